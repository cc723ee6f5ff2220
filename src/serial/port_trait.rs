//! Line-oriented I/O over the serial port, behind traits for testing

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::error::{BridgeError, Result};

/// Line terminator written after every sentence
pub const LINE_TERMINATOR: &str = "\n";

/// Anything that accepts one text line at a time
#[async_trait]
pub trait LineSink: Send {
    /// Write `line` followed by a newline
    async fn write_line(&mut self, line: &str) -> Result<()>;
}

/// [`LineSink`] over any async writer
pub struct LineWriter<W> {
    writer: W,
}

impl<W> LineWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W> LineSink for LineWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_line(&mut self, line: &str) -> Result<()> {
        let data = format!("{}{}", line, LINE_TERMINATOR);

        self.writer.write_all(data.as_bytes()).await
            .map_err(|e| BridgeError::Serial(format!("Failed to write line: {}", e)))?;

        self.writer.flush().await
            .map_err(|e| BridgeError::Serial(format!("Failed to flush serial port: {}", e)))?;

        Ok(())
    }
}

/// A [`LineSink`] shared between tasks, swapped out on reconnect
///
/// Writes are serialized by the lock. Writing while detached fails with
/// [`BridgeError::Serial`].
#[derive(Clone, Default)]
pub struct SharedLineSink {
    inner: Arc<Mutex<Option<Box<dyn LineSink>>>>,
}

impl SharedLineSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route writes to `sink` from now on
    pub async fn attach(&self, sink: Box<dyn LineSink>) {
        *self.inner.lock().await = Some(sink);
    }

    /// Drop the current sink
    pub async fn detach(&self) {
        *self.inner.lock().await = None;
    }

    pub async fn is_attached(&self) -> bool {
        self.inner.lock().await.is_some()
    }
}

#[async_trait]
impl LineSink for SharedLineSink {
    async fn write_line(&mut self, line: &str) -> Result<()> {
        match self.inner.lock().await.as_mut() {
            Some(sink) => sink.write_line(line).await,
            None => Err(BridgeError::Serial("serial port not connected".to_string())),
        }
    }
}

/// Newline-delimited reader that tolerates invalid UTF-8
///
/// Partial lines survive a cancelled [`LineReader::next_line`], so it can be
/// used as a `tokio::select!` branch.
pub struct LineReader<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending: Vec::new(),
        }
    }

    /// Next line without its terminator, `None` at end of stream
    ///
    /// Read failures are returned as [`BridgeError::Io`].
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.pending).await?;

        if read == 0 && self.pending.is_empty() {
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&self.pending)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        self.pending.clear();

        Ok(Some(line))
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock line sink for testing
    #[derive(Clone, Default)]
    pub struct MockLineSink {
        pub written_lines: Arc<Mutex<Vec<String>>>,
        pub fail_writes: Arc<Mutex<bool>>,
    }

    impl MockLineSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn get_written_lines(&self) -> Vec<String> {
            self.written_lines.lock().unwrap().clone()
        }

        pub fn set_write_error(&self) {
            *self.fail_writes.lock().unwrap() = true;
        }
    }

    #[async_trait]
    impl LineSink for MockLineSink {
        async fn write_line(&mut self, line: &str) -> Result<()> {
            if *self.fail_writes.lock().unwrap() {
                return Err(BridgeError::Serial("Mock write error".to_string()));
            }
            self.written_lines.lock().unwrap().push(line.to_string());
            Ok(())
        }
    }
}
