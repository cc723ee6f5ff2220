//! # Command Line Protocol
//!
//! Vehicle-side command lines and the actuator properties they drive.
//!
//! A command line is `<id>,<param1>,<param2>,...`, for example `1,0.75`
//! sets the throttle of engine 0 to 0.75.

use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Engine 0 throttle
pub const CMD_ENGINE0_THROTTLE: i64 = 1;

/// Engine 1 throttle
pub const CMD_ENGINE1_THROTTLE: i64 = 2;

/// Placeholder substituted with parameters, in order
const TEMPLATE_PLACEHOLDER: &str = "{}";

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    /// Numeric command identifier
    pub id: i64,
    /// Parameters in the order they appeared on the line
    pub params: Vec<String>,
}

impl CommandRecord {
    pub fn new(id: i64, params: Vec<String>) -> Self {
        Self { id, params }
    }
}

impl FromStr for CommandRecord {
    type Err = BridgeError;

    /// Parse `<id>,<param>,...`; trailing line terminators are ignored
    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut pieces = line.split(',');

        let id_text = pieces.next().unwrap_or_default().trim();
        let id = id_text
            .parse::<i64>()
            .map_err(|_| BridgeError::MalformedCommand(format!("invalid command id '{}'", id_text)))?;

        Ok(Self {
            id,
            params: pieces.map(str::to_string).collect(),
        })
    }
}

impl fmt::Display for CommandRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        for param in &self.params {
            write!(f, ",{}", param)?;
        }
        Ok(())
    }
}

/// A command id bound to a simulator property expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub id: i64,
    /// Property path and value, `{}` replaced by parameters
    pub template: &'static str,
}

/// Every command the bridge knows how to forward
pub const ACTUATOR_COMMANDS: &[ActuatorCommand] = &[
    ActuatorCommand {
        id: CMD_ENGINE0_THROTTLE,
        template: "/controls/engines/engine[0]/throttle {}",
    },
    ActuatorCommand {
        id: CMD_ENGINE1_THROTTLE,
        template: "/controls/engines/engine[1]/throttle {}",
    },
];

/// Find the actuator for a command id
///
/// # Errors
///
/// Returns [`BridgeError::UnknownCommand`] for ids not in [`ACTUATOR_COMMANDS`].
pub fn lookup_actuator(id: i64) -> Result<&'static ActuatorCommand> {
    ACTUATOR_COMMANDS
        .iter()
        .find(|command| command.id == id)
        .ok_or(BridgeError::UnknownCommand(id))
}

impl ActuatorCommand {
    /// Fill the template with `params`
    ///
    /// Surplus parameters are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MalformedCommand`] when there are fewer
    /// parameters than placeholders.
    ///
    /// # Examples
    ///
    /// ```
    /// use fg_nmea_bridge::command::protocol::lookup_actuator;
    ///
    /// let actuator = lookup_actuator(1)?;
    /// let expression = actuator.render(&["0.5".to_string()])?;
    /// assert_eq!(expression, "/controls/engines/engine[0]/throttle 0.5");
    /// # Ok::<(), fg_nmea_bridge::error::BridgeError>(())
    /// ```
    pub fn render(&self, params: &[String]) -> Result<String> {
        let mut parts = self.template.split(TEMPLATE_PLACEHOLDER);
        let mut expression = String::from(parts.next().unwrap_or_default());

        for (index, part) in parts.enumerate() {
            let param = params.get(index).ok_or_else(|| {
                BridgeError::MalformedCommand(format!(
                    "command {} expects at least {} parameter(s), got {}",
                    self.id,
                    index + 1,
                    params.len()
                ))
            })?;
            expression.push_str(param);
            expression.push_str(part);
        }

        Ok(expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let record: CommandRecord = "1,0.5".parse().unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(record.params, vec!["0.5".to_string()]);
    }

    #[test]
    fn test_parse_strips_line_terminator() {
        let record: CommandRecord = "2,0.25\r\n".parse().unwrap();
        assert_eq!(record, CommandRecord::new(2, vec!["0.25".into()]));
    }

    #[test]
    fn test_parse_multiple_and_empty_params() {
        let record: CommandRecord = "7,a,,c".parse().unwrap();
        assert_eq!(record.params, vec!["a".to_string(), String::new(), "c".to_string()]);

        let record: CommandRecord = "3".parse().unwrap();
        assert!(record.params.is_empty());
    }

    #[test]
    fn test_parse_invalid_id() {
        for line in ["", "throttle,0.5", "1.5,0.5", ",0.5"] {
            assert!(
                matches!(line.parse::<CommandRecord>(), Err(BridgeError::MalformedCommand(_))),
                "{:?} should be rejected",
                line
            );
        }
    }

    #[test]
    fn test_display_round_trips_line() {
        let record: CommandRecord = "1,0.5,x".parse().unwrap();
        assert_eq!(record.to_string(), "1,0.5,x");
    }

    #[test]
    fn test_lookup_known_actuators() {
        assert_eq!(lookup_actuator(CMD_ENGINE0_THROTTLE).unwrap().id, 1);
        assert_eq!(lookup_actuator(CMD_ENGINE1_THROTTLE).unwrap().id, 2);
    }

    #[test]
    fn test_lookup_unknown_actuator() {
        assert!(matches!(lookup_actuator(99), Err(BridgeError::UnknownCommand(99))));
    }

    #[test]
    fn test_render_engine1() {
        let actuator = lookup_actuator(CMD_ENGINE1_THROTTLE).unwrap();
        assert_eq!(
            actuator.render(&["1.0".into(), "ignored".into()]).unwrap(),
            "/controls/engines/engine[1]/throttle 1.0"
        );
    }

    #[test]
    fn test_render_missing_param() {
        let actuator = lookup_actuator(CMD_ENGINE0_THROTTLE).unwrap();
        assert!(matches!(actuator.render(&[]), Err(BridgeError::MalformedCommand(_))));
    }
}
