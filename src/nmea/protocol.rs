//! # NMEA Sentence Constants and Types
//!
//! Fixed fields of the three sentences emitted every poll cycle.

use serde::Deserialize;

/// Sentence start delimiter
pub const NMEA_START: char = '$';

/// Checksum delimiter
pub const NMEA_CHECKSUM_DELIMITER: char = '*';

/// Fixed suffix historically appended to GPGGA (not a real checksum)
pub const GPGGA_LEGACY_CHECKSUM: &str = "6F";

/// Fixed suffix historically appended to GPRMC (not a real checksum)
pub const GPRMC_LEGACY_CHECKSUM: &str = "6D";

/// Feet to metres factor 0.3048, as decimal mantissa and scale
pub const FEET_TO_METRES_MANTISSA: i64 = 3048;
pub const FEET_TO_METRES_SCALE: u32 = 4;

/// Telemetry properties the encoder reads
pub const FIELD_ALTITUDE_FT: &str = "altitude-ft";
pub const FIELD_LATITUDE_DEG: &str = "latitude-deg";
pub const FIELD_LONGITUDE_DEG: &str = "longitude-deg";
pub const FIELD_HEADING_DEG: &str = "heading-deg";
pub const FIELD_ROLL_DEG: &str = "roll-deg";
pub const FIELD_PITCH_DEG: &str = "pitch-deg";
pub const FIELD_GROUNDSPEED_KT: &str = "groundspeed-kt";

/// How the `*XX` suffix of each sentence is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChecksumMode {
    /// Fixed `*6F` / `*6D` suffixes, no suffix on EXINJ.
    ///
    /// Receivers already deployed against this bridge expect these literals,
    /// even though they are not valid NMEA 0183 checksums.
    #[default]
    Legacy,
    /// XOR checksum of every character between `$` and `*`
    Computed,
}

/// How latitude and longitude magnitudes are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoordinateFormat {
    /// Decimal degrees multiplied by 100 (45.5° is written `4550.0000`).
    ///
    /// Not the standard degrees-minutes encoding; downstream consumers
    /// compensate for it.
    #[default]
    Scaled,
    /// Standard `ddmm.mmmm` (45.5° is written `4530.0000`)
    DegreesMinutes,
}

/// The three sentences produced from one telemetry snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NmeaTriple {
    /// Position fix
    pub gpgga: String,
    /// Recommended minimum navigation data
    pub gprmc: String,
    /// Orientation extension
    pub exinj: String,
}

impl NmeaTriple {
    /// Sentences in transmission order
    pub fn sentences(&self) -> [&str; 3] {
        [&self.gpgga, &self.gprmc, &self.exinj]
    }

    pub fn into_array(self) -> [String; 3] {
        [self.gpgga, self.gprmc, self.exinj]
    }
}
