//! # NMEA Sentence Encoder
//!
//! Turns one [`TelemetrySnapshot`] into the GPGGA, GPRMC and EXINJ sentences
//! sent to the receiver every poll cycle.
//!
//! ```text
//! $GPGGA,<time>.000,<lat>,<N|S>,<lon>,<E|W>,1,7,1.15,<alt>,M,23.7,M,,*6F
//! $GPRMC,<time>.000,A,<lat>,<N|S>,<lon>,<E|W>,<speed>,267.70,<date>,,,A*6D
//! $EXINJ,<heading>,<roll>,<pitch>,<yaw>,NA
//! ```
//!
//! Fix quality, satellite count, HDOP, geoid separation and course are fixed
//! literals. Yaw repeats heading because the simulator leaves `yaw-deg` empty.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use super::checksum::with_checksum;
use super::protocol::*;
use crate::error::{BridgeError, Result};
use crate::telemetry::TelemetrySnapshot;

/// Output knobs for [`encode_sentences`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderOptions {
    pub checksum: ChecksumMode,
    pub coordinates: CoordinateFormat,
}

/// Encode a telemetry snapshot into the three NMEA sentences
///
/// # Arguments
///
/// * `snapshot` - Telemetry gathered this cycle
/// * `now` - Timestamp written into the time and date fields
/// * `options` - Checksum and coordinate formatting
///
/// # Errors
///
/// Returns [`BridgeError::MissingField`] if a required property is absent and
/// [`BridgeError::NonNumericField`] if a numeric one is not a decimal. Both
/// mean "skip this cycle".
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use fg_nmea_bridge::nmea::encoder::{encode_sentences, EncoderOptions};
/// use fg_nmea_bridge::telemetry::decoder::decode_listing;
///
/// let snapshot = decode_listing(
///     "altitude-ft = '1000' (double)\r\n\
///      latitude-deg = '45.0' (double)\r\n\
///      longitude-deg = '-122.0' (double)\r\n\
///      heading-deg = '90' (double)\r\n\
///      roll-deg = '1' (double)\r\n\
///      pitch-deg = '2' (double)\r\n\
///      groundspeed-kt = '100' (double)\r\n/> ",
/// );
/// let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
/// let triple = encode_sentences(&snapshot, now, &EncoderOptions::default())?;
/// assert_eq!(triple.exinj, "$EXINJ,90,1,2,90,NA");
/// # Ok::<(), fg_nmea_bridge::error::BridgeError>(())
/// ```
pub fn encode_sentences(
    snapshot: &TelemetrySnapshot,
    now: DateTime<Utc>,
    options: &EncoderOptions,
) -> Result<NmeaTriple> {
    let time = now.format("%H%M%S").to_string();
    let date = now.format("%d%m%y").to_string();

    let altitude_ft = snapshot.require_decimal(FIELD_ALTITUDE_FT)?;
    let altitude_m = altitude_ft
        .checked_mul(Decimal::new(FEET_TO_METRES_MANTISSA, FEET_TO_METRES_SCALE))
        .ok_or_else(|| BridgeError::NonNumericField(FIELD_ALTITUDE_FT.to_string()))?;

    let latitude = snapshot.require_decimal(FIELD_LATITUDE_DEG)?;
    let longitude = snapshot.require_decimal(FIELD_LONGITUDE_DEG)?;
    let lat_hemisphere = if latitude > Decimal::ZERO { 'N' } else { 'S' };
    let lon_hemisphere = if longitude > Decimal::ZERO { 'E' } else { 'W' };
    let lat = encode_coordinate(latitude, options.coordinates)
        .ok_or_else(|| BridgeError::NonNumericField(FIELD_LATITUDE_DEG.to_string()))?;
    let lon = encode_coordinate(longitude, options.coordinates)
        .ok_or_else(|| BridgeError::NonNumericField(FIELD_LONGITUDE_DEG.to_string()))?;
    let lat = format_fixed(lat, 9, 4);
    let lon = format_fixed(lon, 10, 4);

    let heading = snapshot.require(FIELD_HEADING_DEG)?;
    let roll = snapshot.require(FIELD_ROLL_DEG)?;
    let pitch = snapshot.require(FIELD_PITCH_DEG)?;
    let yaw = heading;

    let speed = format_fixed(snapshot.require_decimal(FIELD_GROUNDSPEED_KT)?, 0, 2);

    let gpgga = format!(
        "GPGGA,{}.000,{},{},{},{},1,7,1.15,{},M,23.7,M,,",
        time, lat, lat_hemisphere, lon, lon_hemisphere, altitude_m
    );
    let gprmc = format!(
        "GPRMC,{}.000,A,{},{},{},{},{},267.70,{},,,A",
        time, lat, lat_hemisphere, lon, lon_hemisphere, speed, date
    );
    let exinj = format!("EXINJ,{},{},{},{},NA", heading, roll, pitch, yaw);

    Ok(match options.checksum {
        ChecksumMode::Legacy => NmeaTriple {
            gpgga: legacy_sentence(&gpgga, Some(GPGGA_LEGACY_CHECKSUM)),
            gprmc: legacy_sentence(&gprmc, Some(GPRMC_LEGACY_CHECKSUM)),
            exinj: legacy_sentence(&exinj, None),
        },
        ChecksumMode::Computed => NmeaTriple {
            gpgga: with_checksum(&gpgga),
            gprmc: with_checksum(&gprmc),
            exinj: with_checksum(&exinj),
        },
    })
}

/// Magnitude of a signed coordinate in the configured encoding
///
/// `None` when the value does not fit a decimal after scaling.
fn encode_coordinate(degrees: Decimal, format: CoordinateFormat) -> Option<Decimal> {
    let magnitude = degrees.abs();
    let hundred = Decimal::ONE_HUNDRED;

    match format {
        CoordinateFormat::Scaled => magnitude.checked_mul(hundred),
        CoordinateFormat::DegreesMinutes => {
            let whole = magnitude.trunc();
            let minutes = (magnitude - whole).checked_mul(Decimal::from(60))?;
            whole.checked_mul(hundred)?.checked_add(minutes)
        }
    }
}

/// Fixed-point rendering: round half-to-even, then zero-pad to `width`
fn format_fixed(value: Decimal, width: usize, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointNearestEven);
    let text = format!("{:.*}", decimals as usize, rounded);

    match text.strip_prefix('-') {
        Some(digits) if digits.len() + 1 < width => {
            format!("-{}{}", "0".repeat(width - digits.len() - 1), digits)
        }
        None if text.len() < width => format!("{}{}", "0".repeat(width - text.len()), text),
        _ => text,
    }
}

fn legacy_sentence(body: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{}{}{}{}", NMEA_START, body, NMEA_CHECKSUM_DELIMITER, suffix),
        None => format!("{}{}", NMEA_START, body),
    }
}
