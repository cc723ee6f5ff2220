//! # NMEA 0183 Checksum
//!
//! XOR of every byte between the leading `$` and the `*` delimiter,
//! written as two upper-case hex digits.

use super::protocol::{NMEA_CHECKSUM_DELIMITER, NMEA_START};

/// Calculate the checksum of a sentence body (no `$`, no `*`)
///
/// # Examples
///
/// ```
/// use fg_nmea_bridge::nmea::checksum::nmea_checksum;
///
/// let body = "GPGGA,092750.000,5321.6802,N,00630.3372,W,1,8,1.03,61.7,M,55.2,M,,";
/// assert_eq!(nmea_checksum(body), 0x76);
/// ```
pub fn nmea_checksum(body: &str) -> u8 {
    body.bytes().fold(0u8, |acc, byte| acc ^ byte)
}

/// Build `$<body>*<XX>`
pub fn with_checksum(body: &str) -> String {
    format!(
        "{}{}{}{:02X}",
        NMEA_START,
        body,
        NMEA_CHECKSUM_DELIMITER,
        nmea_checksum(body)
    )
}

/// Check a complete sentence against its trailing checksum
///
/// Returns `false` when the sentence has no `$` prefix, no `*` suffix or
/// a checksum that does not match.
pub fn verify_sentence(sentence: &str) -> bool {
    let Some(rest) = sentence.trim_end().strip_prefix(NMEA_START) else {
        return false;
    };
    let Some((body, checksum)) = rest.rsplit_once(NMEA_CHECKSUM_DELIMITER) else {
        return false;
    };

    match u8::from_str_radix(checksum, 16) {
        Ok(expected) => checksum.len() == 2 && nmea_checksum(body) == expected,
        Err(_) => false,
    }
}
