//! `H:MM:SS` time values used by AVTransport

use crate::error::{RendererError, Result};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Format nanoseconds as `H:MM:SS`; unknown or negative values are zero
pub fn format_time(ns: Option<i64>) -> String {
    let total = ns.filter(|ns| *ns >= 0).unwrap_or(0) / NANOS_PER_SEC;
    format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

/// Parse `H:MM:SS` with an optional `.fff` fraction into nanoseconds
pub fn parse_time(value: &str) -> Result<i64> {
    let invalid = || RendererError::InvalidTime(value.to_string());

    let mut parts = value.trim().split(':');
    let (Some(hours), Some(minutes), Some(seconds), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let (seconds, fraction) = match seconds.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (seconds, None),
    };

    let hours = digits(hours).ok_or_else(invalid)?;
    let minutes = digits(minutes).filter(|m| *m < 60).ok_or_else(invalid)?;
    let seconds = digits(seconds).filter(|s| *s < 60).ok_or_else(invalid)?;

    let fraction_ns = match fraction {
        Some(fraction) if !fraction.is_empty() && fraction.len() <= 9 => {
            let padded = format!("{:0<9}", fraction);
            digits(&padded).ok_or_else(invalid)?
        }
        Some(_) => return Err(invalid()),
        None => 0,
    };

    hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .and_then(|s| s.checked_mul(NANOS_PER_SEC))
        .and_then(|ns| ns.checked_add(fraction_ns))
        .ok_or_else(invalid)
}

fn digits(part: &str) -> Option<i64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}
