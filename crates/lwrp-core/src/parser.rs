//! Response parsing
//!
//! Turns the lines of one response unit into [`ResponseRecord`]s. Each line
//! is `<KEYWORD> <tokens...>`; the keyword selects the record kind and the
//! positional tokens it expects:
//! ```text
//! VER  <attrs>                 IP  <attrs>             SET <attrs>
//! SRC  <num> <attrs>           DST <num> <attrs>       GPI <num> <attrs>
//! GPO  <num> <attrs>           MTR <ICH|OCH> <num> <attrs>
//! LVL  <ICH|OCH> <num.side> <attrs>
//! MIX  <dst> <src:level ...>   ERROR <text>
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::attributes::decode_attributes;
use crate::tokenizer::split_segments;
use crate::types::*;
use crate::{Error, Result};

/// How malformed lines inside a unit are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Log and skip the bad line, keep the rest of the unit
    #[default]
    Lenient,
    /// Fail the whole unit on the first bad line
    Strict,
}

/// Parse every line of a unit, skipping malformed lines
pub fn parse_unit(lines: &[String]) -> Vec<ResponseRecord> {
    let mut records = Vec::with_capacity(lines.len());
    for line in lines {
        match parse_line(line) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => warn!("Skipping line: {}", e),
        }
    }
    records
}

/// Parse every line of a unit with an explicit malformed-line policy
pub fn parse_unit_with(lines: &[String], mode: ParseMode) -> Result<Vec<ResponseRecord>> {
    match mode {
        ParseMode::Lenient => Ok(parse_unit(lines)),
        ParseMode::Strict => {
            let mut records = Vec::with_capacity(lines.len());
            for line in lines {
                if let Some(record) = parse_line(line)? {
                    records.push(record);
                }
            }
            Ok(records)
        }
    }
}

/// Parse a single protocol line
///
/// Returns `Ok(None)` for keywords this client does not decode.
pub fn parse_line(line: &str) -> Result<Option<ResponseRecord>> {
    let (keyword, rest) = line
        .split_once(' ')
        .ok_or_else(|| Error::malformed(line, "missing separator"))?;
    let segments = split_segments(rest);

    let record = match keyword {
        "VER" => ResponseRecord::Device(Device {
            attributes: decode_attributes(&segments),
        }),
        "IP" => ResponseRecord::Network(Network {
            attributes: decode_attributes(&segments),
        }),
        "SET" => ResponseRecord::Set(Settings {
            attributes: decode_attributes(&segments),
        }),
        "SRC" => ResponseRecord::Source(Source {
            num: positional(line, &segments, 0, "source number")?.to_string(),
            attributes: decode_attributes(&segments[1..]),
        }),
        "DST" => ResponseRecord::Destination(Destination {
            num: parse_number(line, positional(line, &segments, 0, "destination number")?)?,
            attributes: decode_attributes(&segments[1..]),
        }),
        "GPI" => ResponseRecord::Gpi(Gpi {
            num: positional(line, &segments, 0, "GPI number")?.to_string(),
            attributes: decode_attributes(&segments[1..]),
        }),
        "GPO" => ResponseRecord::Gpo(Gpo {
            num: positional(line, &segments, 0, "GPO number")?.to_string(),
            attributes: decode_attributes(&segments[1..]),
        }),
        "MTR" => {
            let channel = positional(line, &segments, 1, "meter channel")?;
            ResponseRecord::Meter(Meter {
                io: IoDirection::from_token(&segments[0]),
                num: channel.to_string(),
                attributes: decode_attributes(&segments[2..]),
            })
        }
        "LVL" => {
            let channel = positional(line, &segments, 1, "level channel")?;
            let (num, side) = channel.split_once('.').unwrap_or((channel, ""));
            ResponseRecord::LevelAlert(LevelAlert {
                io: IoDirection::from_token(&segments[0]),
                num: num.to_string(),
                side: side.to_string(),
                attributes: decode_attributes(&segments[2..]),
            })
        }
        "MIX" => ResponseRecord::Matrix(Matrix {
            dst: parse_number(line, positional(line, &segments, 0, "matrix destination")?)?,
            src: segments[1..].iter().filter_map(|p| parse_crosspoint(p)).collect(),
        }),
        "ERROR" => ResponseRecord::Error(DeviceError {
            message: rest.to_string(),
        }),
        _ => {
            debug!("Unknown response type: {} ----- {}", keyword, rest);
            return Ok(None);
        }
    };

    Ok(Some(record))
}

/// Positional token that must be present
fn positional<'a>(line: &str, segments: &'a [String], index: usize, what: &str) -> Result<&'a str> {
    segments
        .get(index)
        .map(|s| s.as_str())
        .ok_or_else(|| Error::malformed(line, format!("missing {}", what)))
}

fn parse_number(line: &str, token: &str) -> Result<u32> {
    token
        .parse()
        .map_err(|_| Error::malformed(line, format!("invalid number {:?}", token)))
}

/// Decode one `src:level` crosspoint, `None` when unpopulated
fn parse_crosspoint(point: &str) -> Option<MatrixSrc> {
    let (num, level) = point.split_once(':')?;
    let level = level.split(':').next().unwrap_or_default();
    if num.is_empty() || level == "-" {
        return None;
    }

    match (num.parse(), level.parse()) {
        (Ok(num), Ok(level)) => Some(MatrixSrc { num, level }),
        _ => {
            debug!("Ignoring unparseable crosspoint {:?}", point);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(line: &str) -> ResponseRecord {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn test_destination() {
        match one("DST 5 ADDR:239.192.0.10") {
            ResponseRecord::Destination(dst) => {
                assert_eq!(dst.num, 5);
                assert_eq!(dst.address(), Some("239.192.0.10"));
            }
            other => panic!("Expected Destination, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_separator() {
        assert!(matches!(parse_line("BOGUS"), Err(Error::MalformedLine { .. })));
    }

    #[test]
    fn test_non_numeric_destination() {
        assert!(parse_line("DST abc ADDR:1").is_err());
    }

    #[test]
    fn test_unknown_keyword() {
        assert_eq!(parse_line("FOO 1 2 3").unwrap(), None);
    }

    #[test]
    fn test_crosspoints() {
        assert_eq!(parse_crosspoint("1:10"), Some(MatrixSrc { num: 1, level: 10 }));
        assert_eq!(parse_crosspoint("4:-20"), Some(MatrixSrc { num: 4, level: -20 }));
        assert_eq!(parse_crosspoint("-:-"), None);
        assert_eq!(parse_crosspoint(":5"), None);
        assert_eq!(parse_crosspoint("7"), None);
    }

    #[test]
    fn test_meter_missing_channel() {
        assert!(parse_line("MTR ICH").is_err());
    }
}
