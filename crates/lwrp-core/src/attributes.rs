//! Attribute decoding
//!
//! Attribute tokens are `KEY:VALUE` pairs. The decoder renames wire keys to
//! canonical names and applies the per-key rules:
//! - paired values (`PEEK:-120:-118` -> `PEAK_L`, `PEAK_R`)
//! - two-state flags (`CLIP` / `NO-CLIP` -> `clip = true/false`)
//! - address-class keys whose value is the next token (`address 10.0.0.5`)
//! - `ADDR` normalization (unset and all-zero addresses become empty)
//!
//! Keys without a rule are kept as `UNKNOWN_<KEY>`.

use tracing::debug;

use crate::types::{Attributes, UNKNOWN_PREFIX};

const TRUE: &str = "true";
const FALSE: &str = "false";

/// Cursor over the tokens of one line
///
/// Address-class keys consume the following token as their value, so
/// decoding needs to advance past more than one token at a time.
#[derive(Debug)]
pub struct TokenCursor<'a> {
    tokens: &'a [String],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: &'a [String]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Take the next token, if any
    pub fn next_token(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token.as_str())
    }

    /// Tokens not yet consumed
    pub fn remaining(&self) -> &'a [String] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }
}

/// Canonical name for keys whose value follows in the next token
fn lookahead_key(key: &str) -> Option<&'static str> {
    match key {
        "address" => Some("ip_address"),
        "netmask" => Some("ip_netmask"),
        "gateway" => Some("ip_gateway"),
        "hostname" => Some("ip_hostname"),
        _ => None,
    }
}

/// Canonical name for keys that are a plain rename
fn renamed_key(key: &str) -> Option<&'static str> {
    let name = match key {
        "LWRP" => "protocol_version",
        "DEVN" => "device_name",
        "SYSV" => "system_version",
        "NDST" => "destination_count",
        "NGPI" => "GPI_count",
        "NGPO" => "GPO_count",
        "MIX" => "matrix_channels",
        "ADIP" => "advertisment_ipaddress",
        "IPCLK_ADDR" => "clock_ipaddress",
        "NIC_IPADDR" => "nic_ipaddress",
        "NIC_NAME" => "nic_name",
        "PSNM" | "NAME" => "name",
        "LWSA" => "livestream_destination",
        "RTPA" => "rtp_destination",
        "CMD" => "command_text",
        _ => return None,
    };
    Some(name)
}

/// Two-state flags signalled by the presence of one of two keys
fn flag_key(key: &str) -> Option<(&'static str, bool)> {
    match key {
        "CLIP" => Some(("clip", true)),
        "NO-CLIP" => Some(("clip", false)),
        "LOW" => Some(("silence", true)),
        "NO-LOW" => Some(("silence", false)),
        _ => None,
    }
}

fn bool_text(value: bool) -> String {
    let text = if value { TRUE } else { FALSE };
    text.to_string()
}

/// Normalize an `ADDR` value
///
/// Unset (`""`) and `0.0.0.0` addresses become empty; trailing descriptive
/// text after the address is dropped.
pub fn normalize_addr(value: &str) -> String {
    if value.is_empty() || value.starts_with("0.0.0.0") {
        return String::new();
    }

    value.split(' ').next().unwrap_or_default().to_string()
}

fn insert_pair(attrs: &mut Attributes, left: &str, right: &str, value: &str) {
    let (l, r) = value.split_once(':').unwrap_or((value, ""));
    attrs.insert(left.to_string(), l.to_string());
    attrs.insert(right.to_string(), r.to_string());
}

/// Decode attribute tokens into a canonical attribute map
pub fn decode_attributes(tokens: &[String]) -> Attributes {
    let mut attrs = Attributes::new();
    let mut cursor = TokenCursor::new(tokens);

    while let Some(token) = cursor.next_token() {
        if token.is_empty() {
            continue;
        }

        let (key, value) = match token.split_once(':') {
            Some(kv) => kv,
            // Address-class keys and level flags also appear bare
            None if lookahead_key(token).is_some() || flag_key(token).is_some() => (token, ""),
            None => {
                debug!("Attribute token without separator: {:?}", token);
                continue;
            }
        };

        if let Some(name) = lookahead_key(key) {
            let value = if value.is_empty() {
                cursor.next_token().unwrap_or_default()
            } else {
                value
            };
            attrs.insert(name.to_string(), value.to_string());
            continue;
        }

        if let Some(name) = renamed_key(key) {
            attrs.insert(name.to_string(), value.to_string());
            continue;
        }

        if let Some((name, state)) = flag_key(key) {
            attrs.insert(name.to_string(), bool_text(state));
            continue;
        }

        match key {
            "PEEK" => insert_pair(&mut attrs, "PEAK_L", "PEAK_R", value),
            "RMS" => insert_pair(&mut attrs, "RMS_L", "RMS_R", value),
            "NSRC" => {
                let (count, kind) = value.split_once('/').unwrap_or((value, ""));
                attrs.insert("source_count".to_string(), count.to_string());
                attrs.insert("source_type".to_string(), kind.to_string());
            }
            "MIXCFG" if value == "1" || value == "0" => {
                attrs.insert("matrix_enabled".to_string(), bool_text(value == "1"));
            }
            "LWSE" => {
                attrs.insert("livestream".to_string(), bool_text(value == "1"));
            }
            "RTPE" => {
                attrs.insert("rtp".to_string(), bool_text(value == "1"));
            }
            "ADDR" => {
                attrs.insert("address".to_string(), normalize_addr(value));
            }
            _ => {
                attrs.insert(format!("{}{}", UNKNOWN_PREFIX, key), value.to_string());
            }
        }
    }

    attrs
}
