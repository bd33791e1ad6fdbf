//! Livewire stream addressing
//!
//! Livewire audio streams are identified by a compact stream number that
//! maps onto a multicast group. Each stream format owns a block of addresses:
//! ```text
//! standard / livestream   239.192.0.0 + n
//! backfeed standard       239.193.0.0 + n
//! backfeed livestream     239.195.0.0 + n
//! surround                239.196.0.0 + n
//! ```
//!
//! Standard and livestream share a block, so decoding an address in
//! `239.192.x.x` always reports [`StreamFormat::Standard`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::{Error, Result};

/// Highest valid stream number
pub const MAX_STREAM_NUM: u32 = 65535;

/// Prefix marking a SIP style source descriptor
pub const SIP_PREFIX: &str = "sip:";

/// Livewire stream formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamFormat {
    #[default]
    Standard,
    Livestream,
    BackfeedStandard,
    BackfeedLivestream,
    Surround,
}

impl StreamFormat {
    /// Every format, in table order
    pub const ALL: [StreamFormat; 5] = [
        StreamFormat::Standard,
        StreamFormat::Livestream,
        StreamFormat::BackfeedStandard,
        StreamFormat::BackfeedLivestream,
        StreamFormat::Surround,
    ];

    /// First address of this format's multicast block
    pub fn base_ip(self) -> Ipv4Addr {
        match self {
            StreamFormat::Standard | StreamFormat::Livestream => Ipv4Addr::new(239, 192, 0, 0),
            StreamFormat::BackfeedStandard => Ipv4Addr::new(239, 193, 0, 0),
            StreamFormat::BackfeedLivestream => Ipv4Addr::new(239, 195, 0, 0),
            StreamFormat::Surround => Ipv4Addr::new(239, 196, 0, 0),
        }
    }

    /// Infer the format from the second octet of an address
    pub fn from_address(address: Ipv4Addr) -> Result<Self> {
        match address.octets()[1] {
            // Livestream shares this block and cannot be told apart
            192 => Ok(StreamFormat::Standard),
            193 => Ok(StreamFormat::BackfeedStandard),
            195 => Ok(StreamFormat::BackfeedLivestream),
            196 => Ok(StreamFormat::Surround),
            _ => Err(Error::UnknownFormat(address.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StreamFormat::Standard => "standard",
            StreamFormat::Livestream => "livestream",
            StreamFormat::BackfeedStandard => "backfeed_standard",
            StreamFormat::BackfeedLivestream => "backfeed_livestream",
            StreamFormat::Surround => "surround",
        }
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        StreamFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| Error::UnknownFormatName(s.to_string()))
    }
}

/// Base address of a format's block
pub fn base_ip(format: StreamFormat) -> Ipv4Addr {
    format.base_ip()
}

/// Infer a stream format from a multicast address
pub fn format_from_address(address: Ipv4Addr) -> Result<StreamFormat> {
    StreamFormat::from_address(address)
}

/// Convert a stream number to its multicast address
pub fn stream_num_to_address(stream_num: u32, format: StreamFormat) -> Result<Ipv4Addr> {
    if stream_num > MAX_STREAM_NUM {
        return Err(Error::StreamNumOutOfRange(i64::from(stream_num)));
    }

    u32::from(format.base_ip())
        .checked_add(stream_num)
        .map(Ipv4Addr::from)
        .ok_or(Error::StreamNumOutOfRange(i64::from(stream_num)))
}

/// Convert a stream number to its standard-format multicast address text
pub fn stream_num_to_multicast(stream_num: u32) -> Result<String> {
    stream_num_to_address(stream_num, StreamFormat::Standard).map(|ip| ip.to_string())
}

/// Convert a multicast address back to its stream number
///
/// The format is inferred from the second octet; see [`StreamFormat::from_address`].
pub fn address_to_stream_num(address: &str) -> Result<u32> {
    let ip = Ipv4Addr::from_str(address.trim())
        .map_err(|_| Error::InvalidAddress(address.to_string()))?;
    ip_to_stream_num(ip)
}

/// Convert a parsed multicast address back to its stream number
pub fn ip_to_stream_num(ip: Ipv4Addr) -> Result<u32> {
    let format = StreamFormat::from_address(ip)?;

    u32::from(ip)
        .checked_sub(u32::from(format.base_ip()))
        .filter(|n| *n <= MAX_STREAM_NUM)
        .ok_or_else(|| Error::InvalidAddress(format!("{} is outside the {} block", ip, format)))
}

/// Resolve user supplied source text into the address form sent to a device
///
/// `sip:` descriptors pass through unchanged, anything else must be a
/// stream number and becomes its standard multicast address.
pub fn resolve_source(source: &str) -> Result<String> {
    let source = source.trim();
    if source.is_empty() {
        return Err(Error::EmptySource);
    }

    if source.starts_with(SIP_PREFIX) {
        return Ok(source.to_string());
    }

    let stream_num: i64 = source
        .parse()
        .map_err(|_| Error::InvalidStreamNum(source.to_string()))?;
    let stream_num = u32::try_from(stream_num)
        .ok()
        .filter(|n| *n <= MAX_STREAM_NUM)
        .ok_or(Error::StreamNumOutOfRange(stream_num))?;

    stream_num_to_multicast(stream_num)
}
