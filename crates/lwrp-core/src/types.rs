//! Response record types
//!
//! Every line a device sends decodes into exactly one [`ResponseRecord`]
//! variant. Attribute maps use canonical names produced by
//! [`crate::attributes::decode_attributes`], not the wire keys.

use serde::Serialize;
use std::collections::HashMap;

/// Decoded attribute map (canonical key -> raw text value)
pub type Attributes = HashMap<String, String>;

/// Prefix given to attribute keys the decoder does not recognise
pub const UNKNOWN_PREFIX: &str = "UNKNOWN_";

/// Channel direction for meter and level records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IoDirection {
    In,
    Out,
    #[default]
    Unknown,
}

impl IoDirection {
    /// Decode the `ICH` / `OCH` channel class token
    pub fn from_token(token: &str) -> Self {
        match token {
            "ICH" => IoDirection::In,
            "OCH" => IoDirection::Out,
            _ => IoDirection::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IoDirection::In => "in",
            IoDirection::Out => "out",
            IoDirection::Unknown => "unknown",
        }
    }
}

/// Device information (`VER`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Device {
    pub attributes: Attributes,
}

/// Network settings (`IP`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Network {
    pub attributes: Attributes,
}

/// Device settings (`SET`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Settings {
    pub attributes: Attributes,
}

/// A source channel (`SRC`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Source {
    pub num: String,
    pub attributes: Attributes,
}

/// A destination / output channel (`DST`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Destination {
    pub num: u32,
    pub attributes: Attributes,
}

impl Destination {
    /// The decoded `ADDR` attribute, if the device reported one
    pub fn address(&self) -> Option<&str> {
        self.attributes.get("address").map(|s| s.as_str())
    }

    /// The channel name, if reported
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").map(|s| s.as_str())
    }
}

/// Meter levels (`MTR`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Meter {
    pub io: IoDirection,
    pub num: String,
    pub attributes: Attributes,
}

/// Level alert (`LVL`), num is `<channel>.<side>` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LevelAlert {
    pub io: IoDirection,
    pub num: String,
    pub side: String,
    pub attributes: Attributes,
}

/// General purpose input (`GPI`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Gpi {
    pub num: String,
    pub attributes: Attributes,
}

/// General purpose output (`GPO`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Gpo {
    pub num: String,
    pub attributes: Attributes,
}

/// One populated crosspoint of a mix matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatrixSrc {
    pub num: u32,
    pub level: i32,
}

/// Mix matrix for a destination (`MIX`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Matrix {
    pub dst: u32,
    pub src: Vec<MatrixSrc>,
}

/// Device reported error (`ERROR`)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DeviceError {
    pub message: String,
}

/// A decoded protocol line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseRecord {
    Device(Device),
    Network(Network),
    Set(Settings),
    Source(Source),
    Destination(Destination),
    Meter(Meter),
    LevelAlert(LevelAlert),
    Gpi(Gpi),
    Gpo(Gpo),
    Matrix(Matrix),
    Error(DeviceError),
}

impl ResponseRecord {
    /// Short name of the record kind
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseRecord::Device(_) => "device",
            ResponseRecord::Network(_) => "network",
            ResponseRecord::Set(_) => "set",
            ResponseRecord::Source(_) => "source",
            ResponseRecord::Destination(_) => "destination",
            ResponseRecord::Meter(_) => "meter",
            ResponseRecord::LevelAlert(_) => "level_alert",
            ResponseRecord::Gpi(_) => "gpi",
            ResponseRecord::Gpo(_) => "gpo",
            ResponseRecord::Matrix(_) => "matrix",
            ResponseRecord::Error(_) => "error",
        }
    }

    /// Attribute map, for every kind that carries one
    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            ResponseRecord::Device(r) => Some(&r.attributes),
            ResponseRecord::Network(r) => Some(&r.attributes),
            ResponseRecord::Set(r) => Some(&r.attributes),
            ResponseRecord::Source(r) => Some(&r.attributes),
            ResponseRecord::Destination(r) => Some(&r.attributes),
            ResponseRecord::Meter(r) => Some(&r.attributes),
            ResponseRecord::LevelAlert(r) => Some(&r.attributes),
            ResponseRecord::Gpi(r) => Some(&r.attributes),
            ResponseRecord::Gpo(r) => Some(&r.attributes),
            ResponseRecord::Matrix(_) | ResponseRecord::Error(_) => None,
        }
    }

    pub fn as_destination(&self) -> Option<&Destination> {
        match self {
            ResponseRecord::Destination(dst) => Some(dst),
            _ => None,
        }
    }

    pub fn into_destination(self) -> Option<Destination> {
        match self {
            ResponseRecord::Destination(dst) => Some(dst),
            _ => None,
        }
    }
}
