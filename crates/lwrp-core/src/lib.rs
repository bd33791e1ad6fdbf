//! LWRP Core
//!
//! Protocol engine for the Livewire Routing Protocol (LWRP), the line-oriented
//! text protocol spoken over TCP by audio-over-IP routing devices.
//!
//! This crate provides:
//! - Stream number / multicast address conversion ([`address`])
//! - Byte stream to response unit framing ([`BlockFramer`])
//! - Line tokenizing and attribute decoding ([`tokenizer`], [`attributes`])
//! - Typed response records ([`ResponseRecord`]) and the [`parser`]
//! - The per-output routing snapshot ([`OutputStateCache`])
//! - Outbound command encoding ([`Command`])

pub mod address;
pub mod attributes;
pub mod command;
pub mod error;
pub mod framer;
pub mod parser;
pub mod state;
pub mod tokenizer;
pub mod types;

pub use address::StreamFormat;
pub use command::Command;
pub use error::{Error, Result};
pub use framer::BlockFramer;
pub use parser::{parse_line, parse_unit, parse_unit_with, ParseMode};
pub use state::OutputStateCache;
pub use types::*;

/// Default LWRP TCP port
pub const DEFAULT_PORT: u16 = 93;

/// Line terminator used on outbound commands
pub const LINE_TERMINATOR: &str = "\n";

/// Marker line opening a multi-line response unit
pub const BLOCK_BEGIN: &str = "BEGIN";

/// Marker line closing a multi-line response unit
pub const BLOCK_END: &str = "END";

/// Default cap on bytes buffered while waiting for a line or block to finish
pub const DEFAULT_MAX_PENDING: usize = 1024 * 1024;

/// Highest output number accepted by routing actions
pub const MAX_OUTPUT_NUM: u32 = 32767;
