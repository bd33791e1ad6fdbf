//! Outbound commands
//!
//! Commands are single text lines terminated by `\n` and sent as Latin-1.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{Error, Result, LINE_TERMINATOR};

/// A command sent to a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `LOGIN [password]`
    Login { password: Option<String> },
    /// `DST`: list destinations and subscribe to their changes
    Destinations,
    /// `DST <output> ADDR:<address>`
    SetRoute { output: u32, address: String },
    /// Any other command text, sent as given
    Raw(String),
}

impl Command {
    /// Login command; an empty password logs in without one
    pub fn login(password: Option<&str>) -> Self {
        Command::Login {
            password: password.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }

    pub fn set_route(output: u32, address: impl Into<String>) -> Self {
        Command::SetRoute {
            output,
            address: address.into(),
        }
    }

    /// Wire text without the terminator
    pub fn text(&self) -> String {
        self.to_string()
    }

    /// Terminated, Latin-1 encoded bytes ready for a single write
    pub fn encode(&self) -> Result<Bytes> {
        encode_line(&self.text())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Login { password: Some(password) } => write!(f, "LOGIN {}", password),
            Command::Login { password: None } => f.write_str("LOGIN"),
            Command::Destinations => f.write_str("DST"),
            Command::SetRoute { output, address } => write!(f, "DST {} ADDR:{}", output, address),
            Command::Raw(text) => f.write_str(text),
        }
    }
}

/// Encode one command line as Latin-1 and append the terminator
pub fn encode_line(text: &str) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(text.len() + LINE_TERMINATOR.len());
    for c in text.chars() {
        let byte = u8::try_from(u32::from(c)).map_err(|_| Error::NotLatin1(text.to_string()))?;
        buf.put_u8(byte);
    }
    buf.put_slice(LINE_TERMINATOR.as_bytes());
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login() {
        assert_eq!(Command::login(Some("secret")).text(), "LOGIN secret");
        assert_eq!(Command::login(Some("")).text(), "LOGIN");
        assert_eq!(Command::login(None).text(), "LOGIN");
    }

    #[test]
    fn test_set_route_bytes() {
        let bytes = Command::set_route(7, "239.192.0.7").encode().unwrap();
        assert_eq!(&bytes[..], b"DST 7 ADDR:239.192.0.7\n");
    }

    #[test]
    fn test_latin1() {
        let bytes = encode_line("SRC 1 PSNM:Caf\u{e9}").unwrap();
        assert_eq!(&bytes[bytes.len() - 2..], &[0xe9, b'\n']);
        assert!(matches!(encode_line("NAME:\u{2603}"), Err(Error::NotLatin1(_))));
    }
}
