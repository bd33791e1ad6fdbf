//! Human readable rendering of client events

use colored::Colorize;
use lwrp_client::ConnectionStatus;
use lwrp_core::{Attributes, Destination, IoDirection, ResponseRecord};

/// Attributes as `key=value` pairs, sorted by key
fn attributes_text(attributes: &Attributes) -> String {
    let mut pairs: Vec<_> = attributes.iter().collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| {
            if v.contains(' ') {
                format!("{}=\"{}\"", k, v)
            } else {
                format!("{}={}", k, v)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn io_token(io: IoDirection) -> &'static str {
    match io {
        IoDirection::In => "ICH",
        IoDirection::Out => "OCH",
        IoDirection::Unknown => "?",
    }
}

/// One line per record
pub fn record_line(record: &ResponseRecord) -> String {
    let head = match record {
        ResponseRecord::Device(_) => "VER".to_string(),
        ResponseRecord::Network(_) => "IP".to_string(),
        ResponseRecord::Set(_) => "SET".to_string(),
        ResponseRecord::Source(src) => format!("SRC {}", src.num),
        ResponseRecord::Destination(dst) => format!("DST {}", dst.num),
        ResponseRecord::Meter(mtr) => format!("MTR {} {}", io_token(mtr.io), mtr.num),
        ResponseRecord::LevelAlert(lvl) if lvl.side.is_empty() => {
            format!("LVL {} {}", io_token(lvl.io), lvl.num)
        }
        ResponseRecord::LevelAlert(lvl) => format!("LVL {} {}.{}", io_token(lvl.io), lvl.num, lvl.side),
        ResponseRecord::Gpi(gpi) => format!("GPI {}", gpi.num),
        ResponseRecord::Gpo(gpo) => format!("GPO {}", gpo.num),
        ResponseRecord::Matrix(mix) => {
            let points: Vec<String> = mix
                .src
                .iter()
                .map(|s| format!("{}:{}", s.num, s.level))
                .collect();
            return format!("MIX {} {}", mix.dst, points.join(" "));
        }
        ResponseRecord::Error(err) => return format!("{} {}", "ERROR".red(), err.message),
    };

    match record.attributes() {
        Some(attributes) if !attributes.is_empty() => {
            format!("{} {}", head.bold(), attributes_text(attributes))
        }
        _ => head.bold().to_string(),
    }
}

pub fn status_line(status: ConnectionStatus, message: Option<&str>) -> String {
    let label = match status {
        ConnectionStatus::Ok => status.as_str().green(),
        ConnectionStatus::Connecting => status.as_str().yellow(),
        ConnectionStatus::Disconnected => status.as_str().dimmed(),
        ConnectionStatus::BadConfig | ConnectionStatus::ConnectionFailure => {
            status.as_str().red()
        }
    };

    match message {
        Some(message) => format!("{} {}", label, message),
        None => label.to_string(),
    }
}

/// `output  source  name`
pub fn output_line(dst: &Destination, source: Option<&str>) -> String {
    format!(
        "{:>5}  {:<24}  {}",
        dst.num,
        source.unwrap_or("-"),
        dst.name().unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwrp_core::parse_line;

    fn line(text: &str) -> String {
        colored::control::set_override(false);
        record_line(&parse_line(text).unwrap().unwrap())
    }

    #[test]
    fn test_record_lines() {
        assert_eq!(
            line(r#"DST 5 NAME:"Studio B" ADDR:239.192.0.10"#),
            r#"DST 5 address=239.192.0.10 name="Studio B""#
        );
        assert_eq!(line("MIX 3 1:10 -:- 2:5"), "MIX 3 1:10 2:5");
        assert_eq!(line("LVL ICH 4.L CLIP"), "LVL ICH 4.L clip=true");
        assert_eq!(line("ERROR 1000 bad"), "ERROR 1000 bad");
    }

    #[test]
    fn test_output_line() {
        colored::control::set_override(false);
        let dst = parse_line("DST 2 ADDR:239.192.0.1").unwrap().unwrap().into_destination().unwrap();
        let text = output_line(&dst, Some("239.192.0.1"));
        assert!(text.starts_with("    2  239.192.0.1"));
    }
}
