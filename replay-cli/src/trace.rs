//! Command trace parsing.
//!
//! A trace is a text file of timed sound commands, one per line, as
//! recorded from live gameplay or written by hand:
//!
//! ```text
//! # msec, command byte
//! 0, 0x7A
//! 5, 0x42
//! 1250, 0x17
//! ```
//!
//! Timestamps are absolute milliseconds from replay start.

use std::path::Path;

use anyhow::{bail, Context, Result};

/// One timed command byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TraceEntry {
    pub at_ms: u64,
    pub cmd: u8,
}

/// Parse a trace file. Lines are `msec, cmd` with `#` comments.
pub fn parse_trace(path: &Path) -> Result<Vec<TraceEntry>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading trace file {}", path.display()))?;

    let mut entries = Vec::new();
    for (idx, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (msec, cmd) = line
            .split_once(',')
            .with_context(|| format!("line {}: expected `msec, cmd`", idx + 1))?;

        let at_ms: u64 = msec
            .trim()
            .parse()
            .with_context(|| format!("line {}: bad timestamp {msec:?}", idx + 1))?;

        let cmd_token = cmd.trim();
        let value = if let Some(hex) = cmd_token
            .strip_prefix("0x")
            .or_else(|| cmd_token.strip_prefix("0X"))
        {
            u32::from_str_radix(hex, 16)
        } else {
            cmd_token.parse()
        }
        .with_context(|| format!("line {}: bad command {cmd_token:?}", idx + 1))?;

        if value > 0xFF {
            bail!("line {}: command {value:#X} does not fit in a byte", idx + 1);
        }

        entries.push(TraceEntry {
            at_ms,
            cmd: value as u8,
        });
    }

    if entries.is_empty() {
        bail!("trace {} contains no commands", path.display());
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("alt-replay-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parses_hex_and_decimal() {
        let path = write_temp("trace_ok.txt", "# header\n0, 0x7A\n5, 66\n\n1250, 0x17\n");
        let entries = parse_trace(&path).unwrap();
        assert_eq!(
            entries,
            vec![
                TraceEntry { at_ms: 0, cmd: 0x7A },
                TraceEntry { at_ms: 5, cmd: 66 },
                TraceEntry { at_ms: 1250, cmd: 0x17 },
            ]
        );
    }

    #[test]
    fn rejects_wide_commands() {
        let path = write_temp("trace_wide.txt", "0, 0x1FF\n");
        assert!(parse_trace(&path).is_err());
    }

    #[test]
    fn rejects_empty_trace() {
        let path = write_temp("trace_empty.txt", "# nothing here\n");
        assert!(parse_trace(&path).is_err());
    }
}
