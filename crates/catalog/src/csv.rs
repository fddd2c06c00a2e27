//! Sample manifest parsing.
//!
//! The manifest is a plain comma-separated file, one sample per row:
//!
//! ```text
//! # comment lines and blank lines are skipped
//! ID,TYPE,GAIN,LOOP,PROFILE,FNAME
//! 0x0040,music,0.8,1,,music/main_theme.ogg
//! 0x0051,sfx,0.9,0,profile1,sfx/pop_bumper.wav
//! ```
//!
//! Ids are hex with a `0x` prefix or decimal. Gains above 1.0 are read as
//! legacy percentages. The same id may appear on several rows; dispatch
//! picks among them round-robin.

use std::path::Path;

use alt_common::SampleCategory;
use tracing::{debug, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::sample::SampleInfo;

/// Parse the manifest at `path`; sample paths resolve relative to `base`.
pub fn parse_manifest(path: &Path, base: &Path) -> CatalogResult<Vec<SampleInfo>> {
    if !path.exists() {
        return Err(CatalogError::ManifestNotFound {
            path: path.display().to_string(),
        });
    }
    let text = std::fs::read_to_string(path)?;
    let file = path.display().to_string();

    let mut samples = Vec::new();
    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields[0].eq_ignore_ascii_case("id") {
            // header row
            continue;
        }
        if fields.len() != 6 {
            return Err(CatalogError::Parse {
                file,
                line: line_no,
                reason: format!("expected 6 fields, got {}", fields.len()),
            });
        }

        let id = parse_id(fields[0]).ok_or_else(|| CatalogError::Parse {
            file: file.clone(),
            line: line_no,
            reason: format!("bad sample id {:?}", fields[0]),
        })?;

        let category = SampleCategory::parse(fields[1]);
        if category == SampleCategory::Undefined {
            warn!(line = line_no, token = fields[1], "Unknown sample category, row skipped");
            continue;
        }

        let gain = parse_gain(fields[2]).ok_or_else(|| CatalogError::Parse {
            file: file.clone(),
            line: line_no,
            reason: format!("bad gain {:?}", fields[2]),
        })?;

        let looped = parse_flag(fields[3]);
        let profile = fields[4].to_string();
        let fname = fields[5];
        if fname.is_empty() {
            return Err(CatalogError::Parse {
                file,
                line: line_no,
                reason: "empty file name".to_string(),
            });
        }

        samples.push(SampleInfo {
            id,
            path: base.join(fname),
            category,
            gain,
            looped,
            profile,
        });
    }

    debug!(count = samples.len(), manifest = %path.display(), "Parsed sample manifest");
    Ok(samples)
}

fn parse_id(token: &str) -> Option<u16> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else {
        token.parse().ok()
    }
}

/// Gain in [0, 1]; values above 1 are legacy percentages.
fn parse_gain(token: &str) -> Option<f32> {
    let value: f32 = token.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(if value > 1.0 { (value / 100.0).min(1.0) } else { value })
}

/// Boolean manifest flag; legacy files use 0/100 here.
pub(crate) fn parse_flag(token: &str) -> bool {
    match token.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => true,
        "false" | "no" | "off" | "" => false,
        other => other.parse::<f32>().map(|v| v != 0.0).unwrap_or(false),
    }
}
