//! Behavior file parsing.
//!
//! `behavior.ini` declares per-category behavior records, ducking
//! profiles, and game options:
//!
//! ```text
//! [format]
//! rom_volume_ctrl = true
//! cmd_skip_count = 0
//!
//! [music]
//! base_gain = 1.0
//! max_concurrent = 1
//! stops = music
//!
//! [callout]
//! ducks = music, sfx
//! profile1 = music:0.3, sfx:0.6
//! ```
//!
//! The file is optional; a game without one gets the built-in defaults.

use std::path::Path;

use alt_common::{
    BehaviorTable, CategorySet, DuckingProfile, GameSettings, SampleCategory, SaturationPolicy,
};
use tracing::{debug, warn};

use crate::csv::parse_flag;
use crate::error::{CatalogError, CatalogResult};

/// Parse `behavior.ini`. Returns defaults when the file does not exist.
pub fn parse_behavior(path: &Path) -> CatalogResult<(BehaviorTable, GameSettings)> {
    let mut behavior = BehaviorTable::default();
    let mut settings = GameSettings::default();

    if !path.exists() {
        debug!(path = %path.display(), "No behavior file, using defaults");
        return Ok((behavior, settings));
    }

    let text = std::fs::read_to_string(path)?;
    let file = path.display().to_string();

    let mut section: Option<Section> = None;
    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = match Section::parse(name) {
                Some(s) => Some(s),
                None => {
                    warn!(line = line_no, section = name, "Unknown behavior section, ignored");
                    None
                }
            };
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| CatalogError::Parse {
            file: file.clone(),
            line: line_no,
            reason: format!("expected key = value, got {line:?}"),
        })?;
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match section {
            Some(Section::Format) => apply_format_key(&mut settings, &key, value),
            Some(Section::Category(cat)) => {
                apply_category_key(&mut behavior, cat, &key, value).map_err(|reason| {
                    CatalogError::Parse {
                        file: file.clone(),
                        line: line_no,
                        reason,
                    }
                })?
            }
            None => {}
        }
    }

    debug!(path = %path.display(), "Parsed behavior file");
    Ok((behavior, settings))
}

#[derive(Copy, Clone)]
enum Section {
    Format,
    Category(SampleCategory),
}

impl Section {
    fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("format") {
            return Some(Section::Format);
        }
        match SampleCategory::parse(name) {
            SampleCategory::Undefined => None,
            cat => Some(Section::Category(cat)),
        }
    }
}

fn apply_format_key(settings: &mut GameSettings, key: &str, value: &str) {
    match key {
        "rom_volume_ctrl" => settings.rom_volume_ctrl = parse_flag(value),
        "record_sound_cmds" => settings.record_sound_cmds = parse_flag(value),
        "cmd_skip_count" => settings.cmd_skip_count = value.parse().unwrap_or(0),
        other => warn!(key = other, "Unknown format key, ignored"),
    }
}

fn apply_category_key(
    behavior: &mut BehaviorTable,
    category: SampleCategory,
    key: &str,
    value: &str,
) -> Result<(), String> {
    let info = behavior.get_mut(category);
    match key {
        "base_gain" => {
            info.base_gain = value
                .parse::<f32>()
                .ok()
                .filter(|g| g.is_finite() && *g >= 0.0)
                .ok_or_else(|| format!("bad base_gain {value:?}"))?;
        }
        "max_concurrent" => {
            info.max_concurrent = value
                .parse()
                .map_err(|_| format!("bad max_concurrent {value:?}"))?;
        }
        "on_full" => {
            info.on_full = match value.to_ascii_lowercase().as_str() {
                "drop" => SaturationPolicy::Drop,
                "evict_oldest" => SaturationPolicy::EvictOldest,
                other => return Err(format!("bad on_full policy {other:?}")),
            };
        }
        "stops" => info.stops = parse_category_set(value)?,
        "pauses" => info.pauses = parse_category_set(value)?,
        "ducks" => info.ducks = parse_category_set(value)?,
        profile if profile.starts_with("profile") => {
            let parsed = parse_profile(value)?;
            info.ducking_profiles.insert(profile.to_string(), parsed);
        }
        other => warn!(category = %category, key = other, "Unknown behavior key, ignored"),
    }
    Ok(())
}

fn parse_category_set(value: &str) -> Result<CategorySet, String> {
    let mut set = CategorySet::EMPTY;
    for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match SampleCategory::parse(token) {
            SampleCategory::Undefined => return Err(format!("unknown category {token:?}")),
            cat => set.insert(cat),
        }
    }
    Ok(set)
}

/// `music:0.3, sfx:0.6` — unnamed categories stay at 1.0.
fn parse_profile(value: &str) -> Result<DuckingProfile, String> {
    let mut profile = DuckingProfile::IDENTITY;
    for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (cat, vol) = token
            .split_once(':')
            .ok_or_else(|| format!("expected category:volume, got {token:?}"))?;
        let vol: f32 = vol
            .trim()
            .parse()
            .map_err(|_| format!("bad duck volume {token:?}"))?;
        if !(0.0..=1.0).contains(&vol) {
            return Err(format!("duck volume out of range in {token:?}"));
        }
        match SampleCategory::parse(cat) {
            SampleCategory::Music => profile.music = vol,
            SampleCategory::Jingle => profile.music = vol,
            SampleCategory::Callout => profile.callout = vol,
            SampleCategory::Sfx => profile.sfx = vol,
            SampleCategory::Solo => profile.solo = vol,
            SampleCategory::Overlay => profile.overlay = vol,
            SampleCategory::Undefined => {
                return Err(format!("unknown category in profile entry {token:?}"))
            }
        }
    }
    Ok(profile)
}
