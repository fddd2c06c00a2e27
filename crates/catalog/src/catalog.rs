//! The immutable sample catalog and game manifest loading.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use alt_common::{BehaviorTable, GameSettings};
use tracing::{info, warn};

use crate::csv::parse_manifest;
use crate::error::{CatalogError, CatalogResult};
use crate::ini::parse_behavior;
use crate::sample::SampleInfo;

/// Immutable table of samples keyed by logical command id.
///
/// A command may map to several samples; [`select`](Self::select) walks
/// them round-robin so replays stay deterministic.
#[derive(Debug)]
pub struct SampleCatalog {
    samples: HashMap<u16, Vec<SampleInfo>>,
    cursors: HashMap<u16, AtomicUsize>,
}

impl SampleCatalog {
    pub fn from_samples(samples: Vec<SampleInfo>) -> Self {
        let mut map: HashMap<u16, Vec<SampleInfo>> = HashMap::new();
        for sample in samples {
            map.entry(sample.id).or_default().push(sample);
        }
        let cursors = map.keys().map(|&id| (id, AtomicUsize::new(0))).collect();
        Self { samples: map, cursors }
    }

    /// All samples mapped to a command, or `None` for an unknown command.
    pub fn lookup(&self, cmd: u16) -> Option<&[SampleInfo]> {
        self.samples.get(&cmd).map(|v| v.as_slice())
    }

    /// Pick the next sample for a command, round-robin across its rows.
    pub fn select(&self, cmd: u16) -> Option<&SampleInfo> {
        let candidates = self.samples.get(&cmd)?;
        if candidates.is_empty() {
            return None;
        }
        let cursor = self
            .cursors
            .get(&cmd)
            .map(|c| c.fetch_add(1, Ordering::Relaxed))
            .unwrap_or(0);
        Some(&candidates[cursor % candidates.len()])
    }

    /// Number of distinct command ids.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Everything loaded from a game's altsound directory.
#[derive(Debug)]
pub struct GameManifest {
    pub catalog: SampleCatalog,
    pub behavior: BehaviorTable,
    pub settings: GameSettings,
}

/// Load `<altsound_dir>/altsound.csv` and the optional `behavior.ini`.
pub fn load_game(altsound_dir: &Path) -> CatalogResult<GameManifest> {
    if !altsound_dir.is_dir() {
        return Err(CatalogError::DirectoryNotFound {
            path: altsound_dir.display().to_string(),
        });
    }

    let samples = parse_manifest(&altsound_dir.join("altsound.csv"), altsound_dir)?;
    if samples.is_empty() {
        warn!(dir = %altsound_dir.display(), "Manifest declares no samples");
    }

    let (behavior, settings) = parse_behavior(&altsound_dir.join("behavior.ini"))?;

    info!(
        dir = %altsound_dir.display(),
        commands = samples.iter().map(|s| s.id).collect::<std::collections::HashSet<_>>().len(),
        samples = samples.len(),
        rom_volume_ctrl = settings.rom_volume_ctrl,
        "Game manifest loaded"
    );

    Ok(GameManifest {
        catalog: SampleCatalog::from_samples(samples),
        behavior,
        settings,
    })
}
