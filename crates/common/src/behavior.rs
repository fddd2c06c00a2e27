//! Behavior records and ducking profiles.
//!
//! Each behavioral category declares how many instances may play at once,
//! what happens when the limit is hit, and how a newly started sound of
//! that category affects the others: stop them outright, pause them until
//! it ends, or duck them by a per-category multiplier taken from a named
//! ducking profile.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::SampleCategory;

/// Multiplicative volume applied to each category while a ducking sound
/// plays. The identity profile leaves everything at full volume.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DuckingProfile {
    pub music: f32,
    pub callout: f32,
    pub sfx: f32,
    pub solo: f32,
    pub overlay: f32,
}

impl DuckingProfile {
    /// All-1.0 profile: no attenuation anywhere.
    pub const IDENTITY: Self = Self {
        music: 1.0,
        callout: 1.0,
        sfx: 1.0,
        solo: 1.0,
        overlay: 1.0,
    };

    /// The multiplier this profile applies to the given category.
    pub fn volume_for(&self, category: SampleCategory) -> f32 {
        match category.behavior_key() {
            SampleCategory::Music => self.music,
            SampleCategory::Callout => self.callout,
            SampleCategory::Sfx => self.sfx,
            SampleCategory::Solo => self.solo,
            SampleCategory::Overlay => self.overlay,
            _ => 1.0,
        }
    }
}

impl Default for DuckingProfile {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Small set of behavioral categories.
///
/// Categories are few and fixed, so a bitmask beats a heap-allocated set.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySet(u8);

impl CategorySet {
    pub const EMPTY: Self = Self(0);

    fn bit(category: SampleCategory) -> u8 {
        match category.behavior_key() {
            SampleCategory::Music => 1 << 0,
            SampleCategory::Callout => 1 << 1,
            SampleCategory::Sfx => 1 << 2,
            SampleCategory::Solo => 1 << 3,
            SampleCategory::Overlay => 1 << 4,
            _ => 0,
        }
    }

    pub fn with(mut self, category: SampleCategory) -> Self {
        self.insert(category);
        self
    }

    pub fn insert(&mut self, category: SampleCategory) {
        self.0 |= Self::bit(category);
    }

    pub fn contains(&self, category: SampleCategory) -> bool {
        let bit = Self::bit(category);
        bit != 0 && self.0 & bit != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<SampleCategory> for CategorySet {
    fn from_iter<I: IntoIterator<Item = SampleCategory>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for cat in iter {
            set.insert(cat);
        }
        set
    }
}

/// What to do when a category is already at its concurrency limit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaturationPolicy {
    /// Silently discard the new sound (logged at info).
    #[default]
    Drop,
    /// Stop the earliest-started instance to make room.
    EvictOldest,
}

/// Per-category behavior declaration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BehaviorInfo {
    /// Gain applied on top of the sample's own gain.
    pub base_gain: f32,
    /// Maximum simultaneous instances of this category.
    pub max_concurrent: usize,
    /// What to do when `max_concurrent` is reached.
    pub on_full: SaturationPolicy,
    /// Categories whose streams are terminated when a sound of this
    /// category starts.
    pub stops: CategorySet,
    /// Categories paused for the duration of a sound of this category.
    pub pauses: CategorySet,
    /// Categories ducked while a sound of this category plays. The
    /// multiplier comes from the playing sample's ducking profile.
    pub ducks: CategorySet,
    /// Named ducking profiles referenced by samples of this category.
    pub ducking_profiles: HashMap<String, DuckingProfile>,
}

impl BehaviorInfo {
    /// Resolve a profile key, falling back to identity when unknown.
    ///
    /// An unknown key is a manifest authoring error; the original engine
    /// logs it and carries on at full volume.
    pub fn ducking_profile(&self, key: &str) -> DuckingProfile {
        if key.is_empty() {
            return DuckingProfile::IDENTITY;
        }
        match self.ducking_profiles.get(key) {
            Some(profile) => *profile,
            None => {
                tracing::warn!(profile = key, "Ducking profile not found, using identity");
                DuckingProfile::IDENTITY
            }
        }
    }
}

impl Default for BehaviorInfo {
    fn default() -> Self {
        Self {
            base_gain: 1.0,
            max_concurrent: 1,
            on_full: SaturationPolicy::Drop,
            stops: CategorySet::EMPTY,
            pauses: CategorySet::EMPTY,
            ducks: CategorySet::EMPTY,
            ducking_profiles: HashMap::new(),
        }
    }
}

/// The full set of behavior records, one per behavioral category.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BehaviorTable {
    pub music: BehaviorInfo,
    pub callout: BehaviorInfo,
    pub sfx: BehaviorInfo,
    pub solo: BehaviorInfo,
    pub overlay: BehaviorInfo,
}

impl BehaviorTable {
    pub fn get(&self, category: SampleCategory) -> &BehaviorInfo {
        match category.behavior_key() {
            SampleCategory::Callout => &self.callout,
            SampleCategory::Sfx => &self.sfx,
            SampleCategory::Solo => &self.solo,
            SampleCategory::Overlay => &self.overlay,
            // Music, Jingle, and anything undefined fall back to the
            // music record, matching the legacy alias.
            _ => &self.music,
        }
    }

    pub fn get_mut(&mut self, category: SampleCategory) -> &mut BehaviorInfo {
        match category.behavior_key() {
            SampleCategory::Callout => &mut self.callout,
            SampleCategory::Sfx => &mut self.sfx,
            SampleCategory::Solo => &mut self.solo,
            SampleCategory::Overlay => &mut self.overlay,
            _ => &mut self.music,
        }
    }
}

impl Default for BehaviorTable {
    /// Defaults used when a game ships no behavior file.
    ///
    /// New music replaces the current track, callouts and solos are
    /// exclusive within their category, sound effects recycle their
    /// oldest instance once the pool is full.
    fn default() -> Self {
        Self {
            music: BehaviorInfo {
                max_concurrent: 1,
                stops: CategorySet::EMPTY.with(SampleCategory::Music),
                ..BehaviorInfo::default()
            },
            callout: BehaviorInfo {
                max_concurrent: 1,
                stops: CategorySet::EMPTY.with(SampleCategory::Callout),
                ducks: CategorySet::EMPTY.with(SampleCategory::Music),
                ducking_profiles: HashMap::from([(
                    "default".to_string(),
                    DuckingProfile {
                        music: 0.65,
                        ..DuckingProfile::IDENTITY
                    },
                )]),
                ..BehaviorInfo::default()
            },
            sfx: BehaviorInfo {
                max_concurrent: 8,
                on_full: SaturationPolicy::EvictOldest,
                ..BehaviorInfo::default()
            },
            solo: BehaviorInfo {
                max_concurrent: 1,
                stops: CategorySet::EMPTY
                    .with(SampleCategory::Music)
                    .with(SampleCategory::Solo),
                ..BehaviorInfo::default()
            },
            overlay: BehaviorInfo {
                max_concurrent: 2,
                on_full: SaturationPolicy::EvictOldest,
                ducks: CategorySet::EMPTY.with(SampleCategory::Music),
                ..BehaviorInfo::default()
            },
        }
    }
}
