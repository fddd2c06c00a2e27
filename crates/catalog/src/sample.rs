//! Sample descriptors.

use std::path::PathBuf;

use alt_common::SampleCategory;

/// One declarable sample, immutable after catalog load.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleInfo {
    /// Logical command id this sample answers to.
    pub id: u16,
    /// Absolute path of the audio file.
    pub path: PathBuf,
    /// Behavioral category.
    pub category: SampleCategory,
    /// Author-declared gain in [0, 1].
    pub gain: f32,
    /// Whether the sample loops until stopped.
    pub looped: bool,
    /// Key of the ducking profile this sample plays with ("" = identity).
    pub profile: String,
}

impl SampleInfo {
    /// Short display name for logs.
    pub fn name(&self) -> std::borrow::Cow<'_, str> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| self.path.to_string_lossy())
    }
}
