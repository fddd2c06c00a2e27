//! Core types with newtype pattern for type safety.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle identifying an active audio stream.
///
/// Handles are allocated monotonically starting at 1 and are never reused
/// within a process lifetime, so a stale handle can never alias a newer
/// stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamHandle(pub u32);

impl StreamHandle {
    /// The first handle ever allocated.
    pub const FIRST: Self = Self(1);

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Behavioral category of a sample.
///
/// The category drives concurrency limits and inter-category effects
/// (stop/pause/duck). `Jingle` is a legacy alias that shares the music
/// behavior record.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleCategory {
    Music,
    Jingle,
    Sfx,
    Callout,
    Solo,
    Overlay,
    /// Parse fallback for unrecognized category strings.
    #[default]
    Undefined,
}

impl SampleCategory {
    /// All categories that carry their own behavior record.
    pub const BEHAVIORAL: [SampleCategory; 5] = [
        SampleCategory::Music,
        SampleCategory::Callout,
        SampleCategory::Sfx,
        SampleCategory::Solo,
        SampleCategory::Overlay,
    ];

    /// The category whose behavior record governs this sample.
    ///
    /// Jingles are treated as music for all behavior purposes.
    pub fn behavior_key(self) -> SampleCategory {
        match self {
            SampleCategory::Jingle => SampleCategory::Music,
            other => other,
        }
    }

    /// Parse a manifest category token (case-insensitive).
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "music" => SampleCategory::Music,
            "jingle" => SampleCategory::Jingle,
            "sfx" => SampleCategory::Sfx,
            "callout" => SampleCategory::Callout,
            "solo" => SampleCategory::Solo,
            "overlay" => SampleCategory::Overlay,
            _ => SampleCategory::Undefined,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SampleCategory::Music => "music",
            SampleCategory::Jingle => "jingle",
            SampleCategory::Sfx => "sfx",
            SampleCategory::Callout => "callout",
            SampleCategory::Solo => "solo",
            SampleCategory::Overlay => "overlay",
            SampleCategory::Undefined => "undefined",
        }
    }
}

impl fmt::Display for SampleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pinball ROM sound board generation.
///
/// Selects the framing rule set used to reassemble raw command bytes into
/// logical 16-bit commands. Unrecognized generations pass bytes through
/// unchanged as 8-bit commands.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HardwareGen {
    WpcAlpha1,
    WpcAlpha2,
    WpcDmd,
    WpcFliptron,
    WpcDcs,
    WpcSecurity,
    Wpc95,
    Wpc95Dcs,
    S11,
    S11X,
    S11B2,
    S11C,
    DeDmd16,
    DeDmd32,
    DeDmd64,
    De,
    Ws,
    Ws1,
    Ws2,
    Gts80a,
    #[default]
    None,
}

impl HardwareGen {
    /// Parse a generation token as found in trace files and configs.
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_uppercase().as_str() {
            "WPCALPHA_1" => HardwareGen::WpcAlpha1,
            "WPCALPHA_2" => HardwareGen::WpcAlpha2,
            "WPCDMD" => HardwareGen::WpcDmd,
            "WPCFLIPTRON" => HardwareGen::WpcFliptron,
            "WPCDCS" => HardwareGen::WpcDcs,
            "WPCSECURITY" => HardwareGen::WpcSecurity,
            "WPC95" => HardwareGen::Wpc95,
            "WPC95DCS" => HardwareGen::Wpc95Dcs,
            "S11" => HardwareGen::S11,
            "S11X" => HardwareGen::S11X,
            "S11B2" => HardwareGen::S11B2,
            "S11C" => HardwareGen::S11C,
            "DEDMD16" => HardwareGen::DeDmd16,
            "DEDMD32" => HardwareGen::DeDmd32,
            "DEDMD64" => HardwareGen::DeDmd64,
            "DE" => HardwareGen::De,
            "WS" => HardwareGen::Ws,
            "WS_1" => HardwareGen::Ws1,
            "WS_2" => HardwareGen::Ws2,
            "GTS80A" => HardwareGen::Gts80a,
            _ => HardwareGen::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_allocation_starts_at_one() {
        let h = StreamHandle::FIRST;
        assert_eq!(h.0, 1);
        assert_eq!(h.next().0, 2);
    }

    #[test]
    fn handle_display() {
        assert_eq!(StreamHandle(7).to_string(), "S7");
    }

    #[test]
    fn category_parse_roundtrip() {
        for cat in SampleCategory::BEHAVIORAL {
            assert_eq!(SampleCategory::parse(cat.as_str()), cat);
        }
        assert_eq!(SampleCategory::parse("JINGLE"), SampleCategory::Jingle);
        assert_eq!(SampleCategory::parse("  Music "), SampleCategory::Music);
        assert_eq!(SampleCategory::parse("voice"), SampleCategory::Undefined);
    }

    #[test]
    fn jingle_behaves_as_music() {
        assert_eq!(SampleCategory::Jingle.behavior_key(), SampleCategory::Music);
        assert_eq!(SampleCategory::Sfx.behavior_key(), SampleCategory::Sfx);
    }

    #[test]
    fn hardware_gen_parse() {
        assert_eq!(HardwareGen::parse("WPCDCS"), HardwareGen::WpcDcs);
        assert_eq!(HardwareGen::parse("ws_1"), HardwareGen::Ws1);
        assert_eq!(HardwareGen::parse("unknown-board"), HardwareGen::None);
    }
}
