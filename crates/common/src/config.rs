//! Configuration structs for the engine and per-game settings.

use serde::{Deserialize, Serialize};

/// Capacity of the channel table: the most streams that can be active at
/// any instant, across all categories.
pub const MAX_CHANNELS: usize = 16;

/// How many raw command bytes the framer keeps for pattern matching.
pub const CMD_BUFFER_LEN: usize = 4;

/// One −1 dB step as a linear factor: 10^(1/20).
pub const DB_STEP: f32 = 1.122_018_5;

/// Top-level audio output configuration.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channel count (interleaved).
    pub channels: u16,
    /// Frames mixed per period; also sets the worker's wake cadence.
    pub buffer_frames: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            buffer_frames: 256,
        }
    }
}

impl EngineConfig {
    /// Samples per mixed buffer (`buffer_frames × channels`).
    pub fn samples_per_buffer(&self) -> usize {
        self.buffer_frames * self.channels as usize
    }
}

/// Per-game options parsed from the behavior file.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub struct GameSettings {
    /// Whether in-game ROM volume commands drive the global volume.
    pub rom_volume_ctrl: bool,
    /// Whether processed sound commands are echoed at debug level for
    /// trace capture.
    pub record_sound_cmds: bool,
    /// Number of initial logical commands to swallow (some ROMs spew
    /// noise during boot).
    pub cmd_skip_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.sample_rate, 44100);
        assert_eq!(cfg.channels, 2);
        assert_eq!(cfg.samples_per_buffer(), 512);
    }

    #[test]
    fn db_step_is_one_decibel() {
        // 20 * log10(DB_STEP) should be 1 dB.
        let db = 20.0 * (DB_STEP as f64).log10();
        assert!((db - 1.0).abs() < 1e-4, "step is {db} dB");
    }
}
