//! State shared between the host-facing engine and the mixing worker.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use alt_common::{BehaviorTable, EngineConfig};
use parking_lot::{Condvar, Mutex};

use crate::channels::ChannelTable;
use crate::registry::{EndCallback, StreamRegistry};

/// Host-installed sink for mixed buffers: interleaved samples, sample
/// rate, channel count. The buffer is only valid for the duration of the
/// call.
pub type AudioCallback = Box<dyn FnMut(&[f32], u32, u32) + Send>;

/// Everything both threads touch.
///
/// Lock order, always: `channels` → `streams` → `sink`. The wakeup pair
/// is independent and never held across the others.
pub(crate) struct EngineShared {
    pub config: EngineConfig,
    /// Immutable after init.
    pub behavior: BehaviorTable,

    pub channels: Mutex<ChannelTable>,
    pub streams: Mutex<StreamRegistry>,
    pub sink: Mutex<Option<AudioCallback>>,
    /// Cloned into each new stream as its end-of-stream callback.
    pub end_hook: Mutex<Option<EndCallback>>,

    /// Mixer wakeup: notified on command dispatch and shutdown.
    pub wake: Condvar,
    pub wake_lock: Mutex<()>,
    pub running: AtomicBool,
    /// Host-requested pause of all playback.
    pub paused_all: AtomicBool,

    // f32 volumes stored as bits for lock-free access from the mixer.
    master_vol_bits: AtomicU32,
    global_vol_bits: AtomicU32,
}

impl EngineShared {
    pub fn new(config: EngineConfig, behavior: BehaviorTable) -> Self {
        Self {
            config,
            behavior,
            channels: Mutex::new(ChannelTable::new()),
            streams: Mutex::new(StreamRegistry::new()),
            sink: Mutex::new(None),
            end_hook: Mutex::new(None),
            wake: Condvar::new(),
            wake_lock: Mutex::new(()),
            running: AtomicBool::new(false),
            paused_all: AtomicBool::new(false),
            master_vol_bits: AtomicU32::new(1.0f32.to_bits()),
            global_vol_bits: AtomicU32::new(1.0f32.to_bits()),
        }
    }

    pub fn master_vol(&self) -> f32 {
        f32::from_bits(self.master_vol_bits.load(Ordering::Relaxed))
    }

    pub fn set_master_vol(&self, volume: f32) {
        self.master_vol_bits.store(volume.to_bits(), Ordering::Relaxed);
    }

    pub fn global_vol(&self) -> f32 {
        f32::from_bits(self.global_vol_bits.load(Ordering::Relaxed))
    }

    pub fn set_global_vol(&self, volume: f32) {
        self.global_vol_bits.store(volume.to_bits(), Ordering::Relaxed);
    }

    /// Short-circuit the mixer's timed wait so fresh streams are audible
    /// within one buffer period.
    pub fn notify_mixer(&self) {
        self.wake.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volumes_default_to_unity() {
        let shared = EngineShared::new(EngineConfig::default(), BehaviorTable::default());
        assert_eq!(shared.master_vol(), 1.0);
        assert_eq!(shared.global_vol(), 1.0);
    }

    #[test]
    fn volume_roundtrip_through_bits() {
        let shared = EngineShared::new(EngineConfig::default(), BehaviorTable::default());
        shared.set_master_vol(0.3523);
        shared.set_global_vol(0.0);
        assert_eq!(shared.master_vol(), 0.3523);
        assert_eq!(shared.global_vol(), 0.0);
    }
}
