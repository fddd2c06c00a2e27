//! The public engine surface.
//!
//! One [`AltSoundEngine`] owns the catalog, behavior table, channel
//! table, stream registry, and mixing worker. The host creates it with a
//! game's altsound directory, points commands at it, and installs an
//! audio callback to receive the mixed output.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use alt_common::{EngineConfig, HardwareGen, SampleCategory, StreamHandle};
use tracing::{info, warn};

use crate::behavior;
use crate::error::EngineResult;
use crate::mixer;
use crate::processor::CommandProcessor;
use crate::shared::EngineShared;

/// The alternate-sound engine.
///
/// Command processing (`process_command` and the setters) belongs to one
/// host thread; the engine runs its own mixing worker and invokes the
/// audio callback from it. Dropping the engine shuts it down.
pub struct AltSoundEngine {
    shared: Arc<EngineShared>,
    processor: CommandProcessor,
    worker: Option<JoinHandle<()>>,
}

impl AltSoundEngine {
    /// Initialize the engine for a game.
    ///
    /// Parses the manifest under `<base_path>/altsound/<game_name>/` and
    /// starts the mixing worker. Initialization is atomic: on error no
    /// worker is running and nothing needs tearing down.
    pub fn new(base_path: &Path, game_name: &str, config: EngineConfig) -> EngineResult<Self> {
        let altsound_dir = base_path.join("altsound").join(game_name);
        let manifest = alt_catalog::load_game(&altsound_dir)?;

        let shared = Arc::new(EngineShared::new(config, manifest.behavior));
        shared.running.store(true, Ordering::Release);
        let worker = match mixer::spawn(Arc::clone(&shared)) {
            Ok(worker) => worker,
            Err(e) => {
                shared.running.store(false, Ordering::Release);
                return Err(e.into());
            }
        };

        info!(
            game = game_name,
            sample_rate = config.sample_rate,
            channels = config.channels,
            buffer_frames = config.buffer_frames,
            "AltSound engine initialized"
        );

        Ok(Self {
            shared,
            processor: CommandProcessor::new(manifest.catalog, manifest.settings),
            worker: Some(worker),
        })
    }

    /// Select the hardware generation whose framing rules apply.
    pub fn set_hardware_gen(&mut self, gen: HardwareGen) {
        self.processor.set_hardware_gen(gen);
    }

    pub fn hardware_gen(&self) -> HardwareGen {
        self.processor.hardware_gen()
    }

    /// Install the sink that receives every mixed buffer.
    pub fn set_audio_callback<F>(&self, callback: F)
    where
        F: FnMut(&[f32], u32, u32) + Send + 'static,
    {
        *self.shared.sink.lock() = Some(Box::new(callback));
    }

    /// Remove the sink; the mixer keeps running silently.
    pub fn clear_audio_callback(&self) {
        *self.shared.sink.lock() = None;
    }

    /// Install a hook fired once per stream that reaches its natural end.
    /// Applies to streams started after the call.
    pub fn set_stream_end_callback<F>(&self, callback: F)
    where
        F: Fn(StreamHandle) + Send + Sync + 'static,
    {
        *self.shared.end_hook.lock() = Some(Arc::new(callback));
    }

    /// Feed one raw command byte with the host's attenuation request.
    ///
    /// Returns false when a completed command could not be dispatched
    /// (unknown id, unreadable sample); diagnostics go to the log.
    pub fn process_command(&mut self, cmd: u8, attenuation: i32) -> bool {
        if !self.is_running() {
            warn!("process_command after shutdown");
            return false;
        }
        self.processor.process(&self.shared, cmd, attenuation)
    }

    /// Pause or resume every active stream.
    pub fn pause(&mut self, paused: bool) {
        behavior::pause_all(&self.shared, paused);
    }

    /// Stop the worker, join it, and drop all streams. Idempotent; also
    /// runs on drop.
    pub fn shutdown(&mut self) {
        if self.shared.running.swap(false, Ordering::AcqRel) {
            self.shared.notify_mixer();
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Mixing worker panicked during shutdown");
            }
        }

        // Tear down shared state after the worker has exited.
        {
            let mut channels = self.shared.channels.lock();
            let mut streams = self.shared.streams.lock();
            for handle in channels.iter().map(|s| s.handle).collect::<Vec<_>>() {
                streams.free(handle);
                channels.release_handle(handle);
            }
        }
        *self.shared.sink.lock() = None;
        info!("AltSound engine shut down");
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    // -- Introspection ----------------------------------------------------

    /// Number of active streams across all categories.
    pub fn active_streams(&self) -> usize {
        self.shared.channels.lock().len()
    }

    /// Number of active streams in one category.
    pub fn active_streams_in(&self, category: SampleCategory) -> usize {
        self.shared.channels.lock().count_category(category)
    }

    /// Handles of the active streams in one category.
    pub fn stream_handles_in(&self, category: SampleCategory) -> Vec<StreamHandle> {
        self.shared.channels.lock().handles_in_category(category)
    }

    pub fn master_volume(&self) -> f32 {
        self.shared.master_vol()
    }

    pub fn global_volume(&self) -> f32 {
        self.shared.global_vol()
    }

    /// Effective mix volume of a stream (gain × ducking), before the
    /// global and master factors.
    pub fn stream_mix_volume(&self, handle: StreamHandle) -> Option<f32> {
        self.shared
            .channels
            .lock()
            .iter()
            .find(|s| s.handle == handle)
            .map(|s| s.gain * s.ducking)
    }
}

impl Drop for AltSoundEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
