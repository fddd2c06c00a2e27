//! Command processor: raw bytes in, playback mutations out.
//!
//! Applies host attenuation to the master volume, runs the framer, and
//! dispatches completed logical commands through the catalog and behavior
//! model. Runs on the host's command-producer thread.

use alt_catalog::SampleCatalog;
use alt_common::{GameSettings, HardwareGen, DB_STEP};
use alt_framer::{hooks, CommandFramer, FramerStep};
use tracing::{debug, error, info, warn};

use crate::behavior;
use crate::decoder::DecoderAdapter;
use crate::shared::EngineShared;

pub(crate) struct CommandProcessor {
    gen: HardwareGen,
    framer: CommandFramer,
    catalog: SampleCatalog,
    settings: GameSettings,
    skip_remaining: u32,
}

impl CommandProcessor {
    pub fn new(catalog: SampleCatalog, settings: GameSettings) -> Self {
        Self {
            gen: HardwareGen::None,
            framer: CommandFramer::new(HardwareGen::None),
            catalog,
            settings,
            skip_remaining: settings.cmd_skip_count,
        }
    }

    /// Switch hardware generation; framing state starts over.
    pub fn set_hardware_gen(&mut self, gen: HardwareGen) {
        self.gen = gen;
        self.framer = CommandFramer::new(gen);
        debug!(?gen, "Hardware generation set");
    }

    pub fn hardware_gen(&self) -> HardwareGen {
        self.gen
    }

    /// Process one raw command byte with the host's attenuation request.
    pub fn process(&mut self, shared: &EngineShared, cmd: u8, attenuation: i32) -> bool {
        // Each -1 step is one decibel off the master volume.
        let mut attenuation = attenuation;
        if attenuation < 0 {
            let mut master = shared.master_vol();
            while attenuation < 0 {
                master /= DB_STEP;
                attenuation += 1;
            }
            shared.set_master_vol(master);
            debug!(master, "Master volume after attenuation");
        }

        match self.framer.accept(cmd) {
            FramerStep::Absorbed => true,
            FramerStep::SetGlobalVolume(volume) => {
                if self.settings.rom_volume_ctrl {
                    shared.set_global_vol(volume);
                    info!(volume, "ROM volume change");
                }
                true
            }
            FramerStep::Emit(logical) => self.dispatch(shared, logical),
        }
    }

    /// Dispatch a completed logical command.
    fn dispatch(&mut self, shared: &EngineShared, logical: u16) -> bool {
        if self.settings.record_sound_cmds {
            debug!(cmd = %format_args!("{logical:04X}"), "Sound command");
        }

        if self.skip_remaining > 0 {
            self.skip_remaining -= 1;
            debug!(
                cmd = %format_args!("{logical:04X}"),
                remaining = self.skip_remaining,
                "Startup command skipped"
            );
            return true;
        }

        let ok = self.handle_logical(shared, logical);
        if ok {
            // New streams become audible within one buffer period.
            shared.notify_mixer();
        }

        if hooks::stops_music(self.gen, logical) {
            info!(cmd = %format_args!("{logical:04X}"), "Stopping music");
            behavior::stop_music(shared);
            shared.notify_mixer();
        }

        ok
    }

    fn handle_logical(&mut self, shared: &EngineShared, logical: u16) -> bool {
        let Some(candidates) = self.catalog.lookup(logical) else {
            warn!(cmd = %format_args!("{logical:04X}"), "Unknown command");
            return false;
        };
        if candidates.is_empty() {
            // A declared command with no samples is a silent no-op.
            return true;
        }
        let Some(sample) = self.catalog.select(logical) else {
            return true;
        };

        let decoder = match DecoderAdapter::open(&sample.path, shared.config.sample_rate) {
            Ok(decoder) => decoder,
            Err(e) => {
                error!(
                    cmd = %format_args!("{logical:04X}"),
                    sample = %sample.name(),
                    error = %e,
                    "Failed to open sample"
                );
                return false;
            }
        };

        // A policy drop is still success from the host's point of view.
        behavior::start_sample(shared, sample, decoder);
        true
    }
}
