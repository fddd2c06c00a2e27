//! `alt-framer` — Command framing for emulated pinball sound boards.
//!
//! ROM sound boards emit single bytes; what those bytes mean depends on
//! the hardware generation. This crate reassembles the byte stream into
//! logical 16-bit commands:
//!
//! - **State**: four-byte command buffer, parity counter, stored command
//! - **Rules**: one [`GenerationRules`] variant per hardware family
//! - **Hooks**: post-emission detection of global "stop music" commands
//!
//! The framer is a pure state machine: ROM volume writes are surfaced as
//! [`FramerStep::SetGlobalVolume`] rather than applied, so each rule set
//! can be exercised standalone.

mod state;

pub mod hooks;
pub mod rules;

use alt_common::HardwareGen;
use tracing::debug;

use crate::state::FramerState;
pub use crate::rules::GenerationRules;

/// Outcome of feeding one byte to the framer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FramerStep {
    /// Byte consumed; nothing to dispatch yet.
    Absorbed,
    /// A complete logical command.
    Emit(u16),
    /// Byte completed a ROM volume sequence. Consumed and filtered; the
    /// caller applies the volume only when ROM volume control is enabled.
    SetGlobalVolume(f32),
}

/// Reassembles raw command bytes into logical commands for one hardware
/// generation.
///
/// Not thread-safe: the engine serializes producers, matching the single
/// command-producer contract of the emulator interface.
#[derive(Debug)]
pub struct CommandFramer {
    rules: GenerationRules,
    state: FramerState,
}

impl CommandFramer {
    pub fn new(gen: HardwareGen) -> Self {
        Self {
            rules: GenerationRules::for_gen(gen),
            state: FramerState::new(),
        }
    }

    /// Feed one raw byte.
    pub fn accept(&mut self, byte: u8) -> FramerStep {
        self.state.counter = self.state.counter.wrapping_add(1);
        self.state.shift_in(byte);

        let volume = self.rules.preprocess(&mut self.state, byte);

        if let Some(volume) = volume {
            self.state.stored = byte as u16;
            debug!(byte = %format_args!("{byte:02X}"), volume, "Volume sequence consumed");
            return FramerStep::SetGlobalVolume(volume);
        }

        if self.state.filter || self.state.counter & 1 != 0 {
            // Filtered, or waiting for the second half of a 16-bit
            // command. Latch the byte as the pending high half.
            self.state.stored = byte as u16;
            if self.state.filter {
                debug!(byte = %format_args!("{byte:02X}"), "Command filtered");
            } else {
                debug!(byte = %format_args!("{byte:02X}"), "Command incomplete");
            }
            return FramerStep::Absorbed;
        }

        let cmd = (self.state.stored << 8) | byte as u16;
        self.state.stored = 0;
        self.state.counter = 0;
        FramerStep::Emit(cmd)
    }

    /// Clear buffer, counter, and stored command.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Whether the most recent byte was consumed as volume/meta data.
    pub fn last_byte_filtered(&self) -> bool {
        self.state.filter
    }

    /// The rule set this framer dispatches on.
    pub fn rules(&self) -> GenerationRules {
        self.rules
    }
}
