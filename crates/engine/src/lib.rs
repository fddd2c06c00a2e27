//! `alt-engine` — The AltSound alternate-sound engine core.
//!
//! Receives raw command bytes from an emulated pinball ROM sound board,
//! frames them per hardware generation (via `alt-framer`), resolves them
//! against a game's sample catalog (via `alt-catalog`), and plays the
//! results through a real-time mixing worker:
//!
//! - **Decoder**: Symphonia-backed pull decoder at the output rate
//! - **Registry**: handle-keyed stream ownership, monotonic handles
//! - **Channels**: fixed 16-slot table of mix-time parameters
//! - **Behavior**: per-category stop/pause/duck dispatch
//! - **Mixer**: condvar-paced worker summing f32 frames into the sink
//!
//! # Architecture
//!
//! ```text
//! process_command(byte) -> CommandFramer -> catalog -> behavior
//!                                                        |
//!                                        ChannelTable + StreamRegistry
//!                                                        |
//!                 mixing worker (periodic) -> audio callback (host)
//! ```
//!
//! The host creates an [`AltSoundEngine`], installs an audio callback,
//! and feeds it command bytes; everything else happens inside.

mod behavior;
mod mixer;
mod processor;
mod shared;
#[cfg(test)]
mod testutil;

pub mod channels;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod logging;
pub mod registry;

// Re-export primary types at crate root for convenience
pub use alt_common::{EngineConfig, HardwareGen, SampleCategory, StreamHandle};
pub use decoder::{DecoderAdapter, DecoderError};
pub use engine::AltSoundEngine;
pub use error::{EngineError, EngineResult};
pub use logging::{set_logger, LogLevel};
pub use shared::AudioCallback;
