//! `alt-common` — Shared types and behavior records for the AltSound engine.
//!
//! This crate is the foundation that the framer, catalog, and engine
//! crates depend on. It defines the core abstractions:
//!
//! - **Types**: `StreamHandle`, `SampleCategory`, `HardwareGen` (newtypes
//!   and enums for safety)
//! - **Behavior**: `BehaviorInfo`, `BehaviorTable`, `DuckingProfile`,
//!   `CategorySet` (the stop/pause/duck model)
//! - **Config**: `EngineConfig`, `GameSettings`, channel and buffer
//!   constants

pub mod behavior;
pub mod config;
pub mod types;

// Re-export commonly used items at crate root
pub use behavior::{BehaviorInfo, BehaviorTable, CategorySet, DuckingProfile, SaturationPolicy};
pub use config::{EngineConfig, GameSettings, CMD_BUFFER_LEN, DB_STEP, MAX_CHANNELS};
pub use types::{HardwareGen, SampleCategory, StreamHandle};
