//! `alt-catalog` — Sample catalog and manifest loading for the AltSound
//! engine.
//!
//! A game ships a directory of audio samples plus two small text files:
//!
//! - `altsound.csv` maps logical command ids to samples (path, category,
//!   gain, loop flag, ducking profile)
//! - `behavior.ini` (optional) declares per-category behavior records,
//!   ducking profiles, and game options
//!
//! [`load_game`] parses both into an immutable [`SampleCatalog`] plus the
//! behavior table and settings the engine dispatches against.

mod csv;
mod ini;

pub mod catalog;
pub mod error;
pub mod sample;

pub use catalog::{load_game, GameManifest, SampleCatalog};
pub use error::{CatalogError, CatalogResult};
pub use sample::SampleInfo;
