// src/config/mod.rs

//! Settings loading and validation for stackpull.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a settings file from disk, or fall back to defaults (`loader.rs`).
//! - Validate it into a [`ConfigFile`] (`validate.rs`).
//!
//! Workload definitions and the selection policy are *not* part of this
//! file: they live next to the compose project and are re-read every cycle.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, WebhookSection};
