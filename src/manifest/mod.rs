//! Batch manifests: the job list plus batch-level settings.
//!
//! A manifest goes through three steps before it reaches the processor:
//! parsing ([`Manifest::from_path`] and friends), default application
//! ([`apply_defaults`]) and validation ([`validate`]). [`Manifest::prepare`]
//! runs the last two, [`Manifest::load`] runs all three.

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::*;
pub use types::*;
pub use validation::*;
