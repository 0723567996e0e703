//! `onair-core` — identifiers, vocabulary and configuration shared by every
//! OnAir crate.
//!
//! Nothing in here performs I/O except [`config::OnairConfig::load`].

pub mod config;
pub mod error;
pub mod types;

pub use error::{OnairError, Result};
pub use types::{ActorId, ItemId, ItemKind, ProgramId, Weekday};
