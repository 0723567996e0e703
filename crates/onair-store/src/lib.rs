//! `onair-store` — everything that talks to the hosted database.
//!
//! The agenda engine only ever sees the narrow [`collaborator::Collaborator`]
//! contract: filtered `select`, filtered `update`, and the current actor.
//! Two implementations ship here:
//!
//! | Type                  | Use                                             |
//! |-----------------------|-------------------------------------------------|
//! | [`RestCollaborator`]  | PostgREST-style HTTP API with transport retries |
//! | [`MemoryCollaborator`]| In-process tables, loaded from a JSON fixture   |
//!
//! [`service::AgendaService`] ties a collaborator to the resolver and owns
//! the mark-as-read operation.

pub mod collaborator;
pub mod directory;
pub mod error;
pub mod memory;
pub mod query;
pub mod read_cache;
pub mod rest;
pub mod rows;
pub mod service;

pub use collaborator::{Actor, Collaborator};
pub use directory::UserDirectory;
pub use error::{MarkReadError, Result, StoreError};
pub use memory::MemoryCollaborator;
pub use query::{Filter, Order, Query, Table};
pub use read_cache::SqliteReadCache;
pub use rest::RestCollaborator;
pub use service::AgendaService;
