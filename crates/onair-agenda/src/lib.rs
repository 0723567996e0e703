//! `onair-agenda` — decides what an announcer should read right now.
//!
//! # Pipeline
//!
//! Every resolution cycle is a pure function of one clock instant and one
//! snapshot of backend rows:
//!
//! | Stage                       | Module        |
//! |-----------------------------|---------------|
//! | merge overlapping fetches   | [`merge`]     |
//! | validity / program window   | [`window`]    |
//! | drop already-read items     | [`read_state`]|
//! | classify, drop missed, sort | [`urgency`]   |
//!
//! [`resolve::AgendaResolver`] runs the stages in that order. The only
//! state-changing operation, marking an item read, is split between
//! [`transition`] (the pure item mutation) and the store crate (persistence).

pub mod clock;
pub mod error;
pub mod item;
pub mod merge;
pub mod read_state;
pub mod resolve;
pub mod transition;
pub mod urgency;
pub mod window;

pub use clock::{parse_time_to_minutes, Clock, FixedClock, NowParts, SystemClock};
pub use error::{AgendaError, Result};
pub use item::{
    ItemKey, ItemSchedule, ItemStatus, ProducedContent, Program, ReadState, Schedulable,
    ScheduledItem, Testimonial, ValidityWindow,
};
pub use merge::merge_unique;
pub use read_state::{filter_unread, LocalReadCache, ReadCache};
pub use resolve::{AgendaInput, AgendaResolver, Resolution};
pub use transition::{apply_read, ReadPatch, RecurrenceResult};
pub use urgency::{classify, sort_entries, AgendaEntry, RecurrenceLabel, UrgencyWindow};
pub use window::{is_item_eligible, is_item_in_window, is_program_active, programs_on_air};
