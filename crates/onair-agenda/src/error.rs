use thiserror::Error;

/// Errors raised while resolving the agenda.
///
/// Resolution itself never fails as a whole: a parse error excludes the
/// offending item for the current cycle and is only logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgendaError {
    /// A time-of-day string could not be read as `HH:MM[:SS]`.
    #[error("Invalid time '{input}': {reason}")]
    Parse { input: String, reason: String },
}

pub type Result<T> = std::result::Result<T, AgendaError>;
