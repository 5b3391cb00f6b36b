use std::convert::Infallible;

use thiserror::Error;

use crate::event::EventId;

/// Errors that can occur within the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The provided time/period/day-mask argument is invalid.
    #[error("Invalid spec: {0}")]
    InvalidSpec(String),

    /// No pending event with the given ID exists.
    #[error("Event not found: {id}")]
    NotFound { id: EventId },

    /// A user callback failed during dispatch. Not retried; the failing
    /// event is already removed and repeat events are not re-armed.
    #[error("Callback failed: {0}")]
    Callback(anyhow::Error),
}

// Lets registration calls accept both fallible and infallible day-set
// conversions through one TryInto bound.
impl From<Infallible> for SchedulerError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
