use thiserror::Error;

/// Everything that can abort a roster run.
///
/// Infeasible and time-limited solves are not errors; they travel as
/// [`crate::engine::SolveStatus`] values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RosterError {
    #[error("availability of {person} covers {actual} shifts, schedule has {expected}")]
    AvailabilityLength {
        person: String,
        expected: usize,
        actual: usize,
    },
    #[error("unknown day name: {0}")]
    UnknownWeekday(String),
    #[error("unknown shift category: {0}")]
    UnknownCategory(String),
    #[error("malformed time window: {0:?}")]
    MalformedTime(String),
    #[error("shift {index} is declared on {declared} but {date} is a {actual}")]
    WeekdayMismatch {
        index: usize,
        declared: String,
        date: String,
        actual: String,
    },
    #[error("duplicate person: {0}")]
    DuplicatePerson(String),
    #[error("unknown person: {0}")]
    UnknownPerson(String),
    #[error("availability totals for {0} read before aggregation")]
    AggregatesNotComputed(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("solving engine failed: {0}")]
    Engine(String),
}

impl RosterError {
    /// True for errors caused by the caller's data or configuration.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, RosterError::Engine(_))
    }
}
