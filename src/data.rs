use crate::audit::RuleViolation;
use crate::config::ConfigOverrides;
use crate::domain::{Person, Schedule, Shift};
use crate::engine::SolveStatus;
use crate::error::RosterError;
use crate::metrics::PersonMetrics;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One shift row as a loader delivers it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSpec {
    /// `HH:MM-HH:MM`
    pub time: String,
    pub persons_required: u32,
    pub category: String,
    pub day: String,
    pub date: NaiveDate,
}

/// A worker and one availability flag per shift, in shift order.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSpec {
    pub name: String,
    pub availability: Vec<bool>,
}

/// The complete input for a roster run. Shifts must be in time order.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterInput {
    pub shifts: Vec<ShiftSpec>,
    pub people: Vec<PersonSpec>,
    /// Per-request settings; fields left out fall back to the caller's
    /// defaults.
    #[serde(default)]
    pub config: Option<ConfigOverrides>,
}

impl RosterInput {
    /// Parses every field into the strongly typed schedule. Any malformed
    /// value aborts the run.
    pub fn to_schedule(&self) -> Result<Schedule, RosterError> {
        let mut schedule = Schedule::new();
        for spec in &self.shifts {
            let shift = Shift::new(
                spec.time.parse()?,
                spec.persons_required,
                spec.category.parse()?,
                spec.day.parse()?,
                spec.date,
            );
            schedule.add_shift(shift)?;
        }
        for spec in &self.people {
            schedule.add_person(Person::new(spec.name.clone(), spec.availability.clone()))?;
        }
        schedule.check_availability_lengths()?;
        Ok(schedule)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UnfilledReason {
    /// Every available person who could take this seat is already on the
    /// shift or on an earlier unfilled seat.
    NobodyAvailable,
    /// Someone was available but the rules kept them off.
    Unattainable,
}

/// A shift row of the written roster.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftAssignment {
    pub index: usize,
    pub date: NaiveDate,
    pub day: String,
    pub category: String,
    pub time: String,
    pub hours: f64,
    pub bonus_hours: f64,
    pub persons_required: u32,
    pub assigned: Vec<String>,
    pub unfilled: u32,
    /// One entry per unfilled seat.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unfilled_reasons: Vec<UnfilledReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FairnessSummary {
    pub regular_sse: f64,
    pub bonus_sse: f64,
    pub required_seats: u32,
    pub total_slack: u32,
    pub fill_rate_percent: f64,
}

/// The final output of a roster run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterOutput {
    pub status: SolveStatus,
    pub solve_seconds: f64,
    pub shifts: Vec<ShiftAssignment>,
    pub people: Vec<PersonMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fairness: Option<FairnessSummary>,
    pub violations: Vec<RuleViolation>,
}
