use crate::availability::ratio;
use crate::domain::{PersonId, Schedule, ShiftId};
use crate::error::RosterError;
use crate::model::{SolvedAssignment, pair_penalty};
use itertools::Itertools;
use log::info;
use serde::Serialize;

/// Received versus expected hours for one person.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonMetrics {
    pub name: String,
    pub shift_count: usize,
    pub sunday_shifts: usize,
    pub regular_hours: f64,
    pub bonus_hours: f64,
    pub total_hours: f64,
    pub expected_regular: f64,
    pub expected_bonus: f64,
    pub received_regular_share: f64,
    pub expected_regular_share: f64,
    pub received_bonus_share: f64,
    pub expected_bonus_share: f64,
    pub received_total_share: f64,
    pub expected_total_share: f64,
    pub distribution_penalty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FairnessReport {
    pub people: Vec<PersonMetrics>,
    pub regular_sse: f64,
    pub bonus_sse: f64,
    pub required_seats: u32,
    pub total_slack: u32,
    pub fill_rate_percent: f64,
}

/// The spread penalty the objective charges for this set of shifts,
/// recomputed for reporting.
pub fn distribution_penalty(schedule: &Schedule, shifts: &[ShiftId]) -> f64 {
    shifts
        .iter()
        .tuple_combinations()
        .map(|(a, b)| pair_penalty(schedule.shift(*a).day(), schedule.shift(*b).day()))
        .sum()
}

/// Filled seats over required seats, as a percentage. 0 when nothing is
/// required.
pub fn fill_rate_percent(required_seats: u32, total_slack: u32) -> f64 {
    if required_seats == 0 {
        return 0.0;
    }
    f64::from(required_seats.saturating_sub(total_slack)) / f64::from(required_seats) * 100.0
}

fn person_metrics(
    schedule: &Schedule,
    person: PersonId,
    shifts: &[ShiftId],
) -> Result<PersonMetrics, RosterError> {
    let p = schedule.person(person);
    let totals = p.totals()?;
    let target = p.target()?;

    let regular_hours: f64 = shifts.iter().map(|s| schedule.shift(*s).hours()).sum();
    let bonus_hours: f64 = shifts.iter().map(|s| schedule.shift(*s).bonus_hours()).sum();

    Ok(PersonMetrics {
        name: p.name().to_string(),
        shift_count: shifts.len(),
        sunday_shifts: shifts.iter().filter(|s| schedule.shift(**s).is_sunday()).count(),
        regular_hours,
        bonus_hours,
        total_hours: regular_hours + bonus_hours,
        expected_regular: target.regular,
        expected_bonus: target.bonus,
        received_regular_share: ratio(regular_hours, totals.regular),
        expected_regular_share: ratio(target.regular, totals.regular),
        received_bonus_share: ratio(bonus_hours, totals.bonus),
        expected_bonus_share: ratio(target.bonus, totals.bonus),
        received_total_share: ratio(regular_hours + bonus_hours, totals.total),
        expected_total_share: ratio(target.regular + target.bonus, totals.total),
        distribution_penalty: distribution_penalty(schedule, shifts),
    })
}

/// Builds the fairness readout for a solved assignment. The schedule must
/// have been prepared by the aggregator.
pub fn report(schedule: &Schedule, assignment: &SolvedAssignment) -> Result<FairnessReport, RosterError> {
    let people = schedule
        .person_ids()
        .map(|p| person_metrics(schedule, p, &assignment.shifts_of(p)))
        .collect::<Result<Vec<_>, _>>()?;

    let regular_sse: f64 = people
        .iter()
        .map(|m| (m.expected_regular - m.regular_hours).powi(2))
        .sum();
    let bonus_sse: f64 = people
        .iter()
        .map(|m| (m.expected_bonus - m.bonus_hours).powi(2))
        .sum();
    let required_seats = schedule.required_seats();
    let total_slack = assignment.total_slack();
    let fill_rate_percent = fill_rate_percent(required_seats, total_slack);

    info!(
        "Fairness: regular SSE {:.2}, bonus SSE {:.2}, fill rate {:.1}%",
        regular_sse, bonus_sse, fill_rate_percent
    );
    Ok(FairnessReport {
        people,
        regular_sse,
        bonus_sse,
        required_seats,
        total_slack,
        fill_rate_percent,
    })
}
