use crate::config::RosterConfig;
use crate::domain::{Schedule, ShiftId};
use crate::error::RosterError;
use crate::model::{SolvedAssignment, evening_lookback_pairs, evening_to_morning_pairs};
use serde::Serialize;
use std::fmt;

const HOURS_TOLERANCE: f64 = 1e-6;

/// A hard rule the solved roster breaks. An accepted solution has none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleViolation {
    pub rule: String,
    pub description: String,
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.rule, self.description)
    }
}

fn violation(rule: &str, description: String) -> RuleViolation {
    RuleViolation {
        rule: rule.to_string(),
        description,
    }
}

/// Re-checks every hard rule against a decoded assignment.
pub fn check_hard_rules(
    schedule: &Schedule,
    assignment: &SolvedAssignment,
    config: &RosterConfig,
) -> Result<Vec<RuleViolation>, RosterError> {
    let mut unmet = Vec::new();

    for (s, shift) in schedule.shift_ids().zip(schedule.shifts()) {
        let assigned = assignment.by_shift[s.0].len() as u32;
        let slack = assignment.slack[s.0];
        if assigned + slack != shift.persons_required() {
            unmet.push(violation(
                "Coverage",
                format!(
                    "Shift {} ({shift}) has {assigned} assigned and {slack} unfilled, needs {}.",
                    s.0, shift.persons_required()
                ),
            ));
        }
    }

    let rest_pairs = evening_to_morning_pairs(schedule);
    let lookback_pairs = evening_lookback_pairs(schedule);

    for p in schedule.person_ids() {
        let person = schedule.person(p);
        let name = person.name();
        let shifts = assignment.shifts_of(p);
        let works = |s: &ShiftId| shifts.contains(s);

        for s in shifts.iter().filter(|s| !person.is_available(**s)) {
            unmet.push(violation(
                "Availability",
                format!("{name} is assigned to shift {} without being available.", s.0),
            ));
        }
        for (evening, morning) in rest_pairs.iter().filter(|(a, b)| works(a) && works(b)) {
            unmet.push(violation(
                "Evening Then Morning",
                format!(
                    "{name} works evening shift {} and the next morning shift {}.",
                    evening.0, morning.0
                ),
            ));
        }
        for (earlier, evening) in lookback_pairs.iter().filter(|(a, b)| works(a) && works(b)) {
            unmet.push(violation(
                "Day Then Evening",
                format!(
                    "{name} works shift {} and the evening shift {} after it.",
                    earlier.0, evening.0
                ),
            ));
        }

        let sundays: Vec<&ShiftId> = shifts
            .iter()
            .filter(|s| schedule.shift(**s).is_sunday())
            .collect();
        let non_sunday = person.totals()?.non_sunday;
        if non_sunday < config.sunday_quota && !sundays.is_empty() {
            unmet.push(violation(
                "Sunday Quota",
                format!(
                    "{name} has {non_sunday} non-Sunday hours (quota {}) but works {} Sunday shift(s).",
                    config.sunday_quota,
                    sundays.len()
                ),
            ));
        }
        if sundays.len() > 1 {
            unmet.push(violation(
                "One Sunday",
                format!("{name} works {} Sunday shifts.", sundays.len()),
            ));
        }

        let hours: f64 = shifts.iter().map(|s| schedule.shift(*s).hours()).sum();
        if hours > config.max_hours + HOURS_TOLERANCE {
            unmet.push(violation(
                "Max Hours",
                format!("{name} works {hours} hours, above the {} hour ceiling.", config.max_hours),
            ));
        }
    }

    Ok(unmet)
}
