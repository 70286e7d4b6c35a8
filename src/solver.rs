use crate::audit::{RuleViolation, check_hard_rules};
use crate::availability::prepare;
use crate::config::RosterConfig;
use crate::data::{
    FairnessSummary, RosterInput, RosterOutput, ShiftAssignment, UnfilledReason,
};
use crate::domain::{Schedule, ShiftId};
use crate::engine::{EngineOutcome, SolveStatus, SolvingEngine};
use crate::error::RosterError;
use crate::metrics::{FairnessReport, report};
use crate::model::{SolvedAssignment, build};
use log::{info, warn};
use std::time::Duration;

/// Everything one solve produced, before rendering.
#[derive(Debug, Clone)]
pub struct RosterRun {
    pub status: SolveStatus,
    pub elapsed: Duration,
    /// `None` when the model was infeasible.
    pub assignment: Option<SolvedAssignment>,
    pub report: Option<FairnessReport>,
    pub violations: Vec<RuleViolation>,
}

/// Aggregates availability, builds the model, solves it and reads the
/// result back into the schedule. Infeasibility is a status, not an error.
pub fn solve_schedule(
    schedule: &mut Schedule,
    config: &RosterConfig,
    engine: &dyn SolvingEngine,
) -> Result<RosterRun, RosterError> {
    config.validate()?;
    prepare(schedule)?;
    let model = build(schedule, config)?;

    let outcome = if schedule.shifts().is_empty() {
        info!("No shifts to staff; skipping the solver.");
        EngineOutcome::trivial(&model.formulation)
    } else {
        engine.solve(&model.formulation, config.time_limit())?
    };

    if outcome.status == SolveStatus::Infeasible {
        warn!("No roster satisfies the hard rules; raise maxHours or lower sundayQuota and retry.");
        return Ok(RosterRun {
            status: outcome.status,
            elapsed: outcome.elapsed,
            assignment: None,
            report: None,
            violations: Vec::new(),
        });
    }

    if outcome.values.len() != model.formulation.variables.len() {
        return Err(RosterError::Engine(format!(
            "engine returned {} values for {} variables",
            outcome.values.len(),
            model.formulation.variables.len()
        )));
    }
    let assignment = model.decode(&outcome.values);
    for p in schedule.person_ids().collect::<Vec<_>>() {
        let shifts = assignment.shifts_of(p);
        schedule.person_mut(p).set_assigned_shifts(shifts);
    }
    let report = report(schedule, &assignment)?;
    let violations = check_hard_rules(schedule, &assignment, config)?;
    for v in &violations {
        warn!("{v}");
    }

    Ok(RosterRun {
        status: outcome.status,
        elapsed: outcome.elapsed,
        assignment: Some(assignment),
        report: Some(report),
        violations,
    })
}

fn shift_rows(schedule: &Schedule, assignment: &SolvedAssignment) -> Vec<ShiftAssignment> {
    schedule
        .shift_ids()
        .map(|s| {
            let shift = schedule.shift(s);
            let assigned: Vec<String> = assignment.by_shift[s.0]
                .iter()
                .map(|p| schedule.person(*p).name().to_string())
                .collect();
            let unfilled = assignment.slack[s.0];
            let reasons = unfilled_reasons(schedule, s, assigned.len(), unfilled);
            ShiftAssignment {
                index: s.0,
                date: shift.date(),
                day: shift.day().to_string(),
                category: shift.category().to_string(),
                time: shift.window().to_string(),
                hours: shift.hours(),
                bonus_hours: shift.bonus_hours(),
                persons_required: shift.persons_required(),
                assigned,
                unfilled,
                unfilled_reasons: reasons,
            }
        })
        .collect()
}

/// Seat `k` past the assigned ones has nobody left to take it once the
/// available people are used up by the assigned and the `k` seats before.
fn unfilled_reasons(
    schedule: &Schedule,
    shift: ShiftId,
    assigned: usize,
    unfilled: u32,
) -> Vec<UnfilledReason> {
    let available = schedule.available_count(shift);
    (0..unfilled as usize)
        .map(|k| {
            if available <= assigned + k {
                UnfilledReason::NobodyAvailable
            } else {
                UnfilledReason::Unattainable
            }
        })
        .collect()
}

/// Renders a run into the payload the roster writer consumes.
pub fn render(schedule: &Schedule, run: &RosterRun) -> RosterOutput {
    let shifts = match &run.assignment {
        Some(assignment) => shift_rows(schedule, assignment),
        None => Vec::new(),
    };
    let (people, fairness) = match &run.report {
        Some(report) => (
            report.people.clone(),
            Some(FairnessSummary {
                regular_sse: report.regular_sse,
                bonus_sse: report.bonus_sse,
                required_seats: report.required_seats,
                total_slack: report.total_slack,
                fill_rate_percent: report.fill_rate_percent,
            }),
        ),
        None => (Vec::new(), None),
    };
    RosterOutput {
        status: run.status,
        solve_seconds: run.elapsed.as_secs_f64(),
        shifts,
        people,
        fairness,
        violations: run.violations.clone(),
    }
}

/// Solves a roster request end to end. Fields of the request's config
/// block win over `defaults`; missing ones keep the default.
pub fn solve(
    input: &RosterInput,
    defaults: &RosterConfig,
    engine: &dyn SolvingEngine,
) -> Result<RosterOutput, RosterError> {
    let config = defaults.with_overrides(input.config.unwrap_or_default());
    let mut schedule = input.to_schedule()?;
    info!(
        "Solving roster for {} people over {} shifts (max {} h, Sunday quota {} h)...",
        schedule.people().len(),
        schedule.shifts().len(),
        config.max_hours,
        config.sunday_quota
    );
    let run = solve_schedule(&mut schedule, &config, engine)?;
    Ok(render(&schedule, &run))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;
    use crate::formulation::Formulation;
    use serde_json::json;
    use std::cell::Cell;

    /// Leaves every seat to slack; enough to exercise the plumbing
    /// without HiGHS.
    struct NothingAssigned;

    impl SolvingEngine for NothingAssigned {
        fn solve(&self, formulation: &Formulation, _: Duration) -> Result<EngineOutcome, RosterError> {
            let mut values = vec![0.0; formulation.variables.len()];
            for c in formulation.constraints_named("coverage[") {
                let (slack, _) = c.expr.terms.last().copied().unwrap();
                values[slack.0] = c.rhs;
            }
            Ok(EngineOutcome {
                status: SolveStatus::TimeLimited,
                values,
                elapsed: Duration::from_millis(5),
            })
        }
    }

    struct AlwaysInfeasible;

    impl SolvingEngine for AlwaysInfeasible {
        fn solve(&self, _: &Formulation, _: Duration) -> Result<EngineOutcome, RosterError> {
            Ok(EngineOutcome {
                status: SolveStatus::Infeasible,
                values: Vec::new(),
                elapsed: Duration::ZERO,
            })
        }
    }

    /// Remembers the budget and the max-hours rows it was handed.
    #[derive(Default)]
    struct Recording {
        budget: Cell<Option<Duration>>,
        max_hours: Cell<Option<f64>>,
    }

    impl SolvingEngine for Recording {
        fn solve(&self, formulation: &Formulation, budget: Duration) -> Result<EngineOutcome, RosterError> {
            self.budget.set(Some(budget));
            self.max_hours
                .set(formulation.constraints_named("max_hours[").next().map(|c| c.rhs));
            NothingAssigned.solve(formulation, budget)
        }
    }

    /// Drops the last value.
    struct ShortValues;

    impl SolvingEngine for ShortValues {
        fn solve(&self, formulation: &Formulation, budget: Duration) -> Result<EngineOutcome, RosterError> {
            let mut outcome = NothingAssigned.solve(formulation, budget)?;
            outcome.values.pop();
            Ok(outcome)
        }
    }

    fn input() -> RosterInput {
        serde_json::from_value(json!({
            "shifts": [
                {"time": "08:00-13:00", "personsRequired": 1, "category": "Morning", "day": "Monday", "date": "2024-01-15"},
                {"time": "13:00-18:00", "personsRequired": 1, "category": "Midday", "day": "Monday", "date": "2024-01-15"}
            ],
            "people": [
                {"name": "Ann", "availability": [true, false]},
                {"name": "Bo", "availability": [false, false]}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn time_limited_runs_are_reported_as_results() {
        let output = solve(&input(), &RosterConfig::default(), &NothingAssigned).unwrap();
        assert_eq!(output.status, SolveStatus::TimeLimited);
        assert_eq!(output.shifts.len(), 2);
        assert_eq!(output.shifts[0].unfilled, 1);
        assert_eq!(output.shifts[0].unfilled_reasons, vec![UnfilledReason::Unattainable]);
        assert_eq!(output.shifts[1].unfilled_reasons, vec![UnfilledReason::NobodyAvailable]);
        assert_eq!(output.fairness.as_ref().unwrap().fill_rate_percent, 0.0);
        assert!(output.violations.is_empty());
    }

    #[test]
    fn infeasible_runs_carry_no_assignment() {
        let output = solve(&input(), &RosterConfig::default(), &AlwaysInfeasible).unwrap();
        assert_eq!(output.status, SolveStatus::Infeasible);
        assert!(output.shifts.is_empty());
        assert!(output.fairness.is_none());
    }

    #[test]
    fn request_config_wins_and_is_validated() {
        let mut request = input();
        request.config = Some(ConfigOverrides {
            max_hours: Some(-5.0),
            ..Default::default()
        });
        assert!(matches!(
            solve(&request, &RosterConfig::default(), &NothingAssigned),
            Err(RosterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn partial_config_block_keeps_caller_defaults() {
        let mut request = input();
        request.config = serde_json::from_value(json!({"sundayQuota": 8})).unwrap();
        let defaults = RosterConfig {
            max_hours: 40.0,
            sunday_quota: 20.0,
            time_limit_secs: 7.0,
        };
        let engine = Recording::default();
        solve(&request, &defaults, &engine).unwrap();
        assert_eq!(engine.max_hours.get(), Some(40.0));
        assert_eq!(engine.budget.get(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn short_value_vectors_are_engine_errors() {
        assert!(matches!(
            solve(&input(), &RosterConfig::default(), &ShortValues),
            Err(RosterError::Engine(_))
        ));
    }

    #[test]
    fn seats_past_the_available_people_have_nobody() {
        let request: RosterInput = serde_json::from_value(json!({
            "shifts": [
                {"time": "08:00-13:00", "personsRequired": 2, "category": "Morning", "day": "Monday", "date": "2024-01-15"}
            ],
            "people": [
                {"name": "Ann", "availability": [true]},
                {"name": "Bo", "availability": [false]}
            ]
        }))
        .unwrap();
        let output = solve(&request, &RosterConfig::default(), &NothingAssigned).unwrap();
        assert_eq!(output.shifts[0].unfilled, 2);
        assert_eq!(
            output.shifts[0].unfilled_reasons,
            vec![UnfilledReason::Unattainable, UnfilledReason::NobodyAvailable]
        );
    }

    #[test]
    fn zero_shifts_solve_trivially() {
        let request: RosterInput = serde_json::from_value(json!({
            "shifts": [],
            "people": [{"name": "Ann", "availability": []}]
        }))
        .unwrap();
        let output = solve(&request, &RosterConfig::default(), &AlwaysInfeasible).unwrap();
        assert_eq!(output.status, SolveStatus::Optimal);
        assert!(output.shifts.is_empty());
        let fairness = output.fairness.unwrap();
        assert_eq!(fairness.fill_rate_percent, 0.0);
        assert_eq!(fairness.regular_sse, 0.0);
        assert_eq!(output.people[0].received_total_share, 0.0);
    }
}
