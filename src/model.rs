use crate::config::RosterConfig;
use crate::domain::{PersonId, Schedule, ShiftCategory, ShiftId, Weekday};
use crate::error::RosterError;
use crate::formulation::{Formulation, LinearExpr, Relation, VarId, VarKind};
use log::{debug, info};

/// Bonus-hour error counts at this fraction of regular-hour error.
pub const BONUS_WEIGHT: f64 = 0.3;
/// Weight per pair of same-person shifts at weekday distance 1, 2, 3.
pub const SPREAD_WEIGHTS: [f64; 3] = [1.0, 0.5, 0.25];
pub const MAX_SPREAD_GAP: usize = 3;
pub const SPREAD_COEFFICIENT: f64 = 1.0;
/// Cost of one unfilled seat. Must dwarf every fairness and spread term.
pub const SLACK_PENALTY: f64 = 100_000.0;

/// Spread weight for a weekday distance. Same-weekday pairs and pairs
/// further apart than [`MAX_SPREAD_GAP`] cost nothing.
pub fn spread_weight(distance: usize) -> f64 {
    match distance {
        1..=MAX_SPREAD_GAP => SPREAD_WEIGHTS[distance - 1],
        _ => 0.0,
    }
}

/// Objective cost of one person working shifts on days `a` and `b`.
pub fn pair_penalty(a: Weekday, b: Weekday) -> f64 {
    SPREAD_COEFFICIENT * spread_weight(a.circular_distance(b))
}

/// Decision and auxiliary variables, indexed by person and shift.
#[derive(Debug, Clone)]
pub struct VariableTable {
    shift_count: usize,
    assign: Vec<VarId>,
    slack: Vec<VarId>,
    regular_error: Vec<VarId>,
    bonus_error: Vec<VarId>,
}

impl VariableTable {
    pub fn assign(&self, person: PersonId, shift: ShiftId) -> VarId {
        self.assign[person.0 * self.shift_count + shift.0]
    }

    pub fn slack(&self, shift: ShiftId) -> VarId {
        self.slack[shift.0]
    }

    pub fn regular_error(&self, person: PersonId) -> VarId {
        self.regular_error[person.0]
    }

    pub fn bonus_error(&self, person: PersonId) -> VarId {
        self.bonus_error[person.0]
    }
}

/// The built problem plus the table needed to read a solution back.
#[derive(Debug, Clone)]
pub struct RosterModel {
    pub formulation: Formulation,
    pub vars: VariableTable,
    person_count: usize,
}

/// Who works which shift, and how many seats stay empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedAssignment {
    pub by_shift: Vec<Vec<PersonId>>,
    pub slack: Vec<u32>,
}

impl SolvedAssignment {
    pub fn shifts_of(&self, person: PersonId) -> Vec<ShiftId> {
        self.by_shift
            .iter()
            .enumerate()
            .filter(|(_, people)| people.contains(&person))
            .map(|(index, _)| ShiftId(index))
            .collect()
    }

    pub fn total_slack(&self) -> u32 {
        self.slack.iter().sum()
    }
}

impl RosterModel {
    /// Reads binary values above 0.5 as assigned and rounds slack.
    pub fn decode(&self, values: &[f64]) -> SolvedAssignment {
        let shift_count = self.vars.shift_count;
        let by_shift: Vec<Vec<PersonId>> = (0..shift_count)
            .map(|s| {
                (0..self.person_count)
                    .map(PersonId)
                    .filter(|p| values[self.vars.assign(*p, ShiftId(s)).0] > 0.5)
                    .collect()
            })
            .collect();
        let slack: Vec<u32> = (0..shift_count)
            .map(|s| values[self.vars.slack(ShiftId(s)).0].round().max(0.0) as u32)
            .collect();
        SolvedAssignment { by_shift, slack }
    }
}

/// Builds variables, objective and hard constraints for a prepared
/// schedule (see [`crate::availability::prepare`]).
pub fn build(schedule: &Schedule, config: &RosterConfig) -> Result<RosterModel, RosterError> {
    schedule.check_availability_lengths()?;
    let shifts = schedule.shifts();
    let people = schedule.people();
    info!(
        "Setting up roster model with {} people and {} shifts...",
        people.len(),
        shifts.len()
    );

    let mut f = Formulation::new();

    // assign(p, s) = 1 if person p works shift s
    let mut assign = Vec::with_capacity(people.len() * shifts.len());
    for person in people {
        for s in 0..shifts.len() {
            assign.push(f.binary(format!("assign[{},{s}]", person.name())));
        }
    }
    let slack: Vec<VarId> = shifts
        .iter()
        .enumerate()
        .map(|(s, shift)| {
            f.add_var(
                format!("slack[{s}]"),
                VarKind::Integer,
                0.0,
                f64::from(shift.persons_required()),
            )
        })
        .collect();

    let mut regular_error = Vec::with_capacity(people.len());
    let mut bonus_error = Vec::with_capacity(people.len());
    for person in people {
        let totals = person.totals()?;
        let target = person.target()?;
        let max_regular = totals.regular.min(config.max_hours);
        regular_error.push(f.add_var(
            format!("regular_error[{}]", person.name()),
            VarKind::Continuous,
            target.regular - max_regular,
            target.regular,
        ));
        bonus_error.push(f.add_var(
            format!("bonus_error[{}]", person.name()),
            VarKind::Continuous,
            target.bonus - totals.bonus,
            target.bonus,
        ));
    }

    let vars = VariableTable {
        shift_count: shifts.len(),
        assign,
        slack,
        regular_error,
        bonus_error,
    };
    let mut model = RosterModel {
        formulation: f,
        vars,
        person_count: people.len(),
    };

    add_objective(&mut model, schedule, config)?;
    add_fairness_links(&mut model, schedule)?;
    add_coverage(&mut model, schedule);
    add_availability(&mut model, schedule);
    add_evening_to_morning(&mut model, schedule);
    add_evening_lookback(&mut model, schedule);
    add_sunday_quota_gate(&mut model, schedule, config)?;
    add_one_sunday(&mut model, schedule);
    add_max_hours(&mut model, schedule, config);

    info!(
        "Roster model ready: {} variables, {} constraints, {} spread pairs.",
        model.formulation.variables.len(),
        model.formulation.constraints.len(),
        model.formulation.objective.products.len()
    );
    Ok(model)
}

/// True if the quota gate keeps this person off Sunday shifts.
fn sunday_gated(schedule: &Schedule, person: PersonId, config: &RosterConfig) -> Result<bool, RosterError> {
    Ok(schedule.person(person).totals()?.non_sunday < config.sunday_quota)
}

fn add_objective(
    model: &mut RosterModel,
    schedule: &Schedule,
    config: &RosterConfig,
) -> Result<(), RosterError> {
    let objective = &mut model.formulation.objective;
    for p in schedule.person_ids() {
        objective.squares.push((model.vars.regular_error(p), 1.0));
        objective.squares.push((model.vars.bonus_error(p), BONUS_WEIGHT));
    }

    // Pairs that can never both be assigned are left out: the product is
    // zero for them anyway.
    let shifts = schedule.shifts();
    for p in schedule.person_ids() {
        let gated = sunday_gated(schedule, p, config)?;
        let person = schedule.person(p);
        let workable: Vec<ShiftId> = schedule
            .shift_ids()
            .filter(|s| person.is_available(*s) && !(gated && shifts[s.0].is_sunday()))
            .collect();
        for (i, a) in workable.iter().enumerate() {
            for b in &workable[i + 1..] {
                let weight = pair_penalty(shifts[a.0].day(), shifts[b.0].day());
                if weight > 0.0 {
                    objective
                        .products
                        .push((model.vars.assign(p, *a), model.vars.assign(p, *b), weight));
                }
            }
        }
    }

    for s in schedule.shift_ids() {
        objective.linear.add_term(model.vars.slack(s), SLACK_PENALTY);
    }
    Ok(())
}

/// error = target - assigned hours, for regular and bonus hours.
fn add_fairness_links(model: &mut RosterModel, schedule: &Schedule) -> Result<(), RosterError> {
    let shifts = schedule.shifts();
    for p in schedule.person_ids() {
        let person = schedule.person(p);
        let target = person.target()?;

        let mut regular = LinearExpr::new().with_term(model.vars.regular_error(p), 1.0);
        let mut bonus = LinearExpr::new().with_term(model.vars.bonus_error(p), 1.0);
        for s in schedule.shift_ids() {
            let var = model.vars.assign(p, s);
            regular.add_term(var, shifts[s.0].hours());
            bonus.add_term(var, shifts[s.0].bonus_hours());
        }
        model.formulation.add_constraint(
            format!("regular_error_link[{}]", person.name()),
            regular,
            Relation::Eq,
            target.regular,
        );
        model.formulation.add_constraint(
            format!("bonus_error_link[{}]", person.name()),
            bonus,
            Relation::Eq,
            target.bonus,
        );
    }
    Ok(())
}

fn add_coverage(model: &mut RosterModel, schedule: &Schedule) {
    debug!("Adding coverage constraints...");
    for (s, shift) in schedule.shift_ids().zip(schedule.shifts()) {
        let mut covered: LinearExpr = schedule
            .person_ids()
            .map(|p| (model.vars.assign(p, s), 1.0))
            .collect();
        covered.add_term(model.vars.slack(s), 1.0);
        model.formulation.add_constraint(
            format!("coverage[{}]", s.0),
            covered,
            Relation::Eq,
            f64::from(shift.persons_required()),
        );
    }
}

/// assign <= availability. Binaries already sit below 1, so only the
/// unavailable cells need a row.
fn add_availability(model: &mut RosterModel, schedule: &Schedule) {
    debug!("Adding availability constraints...");
    for p in schedule.person_ids() {
        let person = schedule.person(p);
        for s in schedule.shift_ids().filter(|s| !person.is_available(*s)) {
            model.formulation.add_constraint(
                format!("availability[{},{}]", person.name(), s.0),
                LinearExpr::new().with_term(model.vars.assign(p, s), 1.0),
                Relation::Le,
                0.0,
            );
        }
    }
}

fn add_pair_exclusion(model: &mut RosterModel, name: String, p: PersonId, a: ShiftId, b: ShiftId) {
    let expr = LinearExpr::new()
        .with_term(model.vars.assign(p, a), 1.0)
        .with_term(model.vars.assign(p, b), 1.0);
    model.formulation.add_constraint(name, expr, Relation::Le, 1.0);
}

/// Sequence positions (prev, next) where an evening is directly followed
/// by a morning.
pub fn evening_to_morning_pairs(schedule: &Schedule) -> Vec<(ShiftId, ShiftId)> {
    schedule
        .shifts()
        .windows(2)
        .enumerate()
        .filter(|(_, w)| {
            w[0].category() == ShiftCategory::Evening && w[1].category() == ShiftCategory::Morning
        })
        .map(|(k, _)| (ShiftId(k), ShiftId(k + 1)))
        .collect()
}

/// (earlier, evening) pairs: the shift right before an evening when it is
/// a morning or midday, and the one two back when it is a morning.
pub fn evening_lookback_pairs(schedule: &Schedule) -> Vec<(ShiftId, ShiftId)> {
    let shifts = schedule.shifts();
    let mut pairs = Vec::new();
    for (k, shift) in shifts.iter().enumerate() {
        if shift.category() != ShiftCategory::Evening {
            continue;
        }
        if k >= 1
            && matches!(
                shifts[k - 1].category(),
                ShiftCategory::Morning | ShiftCategory::Midday
            )
        {
            pairs.push((ShiftId(k - 1), ShiftId(k)));
        }
        if k >= 2 && shifts[k - 2].category() == ShiftCategory::Morning {
            pairs.push((ShiftId(k - 2), ShiftId(k)));
        }
    }
    pairs
}

fn add_evening_to_morning(model: &mut RosterModel, schedule: &Schedule) {
    debug!("Adding evening-to-morning rest constraints...");
    let pairs = evening_to_morning_pairs(schedule);
    for p in schedule.person_ids() {
        for (evening, morning) in &pairs {
            let name = format!(
                "evening_to_morning[{},{},{}]",
                schedule.person(p).name(),
                evening.0,
                morning.0
            );
            add_pair_exclusion(model, name, p, *evening, *morning);
        }
    }
}

fn add_evening_lookback(model: &mut RosterModel, schedule: &Schedule) {
    debug!("Adding evening lookback constraints...");
    let pairs = evening_lookback_pairs(schedule);
    for p in schedule.person_ids() {
        for (earlier, evening) in &pairs {
            let name = format!(
                "evening_lookback[{},{},{}]",
                schedule.person(p).name(),
                earlier.0,
                evening.0
            );
            add_pair_exclusion(model, name, p, *earlier, *evening);
        }
    }
}

fn add_sunday_quota_gate(
    model: &mut RosterModel,
    schedule: &Schedule,
    config: &RosterConfig,
) -> Result<(), RosterError> {
    debug!("Adding Sunday quota gate (quota {} hours)...", config.sunday_quota);
    for p in schedule.person_ids() {
        if !sunday_gated(schedule, p, config)? {
            continue;
        }
        let person = schedule.person(p);
        for s in schedule.shift_ids().filter(|s| schedule.shift(*s).is_sunday()) {
            model.formulation.add_constraint(
                format!("sunday_quota[{},{}]", person.name(), s.0),
                LinearExpr::new().with_term(model.vars.assign(p, s), 1.0),
                Relation::Eq,
                0.0,
            );
        }
    }
    Ok(())
}

fn add_one_sunday(model: &mut RosterModel, schedule: &Schedule) {
    let sundays: Vec<ShiftId> = schedule
        .shift_ids()
        .filter(|s| schedule.shift(*s).is_sunday())
        .collect();
    if sundays.is_empty() {
        return;
    }
    for p in schedule.person_ids() {
        let expr = sundays
            .iter()
            .map(|s| (model.vars.assign(p, *s), 1.0))
            .collect();
        model.formulation.add_constraint(
            format!("one_sunday[{}]", schedule.person(p).name()),
            expr,
            Relation::Le,
            1.0,
        );
    }
}

fn add_max_hours(model: &mut RosterModel, schedule: &Schedule, config: &RosterConfig) {
    for p in schedule.person_ids() {
        let expr = schedule
            .shift_ids()
            .map(|s| (model.vars.assign(p, s), schedule.shift(s).hours()))
            .collect();
        model.formulation.add_constraint(
            format!("max_hours[{}]", schedule.person(p).name()),
            expr,
            Relation::Le,
            config.max_hours,
        );
    }
}
