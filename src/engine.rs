use crate::error::RosterError;
use crate::formulation::{Formulation, LinearExpr, Relation, VarDecl, VarKind};
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolutionStatus, SolverModel,
    Variable, WithTimeLimit, constraint, default_solver, variable,
};
use log::{info, trace, warn};
use serde::Serialize;
use std::time::{Duration, Instant};

/// How a solve ended. Neither variant is an error: a time-limited result
/// is a usable assignment, an infeasible one asks the caller to relax the
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SolveStatus {
    Optimal,
    TimeLimited,
    Infeasible,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutcome {
    pub status: SolveStatus,
    /// One value per formulation variable; empty when infeasible.
    pub values: Vec<f64>,
    pub elapsed: Duration,
}

impl EngineOutcome {
    pub fn trivial(formulation: &Formulation) -> Self {
        Self {
            status: SolveStatus::Optimal,
            values: formulation.variables.iter().map(|v| v.lower.max(0.0).min(v.upper)).collect(),
            elapsed: Duration::ZERO,
        }
    }
}

/// A mixed-integer backend that minimises a [`Formulation`] within a
/// wall-clock budget.
pub trait SolvingEngine {
    fn solve(&self, formulation: &Formulation, time_limit: Duration) -> Result<EngineOutcome, RosterError>;
}

/// HiGHS through good_lp. Squared terms are replaced by tangent cuts over
/// the variable's bounds, products of binaries by a linear product
/// variable.
#[derive(Debug, Clone, Copy)]
pub struct HighsEngine {
    pub threads: i32,
    pub random_seed: i32,
    pub log_to_console: bool,
    pub tangent_cuts: usize,
}

impl Default for HighsEngine {
    fn default() -> Self {
        Self {
            threads: 1,
            random_seed: 1234,
            log_to_console: false,
            tangent_cuts: 64,
        }
    }
}

/// A gap-limited HiGHS result is as good as HiGHS was asked to prove, so it
/// counts as optimal; anything cut short by a limit is time-limited.
pub fn status_of(status: SolutionStatus) -> SolveStatus {
    match status {
        SolutionStatus::Optimal | SolutionStatus::GapLimit => SolveStatus::Optimal,
        SolutionStatus::TimeLimit => SolveStatus::TimeLimited,
    }
}

/// Points in `[lower, upper]` at which `x^2` gets a tangent, zero included
/// when it lies inside.
pub fn tangent_points(lower: f64, upper: f64, count: usize) -> Vec<f64> {
    if upper - lower <= 1e-9 || count < 2 {
        return vec![lower];
    }
    let step = (upper - lower) / (count - 1) as f64;
    let mut points: Vec<f64> = (0..count).map(|i| lower + step * i as f64).collect();
    if lower < 0.0 && upper > 0.0 {
        points.push(0.0);
    }
    points
}

fn definition(decl: &VarDecl) -> good_lp::VariableDefinition {
    let def = match decl.kind {
        VarKind::Binary => return variable().binary(),
        VarKind::Integer => variable().integer(),
        VarKind::Continuous => variable(),
    };
    let def = if decl.lower.is_finite() { def.min(decl.lower) } else { def };
    if decl.upper.is_finite() { def.max(decl.upper) } else { def }
}

fn to_expression(expr: &LinearExpr, vars: &[Variable]) -> Expression {
    let mut out = Expression::from(expr.constant);
    for (var, coef) in &expr.terms {
        out += *coef * vars[var.0];
    }
    out
}

impl SolvingEngine for HighsEngine {
    fn solve(&self, formulation: &Formulation, time_limit: Duration) -> Result<EngineOutcome, RosterError> {
        if formulation.variables.is_empty() {
            return Ok(EngineOutcome::trivial(formulation));
        }
        let start_time = Instant::now();
        let mut problem = ProblemVariables::new();
        let vars: Vec<Variable> = formulation
            .variables
            .iter()
            .map(|decl| problem.add(definition(decl)))
            .collect();

        let mut objective = to_expression(&formulation.objective.linear, &vars);
        let mut linearised = Vec::new();

        // t >= 2a*x - a^2 for every tangent point a, so t >= x^2 at the optimum
        for (var, weight) in &formulation.objective.squares {
            let decl = formulation.var(*var);
            if *weight < 0.0 || !decl.lower.is_finite() || !decl.upper.is_finite() {
                return Err(RosterError::Engine(format!(
                    "squared term on {} needs finite bounds and a non-negative weight",
                    decl.name
                )));
            }
            let epigraph = problem.add(variable().min(0.0));
            objective += *weight * epigraph;
            for a in tangent_points(decl.lower, decl.upper, self.tangent_cuts) {
                let cut = Expression::from(epigraph) - (2.0 * a) * vars[var.0];
                linearised.push(constraint!(cut >= -(a * a)));
            }
        }

        // p >= a + b - 1 with p >= 0 is exact for a positive weight
        for (a, b, weight) in &formulation.objective.products {
            let (da, db) = (formulation.var(*a), formulation.var(*b));
            if *weight < 0.0 || da.kind != VarKind::Binary || db.kind != VarKind::Binary {
                return Err(RosterError::Engine(format!(
                    "product {} * {} must join two binaries with a non-negative weight",
                    da.name, db.name
                )));
            }
            let product = problem.add(variable().min(0.0).max(1.0));
            objective += *weight * product;
            let link = Expression::from(product) - vars[a.0] - vars[b.0];
            linearised.push(constraint!(link >= -1.0));
        }
        trace!(
            "Linearised objective with {} extra rows.",
            linearised.len()
        );

        let mut model = problem
            .minimise(objective)
            .using(default_solver)
            .set_option("threads", self.threads)
            .set_option("random_seed", self.random_seed)
            .set_option(
                "log_to_console",
                if self.log_to_console { "true" } else { "false" },
            )
            .with_time_limit(time_limit.as_secs_f64());

        for c in &formulation.constraints {
            let lhs = to_expression(&c.expr, &vars);
            let rhs = c.rhs;
            let row = match c.relation {
                Relation::Eq => constraint!(lhs == rhs),
                Relation::Le => constraint!(lhs <= rhs),
                Relation::Ge => constraint!(lhs >= rhs),
            };
            model.add_constraint(row);
        }
        for row in linearised {
            model.add_constraint(row);
        }

        info!("Starting HiGHS with a {:.1?} budget...", time_limit);
        let solution = match model.solve() {
            Ok(s) => s,
            Err(ResolutionError::Infeasible) => {
                warn!("Roster model is infeasible.");
                return Ok(EngineOutcome {
                    status: SolveStatus::Infeasible,
                    values: Vec::new(),
                    elapsed: start_time.elapsed(),
                });
            }
            Err(e) => return Err(RosterError::Engine(e.to_string())),
        };
        let elapsed = start_time.elapsed();
        let status = status_of(solution.status());
        info!("Solution found in {:.2?} ({:?})", elapsed, status);

        Ok(EngineOutcome {
            status,
            values: vars.iter().map(|v| solution.value(*v)).collect(),
            elapsed,
        })
    }
}
