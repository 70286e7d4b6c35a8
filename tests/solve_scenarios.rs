use chrono::{Duration, NaiveDate};
use roster_solver::data::{PersonSpec, RosterInput, RosterOutput, ShiftSpec};
use roster_solver::domain::{Person, Schedule, Shift, ShiftCategory, Weekday};
use roster_solver::solver::{solve, solve_schedule};
use roster_solver::{HighsEngine, RosterConfig, SolveStatus};

const MONDAY: (i32, u32, u32) = (2024, 1, 15);

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(MONDAY.0, MONDAY.1, MONDAY.2).unwrap()
}

fn shift_spec(date: NaiveDate, time: &str, category: &str) -> ShiftSpec {
    ShiftSpec {
        time: time.to_string(),
        persons_required: 1,
        category: category.to_string(),
        day: Weekday::of_date(date).to_string(),
        date,
    }
}

/// Morning, midday and evening on each of `days` days from Monday.
fn three_a_day(days: i64) -> Vec<ShiftSpec> {
    (0..days)
        .flat_map(|d| {
            let date = monday() + Duration::days(d);
            [
                shift_spec(date, "08:00-12:00", "Morning"),
                shift_spec(date, "12:00-17:00", "Midday"),
                shift_spec(date, "17:00-22:00", "Evening"),
            ]
        })
        .collect()
}

fn config(max_hours: f64, sunday_quota: f64) -> RosterConfig {
    RosterConfig {
        max_hours,
        sunday_quota,
        time_limit_secs: 20.0,
    }
}

fn person(name: &str, availability: Vec<bool>) -> PersonSpec {
    PersonSpec {
        name: name.to_string(),
        availability,
    }
}

/// Checks the hard rules straight from the rendered roster.
fn assert_hard_rules(input: &RosterInput, output: &RosterOutput, config: &RosterConfig) {
    assert!(output.violations.is_empty(), "{:?}", output.violations);
    assert_eq!(output.shifts.len(), input.shifts.len());
    for row in &output.shifts {
        assert_eq!(row.assigned.len() as u32 + row.unfilled, row.persons_required);
    }
    for (p, spec) in input.people.iter().enumerate() {
        let worked: Vec<usize> = output
            .shifts
            .iter()
            .filter(|row| row.assigned.contains(&spec.name))
            .map(|row| row.index)
            .collect();
        for s in &worked {
            assert!(spec.availability[*s], "{} works unavailable shift {s}", spec.name);
        }
        let metrics = &output.people[p];
        assert_eq!(metrics.name, spec.name);
        assert!(metrics.regular_hours <= config.max_hours + 1e-6);
        assert!(metrics.sunday_shifts <= 1);
        for pair in worked.windows(2) {
            let (a, b) = (&output.shifts[pair[0]], &output.shifts[pair[1]]);
            if pair[1] == pair[0] + 1 {
                assert!(
                    !(a.category == "Evening" && b.category == "Morning"),
                    "{} works evening {} then morning {}",
                    spec.name,
                    pair[0],
                    pair[1]
                );
            }
        }
        for s in worked.iter().filter(|s| output.shifts[**s].category == "Evening") {
            for back in [1, 2] {
                if *s >= back && worked.contains(&(s - back)) {
                    let earlier = &output.shifts[s - back].category;
                    assert!(
                        earlier == "Evening" || (back == 2 && earlier == "Midday"),
                        "{} works {earlier} {} before evening {s}",
                        spec.name,
                        s - back
                    );
                }
            }
        }
    }
}

#[test]
fn more_available_person_gets_more_shifts() {
    let shifts = three_a_day(7);
    let n = shifts.len();
    let rare = [0, 4, 10];
    let input = RosterInput {
        people: vec![
            person("Often", (0..n).map(|s| s != 0 && s != 10).collect()),
            person("Rarely", (0..n).map(|s| rare.contains(&s)).collect()),
        ],
        shifts,
        config: Some(config(200.0, 0.0).into()),
    };
    let cfg = RosterConfig::default().with_overrides(input.config.unwrap());
    let output = solve(&input, &cfg, &HighsEngine::default()).unwrap();

    assert_ne!(output.status, SolveStatus::Infeasible);
    assert_hard_rules(&input, &output, &cfg);
    let often = &output.people[0];
    let rarely = &output.people[1];
    assert!(
        often.shift_count > 2 * rarely.shift_count,
        "often {} vs rarely {}",
        often.shift_count,
        rarely.shift_count
    );
    assert!(often.expected_regular > rarely.expected_regular);
}

#[test]
fn equal_availability_splits_hours_evenly() {
    let shifts: Vec<ShiftSpec> = (0..6)
        .map(|d| shift_spec(monday() + Duration::days(d), "08:00-13:00", "Ochtend"))
        .collect();
    let input = RosterInput {
        people: vec![person("Ann", vec![true; 6]), person("Bo", vec![true; 6])],
        shifts,
        config: Some(config(100.0, 0.0).into()),
    };
    let cfg = RosterConfig::default().with_overrides(input.config.unwrap());
    let output = solve(&input, &cfg, &HighsEngine::default()).unwrap();

    assert_eq!(output.status, SolveStatus::Optimal);
    assert_hard_rules(&input, &output, &cfg);
    assert_eq!(output.people[0].shift_count, 3);
    assert_eq!(output.people[1].shift_count, 3);
    assert_eq!(output.fairness.as_ref().unwrap().fill_rate_percent, 100.0);
}

#[test]
fn unearned_sunday_is_left_as_slack() {
    let sunday = monday() + Duration::days(6);
    let input = RosterInput {
        shifts: vec![shift_spec(sunday, "08:00-16:00", "Morning")],
        people: vec![person("Ann", vec![true]), person("Bo", vec![true])],
        config: Some(config(100.0, 20.0).into()),
    };
    let cfg = RosterConfig::default().with_overrides(input.config.unwrap());
    let output = solve(&input, &cfg, &HighsEngine::default()).unwrap();

    assert_eq!(output.status, SolveStatus::Optimal);
    assert_hard_rules(&input, &output, &cfg);
    assert!(output.shifts[0].assigned.is_empty());
    assert_eq!(output.shifts[0].unfilled, 1);
    assert_eq!(output.fairness.unwrap().fill_rate_percent, 0.0);
}

#[test]
fn zero_max_hours_means_zero_shifts() {
    let shifts = three_a_day(2);
    let n = shifts.len();
    let input = RosterInput {
        people: vec![person("Capped", vec![true; n]), person("Free", vec![true; n])],
        shifts,
        config: Some(config(0.0, 0.0).into()),
    };
    let cfg = RosterConfig::default().with_overrides(input.config.unwrap());
    let output = solve(&input, &cfg, &HighsEngine::default()).unwrap();

    assert_hard_rules(&input, &output, &cfg);
    assert_eq!(output.people[0].shift_count, 0);
    assert_eq!(output.people[1].shift_count, 0);
    assert!(output.shifts.iter().all(|row| row.unfilled == 1));
}

#[test]
fn at_most_one_sunday_per_person() {
    let first = monday() + Duration::days(6);
    let second = first + Duration::days(7);
    let input = RosterInput {
        shifts: vec![
            shift_spec(first, "08:00-16:00", "Morning"),
            shift_spec(second, "08:00-16:00", "Morning"),
        ],
        people: vec![person("Ann", vec![true, true])],
        config: Some(config(100.0, 0.0).into()),
    };
    let cfg = RosterConfig::default().with_overrides(input.config.unwrap());
    let output = solve(&input, &cfg, &HighsEngine::default()).unwrap();

    assert_hard_rules(&input, &output, &cfg);
    assert_eq!(output.people[0].sunday_shifts, 1);
    assert_eq!(output.fairness.unwrap().total_slack, 1);
}

#[test]
fn empty_schedule_is_trivially_optimal() {
    let input = RosterInput {
        shifts: Vec::new(),
        people: vec![person("Ann", Vec::new())],
        config: None,
    };
    let output = solve(&input, &RosterConfig::default(), &HighsEngine::default()).unwrap();
    assert_eq!(output.status, SolveStatus::Optimal);
    assert!(output.shifts.is_empty());
    let fairness = output.fairness.unwrap();
    assert_eq!(fairness.required_seats, 0);
    assert_eq!(fairness.fill_rate_percent, 0.0);
}

#[test]
fn solved_shifts_are_written_back_to_people() {
    let mut schedule = Schedule::new();
    for d in 0..3 {
        let date = monday() + Duration::days(d);
        let shift = Shift::new(
            "08:00-12:00".parse().unwrap(),
            1,
            ShiftCategory::Morning,
            Weekday::of_date(date),
            date,
        );
        schedule.add_shift(shift).unwrap();
    }
    schedule.add_person(Person::new("Ann", vec![true, false, true])).unwrap();
    schedule.add_person(Person::new("Bo", vec![false, true, false])).unwrap();

    let run = solve_schedule(&mut schedule, &config(100.0, 0.0), &HighsEngine::default()).unwrap();
    assert_eq!(run.status, SolveStatus::Optimal);
    let ann = schedule.person_id("Ann").unwrap();
    let bo = schedule.person_id("Bo").unwrap();
    assert_eq!(schedule.person(ann).assigned_shifts().len(), 2);
    assert_eq!(schedule.person(bo).assigned_shifts().len(), 1);
    assert_eq!(run.assignment.unwrap().total_slack(), 0);
}
