use crate::domain::Schedule;
use crate::error::RosterError;
use log::debug;
use serde::Serialize;

/// Hours a person could work, derived from their availability vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableHours {
    pub regular: f64,
    pub bonus: f64,
    pub total: f64,
    pub non_sunday: f64,
}

/// Hours a person should receive if work were split in proportion to
/// declared regular availability.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FairnessTarget {
    pub regular: f64,
    pub bonus: f64,
}

/// `part / whole`, or 0 when the denominator is zero.
pub fn ratio(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { part / whole }
}

/// Recomputes [`AvailableHours`] for every person. Idempotent.
pub fn aggregate(schedule: &mut Schedule) -> Result<(), RosterError> {
    schedule.check_availability_lengths()?;
    let (shifts, people) = schedule.split_mut();
    for person in people.iter_mut() {
        let mut totals = AvailableHours::default();
        for (shift, _) in shifts
            .iter()
            .zip(person.availability())
            .filter(|(_, available)| **available)
        {
            totals.regular += shift.hours();
            totals.bonus += shift.bonus_hours();
            if !shift.is_sunday() {
                totals.non_sunday += shift.hours();
            }
        }
        totals.total = totals.regular + totals.bonus;
        debug!(
            "{}: {:.1} regular, {:.1} bonus, {:.1} non-Sunday hours available",
            person.name(),
            totals.regular,
            totals.bonus,
            totals.non_sunday
        );
        person.totals = Some(totals);
    }
    Ok(())
}

/// Derives each person's [`FairnessTarget`]: their share of all declared
/// regular hours, applied to the regular and bonus hours the shifts need.
/// Requires [`aggregate`] to have run.
pub fn derive_targets(schedule: &mut Schedule) -> Result<(), RosterError> {
    let total_regular = schedule.total_available_regular()?;
    let required_regular = schedule.required_person_hours();
    let required_bonus = schedule.required_bonus_hours();
    let (_, people) = schedule.split_mut();
    for person in people.iter_mut() {
        let share = ratio(person.totals()?.regular, total_regular);
        person.target = Some(FairnessTarget {
            regular: share * required_regular,
            bonus: share * required_bonus,
        });
    }
    Ok(())
}

/// Runs both passes.
pub fn prepare(schedule: &mut Schedule) -> Result<(), RosterError> {
    aggregate(schedule)?;
    derive_targets(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Person, PersonId, Shift, ShiftCategory, Weekday};
    use chrono::NaiveDate;

    fn shift(window: &str, category: ShiftCategory, ymd: (i32, u32, u32)) -> Shift {
        let date = NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap();
        Shift::new(window.parse().unwrap(), 1, category, Weekday::of_date(date), date)
    }

    fn weekend_schedule() -> Schedule {
        let mut schedule = Schedule::new();
        // Friday evening, Saturday morning, Sunday morning
        schedule.add_shift(shift("18:00-24:00", ShiftCategory::Evening, (2024, 1, 12))).unwrap();
        schedule.add_shift(shift("08:00-16:00", ShiftCategory::Morning, (2024, 1, 13))).unwrap();
        schedule.add_shift(shift("08:00-16:00", ShiftCategory::Morning, (2024, 1, 14))).unwrap();
        schedule.add_person(Person::new("Ann", vec![true, true, true])).unwrap();
        schedule.add_person(Person::new("Bo", vec![false, true, false])).unwrap();
        schedule
    }

    #[test]
    fn aggregates_regular_bonus_and_non_sunday_hours() {
        let mut schedule = weekend_schedule();
        aggregate(&mut schedule).unwrap();

        let ann = schedule.person(schedule.person_id("Ann").unwrap()).totals().unwrap();
        assert_eq!(ann.regular, 22.0);
        assert!((ann.bonus - (1.6 + 3.2 + 6.0)).abs() < 1e-9);
        assert!((ann.total - (22.0 + 10.8)).abs() < 1e-9);
        assert_eq!(ann.non_sunday, 14.0);

        assert_eq!(schedule.non_sunday_hours("Bo").unwrap(), 8.0);
        assert_eq!(schedule.total_available_regular().unwrap(), 30.0);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let mut schedule = weekend_schedule();
        prepare(&mut schedule).unwrap();
        let first: Vec<_> = schedule.people().to_vec();
        prepare(&mut schedule).unwrap();
        assert_eq!(first, schedule.people().to_vec());
    }

    #[test]
    fn length_mismatch_is_fatal() {
        let mut schedule = weekend_schedule();
        schedule.add_person(Person::new("Cy", vec![true])).unwrap();
        assert_eq!(
            aggregate(&mut schedule),
            Err(RosterError::AvailabilityLength {
                person: "Cy".into(),
                expected: 3,
                actual: 1,
            })
        );
    }

    #[test]
    fn targets_split_required_hours_by_regular_availability() {
        let mut schedule = weekend_schedule();
        prepare(&mut schedule).unwrap();
        let ann = *schedule.person(schedule.person_id("Ann").unwrap()).target().unwrap();
        let bo = *schedule.person(schedule.person_id("Bo").unwrap()).target().unwrap();
        assert!((ann.regular + bo.regular - 22.0).abs() < 1e-9);
        assert!((ann.regular - 22.0 * 22.0 / 30.0).abs() < 1e-9);
        assert!((bo.bonus - 10.8 * 8.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn nobody_available_yields_zero_targets() {
        let mut schedule = weekend_schedule();
        let ann = schedule.person_id("Ann").unwrap();
        let bo = schedule.person_id("Bo").unwrap();
        schedule.person_mut(ann).set_availability(vec![false; 3]);
        schedule.person_mut(bo).set_availability(vec![false; 3]);
        prepare(&mut schedule).unwrap();
        assert_eq!(schedule.total_available_regular().unwrap(), 0.0);
        assert_eq!(*schedule.person(ann).target().unwrap(), FairnessTarget::default());
    }

    #[test]
    fn empty_schedule_sums_to_zero() {
        let mut schedule = Schedule::new();
        schedule.add_person(Person::new("Ann", vec![])).unwrap();
        prepare(&mut schedule).unwrap();
        let ann = schedule.person(PersonId(0));
        assert_eq!(*ann.totals().unwrap(), AvailableHours::default());
        assert_eq!(*ann.target().unwrap(), FairnessTarget::default());
    }

    #[test]
    fn ratio_guards_zero_denominator() {
        assert_eq!(ratio(3.0, 0.0), 0.0);
        assert_eq!(ratio(3.0, 4.0), 0.75);
    }
}
