use crate::availability::{AvailableHours, FairnessTarget};
use crate::error::RosterError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Days of the week in calendar order. Only used for circular distance
/// and the Saturday/Sunday rules, never to reorder shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn of_date(date: NaiveDate) -> Self {
        Self::ALL[date.weekday().num_days_from_monday() as usize]
    }

    /// Distance on the 7-day cycle: `min(|i - j|, 7 - |i - j|)`.
    pub fn circular_distance(self, other: Weekday) -> usize {
        let diff = self.index().abs_diff(other.index());
        diff.min(7 - diff)
    }

    pub fn is_sunday(self) -> bool {
        self == Weekday::Sunday
    }
}

impl FromStr for Weekday {
    type Err = RosterError;

    /// Accepts English and Dutch day names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monday" | "maandag" => Ok(Weekday::Monday),
            "tuesday" | "dinsdag" => Ok(Weekday::Tuesday),
            "wednesday" | "woensdag" => Ok(Weekday::Wednesday),
            "thursday" | "donderdag" => Ok(Weekday::Thursday),
            "friday" | "vrijdag" => Ok(Weekday::Friday),
            "saturday" | "zaterdag" => Ok(Weekday::Saturday),
            "sunday" | "zondag" => Ok(Weekday::Sunday),
            _ => Err(RosterError::UnknownWeekday(s.to_string())),
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShiftCategory {
    Morning,
    Midday,
    Evening,
}

impl FromStr for ShiftCategory {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" | "ochtend" => Ok(ShiftCategory::Morning),
            "midday" | "middag" => Ok(ShiftCategory::Midday),
            "evening" | "avond" => Ok(ShiftCategory::Evening),
            _ => Err(RosterError::UnknownCategory(s.to_string())),
        }
    }
}

impl fmt::Display for ShiftCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A `HH:MM-HH:MM` span. An end at or before the start runs past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start_minute: u32,
    end_minute: u32,
}

impl TimeWindow {
    pub fn new(start_minute: u32, end_minute: u32) -> Result<Self, RosterError> {
        if start_minute >= MINUTES_PER_DAY || end_minute > MINUTES_PER_DAY {
            return Err(RosterError::MalformedTime(format!(
                "{start_minute}..{end_minute}"
            )));
        }
        Ok(Self {
            start_minute,
            end_minute,
        })
    }

    pub fn minutes(&self) -> u32 {
        if self.end_minute > self.start_minute {
            self.end_minute - self.start_minute
        } else {
            self.end_minute + MINUTES_PER_DAY - self.start_minute
        }
    }

    pub fn hours(&self) -> f64 {
        f64::from(self.minutes()) / 60.0
    }
}

fn parse_clock(text: &str, allow_midnight_end: bool) -> Option<u32> {
    let (h, m) = text.trim().split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    if minute >= 60 {
        return None;
    }
    match hour {
        0..=23 => Some(hour * 60 + minute),
        24 if allow_midnight_end && minute == 0 => Some(MINUTES_PER_DAY),
        _ => None,
    }
}

impl FromStr for TimeWindow {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || RosterError::MalformedTime(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(malformed)?;
        let start_minute = parse_clock(start, false).ok_or_else(malformed)?;
        let end_minute = parse_clock(end, true).ok_or_else(malformed)?;
        Self::new(start_minute, end_minute)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start_minute / 60,
            self.start_minute % 60,
            self.end_minute / 60,
            self.end_minute % 60
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ShiftId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PersonId(pub usize);

/// One staffing slot. Fields are fixed at construction so the cached
/// hours and bonus always match the window, day and category.
#[derive(Debug, Clone, PartialEq)]
pub struct Shift {
    window: TimeWindow,
    hours: f64,
    persons_required: u32,
    category: ShiftCategory,
    day: Weekday,
    date: NaiveDate,
    bonus_hours: f64,
}

/// Fixed bonus for a weekday evening, regardless of its length.
pub const WEEKDAY_EVENING_BONUS: f64 = 1.6;
pub const SATURDAY_BONUS_RATE: f64 = 0.4;
pub const SUNDAY_BONUS_RATE: f64 = 0.75;

pub fn bonus_hours_for(day: Weekday, category: ShiftCategory, hours: f64) -> f64 {
    match (day, category) {
        (Weekday::Saturday, _) => SATURDAY_BONUS_RATE * hours,
        (Weekday::Sunday, _) => SUNDAY_BONUS_RATE * hours,
        (_, ShiftCategory::Evening) => WEEKDAY_EVENING_BONUS,
        _ => 0.0,
    }
}

impl Shift {
    pub fn new(
        window: TimeWindow,
        persons_required: u32,
        category: ShiftCategory,
        day: Weekday,
        date: NaiveDate,
    ) -> Self {
        let hours = window.hours();
        Self {
            window,
            hours,
            persons_required,
            category,
            day,
            date,
            bonus_hours: bonus_hours_for(day, category, hours),
        }
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn hours(&self) -> f64 {
        self.hours
    }

    pub fn persons_required(&self) -> u32 {
        self.persons_required
    }

    pub fn category(&self) -> ShiftCategory {
        self.category
    }

    pub fn day(&self) -> Weekday {
        self.day
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn bonus_hours(&self) -> f64 {
        self.bonus_hours
    }

    pub fn is_sunday(&self) -> bool {
        self.day.is_sunday()
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({}, {}h, needs {})",
            self.day, self.date, self.window, self.category, self.hours, self.persons_required
        )
    }
}

/// One worker. Derived totals are `None` until the aggregator has run.
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    name: String,
    availability: Vec<bool>,
    assigned_shifts: Vec<ShiftId>,
    pub(crate) totals: Option<AvailableHours>,
    pub(crate) target: Option<FairnessTarget>,
}

impl Person {
    pub fn new(name: impl Into<String>, availability: Vec<bool>) -> Self {
        Self {
            name: name.into(),
            availability,
            assigned_shifts: Vec::new(),
            totals: None,
            target: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn availability(&self) -> &[bool] {
        &self.availability
    }

    pub fn is_available(&self, shift: ShiftId) -> bool {
        self.availability.get(shift.0).copied().unwrap_or(false)
    }

    /// Replaces the availability vector and invalidates derived totals.
    pub fn set_availability(&mut self, availability: Vec<bool>) {
        self.availability = availability;
        self.totals = None;
        self.target = None;
    }

    pub fn totals(&self) -> Result<&AvailableHours, RosterError> {
        self.totals
            .as_ref()
            .ok_or_else(|| RosterError::AggregatesNotComputed(self.name.clone()))
    }

    pub fn target(&self) -> Result<&FairnessTarget, RosterError> {
        self.target
            .as_ref()
            .ok_or_else(|| RosterError::AggregatesNotComputed(self.name.clone()))
    }

    pub fn assigned_shifts(&self) -> &[ShiftId] {
        &self.assigned_shifts
    }

    pub(crate) fn set_assigned_shifts(&mut self, shifts: Vec<ShiftId>) {
        self.assigned_shifts = shifts;
    }
}

/// Aggregate root: shifts in chronological order plus the people who
/// declared availability for them.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    shifts: Vec<Shift>,
    people: Vec<Person>,
    by_name: HashMap<String, PersonId>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a shift. The caller supplies shifts already in time order.
    pub fn add_shift(&mut self, shift: Shift) -> Result<ShiftId, RosterError> {
        let index = self.shifts.len();
        let actual = Weekday::of_date(shift.date());
        if actual != shift.day() {
            return Err(RosterError::WeekdayMismatch {
                index,
                declared: shift.day().to_string(),
                date: shift.date().to_string(),
                actual: actual.to_string(),
            });
        }
        self.shifts.push(shift);
        Ok(ShiftId(index))
    }

    pub fn add_person(&mut self, person: Person) -> Result<PersonId, RosterError> {
        if self.by_name.contains_key(person.name()) {
            return Err(RosterError::DuplicatePerson(person.name().to_string()));
        }
        let id = PersonId(self.people.len());
        self.by_name.insert(person.name().to_string(), id);
        self.people.push(person);
        Ok(id)
    }

    pub fn shifts(&self) -> &[Shift] {
        &self.shifts
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn shift(&self, id: ShiftId) -> &Shift {
        &self.shifts[id.0]
    }

    pub fn person(&self, id: PersonId) -> &Person {
        &self.people[id.0]
    }

    pub fn person_mut(&mut self, id: PersonId) -> &mut Person {
        &mut self.people[id.0]
    }

    pub fn person_id(&self, name: &str) -> Result<PersonId, RosterError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| RosterError::UnknownPerson(name.to_string()))
    }

    pub fn shift_ids(&self) -> impl Iterator<Item = ShiftId> + '_ {
        (0..self.shifts.len()).map(ShiftId)
    }

    pub fn person_ids(&self) -> impl Iterator<Item = PersonId> + '_ {
        (0..self.people.len()).map(PersonId)
    }

    /// Shifts read-only, people mutable; used by the aggregation passes.
    pub(crate) fn split_mut(&mut self) -> (&[Shift], &mut [Person]) {
        (&self.shifts, &mut self.people)
    }

    /// Fails on the first person whose availability does not cover every shift.
    pub fn check_availability_lengths(&self) -> Result<(), RosterError> {
        for person in &self.people {
            if person.availability().len() != self.shifts.len() {
                return Err(RosterError::AvailabilityLength {
                    person: person.name().to_string(),
                    expected: self.shifts.len(),
                    actual: person.availability().len(),
                });
            }
        }
        Ok(())
    }

    pub fn total_available_regular(&self) -> Result<f64, RosterError> {
        self.people
            .iter()
            .map(|p| p.totals().map(|t| t.regular))
            .sum()
    }

    pub fn non_sunday_hours(&self, name: &str) -> Result<f64, RosterError> {
        let id = self.person_id(name)?;
        Ok(self.person(id).totals()?.non_sunday)
    }

    /// Total person-hours the shifts ask for.
    pub fn required_person_hours(&self) -> f64 {
        self.shifts
            .iter()
            .map(|s| s.hours() * f64::from(s.persons_required()))
            .sum()
    }

    pub fn required_bonus_hours(&self) -> f64 {
        self.shifts
            .iter()
            .map(|s| s.bonus_hours() * f64::from(s.persons_required()))
            .sum()
    }

    pub fn required_seats(&self) -> u32 {
        self.shifts.iter().map(|s| s.persons_required()).sum()
    }

    /// Number of people who marked the shift available.
    pub fn available_count(&self, shift: ShiftId) -> usize {
        self.people.iter().filter(|p| p.is_available(shift)).count()
    }
}

/// Sheet convention: `j`/`J` (ja) or `x`/`X` marks an available cell.
pub fn is_available_mark(cell: &str) -> bool {
    matches!(cell.trim(), "j" | "J" | "x" | "X")
}
