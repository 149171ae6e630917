//! crates/roster_core/src/dates.rs
//!
//! Expands a term's date range into the roster's "attended on" dates.

use chrono::{Duration, NaiveDate};

use crate::domain::{Frequency, SchoolTerm};

/// A lazy sequence of dates from `start` up to and including `end`, spaced
/// `step_days` apart.
///
/// The iterator is `Clone`, so a sequence can be replayed from the start by
/// cloning it before consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermDates {
    next: Option<NaiveDate>,
    end: NaiveDate,
    step: Duration,
}

impl TermDates {
    pub fn with_step(start: NaiveDate, end: NaiveDate, step_days: i64) -> Self {
        let step = Duration::days(step_days.max(1));
        let next = (start <= end).then_some(start);
        Self { next, end, step }
    }
}

impl Iterator for TermDates {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        self.next = current
            .checked_add_signed(self.step)
            .filter(|d| *d <= self.end);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            None => (0, Some(0)),
            Some(current) => {
                let remaining = (self.end - current).num_days() / self.step.num_days() + 1;
                let remaining = remaining as usize;
                (remaining, Some(remaining))
            }
        }
    }
}

impl ExactSizeIterator for TermDates {}

impl std::iter::FusedIterator for TermDates {}

/// Weekly dates from `start` (keeping its weekday) through `end`.
pub fn dates_for_term(start: NaiveDate, end: NaiveDate) -> TermDates {
    TermDates::with_step(start, end, 7)
}

/// The dates a pair meeting at `frequency` is expected to attend in `term`.
pub fn expected_session_dates(term: &SchoolTerm, frequency: Frequency) -> TermDates {
    TermDates::with_step(term.start_date, term.end_date, frequency.in_days())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn term_four_yields_ten_mondays() {
        let dates: Vec<_> = dates_for_term(date(2024, 10, 7), date(2024, 12, 12)).collect();
        assert_eq!(dates.len(), 10);
        assert_eq!(dates.first(), Some(&date(2024, 10, 7)));
        assert_eq!(dates.last(), Some(&date(2024, 12, 9)));
        assert!(dates.iter().all(|d| *d <= date(2024, 12, 12)));
        assert!(dates.windows(2).all(|w| (w[1] - w[0]).num_days() == 7));
    }

    #[test]
    fn inverted_range_is_empty() {
        let mut dates = dates_for_term(date(2024, 12, 12), date(2024, 10, 7));
        assert_eq!(dates.len(), 0);
        assert_eq!(dates.next(), None);
    }

    #[test]
    fn single_day_range_yields_that_day() {
        let dates: Vec<_> = dates_for_term(date(2024, 2, 1), date(2024, 2, 1)).collect();
        assert_eq!(dates, vec![date(2024, 2, 1)]);
    }

    #[test]
    fn end_date_is_inclusive() {
        let dates: Vec<_> = dates_for_term(date(2024, 1, 1), date(2024, 1, 15)).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 8), date(2024, 1, 15)]);
    }

    #[test]
    fn sequence_is_restartable() {
        let dates = dates_for_term(date(2024, 7, 15), date(2024, 9, 20));
        let first: Vec<_> = dates.clone().collect();
        let second: Vec<_> = dates.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn size_hint_matches_count() {
        let dates = dates_for_term(date(2024, 4, 29), date(2024, 6, 28));
        let hinted = dates.len();
        assert_eq!(hinted, dates.count());
    }

    #[test]
    fn fortnightly_assignments_skip_alternate_weeks() {
        let term = SchoolTerm {
            id: Uuid::new_v4(),
            year: 2024,
            name: "Term 4".to_string(),
            start_date: date(2024, 10, 7),
            end_date: date(2024, 12, 12),
        };
        let dates: Vec<_> = expected_session_dates(&term, Frequency::Fortnightly).collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 10, 7),
                date(2024, 10, 21),
                date(2024, 11, 4),
                date(2024, 11, 18),
                date(2024, 12, 2),
            ]
        );
        assert_eq!(expected_session_dates(&term, Frequency::Weekly).count(), 10);
    }
}
