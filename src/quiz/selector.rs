use chrono::{Datelike, NaiveDate, Utc};
use log::debug;

use super::question::{Question, QuestionPool};
use crate::error::{Error, Result};

pub const LCG_MULTIPLIER: u64 = 9301;
pub const LCG_INCREMENT: u64 = 49297;
pub const LCG_MODULUS: u64 = 233280;

/// Default number of questions per day.
pub const DAILY_QUESTION_COUNT: usize = 5;

/// Linear congruential generator shared with every other client of the daily
/// quiz. Changing any constant changes every day's selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Advance and return the new state.
    pub fn next_value(&mut self) -> u64 {
        self.state = (self.state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
        self.state
    }
}

/// Digits of the date read as one integer: 2024-06-01 becomes 20240601.
pub fn date_seed(date: NaiveDate) -> u64 {
    u64::from(date.year().unsigned_abs()) * 10_000
        + u64::from(date.month()) * 100
        + u64::from(date.day())
}

pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_day_key(key: &str) -> Result<NaiveDate> {
    let trimmed = key.trim();
    if trimmed.len() != 10 {
        return Err(Error::InvalidDay(key.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| Error::InvalidDay(key.to_string()))
}

pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Shuffle `items` in place with the date-seeded generator, walking from the
/// last index down to 1.
pub fn shuffle_for_day<T>(items: &mut [T], date: NaiveDate) {
    let mut lcg = Lcg::new(date_seed(date));
    for i in (1..items.len()).rev() {
        let j = (lcg.next_value() % (i as u64 + 1)) as usize;
        items.swap(i, j);
    }
}

/// The first `count` items of the day's shuffle. Asking for more than the
/// pool holds returns the whole shuffled pool.
pub fn select_daily<T: Clone>(pool: &[T], date: NaiveDate, count: usize) -> Vec<T> {
    let mut shuffled = pool.to_vec();
    shuffle_for_day(&mut shuffled, date);
    shuffled.truncate(count);
    debug!(
        "daily selection for {}: seed {}, {} of {} items",
        day_key(date),
        date_seed(date),
        shuffled.len(),
        pool.len()
    );
    shuffled
}

/// Strategy for picking the questions of an attempt.
pub trait QuestionSelector {
    fn select_questions(&self, pool: &QuestionPool, count: usize) -> Vec<Question>;
}

/// Same questions, same order, for everyone on a given UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySelector {
    pub date: NaiveDate,
}

impl DailySelector {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn today() -> Self {
        Self::new(today_utc())
    }
}

impl QuestionSelector for DailySelector {
    fn select_questions(&self, pool: &QuestionPool, count: usize) -> Vec<Question> {
        select_daily(pool.as_slice(), self.date, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(key: &str) -> NaiveDate {
        parse_day_key(key).unwrap()
    }

    fn ids() -> Vec<u32> {
        (1..=10).collect()
    }

    #[test]
    fn seed_is_the_concatenated_digits() {
        assert_eq!(date_seed(date("2024-06-01")), 20240601);
        assert_eq!(date_seed(date("1999-12-31")), 19991231);
    }

    #[test]
    fn lcg_matches_reference_sequence() {
        let mut lcg = Lcg::new(20240601);
        assert_eq!(lcg.next_value(), 219358);
        assert_eq!(lcg.next_value(), 31175);
        assert_eq!(lcg.next_value(), 40932);
    }

    #[test]
    fn known_days_select_known_ids() {
        assert_eq!(select_daily(&ids(), date("2024-06-01"), 5), vec![2, 8, 6, 1, 4]);
        assert_eq!(select_daily(&ids(), date("2024-06-02"), 5), vec![3, 9, 1, 8, 5]);
        assert_eq!(select_daily(&ids(), date("2025-01-15"), 5), vec![2, 4, 6, 5, 10]);
    }

    #[test]
    fn oversized_count_returns_whole_shuffle() {
        let all = select_daily(&ids(), date("2024-06-01"), 50);
        assert_eq!(all, vec![2, 8, 6, 1, 4, 3, 7, 5, 10, 9]);
    }

    #[test]
    fn tiny_pools() {
        let empty: Vec<u32> = Vec::new();
        assert!(select_daily(&empty, date("2024-06-01"), 5).is_empty());
        assert_eq!(select_daily(&[7], date("2024-06-01"), 5), vec![7]);
        assert_eq!(select_daily(&[1, 2], date("2024-06-01"), 5), vec![2, 1]);
        assert_eq!(select_daily(&[1, 2, 3], date("2024-06-01"), 3), vec![1, 3, 2]);
    }

    #[test]
    fn zero_count_is_empty() {
        assert!(select_daily(&ids(), date("2024-06-01"), 0).is_empty());
    }

    #[test]
    fn day_key_round_trips_through_parse() {
        let d = date("2026-10-16");
        assert_eq!(day_key(d), "2026-10-16");
    }

    #[test]
    fn parse_rejects_other_formats() {
        for bad in ["2024/06/01", "20240601", "2024-6-1", "2024-13-01", "tomorrow", ""] {
            assert!(parse_day_key(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn daily_selector_draws_from_pool() {
        let pool = QuestionPool::builtin().unwrap();
        let picked = DailySelector::new(date("2024-06-01")).select_questions(&pool, 5);
        let picked_ids: Vec<u32> = picked.iter().map(|q| q.id).collect();
        assert_eq!(picked_ids, vec![2, 8, 6, 1, 4]);
    }
}
