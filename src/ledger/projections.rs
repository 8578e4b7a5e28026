use serde::Serialize;
use time::{Date, OffsetDateTime, UtcOffset};

use super::model::UserLedger;

const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatedEntry {
    pub food_name: String,
    pub calories: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAggregate {
    pub carbohydrates: f64,
    pub protein: f64,
    pub fat: f64,
    /// Index 0 is Sunday.
    pub calories_by_weekday: [f64; 7],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodaySummary {
    pub total_calories: f64,
    pub calorie_goal: i32,
}

/// Sum of `calories * portion` over the daily log.
pub fn today_total(ledger: &UserLedger) -> f64 {
    ledger
        .daily_intakes
        .iter()
        .map(|r| r.weighted_calories())
        .sum()
}

/// Food-log records confirmed on `date` in the reference offset, in stored order.
/// Weighted calories are truncated toward zero.
pub fn by_date(ledger: &UserLedger, date: Date, offset: UtcOffset) -> Vec<DatedEntry> {
    let start = start_of_day_ms(date, offset);
    let end = start + DAY_MS;
    ledger
        .food_intakes
        .iter()
        .filter(|r| (start..end).contains(&r.confirm_time))
        .map(|r| DatedEntry {
            food_name: r.food_name.clone(),
            calories: r.weighted_calories().trunc() as i64,
        })
        .collect()
}

pub fn weekly_aggregate(ledger: &UserLedger, offset: UtcOffset) -> WeeklyAggregate {
    let mut agg = WeeklyAggregate {
        carbohydrates: 0.0,
        protein: 0.0,
        fat: 0.0,
        calories_by_weekday: [0.0; 7],
    };
    for r in &ledger.weekly_intake {
        agg.carbohydrates += r.carbohydrates * r.portion;
        agg.protein += r.protein * r.portion;
        agg.fat += r.fat * r.portion;
        if let Some(day) = weekday_index(r.confirm_time, offset) {
            agg.calories_by_weekday[day] += r.weighted_calories();
        }
    }
    agg
}

pub fn start_of_day_ms(date: Date, offset: UtcOffset) -> i64 {
    date.midnight().assume_offset(offset).unix_timestamp() * 1000
}

fn weekday_index(confirm_time: i64, offset: UtcOffset) -> Option<usize> {
    let at = OffsetDateTime::from_unix_timestamp_nanos(i128::from(confirm_time) * 1_000_000).ok()?;
    Some(usize::from(at.to_offset(offset).weekday().number_days_from_sunday()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::model::fixtures::{ledger, record};
    use time::macros::{date, datetime, offset};

    const KL: UtcOffset = offset!(+8);

    fn ms(at: OffsetDateTime) -> i64 {
        at.unix_timestamp() * 1000
    }

    #[test]
    fn today_weights_by_portion() {
        let mut l = ledger();
        l.daily_intakes.push(record("a", 200.0, 1, 1.5));
        l.daily_intakes.push(record("b", 100.0, 2, 2.0));
        assert_eq!(today_total(&l), 500.0);
    }

    #[test]
    fn today_of_empty_log_is_zero() {
        assert_eq!(today_total(&ledger()), 0.0);
    }

    #[test]
    fn by_date_uses_half_open_local_day() {
        let mut l = ledger();
        let midnight = ms(datetime!(2024-03-06 0:00 +8));
        l.food_intakes.push(record("late snack", 100.0, midnight - 1, 1.0));
        l.food_intakes.push(record("breakfast", 250.0, midnight, 1.0));
        l.food_intakes.push(record("dinner", 333.0, midnight + DAY_MS - 1, 1.5));
        l.food_intakes.push(record("next day", 90.0, midnight + DAY_MS, 1.0));

        let entries = by_date(&l, date!(2024 - 03 - 06), KL);
        assert_eq!(
            entries,
            vec![
                DatedEntry {
                    food_name: "breakfast".into(),
                    calories: 250
                },
                DatedEntry {
                    food_name: "dinner".into(),
                    calories: 499
                },
            ]
        );
    }

    #[test]
    fn by_date_truncates_weighted_calories() {
        let mut l = ledger();
        let noon = ms(datetime!(2024-03-06 12:00 +8));
        l.food_intakes.push(record("chicken breast", 165.0, noon, 1.5));
        l.food_intakes.push(record("teh tarik", 155.0, noon + 1, 0.99));
        let calories: Vec<_> = by_date(&l, date!(2024 - 03 - 06), KL)
            .into_iter()
            .map(|e| e.calories)
            .collect();
        assert_eq!(calories, vec![247, 153]);
    }

    #[test]
    fn by_date_keeps_insertion_order() {
        let mut l = ledger();
        let noon = ms(datetime!(2024-03-06 12:00 +8));
        l.food_intakes.push(record("second", 1.0, noon + 10, 1.0));
        l.food_intakes.push(record("first", 1.0, noon, 1.0));
        let names: Vec<_> = by_date(&l, date!(2024 - 03 - 06), KL)
            .into_iter()
            .map(|e| e.food_name)
            .collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn weekly_buckets_by_local_weekday() {
        let mut l = ledger();
        // 2024-03-06 is a Wednesday
        l.weekly_intake.push(record("a", 60.0, ms(datetime!(2024-03-06 9:00 +8)), 2.0));
        l.weekly_intake.push(record("b", 80.0, ms(datetime!(2024-03-06 20:00 +8)), 1.0));

        let agg = weekly_aggregate(&l, KL);
        assert_eq!(agg.calories_by_weekday, [0.0, 0.0, 0.0, 200.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn weekly_bucket_follows_reference_offset_not_utc() {
        let mut l = ledger();
        // Tuesday 20:00 UTC is Wednesday 04:00 in +08:00
        l.weekly_intake.push(record("a", 100.0, ms(datetime!(2024-03-05 20:00 UTC)), 1.0));
        let agg = weekly_aggregate(&l, KL);
        assert_eq!(agg.calories_by_weekday[3], 100.0);
        assert_eq!(agg.calories_by_weekday[2], 0.0);
    }

    #[test]
    fn weekly_macros_are_portion_weighted() {
        let mut l = ledger();
        // fixture macros: fat 1, carbs 2, protein 3
        l.weekly_intake.push(record("a", 10.0, 0, 2.0));
        l.weekly_intake.push(record("b", 10.0, 0, 0.5));
        let agg = weekly_aggregate(&l, KL);
        assert_eq!(agg.fat, 2.5);
        assert_eq!(agg.carbohydrates, 5.0);
        assert_eq!(agg.protein, 7.5);
    }
}
