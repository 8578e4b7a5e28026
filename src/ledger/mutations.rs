use serde::Serialize;

use super::model::{IntakeRecord, LogKind, UserLedger};

/// Which logs an edit or delete actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogTouch {
    pub daily: bool,
    pub weekly: bool,
    pub food: bool,
}

impl LogTouch {
    fn mark(&mut self, kind: LogKind) {
        match kind {
            LogKind::Daily => self.daily = true,
            LogKind::Weekly => self.weekly = true,
            LogKind::Food => self.food = true,
        }
    }

    pub fn any(&self) -> bool {
        self.daily || self.weekly || self.food
    }
}

impl UserLedger {
    /// Fans the record out to the food, weekly and daily logs.
    pub fn append(&mut self, record: IntakeRecord) {
        self.food_intakes.push(record.clone());
        self.weekly_intake.push(record.clone());
        self.daily_intakes.push(record);
    }

    /// Replaces `portion` on every record matching `confirm_time`, in place.
    pub fn edit_portion(&mut self, confirm_time: i64, portion: f64) -> LogTouch {
        let mut touched = LogTouch::default();
        for kind in LogKind::ALL {
            for record in self.log_mut(kind).iter_mut() {
                if record.confirm_time == confirm_time {
                    record.portion = portion;
                    touched.mark(kind);
                }
            }
        }
        touched
    }

    /// Removes the first match from each log independently.
    pub fn delete_by_correlation(&mut self, confirm_time: i64) -> LogTouch {
        let mut touched = LogTouch::default();
        for kind in LogKind::ALL {
            let log = self.log_mut(kind);
            if let Some(idx) = log.iter().position(|r| r.confirm_time == confirm_time) {
                log.remove(idx);
                touched.mark(kind);
            }
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::model::fixtures::{ledger, record};

    #[test]
    fn append_fans_out_to_all_logs() {
        let mut l = ledger();
        l.append(record("apple", 52.0, 10, 1.5));
        for kind in LogKind::ALL {
            let log = l.log(kind);
            assert_eq!(log.len(), 1);
            assert_eq!(log[0], record("apple", 52.0, 10, 1.5));
        }
    }

    #[test]
    fn edit_portion_touches_only_matching_records() {
        let mut l = ledger();
        l.append(record("apple", 52.0, 10, 1.0));
        l.append(record("rice", 130.0, 20, 1.0));
        l.append(record("egg", 155.0, 30, 1.0));

        let touched = l.edit_portion(20, 2.5);
        assert_eq!(
            touched,
            LogTouch {
                daily: true,
                weekly: true,
                food: true
            }
        );
        for kind in LogKind::ALL {
            let log = l.log(kind);
            assert_eq!(log[1].portion, 2.5);
            assert_eq!(log[1].food_name, "rice");
            assert_eq!(log[1].calories, 130.0);
            assert_eq!(log[0].portion, 1.0);
            assert_eq!(log[2].portion, 1.0);
        }
    }

    #[test]
    fn edit_portion_skips_logs_that_no_longer_hold_the_record() {
        let mut l = ledger();
        l.append(record("apple", 52.0, 10, 1.0));
        l.daily_intakes.clear();

        let touched = l.edit_portion(10, 3.0);
        assert!(!touched.daily);
        assert!(touched.weekly && touched.food);
        assert_eq!(l.food_intakes[0].portion, 3.0);
    }

    #[test]
    fn delete_is_independent_per_log_and_idempotent() {
        let mut l = ledger();
        l.append(record("apple", 52.0, 10, 1.0));
        l.append(record("rice", 130.0, 20, 1.0));
        // evicted by a daily reset
        l.daily_intakes.clear();
        l.daily_intakes.push(record("rice", 130.0, 20, 1.0));

        let touched = l.delete_by_correlation(10);
        assert_eq!(
            touched,
            LogTouch {
                daily: false,
                weekly: true,
                food: true
            }
        );
        assert_eq!(l.daily_intakes.len(), 1);
        assert_eq!(l.daily_intakes[0].confirm_time, 20);

        let again = l.delete_by_correlation(10);
        assert!(!again.any());
        assert_eq!(l.food_intakes.len(), 1);
    }

    #[test]
    fn delete_removes_only_the_first_duplicate() {
        let mut l = ledger();
        l.food_intakes.push(record("apple", 52.0, 10, 1.0));
        l.food_intakes.push(record("apple copy", 52.0, 10, 1.0));
        l.delete_by_correlation(10);
        assert_eq!(l.food_intakes.len(), 1);
        assert_eq!(l.food_intakes[0].food_name, "apple copy");
    }
}
