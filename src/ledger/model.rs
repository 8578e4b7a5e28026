use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// One confirmed food-consumption event. Nutrient amounts are per 100 g,
/// `portion` multiplies them at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeRecord {
    pub food_name: String,
    pub calories: f64,
    pub fat: f64,
    pub carbohydrates: f64,
    pub protein: f64,
    /// Milliseconds since epoch; the correlation key across the three logs.
    pub confirm_time: i64,
    pub portion: f64,
}

impl IntakeRecord {
    pub fn weighted_calories(&self) -> f64 {
        self.calories * self.portion
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.food_name.trim().is_empty() {
            return Err(AppError::validation("food name is required"));
        }
        for (name, value) in [
            ("calories", self.calories),
            ("fat", self.fat),
            ("carbohydrates", self.carbohydrates),
            ("protein", self.protein),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::validation(format!("{name} must be a non-negative number")));
            }
        }
        validate_portion(self.portion)
    }
}

pub fn validate_portion(portion: f64) -> Result<(), AppError> {
    if portion.is_finite() && portion > 0.0 {
        Ok(())
    } else {
        Err(AppError::validation("portion must be greater than zero"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Woman,
    Man,
}

impl Gender {
    pub fn default_calorie_goal(self) -> i32 {
        match self {
            Gender::Woman => 2000,
            Gender::Man => 2700,
        }
    }
}

/// The three logs every confirmed intake is fanned out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Daily,
    Weekly,
    Food,
}

impl LogKind {
    pub const ALL: [LogKind; 3] = [LogKind::Daily, LogKind::Weekly, LogKind::Food];

    /// Child key of the log inside the stored ledger document.
    pub fn document_key(self) -> &'static str {
        match self {
            LogKind::Daily => "dailyIntakes",
            LogKind::Weekly => "weeklyIntake",
            LogKind::Food => "foodIntakes",
        }
    }
}

/// Per-user ledger document, stored whole under the user's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLedger {
    pub id: Uuid,
    pub username: String,
    pub gender: Gender,
    pub user_calorie_goal: i32,
    /// Durable history, never reset.
    #[serde(default)]
    pub food_intakes: Vec<IntakeRecord>,
    #[serde(default)]
    pub weekly_intake: Vec<IntakeRecord>,
    #[serde(default)]
    pub daily_intakes: Vec<IntakeRecord>,
}

impl UserLedger {
    pub fn new(id: Uuid, username: impl Into<String>, gender: Gender) -> Self {
        Self {
            id,
            username: username.into(),
            gender,
            user_calorie_goal: gender.default_calorie_goal(),
            food_intakes: Vec::new(),
            weekly_intake: Vec::new(),
            daily_intakes: Vec::new(),
        }
    }

    pub fn log(&self, kind: LogKind) -> &[IntakeRecord] {
        match kind {
            LogKind::Daily => &self.daily_intakes,
            LogKind::Weekly => &self.weekly_intake,
            LogKind::Food => &self.food_intakes,
        }
    }

    pub fn log_mut(&mut self, kind: LogKind) -> &mut Vec<IntakeRecord> {
        match kind {
            LogKind::Daily => &mut self.daily_intakes,
            LogKind::Weekly => &mut self.weekly_intake,
            LogKind::Food => &mut self.food_intakes,
        }
    }

    pub fn contains(&self, confirm_time: i64) -> bool {
        LogKind::ALL
            .iter()
            .any(|kind| self.log(*kind).iter().any(|r| r.confirm_time == confirm_time))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn record(name: &str, calories: f64, confirm_time: i64, portion: f64) -> IntakeRecord {
        IntakeRecord {
            food_name: name.into(),
            calories,
            fat: 1.0,
            carbohydrates: 2.0,
            protein: 3.0,
            confirm_time,
            portion,
        }
    }

    pub fn ledger() -> UserLedger {
        UserLedger::new(Uuid::new_v4(), "eater@example.com", Gender::Woman)
    }
}
