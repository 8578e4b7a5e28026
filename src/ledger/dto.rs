use serde::Deserialize;
use time::{macros::format_description, Date};

use super::service::NewIntake;
use crate::error::AppError;

fn default_portion() -> f64 {
    1.0
}

/// Request body for a manually entered intake.
#[derive(Debug, Deserialize)]
pub struct NewIntakeRequest {
    pub food_name: String,
    pub calories: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub carbohydrates: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default = "default_portion")]
    pub portion: f64,
}

impl From<NewIntakeRequest> for NewIntake {
    fn from(r: NewIntakeRequest) -> Self {
        Self {
            food_name: r.food_name,
            calories: r.calories,
            fat: r.fat,
            carbohydrates: r.carbohydrates,
            protein: r.protein,
            portion: r.portion,
        }
    }
}

/// Request body for an intake whose nutrients come from the food database.
#[derive(Debug, Deserialize)]
pub struct LookupIntakeRequest {
    pub fdc_id: u64,
    pub food_name: String,
    pub portion: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct EditPortionRequest {
    pub portion: f64,
}

#[derive(Debug, Deserialize)]
pub struct ByDateQuery {
    pub date: String,
}

impl ByDateQuery {
    /// `YYYY-MM-DD`.
    pub fn parse(&self) -> Result<Date, AppError> {
        let format = format_description!("[year]-[month]-[day]");
        Date::parse(self.date.trim(), format)
            .map_err(|_| AppError::validation(format!("date must be YYYY-MM-DD, got {}", self.date)))
    }
}

#[derive(Debug, Deserialize)]
pub struct GoalRequest {
    pub calorie_goal: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn portion_defaults_to_one() {
        let r: NewIntakeRequest =
            serde_json::from_str(r#"{"food_name":"nasi lemak","calories":644}"#).unwrap();
        assert_eq!(r.portion, 1.0);
        assert_eq!(r.fat, 0.0);
    }

    #[test]
    fn by_date_query_parses_iso_dates() {
        let q = ByDateQuery {
            date: "2024-03-06".into(),
        };
        assert_eq!(q.parse().unwrap(), date!(2024-03-06));
        let bad = ByDateQuery {
            date: "06/03/2024".into(),
        };
        assert!(matches!(bad.parse(), Err(AppError::Validation(_))));
    }
}
