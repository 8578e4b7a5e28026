use std::{fmt, str::FromStr};

use time::{macros::format_description, Duration, OffsetDateTime, Time, UtcOffset, Weekday};

/// Wall-clock firing rule, evaluated in the ledger's reference offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Daily(Time),
    Weekly(Weekday, Time),
}

impl Trigger {
    /// First firing instant strictly after `now`.
    pub fn next_after(&self, now: OffsetDateTime, offset: UtcOffset) -> OffsetDateTime {
        let local = now.to_offset(offset);
        match *self {
            Trigger::Daily(at) => {
                let candidate = local.replace_time(at);
                if candidate <= local {
                    candidate + Duration::days(1)
                } else {
                    candidate
                }
            }
            Trigger::Weekly(day, at) => {
                let ahead = (i64::from(day.number_days_from_monday())
                    - i64::from(local.weekday().number_days_from_monday()))
                .rem_euclid(7);
                let candidate = local.replace_time(at) + Duration::days(ahead);
                if candidate <= local {
                    candidate + Duration::weeks(1)
                } else {
                    candidate
                }
            }
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Daily(at) => write!(f, "daily {:02}:{:02}", at.hour(), at.minute()),
            Trigger::Weekly(day, at) => {
                write!(f, "weekly {day} {:02}:{:02}", at.hour(), at.minute())
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("expected `HH:MM` or `DAY HH:MM`, got `{0}`")]
pub struct TriggerParseError(String);

impl FromStr for Trigger {
    type Err = TriggerParseError;

    /// `00:00` fires daily, `MON 12:00` fires weekly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TriggerParseError(s.to_string());
        let clock = format_description!("[hour]:[minute]");
        let mut parts = s.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(at), None, None) => Time::parse(at, &clock)
                .map(Trigger::Daily)
                .map_err(|_| err()),
            (Some(day), Some(at), None) => {
                let day = parse_weekday(day).ok_or_else(err)?;
                let at = Time::parse(at, &clock).map_err(|_| err())?;
                Ok(Trigger::Weekly(day, at))
            }
            _ => Err(err()),
        }
    }
}

fn parse_weekday(raw: &str) -> Option<Weekday> {
    let day = match raw.to_ascii_uppercase().as_str() {
        "MON" => Weekday::Monday,
        "TUE" => Weekday::Tuesday,
        "WED" => Weekday::Wednesday,
        "THU" => Weekday::Thursday,
        "FRI" => Weekday::Friday,
        "SAT" => Weekday::Saturday,
        "SUN" => Weekday::Sunday,
        _ => return None,
    };
    Some(day)
}
