// Dashboard date strings into instants
use crate::application::collaborators::DateParser;
use crate::error::{DatasourceError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

#[derive(Debug, Clone, Copy)]
enum Sign {
    Minus,
    Plus,
}

/// Understands `now`, `now-<n><unit>` and `now+<n><unit>` (units `s m h d w M y`),
/// RFC 3339, `YYYY-MM-DD[ HH:MM:SS]` (UTC) and integer epoch milliseconds.
#[derive(Debug, Clone, Default)]
pub struct RelativeDateParser {
    fixed_now: Option<DateTime<Utc>>,
}

impl RelativeDateParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `now`, for reproducible ranges.
    pub fn with_now(now: DateTime<Utc>) -> Self {
        Self {
            fixed_now: Some(now),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.fixed_now.unwrap_or_else(Utc::now)
    }

    fn parse_relative(&self, text: &str, offset: &str) -> Result<DateTime<Utc>> {
        let (sign, rest) = match offset.chars().next() {
            Some('-') => (Sign::Minus, &offset[1..]),
            Some('+') => (Sign::Plus, &offset[1..]),
            _ => return Err(DatasourceError::invalid_date(text, "expected now-<n><unit>")),
        };

        let Some(unit) = rest.chars().last() else {
            return Err(DatasourceError::invalid_date(text, "missing offset"));
        };
        let amount: i64 = rest[..rest.len() - unit.len_utf8()]
            .parse()
            .map_err(|_| DatasourceError::invalid_date(text, "offset is not a number"))?;

        let span = match unit {
            's' => Duration::try_seconds(amount),
            'm' => Duration::try_minutes(amount),
            'h' => Duration::try_hours(amount),
            'd' => Duration::try_days(amount),
            'w' => Duration::try_weeks(amount),
            'M' => amount.checked_mul(30).and_then(Duration::try_days),
            'y' => amount.checked_mul(365).and_then(Duration::try_days),
            other => {
                return Err(DatasourceError::invalid_date(
                    text,
                    format!("unknown unit {:?}", other),
                ));
            }
        };

        let now = self.now();
        span.and_then(|span| match sign {
            Sign::Minus => now.checked_sub_signed(span),
            Sign::Plus => now.checked_add_signed(span),
        })
        .ok_or_else(|| DatasourceError::invalid_date(text, "offset out of range"))
    }
}

impl DateParser for RelativeDateParser {
    fn parse_instant(&self, text: &str) -> Result<DateTime<Utc>> {
        let text = text.trim();

        if text == "now" {
            return Ok(self.now());
        }
        if let Some(offset) = text.strip_prefix("now") {
            return self.parse_relative(text, offset);
        }
        if let Ok(ms) = text.parse::<i64>() {
            return DateTime::<Utc>::from_timestamp_millis(ms)
                .ok_or_else(|| DatasourceError::invalid_date(text, "timestamp out of range"));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
            return Ok(dt.and_utc());
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc());
        }

        Err(DatasourceError::invalid_date(text, "unrecognised date format"))
    }
}
