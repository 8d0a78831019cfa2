use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Usage count at which a vehicle is close to its annual limit.
pub const WARNING_THRESHOLD: u32 = 90;

/// Usage count at which a vehicle has reached its annual limit.
pub const LIMIT_THRESHOLD: u32 = 96;

/// One calendar day on which a vehicle was used.
///
/// `user_name` is a snapshot of the user's name when the day was logged;
/// renaming a user does not rewrite past entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageDay {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

impl UsageDay {
    pub fn new(
        vehicle_id: Uuid,
        user_id: Uuid,
        date: impl CalendarDate,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_id,
            user_id,
            date: date.calendar_date(),
            user_name: user_name.into(),
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for UsageDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.date, self.user_name)
    }
}

/// Anything that can be reduced to a calendar day.
///
/// Time of day is discarded, so two instants on the same day map to the same
/// date. Timezone-aware values use the date in their own timezone.
pub trait CalendarDate {
    fn calendar_date(&self) -> NaiveDate;
}

impl CalendarDate for NaiveDate {
    fn calendar_date(&self) -> NaiveDate {
        *self
    }
}

impl CalendarDate for NaiveDateTime {
    fn calendar_date(&self) -> NaiveDate {
        self.date()
    }
}

impl<Tz: TimeZone> CalendarDate for DateTime<Tz> {
    fn calendar_date(&self) -> NaiveDate {
        self.date_naive()
    }
}

/// Where a usage count stands relative to the annual limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageStatus {
    Normal,
    Warning,
    Critical,
}

impl UsageStatus {
    pub fn from_count(count: u32) -> Self {
        if count >= LIMIT_THRESHOLD {
            UsageStatus::Critical
        } else if count >= WARNING_THRESHOLD {
            UsageStatus::Warning
        } else {
            UsageStatus::Normal
        }
    }

    /// Short notice to show next to the counter, if any.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            UsageStatus::Normal => None,
            UsageStatus::Warning => Some("Approaching the annual usage limit"),
            UsageStatus::Critical => Some("Annual usage limit reached"),
        }
    }
}

impl fmt::Display for UsageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageStatus::Normal => write!(f, "normal"),
            UsageStatus::Warning => write!(f, "warning"),
            UsageStatus::Critical => write!(f, "critical"),
        }
    }
}
