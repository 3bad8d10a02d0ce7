use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::category::EventCategory;
use crate::fl;

/// A calendar event proposed by the extraction service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedEvent {
    pub id: String,
    pub title: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub category: EventCategory,
}

/// A timestamp as the extraction service wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    /// Carries an explicit UTC offset.
    Zoned(DateTime<chrono::FixedOffset>),
    /// Wall-clock time with no offset; interpreted in the configured zone.
    Floating(NaiveDateTime),
    /// Date only, i.e. an all-day event.
    AllDay(NaiveDate),
}

impl EventTime {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self::Zoned(dt));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Self::Floating(dt));
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Self::AllDay)
    }

    pub fn display(&self, tz: Tz) -> String {
        match self {
            Self::Zoned(dt) => dt.with_timezone(&tz).format("%B %-d, %Y %H:%M").to_string(),
            Self::Floating(dt) => dt.format("%B %-d, %Y %H:%M").to_string(),
            Self::AllDay(d) => d.format("%B %-d, %Y").to_string(),
        }
    }
}

impl ExtractedEvent {
    pub fn start(&self) -> Option<EventTime> {
        self.start_time.as_deref().and_then(EventTime::parse)
    }

    pub fn end(&self) -> Option<EventTime> {
        self.end_time.as_deref().and_then(EventTime::parse)
    }

    pub fn format_start(&self, tz: Tz) -> String {
        format_time(self.start_time.as_deref(), tz)
    }

    pub fn format_end(&self, tz: Tz) -> String {
        format_time(self.end_time.as_deref(), tz)
    }
}

fn format_time(value: Option<&str>, tz: Tz) -> String {
    match value {
        None => fl!("date-not-specified"),
        Some(s) => match EventTime::parse(s) {
            Some(t) => t.display(tz),
            None => fl!("date-invalid"),
        },
    }
}
