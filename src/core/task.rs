use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::category::TaskCategory;
use crate::fl;

/// A to-do item proposed by the extraction service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTask {
    pub id: String,
    pub title: String,
    pub due_date: Option<String>,
    #[serde(default)]
    pub category: TaskCategory,
}

impl ExtractedTask {
    /// Date part of the due date. Full timestamps are truncated to their date so
    /// a UTC midnight never shifts to the previous day.
    pub fn due(&self) -> Option<NaiveDate> {
        let raw = self.due_date.as_deref()?.trim();
        let date_part = raw.split('T').next().unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }

    pub fn format_due(&self) -> String {
        if self.due_date.is_none() {
            return fl!("task-no-due-date");
        }
        match self.due() {
            Some(d) => d.format("%B %-d, %Y").to_string(),
            None => fl!("date-invalid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(due: Option<&str>) -> ExtractedTask {
        ExtractedTask {
            id: "tsk-1-0".into(),
            title: "Buy milk".into(),
            due_date: due.map(String::from),
            category: TaskCategory::HomeFamily,
        }
    }

    #[test]
    fn due_takes_date_part() {
        let expected = NaiveDate::from_ymd_opt(2026, 5, 1);
        assert_eq!(task(Some("2026-05-01")).due(), expected);
        assert_eq!(task(Some("2026-05-01T00:00:00.000Z")).due(), expected);
        assert_eq!(task(Some("May 1st")).due(), None);
        assert_eq!(task(None).due(), None);
    }

    #[test]
    fn format_due_messages() {
        assert_eq!(task(Some("2026-05-01")).format_due(), "May 1, 2026");
        assert_eq!(task(None).format_due(), "No due date");
        assert_eq!(task(Some("whenever")).format_due(), "Invalid date");
    }
}
