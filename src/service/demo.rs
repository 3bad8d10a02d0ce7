//! Offline stand-ins used when no credentials are configured.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};

use super::{Account, AuthOutcome, Extractor, UserProfile};
use crate::core::analysis::{AnalysisResult, EventDraft, TaskDraft};
use crate::core::category::{EventCategory, TaskCategory};
use crate::core::destination::{Calendar, TaskList};
use crate::core::event::ExtractedEvent;
use crate::core::task::ExtractedTask;
use crate::error::{AppError, ExtractionError};

const EXTRACTION_LATENCY: Duration = Duration::from_millis(1500);
const ACCOUNT_LATENCY: Duration = Duration::from_millis(500);
const WRITE_LATENCY: Duration = Duration::from_millis(800);

/// Returns the same two events and two tasks for any input, dated relative to now.
pub struct DemoExtractor {
    latency: Duration,
}

impl Default for DemoExtractor {
    fn default() -> Self {
        Self {
            latency: EXTRACTION_LATENCY,
        }
    }
}

impl DemoExtractor {
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

pub fn sample_result(stamp: i64) -> AnalysisResult {
    let now = Utc::now();
    let iso = |offset: chrono::Duration| {
        (now + offset).to_rfc3339_opts(SecondsFormat::Millis, true)
    };

    let events = vec![
        EventDraft {
            title: "Meeting with Danny".to_string(),
            start_time: Some(iso(chrono::Duration::days(2))),
            end_time: Some(iso(chrono::Duration::days(2) + chrono::Duration::hours(1))),
            description: Some("Talk about the new project".to_string()),
            location: Some("Downtown cafe".to_string()),
            category: Some(EventCategory::PublicFramework),
        },
        EventDraft {
            title: "Kid's football practice".to_string(),
            start_time: Some(iso(chrono::Duration::days(3))),
            end_time: Some(iso(chrono::Duration::days(3) + chrono::Duration::minutes(90))),
            description: None,
            location: Some("City field".to_string()),
            category: Some(EventCategory::Family),
        },
    ];
    let tasks = vec![
        TaskDraft {
            title: "Prepare the presentation".to_string(),
            due_date: Some((now + chrono::Duration::days(1)).format("%Y-%m-%d").to_string()),
            category: Some(TaskCategory::ProjectDayHospital),
        },
        TaskDraft {
            title: "Buy milk".to_string(),
            due_date: None,
            category: Some(TaskCategory::HomeFamily),
        },
    ];
    AnalysisResult::from_drafts(events, tasks, stamp)
}

#[async_trait]
impl Extractor for DemoExtractor {
    async fn analyze(&self, text: &str) -> Result<AnalysisResult, AppError> {
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyInput.into());
        }
        log::info!("Demo mode: returning sample analysis");
        tokio::time::sleep(self.latency).await;
        Ok(sample_result(Utc::now().timestamp_millis()))
    }
}

/// A signed-in sample account whose writes always succeed.
pub struct DemoAccount {
    latency: Duration,
    write_latency: Duration,
}

impl Default for DemoAccount {
    fn default() -> Self {
        Self {
            latency: ACCOUNT_LATENCY,
            write_latency: WRITE_LATENCY,
        }
    }
}

impl DemoAccount {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            write_latency: latency,
        }
    }

    pub fn profile() -> UserProfile {
        UserProfile {
            name: "Demo User".to_string(),
            email: Some("demo@example.com".to_string()),
            picture: Some(
                "https://ui-avatars.com/api/?name=Demo+User&background=8e24aa&color=fff".to_string(),
            ),
        }
    }

    pub fn calendars() -> Vec<Calendar> {
        [
            ("personal@demo.com", "Personal", "#7986cb"),
            ("family_demo", "Family", "#33b679"),
            ("clinic_demo", "Clinic", "#d50000"),
            ("work_demo", "Work (public framework)", "#8e24aa"),
            ("study_demo", "Study group", "#e67c73"),
        ]
        .into_iter()
        .map(|(id, summary, color)| Calendar {
            id: id.to_string(),
            summary: summary.to_string(),
            background_color: Some(color.to_string()),
        })
        .collect()
    }

    pub fn task_lists() -> Vec<TaskList> {
        [
            ("personal_tasks", "Personal"),
            ("family_tasks", "Home & family"),
            ("clinic_tasks", "Clinic"),
            ("project_tasks", "Day hospital project"),
        ]
        .into_iter()
        .map(|(id, title)| TaskList {
            id: id.to_string(),
            title: title.to_string(),
        })
        .collect()
    }
}

#[async_trait]
impl Account for DemoAccount {
    async fn initialize(&self) -> AuthOutcome {
        log::info!("Demo mode: signing in sample user");
        tokio::time::sleep(self.latency).await;
        AuthOutcome::SignedIn(Self::profile())
    }

    async fn sign_in(&self) -> Result<UserProfile, AppError> {
        Ok(Self::profile())
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        log::info!("Demo mode: signing out");
        Ok(())
    }

    async fn list_calendars(&self) -> Result<Vec<Calendar>, AppError> {
        tokio::time::sleep(self.latency).await;
        Ok(Self::calendars())
    }

    async fn list_task_lists(&self) -> Result<Vec<TaskList>, AppError> {
        tokio::time::sleep(self.latency).await;
        Ok(Self::task_lists())
    }

    async fn create_event(&self, event: &ExtractedEvent, calendar_id: &str) -> Result<(), AppError> {
        log::info!("Demo mode: pretending to add event \"{}\" to {}", event.title, calendar_id);
        tokio::time::sleep(self.write_latency).await;
        Ok(())
    }

    async fn create_task(&self, task: &ExtractedTask, task_list_id: &str) -> Result<(), AppError> {
        if task_list_id.is_empty() {
            return Err(AppError::NoTaskList);
        }
        log::info!("Demo mode: pretending to add task \"{}\" to {}", task.title, task_list_id);
        tokio::time::sleep(self.write_latency).await;
        Ok(())
    }
}
