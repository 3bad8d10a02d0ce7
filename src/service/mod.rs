//! External collaborators: the extraction model and the calendar/task account.
//!
//! Each has a live and a demo implementation behind an object-safe trait. The
//! choice is made once, in [`crate::context::Context::from_config`].

pub mod demo;
pub mod gemini;
pub mod google;
pub mod keyring;
pub mod oauth;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::analysis::AnalysisResult;
use crate::core::destination::{Calendar, TaskList};
use crate::core::event::ExtractedEvent;
use crate::core::task::ExtractedTask;
use crate::error::AppError;

/// The signed-in user, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// How account initialization resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    SignedIn(UserProfile),
    SignedOut,
    ConfigError(String),
}

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract events and tasks from non-empty text.
    async fn analyze(&self, text: &str) -> Result<AnalysisResult, AppError>;
}

#[async_trait]
pub trait Account: Send + Sync {
    /// Restore any existing session. Called once, before anything else.
    async fn initialize(&self) -> AuthOutcome;

    async fn sign_in(&self) -> Result<UserProfile, AppError>;

    async fn sign_out(&self) -> Result<(), AppError>;

    async fn list_calendars(&self) -> Result<Vec<Calendar>, AppError>;

    async fn list_task_lists(&self) -> Result<Vec<TaskList>, AppError>;

    async fn create_event(&self, event: &ExtractedEvent, calendar_id: &str) -> Result<(), AppError>;

    async fn create_task(&self, task: &ExtractedTask, task_list_id: &str) -> Result<(), AppError>;
}
