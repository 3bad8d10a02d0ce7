use crate::core::analysis::{AnalysisResult, ItemKind};
use crate::core::category::{EventCategory, TaskCategory};
use crate::core::destination::Destinations;
use crate::core::event::ExtractedEvent;
use crate::core::task::ExtractedTask;
use crate::error::AppError;
use crate::service::{AuthOutcome, UserProfile};

#[derive(Debug, Clone)]
pub enum Message {
    // Account
    Initialize,
    Initialized(AuthOutcome),
    SignIn,
    SignInFinished(Result<UserProfile, AppError>),
    SignOut,
    DestinationsLoaded(Result<Destinations, AppError>),

    // Analysis
    Analyze(String),
    AnalysisFinished {
        seq: u64,
        result: Result<AnalysisResult, AppError>,
    },
    ChangeEventCategory {
        item_id: String,
        category: EventCategory,
    },
    ChangeTaskCategory {
        item_id: String,
        category: TaskCategory,
    },

    // Confirmation
    Confirm {
        kind: ItemKind,
        item_id: String,
        destination_id: Option<String>,
    },
    ConfirmFinished {
        item_id: String,
        result: Result<(), AppError>,
    },
    RetryConfirm(String),

    DismissError,
}

/// Side effect requested by [`crate::session::Session::update`]. Carries
/// everything needed to run it, so the driver never reads session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    None,
    Initialize,
    SignIn,
    SignOut,
    FetchDestinations,
    Analyze {
        seq: u64,
        text: String,
    },
    CreateEvent {
        event: ExtractedEvent,
        calendar_id: String,
    },
    CreateTask {
        task: ExtractedTask,
        task_list_id: String,
    },
}
