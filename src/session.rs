//! Session state: readiness, destinations, the current analysis and what has
//! been confirmed from it.
//!
//! All transitions go through [`Session::update`], which never performs I/O.
//! It returns a [`Command`] for the driver to execute; the outcome comes back
//! as another [`Message`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::core::analysis::{AnalysisResult, ItemKind};
use crate::core::destination::{Calendar, Destinations, TaskList};
use crate::core::matcher::{select_calendar, select_task_list};
use crate::error::{AppError, ExtractionError};
use crate::message::{Command, Message};
use crate::service::{AuthOutcome, UserProfile};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Initializing,
    SignedOut,
    SignedIn(UserProfile),
    ConfigError(String),
}

/// What the presentation layer should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Loading,
    ConfigError(String),
    Welcome,
    Workspace,
}

/// Where a confirmed item was sent, kept so a failed write can be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Placement {
    kind: ItemKind,
    destination_id: String,
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    calendars: Arc<[Calendar]>,
    task_lists: Arc<[TaskList]>,
    loading_destinations: bool,
    analysis: Option<Arc<AnalysisResult>>,
    analysis_seq: u64,
    analyzing: bool,
    confirmed: HashSet<String>,
    placements: HashMap<String, Placement>,
    failed: HashSet<String>,
    error: Option<AppError>,
}

fn empty<T>() -> Arc<[T]> {
    Arc::from(Vec::<T>::new())
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: SessionState::Uninitialized,
            calendars: empty(),
            task_lists: empty(),
            loading_destinations: false,
            analysis: None,
            analysis_seq: 0,
            analyzing: false,
            confirmed: HashSet::new(),
            placements: HashMap::new(),
            failed: HashSet::new(),
            error: None,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// True once the auth handshake has settled on signed in or signed out.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::SignedIn(_) | SessionState::SignedOut)
    }

    pub fn screen(&self) -> Screen {
        match &self.state {
            SessionState::Uninitialized | SessionState::Initializing => Screen::Loading,
            SessionState::ConfigError(detail) => Screen::ConfigError(detail.clone()),
            SessionState::SignedOut => Screen::Welcome,
            SessionState::SignedIn(_) => Screen::Workspace,
        }
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match &self.state {
            SessionState::SignedIn(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn calendars(&self) -> Arc<[Calendar]> {
        self.calendars.clone()
    }

    pub fn task_lists(&self) -> Arc<[TaskList]> {
        self.task_lists.clone()
    }

    pub fn is_loading_destinations(&self) -> bool {
        self.loading_destinations
    }

    pub fn analysis(&self) -> Option<Arc<AnalysisResult>> {
        self.analysis.clone()
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing
    }

    pub fn is_confirmed(&self, item_id: &str) -> bool {
        self.confirmed.contains(item_id)
    }

    pub fn confirmed_count(&self) -> usize {
        self.confirmed.len()
    }

    /// Confirmed, but the remote write did not go through.
    pub fn has_failed(&self, item_id: &str) -> bool {
        self.failed.contains(item_id)
    }

    pub fn error(&self) -> Option<&AppError> {
        self.error.as_ref()
    }

    /// Calendar the matcher proposes for an event in the current analysis.
    pub fn suggested_calendar(&self, event_id: &str) -> Option<String> {
        let category = self.analysis.as_ref()?.event(event_id)?.category;
        Some(select_calendar(category, &self.calendars))
    }

    /// Task list the matcher proposes, if there is any list at all.
    pub fn suggested_task_list(&self, task_id: &str) -> Option<String> {
        let category = self.analysis.as_ref()?.task(task_id)?.category;
        select_task_list(category, &self.task_lists)
    }

    pub fn update(&mut self, message: Message) -> Command {
        match message {
            Message::Initialize => {
                if self.state != SessionState::Uninitialized {
                    return Command::None;
                }
                self.state = SessionState::Initializing;
                Command::Initialize
            }

            Message::Initialized(outcome) => {
                if self.state != SessionState::Initializing {
                    log::debug!("Ignoring auth outcome outside of initialization");
                    return Command::None;
                }
                match outcome {
                    AuthOutcome::SignedIn(profile) => self.enter_signed_in(profile),
                    AuthOutcome::SignedOut => {
                        self.state = SessionState::SignedOut;
                        Command::None
                    }
                    AuthOutcome::ConfigError(detail) => {
                        log::error!("Configuration error: {}", detail);
                        self.error = Some(AppError::Configuration(detail.clone()));
                        self.state = SessionState::ConfigError(detail);
                        Command::None
                    }
                }
            }

            Message::SignIn => {
                if self.state != SessionState::SignedOut {
                    return Command::None;
                }
                Command::SignIn
            }

            Message::SignInFinished(result) => {
                if self.state != SessionState::SignedOut {
                    return Command::None;
                }
                match result {
                    Ok(profile) => self.enter_signed_in(profile),
                    Err(e) => {
                        log::warn!("Sign-in failed: {}", e);
                        self.error = Some(e);
                        Command::None
                    }
                }
            }

            Message::SignOut => {
                if !matches!(self.state, SessionState::SignedIn(_)) {
                    return Command::None;
                }
                self.state = SessionState::SignedOut;
                self.calendars = empty();
                self.task_lists = empty();
                self.loading_destinations = false;
                self.reset_analysis();
                // Anything still in flight belongs to the old session.
                self.analysis_seq += 1;
                self.analyzing = false;
                self.error = None;
                Command::SignOut
            }

            Message::DestinationsLoaded(result) => {
                if !matches!(self.state, SessionState::SignedIn(_)) {
                    log::debug!("Dropping destination lists that arrived after sign-out");
                    return Command::None;
                }
                self.loading_destinations = false;
                match result {
                    Ok(Destinations {
                        calendars,
                        task_lists,
                    }) => {
                        log::info!(
                            "Loaded {} calendars and {} task lists",
                            calendars.len(),
                            task_lists.len()
                        );
                        self.calendars = calendars.into();
                        self.task_lists = task_lists.into();
                    }
                    Err(e) => {
                        log::warn!("{}", e);
                        self.calendars = empty();
                        self.task_lists = empty();
                        self.error = Some(e);
                    }
                }
                Command::None
            }

            Message::Analyze(text) => {
                if !self.is_ready() {
                    return Command::None;
                }
                if text.trim().is_empty() {
                    self.error = Some(ExtractionError::EmptyInput.into());
                    return Command::None;
                }
                self.reset_analysis();
                self.error = None;
                self.analysis_seq += 1;
                self.analyzing = true;
                Command::Analyze {
                    seq: self.analysis_seq,
                    text,
                }
            }

            Message::AnalysisFinished { seq, result } => {
                if seq != self.analysis_seq || !self.analyzing {
                    log::debug!("Discarding stale analysis #{}", seq);
                    return Command::None;
                }
                self.analyzing = false;
                match result {
                    Ok(analysis) => {
                        log::info!(
                            "Analysis found {} events and {} tasks",
                            analysis.events.len(),
                            analysis.tasks.len()
                        );
                        self.analysis = Some(Arc::new(analysis));
                    }
                    Err(e) => {
                        log::warn!("{}", e);
                        self.error = Some(e);
                    }
                }
                Command::None
            }

            Message::ChangeEventCategory { item_id, category } => {
                if let Some(next) = self
                    .analysis
                    .as_ref()
                    .and_then(|a| a.with_event_category(&item_id, category))
                {
                    self.analysis = Some(Arc::new(next));
                }
                Command::None
            }

            Message::ChangeTaskCategory { item_id, category } => {
                if let Some(next) = self
                    .analysis
                    .as_ref()
                    .and_then(|a| a.with_task_category(&item_id, category))
                {
                    self.analysis = Some(Arc::new(next));
                }
                Command::None
            }

            Message::Confirm {
                kind,
                item_id,
                destination_id,
            } => self.confirm(kind, item_id, destination_id),

            Message::ConfirmFinished { item_id, result } => {
                if !self.confirmed.contains(&item_id) {
                    return Command::None;
                }
                match result {
                    Ok(()) => {
                        self.failed.remove(&item_id);
                    }
                    Err(e) => {
                        log::warn!("Write for {} failed: {}", item_id, e);
                        self.failed.insert(item_id);
                        self.error = Some(e);
                    }
                }
                Command::None
            }

            Message::RetryConfirm(item_id) => {
                if !self.failed.contains(&item_id) {
                    return Command::None;
                }
                let Some(placement) = self.placements.get(&item_id).cloned() else {
                    return Command::None;
                };
                let command = self.write_command(placement.kind, &item_id, placement.destination_id);
                if command != Command::None {
                    self.failed.remove(&item_id);
                }
                command
            }

            Message::DismissError => {
                if !self.error.as_ref().is_some_and(AppError::is_fatal) {
                    self.error = None;
                }
                Command::None
            }
        }
    }

    fn enter_signed_in(&mut self, profile: UserProfile) -> Command {
        log::info!("Signed in as {}", profile.name);
        self.state = SessionState::SignedIn(profile);
        self.loading_destinations = true;
        Command::FetchDestinations
    }

    fn reset_analysis(&mut self) {
        self.analysis = None;
        self.confirmed.clear();
        self.placements.clear();
        self.failed.clear();
    }

    fn confirm(&mut self, kind: ItemKind, item_id: String, destination_id: Option<String>) -> Command {
        if !matches!(self.state, SessionState::SignedIn(_)) {
            return Command::None;
        }
        if self.confirmed.contains(&item_id) {
            return Command::None;
        }
        let Some(analysis) = self.analysis.clone() else {
            return Command::None;
        };

        let destination_id = match kind {
            ItemKind::Event => {
                let Some(event) = analysis.event(&item_id) else {
                    return Command::None;
                };
                destination_id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| select_calendar(event.category, &self.calendars))
            }
            ItemKind::Task => {
                if analysis.task(&item_id).is_none() {
                    return Command::None;
                }
                match destination_id.filter(|id| !id.is_empty()) {
                    Some(id) => id,
                    None => {
                        self.error = Some(AppError::NoTaskList);
                        return Command::None;
                    }
                }
            }
        };

        self.confirmed.insert(item_id.clone());
        self.placements.insert(
            item_id.clone(),
            Placement {
                kind,
                destination_id: destination_id.clone(),
            },
        );
        self.write_command(kind, &item_id, destination_id)
    }

    fn write_command(&self, kind: ItemKind, item_id: &str, destination_id: String) -> Command {
        let Some(analysis) = self.analysis.as_ref() else {
            return Command::None;
        };
        match kind {
            ItemKind::Event => match analysis.event(item_id) {
                Some(event) => Command::CreateEvent {
                    event: event.clone(),
                    calendar_id: destination_id,
                },
                None => Command::None,
            },
            ItemKind::Task => match analysis.task(item_id) {
                Some(task) => Command::CreateTask {
                    task: task.clone(),
                    task_list_id: destination_id,
                },
                None => Command::None,
            },
        }
    }
}
