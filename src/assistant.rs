//! Drives a [`Session`]: feeds it messages and executes the commands it returns
//! against the collaborators in a [`Context`].

use futures::future::join_all;

use crate::context::Context;
use crate::core::destination::Destinations;
use crate::error::AppError;
use crate::message::{Command, Message};
use crate::service::Account;
use crate::session::Session;

pub struct Assistant {
    context: Context,
    session: Session,
}

impl Assistant {
    pub fn new(context: Context) -> Self {
        Self {
            context,
            session: Session::new(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Apply `message` and everything that follows from it, returning once the
    /// session is idle again.
    pub async fn dispatch(&mut self, message: Message) {
        self.dispatch_all([message]).await;
    }

    /// Apply several messages in order, then run the resulting commands
    /// concurrently. Used to confirm a batch of items at once.
    pub async fn dispatch_all(&mut self, messages: impl IntoIterator<Item = Message>) {
        let mut pending: Vec<Message> = messages.into_iter().collect();
        while !pending.is_empty() {
            let commands: Vec<Command> = pending
                .drain(..)
                .map(|message| self.session.update(message))
                .filter(|command| *command != Command::None)
                .collect();
            let follow_ups = join_all(commands.into_iter().map(|command| self.run(command))).await;
            pending = follow_ups.into_iter().flatten().collect();
        }
    }

    async fn run(&self, command: Command) -> Option<Message> {
        let account = self.context.account.as_ref();
        match command {
            Command::None => None,
            Command::Initialize => Some(Message::Initialized(account.initialize().await)),
            Command::SignIn => Some(Message::SignInFinished(account.sign_in().await)),
            Command::SignOut => {
                if let Err(e) = account.sign_out().await {
                    log::warn!("Sign-out did not complete cleanly: {}", e);
                }
                None
            }
            Command::FetchDestinations => {
                Some(Message::DestinationsLoaded(fetch_destinations(account).await))
            }
            Command::Analyze { seq, text } => {
                log::debug!("Analyzing {} characters (#{})", text.chars().count(), seq);
                let result = self.context.extractor.analyze(&text).await;
                Some(Message::AnalysisFinished { seq, result })
            }
            Command::CreateEvent { event, calendar_id } => {
                let result = account.create_event(&event, &calendar_id).await;
                Some(Message::ConfirmFinished {
                    item_id: event.id,
                    result,
                })
            }
            Command::CreateTask { task, task_list_id } => {
                let result = account.create_task(&task, &task_list_id).await;
                Some(Message::ConfirmFinished {
                    item_id: task.id,
                    result,
                })
            }
        }
    }
}

/// Calendars and task lists, fetched together. Either failing fails both.
pub async fn fetch_destinations(account: &dyn Account) -> Result<Destinations, AppError> {
    let (calendars, task_lists) =
        tokio::try_join!(account.list_calendars(), account.list_task_lists())?;
    Ok(Destinations {
        calendars,
        task_lists,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::config::GleanerConfig;
    use crate::core::analysis::ItemKind;
    use crate::core::destination::{Calendar, TaskList};
    use crate::core::event::ExtractedEvent;
    use crate::core::task::ExtractedTask;
    use crate::service::demo::{DemoAccount, DemoExtractor};
    use crate::service::{AuthOutcome, UserProfile};
    use crate::session::Screen;

    fn demo_assistant() -> Assistant {
        let context = Context::new(
            GleanerConfig::default(),
            Arc::new(DemoExtractor::with_latency(Duration::ZERO)),
            Arc::new(DemoAccount::with_latency(Duration::ZERO)),
        )
        .unwrap();
        Assistant::new(context)
    }

    /// Account that starts signed out, records writes and can be told to fail.
    #[derive(Default)]
    struct RecordingAccount {
        writes: Mutex<Vec<(String, String)>>,
        fail_writes: bool,
        fail_lists: bool,
    }

    #[async_trait]
    impl Account for RecordingAccount {
        async fn initialize(&self) -> AuthOutcome {
            AuthOutcome::SignedOut
        }

        async fn sign_in(&self) -> Result<UserProfile, AppError> {
            Ok(DemoAccount::profile())
        }

        async fn sign_out(&self) -> Result<(), AppError> {
            Ok(())
        }

        async fn list_calendars(&self) -> Result<Vec<Calendar>, AppError> {
            Ok(DemoAccount::calendars())
        }

        async fn list_task_lists(&self) -> Result<Vec<TaskList>, AppError> {
            if self.fail_lists {
                return Err(AppError::ListFetch("tasks API disabled".into()));
            }
            Ok(DemoAccount::task_lists())
        }

        async fn create_event(&self, event: &ExtractedEvent, calendar_id: &str) -> Result<(), AppError> {
            self.record(&event.id, calendar_id)
        }

        async fn create_task(&self, task: &ExtractedTask, task_list_id: &str) -> Result<(), AppError> {
            self.record(&task.id, task_list_id)
        }
    }

    impl RecordingAccount {
        fn record(&self, item: &str, destination: &str) -> Result<(), AppError> {
            self.writes
                .lock()
                .unwrap()
                .push((item.to_string(), destination.to_string()));
            if self.fail_writes {
                Err(AppError::RemoteWrite("quota exceeded".into()))
            } else {
                Ok(())
            }
        }
    }

    fn recording_assistant(account: Arc<RecordingAccount>) -> Assistant {
        let context = Context::new(
            GleanerConfig::default(),
            Arc::new(DemoExtractor::with_latency(Duration::ZERO)),
            account,
        )
        .unwrap();
        Assistant::new(context)
    }

    #[tokio::test]
    async fn demo_session_reaches_workspace_with_destinations() {
        let mut assistant = demo_assistant();
        assistant.dispatch(Message::Initialize).await;

        let session = assistant.session();
        assert_eq!(session.screen(), Screen::Workspace);
        assert_eq!(session.calendars().len(), 5);
        assert_eq!(session.task_lists().len(), 4);
        assert!(!session.is_loading_destinations());
    }

    #[tokio::test]
    async fn analyze_then_confirm_everything() {
        let mut assistant = demo_assistant();
        assistant.dispatch(Message::Initialize).await;
        assistant.dispatch(Message::Analyze("Meeting with Danny on Monday".into())).await;

        let analysis = assistant.session().analysis().unwrap();
        assert_eq!(analysis.events.len(), 2);
        assert_eq!(analysis.tasks.len(), 2);

        let mut confirms: Vec<Message> = analysis
            .events
            .iter()
            .map(|e| Message::Confirm {
                kind: ItemKind::Event,
                item_id: e.id.clone(),
                destination_id: None,
            })
            .collect();
        for task in &analysis.tasks {
            confirms.push(Message::Confirm {
                kind: ItemKind::Task,
                item_id: task.id.clone(),
                destination_id: assistant.session().suggested_task_list(&task.id),
            });
        }
        assistant.dispatch_all(confirms).await;

        let session = assistant.session();
        assert_eq!(session.confirmed_count(), 4);
        assert!(session.error().is_none());
        assert!(analysis.tasks.iter().all(|t| !session.has_failed(&t.id)));
    }

    #[tokio::test]
    async fn sign_in_then_writes_reach_the_account() {
        let account = Arc::new(RecordingAccount::default());
        let mut assistant = recording_assistant(account.clone());

        assistant.dispatch(Message::Initialize).await;
        assert_eq!(assistant.session().screen(), Screen::Welcome);

        assistant.dispatch(Message::SignIn).await;
        assert_eq!(assistant.session().screen(), Screen::Workspace);

        assistant.dispatch(Message::Analyze("text".into())).await;
        let event_id = assistant.session().analysis().unwrap().events[1].id.clone();
        assistant
            .dispatch(Message::Confirm {
                kind: ItemKind::Event,
                item_id: event_id.clone(),
                destination_id: Some("clinic_demo".into()),
            })
            .await;

        let writes = account.writes.lock().unwrap().clone();
        assert_eq!(writes, vec![(event_id, "clinic_demo".to_string())]);
    }

    #[tokio::test]
    async fn failed_write_is_retried_to_same_destination() {
        let account = Arc::new(RecordingAccount {
            fail_writes: true,
            ..RecordingAccount::default()
        });
        let mut assistant = recording_assistant(account.clone());
        assistant.dispatch(Message::Initialize).await;
        assistant.dispatch(Message::SignIn).await;
        assistant.dispatch(Message::Analyze("text".into())).await;

        let task_id = assistant.session().analysis().unwrap().tasks[0].id.clone();
        assistant
            .dispatch(Message::Confirm {
                kind: ItemKind::Task,
                item_id: task_id.clone(),
                destination_id: Some("project_tasks".into()),
            })
            .await;
        assert!(assistant.session().is_confirmed(&task_id));
        assert!(assistant.session().has_failed(&task_id));

        assistant.dispatch(Message::RetryConfirm(task_id.clone())).await;
        let writes = account.writes.lock().unwrap().clone();
        assert_eq!(writes.len(), 2);
        assert!(writes.iter().all(|(item, dest)| item == &task_id && dest == "project_tasks"));
        assert!(assistant.session().has_failed(&task_id));
    }

    #[tokio::test]
    async fn list_failure_leaves_both_lists_empty() {
        let account = Arc::new(RecordingAccount {
            fail_lists: true,
            ..RecordingAccount::default()
        });
        let mut assistant = recording_assistant(account);
        assistant.dispatch(Message::Initialize).await;
        assistant.dispatch(Message::SignIn).await;

        let session = assistant.session();
        assert_eq!(session.screen(), Screen::Workspace);
        assert!(session.calendars().is_empty());
        assert!(session.task_lists().is_empty());
        assert!(matches!(session.error(), Some(AppError::ListFetch(_))));
    }

    #[tokio::test]
    async fn sign_out_returns_to_welcome() {
        let mut assistant = demo_assistant();
        assistant.dispatch(Message::Initialize).await;
        assistant.dispatch(Message::Analyze("text".into())).await;
        assistant.dispatch(Message::SignOut).await;

        let session = assistant.session();
        assert_eq!(session.screen(), Screen::Welcome);
        assert!(session.analysis().is_none());
        assert!(session.calendars().is_empty());
    }
}
