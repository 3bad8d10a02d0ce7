//! Google Calendar and Google Tasks behind the [`Account`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use url::Url;

use super::keyring::TokenStore;
use super::oauth::{GoogleApiError, GoogleToken, OAuthClient};
use super::{Account, AuthOutcome, UserProfile};
use crate::config::{GleanerConfig, GoogleConfig};
use crate::core::destination::{Calendar, TaskList};
use crate::core::event::{EventTime, ExtractedEvent};
use crate::core::task::ExtractedTask;
use crate::error::AppError;

const CLIENT_ID_SUFFIX: &str = ".apps.googleusercontent.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

pub struct GoogleAccount {
    config: GoogleConfig,
    time_zone: String,
    oauth: OAuthClient,
    store: Arc<dyn TokenStore>,
    token: Mutex<Option<GoogleToken>>,
    http: reqwest::Client,
}

impl GoogleAccount {
    pub fn new(config: &GleanerConfig, store: Arc<dyn TokenStore>) -> Self {
        Self {
            config: config.google.clone(),
            time_zone: config.time_zone.clone(),
            oauth: OAuthClient::new(&config.google),
            store,
            token: Mutex::new(None),
            http: reqwest::Client::new(),
        }
    }

    /// A usable access token, refreshed first if it is about to expire.
    async fn access_token(&self) -> Result<String, GoogleApiError> {
        let mut guard = self.token.lock().await;
        let token = guard.as_ref().ok_or(GoogleApiError::NotSignedIn)?;
        if !token.is_expired(Utc::now()) {
            return Ok(token.access_token.clone());
        }

        match self.oauth.refresh(token).await {
            Ok(fresh) => {
                if let Err(e) = self.store.store(&fresh).await {
                    log::warn!("Failed to persist refreshed token: {}", e);
                }
                let access = fresh.access_token.clone();
                *guard = Some(fresh);
                Ok(access)
            }
            Err(GoogleApiError::AuthExpired) => {
                *guard = None;
                self.forget_expired_token().await;
                Err(GoogleApiError::AuthExpired)
            }
            Err(e) => Err(e),
        }
    }

    async fn forget_expired_token(&self) {
        log::warn!("Google session expired; signing out");
        if let Err(e) = self.store.delete().await {
            log::warn!("Failed to clear expired token: {}", e);
        }
    }

    /// Drops the cached and stored token when Google rejects it.
    async fn reject_expired<T>(&self, result: Result<T, GoogleApiError>) -> Result<T, GoogleApiError> {
        if let Err(GoogleApiError::AuthExpired) = result {
            *self.token.lock().await = None;
            self.forget_expired_token().await;
        }
        result
    }

    async fn get_all<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, GoogleApiError> {
        let result = self.fetch_pages(url).await;
        self.reject_expired(result).await
    }

    async fn fetch_pages<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, GoogleApiError> {
        let access = self.access_token().await?;
        let mut all = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(url.clone())
                .bearer_auth(&access)
                .query(&[("maxResults", "100")]);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListPage<T> = check(request.send().await?).await?.json().await?;
            all.extend(page.items);

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
        Ok(all)
    }

    async fn post(&self, url: Url, body: &Value) -> Result<(), GoogleApiError> {
        let access = self.access_token().await?;
        let resp = self.http.post(url).bearer_auth(&access).json(body).send().await?;
        let result = check(resp).await.map(|_| ());
        self.reject_expired(result).await
    }
}

#[async_trait]
impl Account for GoogleAccount {
    async fn initialize(&self) -> AuthOutcome {
        if !self.config.client_id.trim().ends_with(CLIENT_ID_SUFFIX) {
            return AuthOutcome::ConfigError(format!(
                "Google client id must end with {}",
                CLIENT_ID_SUFFIX
            ));
        }

        let stored = match self.store.load().await {
            Ok(Some(token)) => token,
            Ok(None) => return AuthOutcome::SignedOut,
            Err(e) => {
                log::warn!("Could not read stored Google token: {}", e);
                return AuthOutcome::SignedOut;
            }
        };
        *self.token.lock().await = Some(stored);

        let profile = match self.access_token().await {
            Ok(access) => self.oauth.fetch_profile(&access).await,
            Err(e) => Err(e),
        };
        match profile {
            Ok(profile) => {
                log::info!("Restored Google session for {}", profile.name);
                AuthOutcome::SignedIn(profile)
            }
            Err(e) => {
                log::warn!("Stored Google session is not usable: {}", e);
                *self.token.lock().await = None;
                AuthOutcome::SignedOut
            }
        }
    }

    async fn sign_in(&self) -> Result<UserProfile, AppError> {
        let token = self
            .oauth
            .run_consent_flow()
            .await
            .map_err(|e| AppError::SignIn(e.to_string()))?;
        let profile = self
            .oauth
            .fetch_profile(&token.access_token)
            .await
            .map_err(|e| AppError::SignIn(e.to_string()))?;

        if let Err(e) = self.store.store(&token).await {
            log::warn!("Failed to save Google token to keyring: {}", e);
        }
        *self.token.lock().await = Some(token);
        log::info!("Signed in to Google as {}", profile.name);
        Ok(profile)
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        if let Some(token) = self.token.lock().await.take() {
            if let Err(e) = self.oauth.revoke(&token).await {
                log::warn!("Failed to revoke Google token: {}", e);
            }
        }
        if let Err(e) = self.store.delete().await {
            log::warn!("Failed to delete Google token from keyring: {}", e);
        }
        Ok(())
    }

    async fn list_calendars(&self) -> Result<Vec<Calendar>, AppError> {
        let url = endpoint(&self.config.calendar_base_url, &["users", "me", "calendarList"])
            .map_err(|e| AppError::ListFetch(e.to_string()))?;
        let calendars: Vec<Calendar> = self
            .get_all(url)
            .await
            .map_err(|e| AppError::ListFetch(e.to_string()))?;
        log::debug!("Fetched {} calendars", calendars.len());
        Ok(calendars)
    }

    async fn list_task_lists(&self) -> Result<Vec<TaskList>, AppError> {
        let url = endpoint(&self.config.tasks_base_url, &["users", "@me", "lists"])
            .map_err(|e| AppError::ListFetch(e.to_string()))?;
        let lists: Vec<TaskList> = self
            .get_all(url)
            .await
            .map_err(|e| AppError::ListFetch(e.to_string()))?;
        log::debug!("Fetched {} task lists", lists.len());
        Ok(lists)
    }

    async fn create_event(&self, event: &ExtractedEvent, calendar_id: &str) -> Result<(), AppError> {
        let body = event_resource(event, &self.time_zone)?;
        let url = endpoint(&self.config.calendar_base_url, &["calendars", calendar_id, "events"])
            .map_err(|e| AppError::RemoteWrite(e.to_string()))?;
        self.post(url, &body)
            .await
            .map_err(|e| AppError::RemoteWrite(e.to_string()))?;
        log::info!("Added event \"{}\" to calendar {}", event.title, calendar_id);
        Ok(())
    }

    async fn create_task(&self, task: &ExtractedTask, task_list_id: &str) -> Result<(), AppError> {
        if task_list_id.is_empty() {
            return Err(AppError::NoTaskList);
        }
        let body = task_resource(task);
        let url = endpoint(&self.config.tasks_base_url, &["lists", task_list_id, "tasks"])
            .map_err(|e| AppError::RemoteWrite(e.to_string()))?;
        self.post(url, &body)
            .await
            .map_err(|e| AppError::RemoteWrite(e.to_string()))?;
        log::info!("Added task \"{}\" to list {}", task.title, task_list_id);
        Ok(())
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, GoogleApiError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GoogleApiError::AuthExpired);
    }
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(GoogleApiError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp)
}

/// `base` with each segment appended, percent-encoded.
fn endpoint(base: &str, segments: &[&str]) -> Result<Url, GoogleApiError> {
    let mut url = Url::parse(base).map_err(|e| GoogleApiError::InvalidUrl(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| GoogleApiError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn timed(time: &EventTime, time_zone: &str) -> Option<Value> {
    let date_time = match time {
        EventTime::Zoned(dt) => dt.to_rfc3339(),
        EventTime::Floating(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        EventTime::AllDay(_) => return None,
    };
    Some(json!({ "dateTime": date_time, "timeZone": time_zone }))
}

/// Calendar API event body. A date-only start makes an all-day event; a missing
/// or unusable end reuses the start.
pub fn event_resource(event: &ExtractedEvent, time_zone: &str) -> Result<Value, AppError> {
    let start = event.start().ok_or_else(|| {
        AppError::RemoteWrite(format!("event \"{}\" has no valid start time", event.title))
    })?;

    let (start_value, end_value) = match start {
        EventTime::AllDay(day) => {
            let end = match event.end() {
                Some(EventTime::AllDay(end)) if end > day => end,
                _ => day + chrono::Duration::days(1),
            };
            (
                json!({ "date": day.format("%Y-%m-%d").to_string() }),
                json!({ "date": end.format("%Y-%m-%d").to_string() }),
            )
        }
        timed_start => {
            let start_value = timed(&timed_start, time_zone).unwrap_or(Value::Null);
            let end_value = event
                .end()
                .and_then(|end| timed(&end, time_zone))
                .unwrap_or_else(|| start_value.clone());
            (start_value, end_value)
        }
    };

    let mut body = json!({
        "summary": event.title,
        "start": start_value,
        "end": end_value,
    });
    if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
        body["description"] = json!(description);
    }
    if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
        body["location"] = json!(location);
    }
    Ok(body)
}

/// Tasks API body. The API only keeps the date of `due`.
pub fn task_resource(task: &ExtractedTask) -> Value {
    let mut body = json!({ "title": task.title });
    match task.due() {
        Some(day) => body["due"] = json!(format!("{}T00:00:00.000Z", day.format("%Y-%m-%d"))),
        None if task.due_date.is_some() => {
            log::warn!("Dropping unparsable due date on task \"{}\"", task.title);
        }
        None => {}
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::category::{EventCategory, TaskCategory};
    use crate::service::keyring::MemoryTokenStore;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn event(start: Option<&str>, end: Option<&str>) -> ExtractedEvent {
        ExtractedEvent {
            id: "evt-1-0".into(),
            title: "Staff meeting".into(),
            start_time: start.map(String::from),
            end_time: end.map(String::from),
            description: None,
            location: Some("Room 4".into()),
            category: EventCategory::PublicFramework,
        }
    }

    fn fresh_token() -> GoogleToken {
        GoogleToken {
            access_token: "live-token".into(),
            refresh_token: Some("refresh".into()),
            expiry: Some(Utc::now() + chrono::Duration::hours(1)),
        }
    }

    fn account(server: &MockServer, store: Arc<dyn TokenStore>) -> GoogleAccount {
        let mut config = GleanerConfig::default();
        config.google = GoogleConfig {
            client_id: "abc.apps.googleusercontent.com".into(),
            token_url: format!("{}/token", server.uri()),
            revoke_url: format!("{}/revoke", server.uri()),
            userinfo_url: format!("{}/userinfo", server.uri()),
            calendar_base_url: format!("{}/calendar/v3", server.uri()),
            tasks_base_url: format!("{}/tasks/v1", server.uri()),
            ..GoogleConfig::default()
        };
        GoogleAccount::new(&config, store)
    }

    async fn mount_userinfo(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Dana Levi",
                "email": "dana@example.com"
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn timed_event_carries_zone_and_missing_end_reuses_start() {
        let body = event_resource(&event(Some("2026-03-04T10:00"), None), "Asia/Jerusalem").unwrap();
        assert_eq!(body["start"]["dateTime"], "2026-03-04T10:00:00");
        assert_eq!(body["start"]["timeZone"], "Asia/Jerusalem");
        assert_eq!(body["end"], body["start"]);
        assert_eq!(body["location"], "Room 4");
        assert!(body.get("description").is_none());
    }

    #[test]
    fn date_only_start_is_all_day() {
        let body = event_resource(&event(Some("2026-03-04"), None), "Asia/Jerusalem").unwrap();
        assert_eq!(body["start"], json!({ "date": "2026-03-04" }));
        assert_eq!(body["end"], json!({ "date": "2026-03-05" }));
    }

    #[test]
    fn event_without_start_is_refused() {
        let err = event_resource(&event(None, None), "UTC").unwrap_err();
        assert!(matches!(err, AppError::RemoteWrite(_)));
        let err = event_resource(&event(Some("soon"), None), "UTC").unwrap_err();
        assert!(matches!(err, AppError::RemoteWrite(_)));
    }

    #[test]
    fn task_due_is_midnight_utc() {
        let task = ExtractedTask {
            id: "tsk-1-0".into(),
            title: "Send report".into(),
            due_date: Some("2026-03-04T15:30:00+02:00".into()),
            category: TaskCategory::ClinicSelf,
        };
        assert_eq!(task_resource(&task)["due"], "2026-03-04T00:00:00.000Z");

        let undated = ExtractedTask {
            due_date: None,
            ..task
        };
        assert!(task_resource(&undated).get("due").is_none());
    }

    #[test]
    fn endpoint_encodes_segments() {
        let url = endpoint("https://example.com/calendar/v3", &["calendars", "a b#c", "events"]).unwrap();
        assert_eq!(url.path(), "/calendar/v3/calendars/a%20b%23c/events");
    }

    #[tokio::test]
    async fn malformed_client_id_is_a_config_error() {
        let mut config = GleanerConfig::default();
        config.google.client_id = "not-a-client-id".into();
        let account = GoogleAccount::new(&config, Arc::new(MemoryTokenStore::default()));
        assert!(matches!(account.initialize().await, AuthOutcome::ConfigError(_)));
    }

    #[tokio::test]
    async fn no_stored_token_is_signed_out() {
        let server = MockServer::start().await;
        let account = account(&server, Arc::new(MemoryTokenStore::default()));
        assert_eq!(account.initialize().await, AuthOutcome::SignedOut);
    }

    #[tokio::test]
    async fn stored_token_restores_session() {
        let server = MockServer::start().await;
        mount_userinfo(&server).await;
        let account = account(&server, Arc::new(MemoryTokenStore::with_token(fresh_token())));

        match account.initialize().await {
            AuthOutcome::SignedIn(profile) => assert_eq!(profile.name, "Dana Levi"),
            other => panic!("expected signed in, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_persisted() {
        let server = MockServer::start().await;
        mount_userinfo(&server).await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "refreshed",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let expired = GoogleToken {
            expiry: Some(Utc::now() - chrono::Duration::minutes(5)),
            ..fresh_token()
        };
        let store = Arc::new(MemoryTokenStore::with_token(expired));
        let account = account(&server, store.clone());

        assert!(matches!(account.initialize().await, AuthOutcome::SignedIn(_)));
        let saved = store.load().await.unwrap().unwrap();
        assert_eq!(saved.access_token, "refreshed");
        assert_eq!(saved.refresh_token.as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn calendar_list_follows_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendar/v3/users/me/calendarList"))
            .and(query_param_is_missing("pageToken"))
            .and(header("authorization", "Bearer live-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "id": "primary-id", "summary": "Main", "backgroundColor": "#9fe1e7" }],
                "nextPageToken": "p2"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendar/v3/users/me/calendarList"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "id": "family-id", "summary": "משפחה" }]
            })))
            .mount(&server)
            .await;

        let account = account(&server, Arc::new(MemoryTokenStore::default()));
        *account.token.lock().await = Some(fresh_token());

        let calendars = account.list_calendars().await.unwrap();
        let ids: Vec<&str> = calendars.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["primary-id", "family-id"]);
        assert_eq!(calendars[0].background_color.as_deref(), Some("#9fe1e7"));
    }

    #[tokio::test]
    async fn task_lists_without_items_are_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks/v1/users/@me/lists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "kind": "tasks#taskLists" })))
            .mount(&server)
            .await;

        let account = account(&server, Arc::new(MemoryTokenStore::default()));
        *account.token.lock().await = Some(fresh_token());
        assert!(account.list_task_lists().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_while_signed_out_is_a_fetch_error() {
        let server = MockServer::start().await;
        let account = account(&server, Arc::new(MemoryTokenStore::default()));
        assert!(matches!(account.list_calendars().await, Err(AppError::ListFetch(_))));
    }

    #[tokio::test]
    async fn create_event_posts_to_calendar() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendar/v3/calendars/work-cal/events"))
            .and(body_partial_json(json!({
                "summary": "Staff meeting",
                "start": { "timeZone": "Asia/Jerusalem" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "created" })))
            .expect(1)
            .mount(&server)
            .await;

        let account = account(&server, Arc::new(MemoryTokenStore::default()));
        *account.token.lock().await = Some(fresh_token());
        account
            .create_event(&event(Some("2026-03-04T10:00:00"), Some("2026-03-04T11:00:00")), "work-cal")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejected_write_is_remote_write_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tasks/v1/lists/home/tasks"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let account = account(&server, Arc::new(MemoryTokenStore::default()));
        *account.token.lock().await = Some(fresh_token());
        let task = ExtractedTask {
            id: "tsk-1-0".into(),
            title: "Buy milk".into(),
            due_date: None,
            category: TaskCategory::HomeFamily,
        };
        assert!(matches!(account.create_task(&task, "home").await, Err(AppError::RemoteWrite(_))));
        assert_eq!(account.create_task(&task, "").await, Err(AppError::NoTaskList));
    }

    #[tokio::test]
    async fn unauthorized_response_forgets_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendar/v3/users/me/calendarList"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/tasks/v1/lists/home/tasks"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryTokenStore::with_token(fresh_token()));
        let account = account(&server, store.clone());
        *account.token.lock().await = Some(fresh_token());

        assert!(matches!(account.list_calendars().await, Err(AppError::ListFetch(_))));
        assert!(account.token.lock().await.is_none());
        assert!(store.load().await.unwrap().is_none());

        *account.token.lock().await = Some(fresh_token());
        let task = ExtractedTask {
            id: "tsk-1-0".into(),
            title: "Buy milk".into(),
            due_date: None,
            category: TaskCategory::HomeFamily,
        };
        assert!(matches!(account.create_task(&task, "home").await, Err(AppError::RemoteWrite(_))));
        assert!(account.token.lock().await.is_none());

        // Nothing cached any more, so no further request goes out.
        assert!(matches!(account.list_calendars().await, Err(AppError::ListFetch(_))));
    }

    #[tokio::test]
    async fn sign_out_revokes_and_forgets() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/revoke"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryTokenStore::with_token(fresh_token()));
        let account = account(&server, store.clone());
        *account.token.lock().await = Some(fresh_token());

        account.sign_out().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        assert!(account.token.lock().await.is_none());
    }
}
