use async_trait::async_trait;
use chrono::Datelike;
use serde_json::{Value, json};

use super::Extractor;
use crate::config::GleanerConfig;
use crate::core::analysis::{AnalysisResult, EventDraft, TaskDraft};
use crate::core::category::{EventCategory, TaskCategory};
use crate::error::{AppError, ExtractionError};

/// Extracts events and tasks with the Gemini `generateContent` API.
pub struct GeminiExtractor {
    api_key: String,
    model: String,
    base_url: String,
    input_language: Option<String>,
    http: reqwest::Client,
}

impl GeminiExtractor {
    pub fn new(config: &GleanerConfig) -> Self {
        Self {
            api_key: config.gemini.api_key.trim().to_string(),
            model: config.gemini.model.clone(),
            base_url: config.gemini.base_url.trim_end_matches('/').to_string(),
            input_language: config.input_language.clone(),
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl Extractor for GeminiExtractor {
    async fn analyze(&self, text: &str) -> Result<AnalysisResult, AppError> {
        if self.api_key.is_empty() {
            return Err(AppError::Configuration(
                "Gemini API is not configured: no API key".to_string(),
            ));
        }
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyInput.into());
        }

        let year = chrono::Local::now().year();
        let prompt = build_prompt(text, year, self.input_language.as_deref());
        let body = json!({
            "contents": [
                { "role": "user", "parts": [ { "text": prompt } ] }
            ],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            }
        });

        log::info!("Analyzing {} chars with {}", text.chars().count(), self.model);

        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            log::error!("Gemini API error {}: {}", status, message);
            return Err(ExtractionError::Api { status, message }.into());
        }

        let api_resp: Value = resp
            .json()
            .await
            .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;

        let text = response_text(&api_resp).ok_or(ExtractionError::EmptyResponse)?;
        let stamp = chrono::Utc::now().timestamp_millis();
        let result = parse_analysis(&text, stamp)?;

        log::info!(
            "Extracted {} events and {} tasks",
            result.events.len(),
            result.tasks.len()
        );
        Ok(result)
    }
}

/// Concatenate the text parts of the first candidate.
fn response_text(api_resp: &Value) -> Option<String> {
    let parts = api_resp["candidates"]
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|c| c["content"]["parts"].as_array())?;
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() { None } else { Some(text) }
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Validate the model's JSON and assign ids. Both arrays must be present; an
/// absent array is malformed, not empty.
pub fn parse_analysis(text: &str, stamp: i64) -> Result<AnalysisResult, ExtractionError> {
    let mut value: Value = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;

    if !value["events"].is_array() || !value["tasks"].is_array() {
        return Err(ExtractionError::MalformedResponse(
            "expected `events` and `tasks` arrays".to_string(),
        ));
    }

    let events: Vec<EventDraft> = serde_json::from_value(value["events"].take())
        .map_err(|e| ExtractionError::MalformedResponse(format!("events: {}", e)))?;
    let tasks: Vec<TaskDraft> = serde_json::from_value(value["tasks"].take())
        .map_err(|e| ExtractionError::MalformedResponse(format!("tasks: {}", e)))?;

    Ok(AnalysisResult::from_drafts(events, tasks, stamp))
}

pub fn build_prompt(text: &str, current_year: i32, language: Option<&str>) -> String {
    let mut prompt = match language {
        Some(lang) if !lang.trim().is_empty() => format!(
            "Analyze the following {} text. Extract all potential calendar events and tasks.\n",
            lang.trim()
        ),
        _ => "Analyze the following text. Extract all potential calendar events and tasks.\n"
            .to_string(),
    };
    prompt.push_str(&format!("The current year is {}.\n\n", current_year));
    prompt.push_str(
        "For each item, you MUST categorize it into one of the specified categories based on the context.\n\n",
    );

    prompt.push_str("Event categories:\n");
    for c in EventCategory::ALL.iter().filter(|c| **c != EventCategory::Unknown) {
        prompt.push_str(&format!("- '{}': {}\n", c.as_str(), c.definition()));
    }
    prompt.push_str("\nTask categories:\n");
    for c in TaskCategory::ALL.iter().filter(|c| **c != TaskCategory::Unknown) {
        prompt.push_str(&format!("- '{}': {}\n", c.as_str(), c.definition()));
    }

    prompt.push_str(
        "\nIf a category is unclear from the text, use 'unknown'.\n\n\
         For each event, provide: title, startTime, endTime, description, location, and category.\n\
         For each task, provide: title, dueDate, and category.\n\n\
         Use ISO 8601 format for all dates and times; task due dates are dates only. \
         If information like location, description, or date is missing, return null for that field.\n\
         Respond ONLY with a JSON object matching the provided schema.\n\n\
         Text to analyze:\n---\n",
    );
    prompt.push_str(text);
    prompt.push_str("\n---\n");
    prompt
}

fn nullable_string(description: &str) -> Value {
    json!({ "type": "STRING", "description": description, "nullable": true })
}

/// Gemini response schema; category enums are the closed sets.
pub fn response_schema() -> Value {
    let event_categories: Vec<&str> = EventCategory::ALL.iter().map(|c| c.as_str()).collect();
    let task_categories: Vec<&str> = TaskCategory::ALL.iter().map(|c| c.as_str()).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "events": {
                "type": "ARRAY",
                "description": "A list of potential calendar events found in the text.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING", "description": "The title or summary of the event." },
                        "startTime": nullable_string("The start date and time in ISO 8601 format. Null if not found."),
                        "endTime": nullable_string("The end date and time in ISO 8601 format. Null if not found."),
                        "description": nullable_string("A brief description of the event. Null if not found."),
                        "location": nullable_string("The location of the event. Null if not found."),
                        "category": {
                            "type": "STRING",
                            "description": "The category of the event.",
                            "enum": event_categories,
                        }
                    },
                    "required": ["title", "startTime", "endTime", "description", "location", "category"]
                }
            },
            "tasks": {
                "type": "ARRAY",
                "description": "A list of potential tasks found in the text.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING", "description": "The title or content of the task." },
                        "dueDate": nullable_string("The due date in ISO 8601 format (date only). Null if not found."),
                        "category": {
                            "type": "STRING",
                            "description": "The category of the task.",
                            "enum": task_categories,
                        }
                    },
                    "required": ["title", "dueDate", "category"]
                }
            }
        },
        "required": ["events", "tasks"]
    })
}
