use serde::{Deserialize, Serialize};

use super::category::{EventCategory, TaskCategory};
use super::event::ExtractedEvent;
use super::task::ExtractedTask;

/// Which half of a result an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Event,
    Task,
}

/// Everything one extraction call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub events: Vec<ExtractedEvent>,
    pub tasks: Vec<ExtractedTask>,
}

/// Event fields as the extraction service returns them, before an id is assigned.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// `null` from the model degrades to [`EventCategory::Unknown`].
    #[serde(default)]
    pub category: Option<EventCategory>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub category: Option<TaskCategory>,
}

impl AnalysisResult {
    /// Assign ids to drafts. `stamp` is taken once per extraction so that ids
    /// differ between runs; the position keeps them unique within the result.
    pub fn from_drafts(events: Vec<EventDraft>, tasks: Vec<TaskDraft>, stamp: i64) -> Self {
        let events = events
            .into_iter()
            .enumerate()
            .map(|(i, d)| ExtractedEvent {
                id: format!("evt-{}-{}", stamp, i),
                title: d.title,
                start_time: d.start_time,
                end_time: d.end_time,
                description: d.description,
                location: d.location,
                category: d.category.unwrap_or_default(),
            })
            .collect();
        let tasks = tasks
            .into_iter()
            .enumerate()
            .map(|(i, d)| ExtractedTask {
                id: format!("tsk-{}-{}", stamp, i),
                title: d.title,
                due_date: d.due_date,
                category: d.category.unwrap_or_default(),
            })
            .collect();
        Self { events, tasks }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.tasks.is_empty()
    }

    pub fn event(&self, id: &str) -> Option<&ExtractedEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn task(&self, id: &str) -> Option<&ExtractedTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, kind: ItemKind, id: &str) -> bool {
        match kind {
            ItemKind::Event => self.event(id).is_some(),
            ItemKind::Task => self.task(id).is_some(),
        }
    }

    /// Copy of this result with one event recategorized. `None` if no such event.
    pub fn with_event_category(&self, id: &str, category: EventCategory) -> Option<Self> {
        self.event(id)?;
        let mut next = self.clone();
        for e in next.events.iter_mut().filter(|e| e.id == id) {
            e.category = category;
        }
        Some(next)
    }

    pub fn with_task_category(&self, id: &str, category: TaskCategory) -> Option<Self> {
        self.task(id)?;
        let mut next = self.clone();
        for t in next.tasks.iter_mut().filter(|t| t.id == id) {
            t.category = category;
        }
        Some(next)
    }
}
