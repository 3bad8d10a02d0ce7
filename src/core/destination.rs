use serde::{Deserialize, Serialize};

/// Anything an extracted item can be confirmed into.
pub trait Destination {
    fn id(&self) -> &str;
    fn display_name(&self) -> &str;
}

/// A calendar from the user's calendar list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub background_color: Option<String>,
}

impl Destination for Calendar {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.summary
    }
}

/// A Google Tasks list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

impl Destination for TaskList {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.title
    }
}

/// Both destination lists, fetched together after sign-in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destinations {
    pub calendars: Vec<Calendar>,
    pub task_lists: Vec<TaskList>,
}
