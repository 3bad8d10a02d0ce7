//! Picks a default calendar or task list for an extracted item.
//!
//! The extraction service only knows the fixed category taxonomy, while the
//! user's calendars carry free-form names. The bridge is a keyword list per
//! category, matched case-insensitively against destination names. The first
//! destination (in the order the provider returned them) containing any
//! keyword wins; otherwise a fallback is used. No scoring.

use super::category::{EventCategory, TaskCategory};
use super::destination::{Calendar, Destination, TaskList};

/// Calendar id understood by the provider as "the user's main calendar".
pub const PRIMARY_CALENDAR: &str = "primary";

fn event_keywords(category: EventCategory) -> &'static [&'static str] {
    match category {
        EventCategory::Personal => &["אישי", "personal"],
        EventCategory::Family => &["משפחה", "family", "home"],
        EventCategory::ClinicPrivate => &["קליניקה", "clinic"],
        EventCategory::PublicFramework => &["ציבורית", "עבודה", "public", "work"],
        EventCategory::StudyGroup => &["למידה", "study"],
        EventCategory::Unknown => &[],
    }
}

fn task_keywords(category: TaskCategory) -> &'static [&'static str] {
    match category {
        TaskCategory::Personal => &["אישי", "personal"],
        TaskCategory::HomeFamily => &["משפחה", "בית", "family", "home"],
        TaskCategory::ClinicSelf | TaskCategory::ClinicSecretary => &["קליניקה", "clinic"],
        TaskCategory::ProjectDayHospital => &["פרויקט", "אשפוז יום", "project", "day hospital"],
        TaskCategory::Unknown => &[],
    }
}

fn first_match<'a, D: Destination>(destinations: &'a [D], keywords: &[&str]) -> Option<&'a str> {
    if keywords.is_empty() {
        return None;
    }
    destinations
        .iter()
        .find(|d| {
            let name = d.display_name().to_lowercase();
            keywords.iter().any(|k| name.contains(k))
        })
        .map(|d| d.id())
}

/// Default calendar for an event. Falls back to the first calendar whose id
/// looks like an account address (the user's own calendar), then to the first
/// calendar, then to [`PRIMARY_CALENDAR`] when there are none.
pub fn select_calendar(category: EventCategory, calendars: &[Calendar]) -> String {
    let Some(first) = calendars.first() else {
        return PRIMARY_CALENDAR.to_string();
    };
    let fallback = calendars
        .iter()
        .find(|c| c.id.contains('@'))
        .unwrap_or(first);

    first_match(calendars, event_keywords(category))
        .unwrap_or(&fallback.id)
        .to_string()
}

/// Default task list for a task, or `None` when the user has no lists. Callers
/// must not allow confirmation until a list is chosen.
pub fn select_task_list(category: TaskCategory, task_lists: &[TaskList]) -> Option<String> {
    let first = task_lists.first()?;
    let id = first_match(task_lists, task_keywords(category)).unwrap_or(&first.id);
    Some(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cal(id: &str, summary: &str) -> Calendar {
        Calendar {
            id: id.into(),
            summary: summary.into(),
            background_color: None,
        }
    }

    fn list(id: &str, title: &str) -> TaskList {
        TaskList {
            id: id.into(),
            title: title.into(),
        }
    }

    #[test]
    fn family_event_picks_family_calendar() {
        let calendars = vec![cal("a", "Personal"), cal("b", "Family Calendar")];
        assert_eq!(select_calendar(EventCategory::Family, &calendars), "b");
    }

    #[test]
    fn clinic_task_picks_clinic_list() {
        let lists = vec![list("x", "Clinic Tasks")];
        assert_eq!(select_task_list(TaskCategory::ClinicSelf, &lists).as_deref(), Some("x"));
    }

    #[test]
    fn hebrew_names_match() {
        let calendars = vec![
            cal("personal@demo.com", "אישי"),
            cal("family_demo", "משפחה"),
            cal("work_demo", "עבודה (מסגרת ציבורית)"),
            cal("study_demo", "קבוצת למידה"),
        ];
        assert_eq!(select_calendar(EventCategory::PublicFramework, &calendars), "work_demo");
        assert_eq!(select_calendar(EventCategory::StudyGroup, &calendars), "study_demo");

        let lists = vec![list("personal_tasks", "אישי"), list("project_tasks", "פרויקט אשפוז יום")];
        assert_eq!(
            select_task_list(TaskCategory::ProjectDayHospital, &lists).as_deref(),
            Some("project_tasks")
        );
    }

    #[test]
    fn empty_lists() {
        assert_eq!(select_calendar(EventCategory::Personal, &[]), PRIMARY_CALENDAR);
        assert_eq!(select_task_list(TaskCategory::Personal, &[]), None);
    }

    #[test]
    fn calendar_fallback_prefers_account_address() {
        let calendars = vec![cal("holidays", "Holidays"), cal("me@example.com", "Me")];
        assert_eq!(select_calendar(EventCategory::StudyGroup, &calendars), "me@example.com");
        assert_eq!(select_calendar(EventCategory::Unknown, &calendars), "me@example.com");
    }

    #[test]
    fn calendar_fallback_without_address_is_first() {
        let calendars = vec![cal("c1", "Holidays"), cal("c2", "Birthdays")];
        assert_eq!(select_calendar(EventCategory::Family, &calendars), "c1");
    }

    #[test]
    fn task_fallback_is_first_list() {
        let lists = vec![list("l1", "Inbox"), list("l2", "Groceries")];
        assert_eq!(select_task_list(TaskCategory::HomeFamily, &lists).as_deref(), Some("l1"));
        assert_eq!(select_task_list(TaskCategory::Unknown, &lists).as_deref(), Some("l1"));
    }

    #[test]
    fn matching_is_case_insensitive_and_first_wins() {
        let calendars = vec![
            cal("me@example.com", "Me"),
            cal("w1", "WORK stuff"),
            cal("w2", "Work"),
        ];
        assert_eq!(select_calendar(EventCategory::PublicFramework, &calendars), "w1");
    }

    #[test]
    fn clinic_secretary_shares_clinic_keywords() {
        let lists = vec![list("a", "Personal"), list("b", "My Clinic")];
        assert_eq!(
            select_task_list(TaskCategory::ClinicSecretary, &lists).as_deref(),
            Some("b")
        );
    }
}
