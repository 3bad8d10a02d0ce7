use serde::{Deserialize, Serialize};

use crate::fl;

/// Fixed palette used to tint categories in every front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryColor {
    Blue,
    Green,
    Red,
    Purple,
    Orange,
    Pink,
    Indigo,
    Gray,
}

impl CategoryColor {
    pub fn hex(&self) -> &'static str {
        match self {
            Self::Blue => "#3b82f6",
            Self::Green => "#22c55e",
            Self::Red => "#ef4444",
            Self::Purple => "#a855f7",
            Self::Orange => "#f97316",
            Self::Pink => "#ec4899",
            Self::Indigo => "#6366f1",
            Self::Gray => "#6b7280",
        }
    }
}

/// Display metadata for a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInfo {
    pub label: String,
    pub color: CategoryColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Personal,
    Family,
    ClinicPrivate,
    PublicFramework,
    StudyGroup,
    #[default]
    #[serde(other)]
    Unknown,
}

impl EventCategory {
    pub const ALL: &'static [EventCategory] = &[
        Self::Personal,
        Self::Family,
        Self::ClinicPrivate,
        Self::PublicFramework,
        Self::StudyGroup,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Family => "family",
            Self::ClinicPrivate => "clinic_private",
            Self::PublicFramework => "public_framework",
            Self::StudyGroup => "study_group",
            Self::Unknown => "unknown",
        }
    }

    /// What the extraction service is told about this category.
    pub fn definition(&self) -> &'static str {
        match self {
            Self::Personal => "For your personal appointments, hobbies, self-time.",
            Self::Family => {
                "For family events, kids' activities, school events, vacations, household \
                 appointments (e.g., doctor). This calendar is shared with your partner."
            }
            Self::ClinicPrivate => {
                "For appointments with patients, professional calls, writing letters in your \
                 private clinic. A virtual assistant has view/manage access."
            }
            Self::PublicFramework => {
                "For work meetings, team meetings, and dedicated time for the \"day hospital\" \
                 project in your public setting job."
            }
            Self::StudyGroup => {
                "For the bi-weekly learning group meetings. This calendar is shared with the group."
            }
            Self::Unknown => "If a category is unclear from the text.",
        }
    }

    pub fn info(&self) -> CategoryInfo {
        match self {
            Self::Personal => CategoryInfo {
                label: fl!("category-event-personal"),
                color: CategoryColor::Blue,
            },
            Self::Family => CategoryInfo {
                label: fl!("category-event-family"),
                color: CategoryColor::Green,
            },
            Self::ClinicPrivate => CategoryInfo {
                label: fl!("category-event-clinic-private"),
                color: CategoryColor::Red,
            },
            Self::PublicFramework => CategoryInfo {
                label: fl!("category-event-public-framework"),
                color: CategoryColor::Purple,
            },
            Self::StudyGroup => CategoryInfo {
                label: fl!("category-event-study-group"),
                color: CategoryColor::Orange,
            },
            Self::Unknown => CategoryInfo {
                label: fl!("category-unknown"),
                color: CategoryColor::Gray,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Personal,
    HomeFamily,
    ClinicSelf,
    ClinicSecretary,
    ProjectDayHospital,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TaskCategory {
    pub const ALL: &'static [TaskCategory] = &[
        Self::Personal,
        Self::HomeFamily,
        Self::ClinicSelf,
        Self::ClinicSecretary,
        Self::ProjectDayHospital,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::HomeFamily => "home_family",
            Self::ClinicSelf => "clinic_self",
            Self::ClinicSecretary => "clinic_secretary",
            Self::ProjectDayHospital => "project_day_hospital",
            Self::Unknown => "unknown",
        }
    }

    pub fn definition(&self) -> &'static str {
        match self {
            Self::Personal => "Things you need to do for yourself.",
            Self::HomeFamily => {
                "Shared list with your partner for the home. e.g., \"buy milk\", \"fix the faucet\"."
            }
            Self::ClinicSelf => {
                "Tasks for you to do related to the clinic. e.g., \"call patient X\", \
                 \"review medication for Y\"."
            }
            Self::ClinicSecretary => "Administrative tasks that can be delegated to a secretary.",
            Self::ProjectDayHospital => {
                "Tasks related to the day hospital project. e.g., \"write protocol\", \
                 \"contact procurement\"."
            }
            Self::Unknown => "If a category is unclear from the text.",
        }
    }

    pub fn info(&self) -> CategoryInfo {
        match self {
            Self::Personal => CategoryInfo {
                label: fl!("category-task-personal"),
                color: CategoryColor::Blue,
            },
            Self::HomeFamily => CategoryInfo {
                label: fl!("category-task-home-family"),
                color: CategoryColor::Green,
            },
            Self::ClinicSelf => CategoryInfo {
                label: fl!("category-task-clinic-self"),
                color: CategoryColor::Red,
            },
            Self::ClinicSecretary => CategoryInfo {
                label: fl!("category-task-clinic-secretary"),
                color: CategoryColor::Pink,
            },
            Self::ProjectDayHospital => CategoryInfo {
                label: fl!("category-task-project-day-hospital"),
                color: CategoryColor::Indigo,
            },
            Self::Unknown => CategoryInfo {
                label: fl!("category-unknown"),
                color: CategoryColor::Gray,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_snake_case_ids() {
        let json = serde_json::to_string(&EventCategory::PublicFramework).unwrap();
        assert_eq!(json, "\"public_framework\"");
        let parsed: TaskCategory = serde_json::from_str("\"project_day_hospital\"").unwrap();
        assert_eq!(parsed, TaskCategory::ProjectDayHospital);
    }

    #[test]
    fn unrecognized_category_falls_back_to_unknown() {
        let parsed: EventCategory = serde_json::from_str("\"clinic_self\"").unwrap();
        assert_eq!(parsed, EventCategory::Unknown);
    }

    #[test]
    fn as_str_matches_serde() {
        for category in EventCategory::ALL {
            let json = serde_json::to_string(category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
        for category in TaskCategory::ALL {
            let json = serde_json::to_string(category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
    }

    #[test]
    fn fallback_labels_are_english() {
        assert_eq!(EventCategory::Family.info().label, "Family & home");
        assert_eq!(TaskCategory::Unknown.info().label, "Uncategorized");
        assert_eq!(TaskCategory::ClinicSecretary.info().color, CategoryColor::Pink);
    }
}
