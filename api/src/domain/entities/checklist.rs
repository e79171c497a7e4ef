//! Checklist domain entity
//!
//! Ordered task lists (onboarding, listing preparation, closing) with
//! completion tracking per item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::double_option;
use super::office::OfficeId;

entity_id!(
    /// Unique identifier for a checklist
    ChecklistId
);

entity_id!(
    /// Unique identifier for a checklist item
    ChecklistItemId
);

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistItem {
    pub id: ChecklistItemId,
    pub checklist_id: ChecklistId,
    pub position: i32,
    pub text: String,
    pub is_required: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ChecklistItem {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Checklist {
    pub id: ChecklistId,
    pub name: String,
    pub description: Option<String>,
    pub office_id: Option<OfficeId>,
    /// Items ordered by position
    pub items: Vec<ChecklistItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Completion summary for a checklist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChecklistProgress {
    pub completed: usize,
    pub total: usize,
    pub required_remaining: usize,
}

impl Checklist {
    pub fn progress(&self) -> ChecklistProgress {
        ChecklistProgress {
            completed: self.items.iter().filter(|i| i.is_completed()).count(),
            total: self.items.len(),
            required_remaining: self
                .items
                .iter()
                .filter(|i| i.is_required && !i.is_completed())
                .count(),
        }
    }

    /// Position for an item appended to the end
    pub fn next_position(&self) -> i32 {
        self.items.iter().map(|i| i.position).max().map_or(0, |p| p + 1)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChecklistItem {
    pub text: String,
    #[serde(default)]
    pub is_required: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChecklist {
    pub name: String,
    pub description: Option<String>,
    pub office_id: Option<OfficeId>,
    #[serde(default)]
    pub items: Vec<NewChecklistItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChecklistChanges {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub office_id: Option<Option<OfficeId>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChecklistItemChanges {
    pub text: Option<String>,
    pub is_required: Option<bool>,
    pub position: Option<i32>,
}
