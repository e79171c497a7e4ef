//! Template domain entity
//!
//! A template is an HTML document definition used to generate listing
//! materials. Every content change is kept as a numbered version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit::AuditAction;
use super::employee::EmployeeId;
use super::taxonomy::{CategoryId, TagId};
use super::double_option;

entity_id!(
    /// Unique identifier for a template
    TemplateId
);

string_enum!(
    /// Publication status of a template
    TemplateStatus {
        Draft => "draft",
        Published => "published",
        Archived => "archived",
    }
);

impl TemplateStatus {
    /// Whether a template may move from `self` to `next`
    pub fn can_transition_to(&self, next: TemplateStatus) -> bool {
        use TemplateStatus::*;
        matches!(
            (*self, next),
            (Draft, Published) | (Published, Draft) | (Draft, Archived) | (Published, Archived)
                | (Archived, Draft)
        )
    }

    /// Audit action recorded for a transition into `next`
    pub fn transition_action(&self, next: TemplateStatus) -> AuditAction {
        match (*self, next) {
            (_, TemplateStatus::Published) => AuditAction::Publish,
            (TemplateStatus::Archived, TemplateStatus::Draft) => AuditAction::Restore,
            (_, TemplateStatus::Draft) => AuditAction::Unpublish,
            (_, TemplateStatus::Archived) => AuditAction::Archive,
        }
    }
}

/// An HTML template with its taxonomy associations
#[derive(Debug, Clone, Serialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub content: String,
    pub status: TemplateStatus,
    pub current_version: i32,
    pub created_by: Option<EmployeeId>,
    pub tag_ids: Vec<TagId>,
    pub category_ids: Vec<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored snapshot of template content
#[derive(Debug, Clone, Serialize)]
pub struct TemplateVersion {
    pub template_id: TemplateId,
    pub version_number: i32,
    pub content: String,
    pub change_note: Option<String>,
    pub created_by: Option<EmployeeId>,
    pub created_at: DateTime<Utc>,
}

/// Data needed to create a new template
#[derive(Debug, Clone, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub content: String,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
    #[serde(skip)]
    pub created_by: Option<EmployeeId>,
}

/// Partial update of a template
///
/// A `content` change produces a new version; the other fields update in place.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateChanges {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub content: Option<String>,
    pub change_note: Option<String>,
    pub tag_ids: Option<Vec<TagId>>,
    pub category_ids: Option<Vec<CategoryId>>,
    #[serde(skip)]
    pub updated_by: Option<EmployeeId>,
}

impl TemplateChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.content.is_none()
            && self.tag_ids.is_none()
            && self.category_ids.is_none()
    }
}

/// Filters for listing templates
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateFilter {
    pub status: Option<TemplateStatus>,
    pub tag: Option<TagId>,
    pub category: Option<CategoryId>,
    /// Case-insensitive match on name or slug
    pub search: Option<String>,
}

impl TemplateFilter {
    pub fn matches(&self, template: &Template) -> bool {
        if let Some(status) = self.status {
            if template.status != status {
                return false;
            }
        }
        if let Some(tag) = self.tag {
            if !template.tag_ids.contains(&tag) {
                return false;
            }
        }
        if let Some(category) = self.category {
            if !template.category_ids.contains(&category) {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().map(str::to_lowercase) {
            if !template.name.to_lowercase().contains(&search)
                && !template.slug.to_lowercase().contains(&search)
            {
                return false;
            }
        }
        true
    }
}

/// Build a URL-safe slug: lowercase ASCII alphanumerics separated by single dashes
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Check a caller-supplied slug is already in canonical form
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug.len() <= 120 && slugify(slug) == slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn make_template() -> Template {
        Template {
            id: TemplateId::new(),
            name: "Open House Flyer".to_string(),
            slug: "open-house-flyer".to_string(),
            description: None,
            content: "<p>Hello</p>".to_string(),
            status: TemplateStatus::Draft,
            current_version: 1,
            created_by: None,
            tag_ids: vec![],
            category_ids: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn status_transitions() {
        use TemplateStatus::*;
        assert!(Draft.can_transition_to(Published));
        assert!(Published.can_transition_to(Draft));
        assert!(Published.can_transition_to(Archived));
        assert!(Archived.can_transition_to(Draft));
        assert!(!Archived.can_transition_to(Published));
        assert!(!Draft.can_transition_to(Draft));
    }

    #[test]
    fn transition_actions() {
        use TemplateStatus::*;
        assert_eq!(Draft.transition_action(Published), AuditAction::Publish);
        assert_eq!(Published.transition_action(Draft), AuditAction::Unpublish);
        assert_eq!(Archived.transition_action(Draft), AuditAction::Restore);
        assert_eq!(Draft.transition_action(Archived), AuditAction::Archive);
    }

    #[test]
    fn status_from_str() {
        assert_eq!(
            "PUBLISHED".parse::<TemplateStatus>().unwrap(),
            TemplateStatus::Published
        );
        let err = "live".parse::<TemplateStatus>().unwrap_err();
        assert!(err.contains("draft, published, archived"));
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Open House  Flyer!"), "open-house-flyer");
        assert_eq!(slugify("  --Just Listed-- "), "just-listed");
        assert_eq!(slugify("Café 2024"), "caf-2024");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("open-house"));
        assert!(!is_valid_slug("Open-House"));
        assert!(!is_valid_slug("open--house"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn filter_matches_search_and_tags() {
        let tag = TagId(Uuid::new_v4());
        let mut template = make_template();
        template.tag_ids.push(tag);

        let filter = TemplateFilter {
            search: Some("HOUSE".to_string()),
            tag: Some(tag),
            ..Default::default()
        };
        assert!(filter.matches(&template));

        let filter = TemplateFilter {
            status: Some(TemplateStatus::Published),
            ..Default::default()
        };
        assert!(!filter.matches(&template));
    }

    #[test]
    fn changes_is_empty() {
        assert!(TemplateChanges::default().is_empty());
        let changes = TemplateChanges {
            content: Some("<p>x</p>".into()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
