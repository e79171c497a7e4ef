//! Employee domain entity
//!
//! Employees belong to an office and carry system roles that gate what
//! they may change through the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::double_option;
use super::office::OfficeId;

entity_id!(
    /// Unique identifier for an employee
    EmployeeId
);

string_enum!(
    /// Access level within Document Hub
    SystemRole {
        Admin => "admin",
        Editor => "editor",
        Viewer => "viewer",
    }
);

#[derive(Debug, Clone, Serialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub office_id: Option<OfficeId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub roles: Vec<SystemRole>,
    /// Whether an API key is currently issued (the hash never leaves the repository)
    pub has_api_key: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_role(&self, role: SystemRole) -> bool {
        self.roles.contains(&role)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEmployee {
    pub office_id: Option<OfficeId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub title: Option<String>,
    pub phone: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "default_roles")]
    pub roles: Vec<SystemRole>,
}

fn default_active() -> bool {
    true
}

fn default_roles() -> Vec<SystemRole> {
    vec![SystemRole::Viewer]
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeChanges {
    #[serde(default, deserialize_with = "double_option")]
    pub office_id: Option<Option<OfficeId>>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Filters for listing employees
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeFilter {
    pub office_id: Option<OfficeId>,
    pub active: Option<bool>,
}

impl EmployeeFilter {
    pub fn for_office(office_id: OfficeId) -> Self {
        Self {
            office_id: Some(office_id),
            active: None,
        }
    }

    pub fn matches(&self, employee: &Employee) -> bool {
        self.office_id
            .map_or(true, |id| employee.office_id == Some(id))
            && self.active.map_or(true, |a| employee.is_active == a)
    }
}

/// The authenticated caller of a request
#[derive(Debug, Clone)]
pub enum Principal {
    /// Bootstrap administrator authenticated with the configured key
    System,
    Employee(Employee),
}

impl Principal {
    /// Employee id recorded as the actor in audit entries
    pub fn actor_id(&self) -> Option<EmployeeId> {
        match self {
            Principal::System => None,
            Principal::Employee(e) => Some(e.id),
        }
    }

    pub fn is_admin(&self) -> bool {
        match self {
            Principal::System => true,
            Principal::Employee(e) => e.has_role(SystemRole::Admin),
        }
    }

    /// Editors and admins may change content
    pub fn can_write(&self) -> bool {
        match self {
            Principal::System => true,
            Principal::Employee(e) => {
                e.has_role(SystemRole::Admin) || e.has_role(SystemRole::Editor)
            }
        }
    }
}

/// Emails are lowercased and need exactly one `@` between a non-empty local
/// part and domain
pub fn normalize_email(email: &str) -> Result<String, String> {
    let email = email.trim().to_lowercase();
    let mut parts = email.split('@');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    };
    if !valid {
        return Err(format!("'{}' is not a valid email address", email));
    }
    Ok(email)
}

/// Deduplicate roles while keeping the caller's order
pub fn dedup_roles(roles: &[SystemRole]) -> Vec<SystemRole> {
    let mut out = Vec::with_capacity(roles.len());
    for role in roles {
        if !out.contains(role) {
            out.push(*role);
        }
    }
    out
}
