use serde::{Deserialize, Serialize};

use crate::utils::Violation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Dean,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::Student
    }
}

/// Verified caller identity handed over by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Registered student (collection: users)
///
/// Identity fields (`identifier`, derived codes, `state`, `religion`) are
/// written once at registration and never updated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faculty_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub religion: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct RegisterUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub religion: Option<String>,
}

/// Registration payload after schema checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub identifier: String,
    pub state: Option<String>,
    pub religion: Option<String>,
}

impl RegisterUserRequest {
    pub fn validate(&self) -> Result<NewUser, Vec<Violation>> {
        let mut violations = Vec::new();

        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        let name_len = name.chars().count();
        if name_len < 2 || name_len > 100 {
            violations.push(Violation::new("name", "must be between 2 and 100 characters"));
        }

        let identifier = self.identifier.as_deref().map(str::trim).unwrap_or_default();
        if identifier.is_empty() {
            violations.push(Violation::new("identifier", "is required"));
        } else if identifier.chars().count() > 64 {
            violations.push(Violation::new("identifier", "must be at most 64 characters"));
        }

        let state = optional_trimmed(&self.state);
        let religion = optional_trimmed(&self.religion);
        for (field, value) in [("state", &state), ("religion", &religion)] {
            if value.as_ref().is_some_and(|v| v.chars().count() > 50) {
                violations.push(Violation::new(field, "must be at most 50 characters"));
            }
        }

        if !violations.is_empty() {
            return Err(violations);
        }

        Ok(NewUser {
            name: name.to_string(),
            identifier: identifier.to_string(),
            state,
            religion,
        })
    }
}

pub(crate) fn optional_trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Author identity resolved for display.
#[derive(Debug, Clone, Serialize, PartialEq, utoipa::ToSchema)]
pub struct AuthorSummary {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl AuthorSummary {
    pub fn unknown(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: "Unknown user".to_string(),
            role: Role::Student,
        }
    }
}

impl From<&User> for AuthorSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}
