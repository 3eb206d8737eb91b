use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::user::optional_trimmed;
use crate::utils::Violation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClubType {
    General,
    Faculty,
    Department,
    State,
    Religion,
    Src,
}

impl ClubType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClubType::General => "general",
            ClubType::Faculty => "faculty",
            ClubType::Department => "department",
            ClubType::State => "state",
            ClubType::Religion => "religion",
            ClubType::Src => "src",
        }
    }

    /// Every type except `general` is assigned by the matcher, never joined by hand.
    pub fn is_auto_joined(&self) -> bool {
        !matches!(self, ClubType::General)
    }
}

impl fmt::Display for ClubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClubType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(ClubType::General),
            "faculty" => Ok(ClubType::Faculty),
            "department" => Ok(ClubType::Department),
            "state" => Ok(ClubType::State),
            "religion" => Ok(ClubType::Religion),
            "src" => Ok(ClubType::Src),
            other => Err(format!("unknown club type '{}'", other)),
        }
    }
}

/// Matching criteria of an auto-joined club.
///
/// Each value maps to exactly one `match_key`, which carries a unique index
/// in the store so that a lookup is unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClubCriteria {
    Src,
    Faculty { faculty_code: String },
    Department { faculty_code: String, department_code: String },
    State { state: String },
    Religion { religion: String },
}

impl ClubCriteria {
    pub fn faculty(code: &str) -> Self {
        ClubCriteria::Faculty {
            faculty_code: code.trim().to_ascii_uppercase(),
        }
    }

    pub fn department(faculty_code: &str, department_code: &str) -> Self {
        ClubCriteria::Department {
            faculty_code: faculty_code.trim().to_ascii_uppercase(),
            department_code: department_code.trim().to_ascii_uppercase(),
        }
    }

    pub fn state(state: &str) -> Self {
        ClubCriteria::State {
            state: state.trim().to_lowercase(),
        }
    }

    pub fn religion(religion: &str) -> Self {
        ClubCriteria::Religion {
            religion: religion.trim().to_lowercase(),
        }
    }

    pub fn club_type(&self) -> ClubType {
        match self {
            ClubCriteria::Src => ClubType::Src,
            ClubCriteria::Faculty { .. } => ClubType::Faculty,
            ClubCriteria::Department { .. } => ClubType::Department,
            ClubCriteria::State { .. } => ClubType::State,
            ClubCriteria::Religion { .. } => ClubType::Religion,
        }
    }

    pub fn match_key(&self) -> String {
        match self {
            ClubCriteria::Src => "src".to_string(),
            ClubCriteria::Faculty { faculty_code } => format!("faculty:{}", faculty_code),
            ClubCriteria::Department {
                faculty_code,
                department_code,
            } => format!("department:{}:{}", faculty_code, department_code),
            ClubCriteria::State { state } => format!("state:{}", state),
            ClubCriteria::Religion { religion } => format!("religion:{}", religion),
        }
    }
}

/// Club record (collection: clubs)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Club {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub club_type: ClubType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faculty_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub religion: Option<String>,
    /// Absent for general clubs so the partial unique index ignores them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_key: Option<String>,
    pub member_count: i64,
    pub dues_applied: bool,
    pub dues_amount: f64,
    pub created_at: i64,
}

impl Club {
    pub fn new(
        id: String,
        name: String,
        description: Option<String>,
        criteria: Option<&ClubCriteria>,
        dues_applied: bool,
        dues_amount: f64,
        created_at: i64,
    ) -> Self {
        let mut club = Club {
            id,
            name,
            description,
            club_type: criteria.map_or(ClubType::General, ClubCriteria::club_type),
            faculty_code: None,
            department_code: None,
            state: None,
            religion: None,
            match_key: criteria.map(ClubCriteria::match_key),
            member_count: 0,
            dues_applied,
            dues_amount,
            created_at,
        };
        match criteria {
            Some(ClubCriteria::Faculty { faculty_code }) => {
                club.faculty_code = Some(faculty_code.clone());
            }
            Some(ClubCriteria::Department {
                faculty_code,
                department_code,
            }) => {
                club.faculty_code = Some(faculty_code.clone());
                club.department_code = Some(department_code.clone());
            }
            Some(ClubCriteria::State { state }) => club.state = Some(state.clone()),
            Some(ClubCriteria::Religion { religion }) => club.religion = Some(religion.clone()),
            Some(ClubCriteria::Src) | None => {}
        }
        club
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, utoipa::ToSchema)]
pub struct ClubSummary {
    pub id: String,
    pub name: String,
    pub club_type: ClubType,
}

impl From<&Club> for ClubSummary {
    fn from(club: &Club) -> Self {
        Self {
            id: club.id.clone(),
            name: club.name.clone(),
            club_type: club.club_type,
        }
    }
}

/// Admin payload for a new club
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct CreateClubRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub club_type: Option<String>,
    #[serde(default)]
    pub faculty_code: Option<String>,
    #[serde(default)]
    pub department_code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub religion: Option<String>,
    #[serde(default)]
    pub dues_applied: Option<bool>,
    #[serde(default)]
    pub dues_amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewClub {
    pub name: String,
    pub description: Option<String>,
    pub criteria: Option<ClubCriteria>,
    pub dues_applied: bool,
    pub dues_amount: f64,
}

impl CreateClubRequest {
    pub fn validate(&self) -> Result<NewClub, Vec<Violation>> {
        let mut violations = Vec::new();

        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        let name_len = name.chars().count();
        if name_len < 2 || name_len > 100 {
            violations.push(Violation::new("name", "must be between 2 and 100 characters"));
        }

        let description = optional_trimmed(&self.description);
        if description.as_ref().is_some_and(|d| d.chars().count() > 1000) {
            violations.push(Violation::new("description", "must be at most 1000 characters"));
        }

        let club_type = match self.club_type.as_deref() {
            None => Some(ClubType::General),
            Some(raw) => match raw.parse::<ClubType>() {
                Ok(t) => Some(t),
                Err(e) => {
                    violations.push(Violation::new("club_type", e));
                    None
                }
            },
        };

        let faculty = optional_trimmed(&self.faculty_code);
        let department = optional_trimmed(&self.department_code);
        let state = optional_trimmed(&self.state);
        let religion = optional_trimmed(&self.religion);

        let mut require = |field: &str, value: &Option<String>| {
            if value.is_none() {
                violations.push(Violation::new(field, "is required for this club type"));
            }
        };
        let criteria = match club_type {
            Some(ClubType::General) | None => None,
            Some(ClubType::Src) => Some(ClubCriteria::Src),
            Some(ClubType::Faculty) => {
                require("faculty_code", &faculty);
                faculty.as_deref().map(ClubCriteria::faculty)
            }
            Some(ClubType::Department) => {
                require("faculty_code", &faculty);
                require("department_code", &department);
                match (faculty.as_deref(), department.as_deref()) {
                    (Some(f), Some(d)) => Some(ClubCriteria::department(f, d)),
                    _ => None,
                }
            }
            Some(ClubType::State) => {
                require("state", &state);
                state.as_deref().map(ClubCriteria::state)
            }
            Some(ClubType::Religion) => {
                require("religion", &religion);
                religion.as_deref().map(ClubCriteria::religion)
            }
        };

        let dues_applied = self.dues_applied.unwrap_or(false);
        let dues_amount = self.dues_amount.unwrap_or(0.0);
        if !dues_amount.is_finite() || dues_amount < 0.0 {
            violations.push(Violation::new("dues_amount", "must be a nonnegative amount"));
        }

        if !violations.is_empty() {
            return Err(violations);
        }

        Ok(NewClub {
            name: name.to_string(),
            description,
            criteria,
            dues_applied,
            dues_amount,
        })
    }
}
