//! Member and yearly role models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::team::{categorize, Category};

/// System role a member holds, either globally or for one team year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    Admin,
    NodalOfficer,
    Ceo,
    Lead,
    CoLead,
    Coordinator,
    #[default]
    Member,
}

impl SystemRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemRole::Admin => "admin",
            SystemRole::NodalOfficer => "nodal_officer",
            SystemRole::Ceo => "ceo",
            SystemRole::Lead => "lead",
            SystemRole::CoLead => "co_lead",
            SystemRole::Coordinator => "coordinator",
            SystemRole::Member => "member",
        }
    }

    /// Roles allowed into the admin area.
    pub fn can_manage_members(&self) -> bool {
        matches!(self, SystemRole::Admin | SystemRole::NodalOfficer)
    }
}

impl fmt::Display for SystemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(SystemRole::Admin),
            "nodal_officer" => Ok(SystemRole::NodalOfficer),
            "ceo" => Ok(SystemRole::Ceo),
            "lead" => Ok(SystemRole::Lead),
            "co_lead" => Ok(SystemRole::CoLead),
            "coordinator" => Ok(SystemRole::Coordinator),
            "member" => Ok(SystemRole::Member),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// The role a member holds for one team year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyRole {
    pub year: i32,
    #[serde(default)]
    pub role: SystemRole,
    #[serde(default)]
    pub team_role: String,
    /// Academic year of study, 1 through 4.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<u8>,
}

impl YearlyRole {
    /// The role assigned when a year is first selected.
    pub fn default_for(year: i32) -> Self {
        Self {
            year,
            role: SystemRole::Member,
            team_role: String::new(),
            academic_year: None,
        }
    }
}

/// A club member record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Top-level role, used when no yearly role exists for a viewed year.
    pub role: SystemRole,
    #[serde(default)]
    pub team_role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub active: bool,
    #[serde(default)]
    pub display_order: Option<i64>,
    #[serde(default)]
    pub team_years: Vec<i32>,
    #[serde(default)]
    pub yearly_roles: Vec<YearlyRole>,
    pub created_at: String,
    pub updated_at: String,
}

impl Member {
    pub fn yearly_role(&self, year: i32) -> Option<&YearlyRole> {
        self.yearly_roles.iter().find(|r| r.year == year)
    }

    /// Role and team role shown for `year`, falling back to the top-level fields
    /// for records that predate yearly roles.
    pub fn resolve_role(&self, year: i32) -> (SystemRole, &str) {
        match self.yearly_role(year) {
            Some(yearly) => (yearly.role, yearly.team_role.as_str()),
            None => (self.role, self.team_role.as_str()),
        }
    }

    pub fn category_for(&self, year: i32) -> Category {
        let (role, team_role) = self.resolve_role(year);
        categorize(role, team_role)
    }

    pub fn belongs_to_year(&self, year: i32) -> bool {
        self.team_years.contains(&year)
    }
}

/// Request body for inviting a new member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub team_years: Vec<i32>,
    #[serde(default)]
    pub yearly_roles: Vec<YearlyRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<SystemRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default)]
    pub send_email: bool,
}

/// Fields accepted by the admin edit and self-service edit forms.
///
/// Absent fields are left unchanged. When `team_years` is present the yearly
/// roles are replaced as a whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<SystemRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_years: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yearly_roles: Option<Vec<YearlyRole>>,
}

/// One entry of a display-order batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayOrderUpdate {
    pub user_id: String,
    pub display_order: i64,
}

/// Request body for the batch display-order update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDisplayOrderRequest {
    pub updates: Vec<DisplayOrderUpdate>,
}

/// Request body for an admin password reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub new_password: String,
}

/// Public roster entry for one team year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamListing {
    pub id: String,
    pub name: String,
    pub role: SystemRole,
    pub team_role: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    pub display_order: i64,
}

impl TeamListing {
    pub fn for_year(member: &Member, year: i32) -> Self {
        let (role, team_role) = member.resolve_role(year);
        Self {
            id: member.id.clone(),
            name: member.name.clone(),
            role,
            team_role: team_role.to_string(),
            category: categorize(role, team_role),
            profile_image: member.profile_image.clone(),
            linkedin: member.linkedin.clone(),
            github: member.github.clone(),
            display_order: member.display_order.unwrap_or(0),
        }
    }
}
