//! Display category derived from a role and free-text team role.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::SystemRole;

/// Words in a team role that mark a leadership position.
const LEADERSHIP_TITLES: &[&str] = &[
    "president",
    "vice",
    "secretary",
    "treasurer",
    "ceo",
    "cto",
    "coo",
    "cfo",
    "lead",
    "co-lead",
    "colead",
    "head",
    "coordinator",
    "director",
    "founder",
];

/// Section of the public team page a member is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Faculty")]
    Faculty,
    #[serde(rename = "Core Team")]
    CoreTeam,
    #[serde(rename = "Team Member")]
    TeamMember,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Faculty => "Faculty",
            Category::CoreTeam => "Core Team",
            Category::TeamMember => "Team Member",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a member for display.
pub fn categorize(role: SystemRole, team_role: &str) -> Category {
    let team_role = team_role.to_lowercase();

    if role == SystemRole::NodalOfficer || team_role.contains("faculty") {
        return Category::Faculty;
    }

    let leadership_role = matches!(
        role,
        SystemRole::Ceo | SystemRole::Lead | SystemRole::CoLead | SystemRole::Coordinator
    );
    if leadership_role || is_leadership_title(&team_role) {
        return Category::CoreTeam;
    }

    Category::TeamMember
}

fn is_leadership_title(team_role: &str) -> bool {
    team_role
        .split(|c: char| c.is_whitespace() || c == '/' || c == ',' || c == '&')
        .filter(|word| !word.is_empty())
        .any(|word| LEADERSHIP_TITLES.contains(&word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodal_officer_is_faculty() {
        assert_eq!(categorize(SystemRole::NodalOfficer, ""), Category::Faculty);
    }

    #[test]
    fn test_faculty_mentioned_in_team_role() {
        assert_eq!(
            categorize(SystemRole::Member, "Faculty Advisor"),
            Category::Faculty
        );
    }

    #[test]
    fn test_leadership_roles_are_core_team() {
        for role in [
            SystemRole::Ceo,
            SystemRole::Lead,
            SystemRole::CoLead,
            SystemRole::Coordinator,
        ] {
            assert_eq!(categorize(role, ""), Category::CoreTeam);
        }
    }

    #[test]
    fn test_leadership_title_in_team_role() {
        assert_eq!(
            categorize(SystemRole::Member, "Vice President"),
            Category::CoreTeam
        );
        assert_eq!(
            categorize(SystemRole::Member, "Tech Lead"),
            Category::CoreTeam
        );
        assert_eq!(
            categorize(SystemRole::Member, "Head of Marketing"),
            Category::CoreTeam
        );
    }

    #[test]
    fn test_plain_member_is_team_member() {
        assert_eq!(categorize(SystemRole::Member, ""), Category::TeamMember);
        assert_eq!(
            categorize(SystemRole::Member, "Graphic Designer"),
            Category::TeamMember
        );
        // "leading" is not the title "lead"
        assert_eq!(
            categorize(SystemRole::Member, "Leading volunteer"),
            Category::TeamMember
        );
    }

    #[test]
    fn test_admin_without_title_is_team_member() {
        assert_eq!(categorize(SystemRole::Admin, ""), Category::TeamMember);
    }

    #[test]
    fn test_category_serializes_as_label() {
        let json = serde_json::to_string(&Category::CoreTeam).unwrap();
        assert_eq!(json, "\"Core Team\"");
    }
}
