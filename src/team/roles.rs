//! Yearly role assignment.
//!
//! A member's team years are exactly the years they hold a [`YearlyRole`] for.
//! The editor stages year toggles and per-year edits before submission; the
//! server reconciles submitted `teamYears` and `yearlyRoles` with
//! [`reconcile_yearly_roles`].

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Member, SystemRole, YearlyRole};
use crate::validation::{validate_academic_year, ValidationError};

/// Per-year fields as edited. `None` means the field was never set and falls
/// back to its default on submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearlyRoleDraft {
    pub role: Option<SystemRole>,
    pub team_role: Option<String>,
    pub academic_year: Option<u8>,
}

impl YearlyRoleDraft {
    fn selected_default() -> Self {
        Self {
            role: Some(SystemRole::Member),
            team_role: Some(String::new()),
            academic_year: None,
        }
    }

    fn into_role(self, year: i32) -> YearlyRole {
        YearlyRole {
            year,
            role: self.role.unwrap_or(SystemRole::Member),
            team_role: self.team_role.unwrap_or_default(),
            academic_year: self.academic_year,
        }
    }
}

/// Team years and yearly roles ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamYearsPayload {
    pub team_years: Vec<i32>,
    pub yearly_roles: Vec<YearlyRole>,
}

/// Staged team-year selection for a member under edit.
#[derive(Debug, Clone, Default)]
pub struct TeamYearsEditor {
    drafts: BTreeMap<i32, YearlyRoleDraft>,
}

impl TeamYearsEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a member's stored years. Years without a stored yearly role
    /// are selected with unset fields.
    pub fn from_member(member: &Member) -> Self {
        let mut drafts: BTreeMap<i32, YearlyRoleDraft> = member
            .team_years
            .iter()
            .map(|year| (*year, YearlyRoleDraft::default()))
            .collect();

        for role in &member.yearly_roles {
            drafts.insert(
                role.year,
                YearlyRoleDraft {
                    role: Some(role.role),
                    team_role: Some(role.team_role.clone()),
                    academic_year: role.academic_year,
                },
            );
        }

        Self { drafts }
    }

    /// Flip a year on or off. Returns whether the year is selected afterwards.
    pub fn toggle_year(&mut self, year: i32) -> bool {
        if self.drafts.remove(&year).is_some() {
            false
        } else {
            self.drafts.insert(year, YearlyRoleDraft::selected_default());
            true
        }
    }

    /// Select a year, keeping any draft that already exists for it.
    pub fn select_year(&mut self, year: i32) {
        self.drafts
            .entry(year)
            .or_insert_with(YearlyRoleDraft::selected_default);
    }

    pub fn deselect_year(&mut self, year: i32) {
        self.drafts.remove(&year);
    }

    pub fn is_selected(&self, year: i32) -> bool {
        self.drafts.contains_key(&year)
    }

    /// Selected years, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.drafts.keys().copied().collect()
    }

    pub fn draft(&self, year: i32) -> Option<&YearlyRoleDraft> {
        self.drafts.get(&year)
    }

    pub fn set_role(&mut self, year: i32, role: SystemRole) -> Result<(), ValidationError> {
        self.draft_mut(year)?.role = Some(role);
        Ok(())
    }

    pub fn set_team_role(
        &mut self,
        year: i32,
        team_role: impl Into<String>,
    ) -> Result<(), ValidationError> {
        self.draft_mut(year)?.team_role = Some(team_role.into());
        Ok(())
    }

    pub fn set_academic_year(
        &mut self,
        year: i32,
        academic_year: Option<u8>,
    ) -> Result<(), ValidationError> {
        validate_academic_year(academic_year)?;
        self.draft_mut(year)?.academic_year = academic_year;
        Ok(())
    }

    /// Assemble the submission payload. Fails when no year is selected.
    pub fn build_payload(&self) -> Result<TeamYearsPayload, ValidationError> {
        if self.drafts.is_empty() {
            return Err(ValidationError::NoTeamYears);
        }

        let yearly_roles = self
            .drafts
            .iter()
            .map(|(year, draft)| draft.clone().into_role(*year))
            .collect();

        Ok(TeamYearsPayload {
            team_years: self.years(),
            yearly_roles,
        })
    }

    fn draft_mut(&mut self, year: i32) -> Result<&mut YearlyRoleDraft, ValidationError> {
        self.drafts
            .get_mut(&year)
            .ok_or(ValidationError::YearNotSelected(year))
    }
}

/// Produce exactly one yearly role per selected team year.
///
/// Submitted roles for unselected years are dropped; selected years without a
/// submitted role get the default one.
pub fn reconcile_yearly_roles(
    team_years: &[i32],
    yearly_roles: &[YearlyRole],
) -> Result<Vec<YearlyRole>, ValidationError> {
    if team_years.is_empty() {
        return Err(ValidationError::NoTeamYears);
    }

    let mut selected = BTreeSet::new();
    for year in team_years {
        if !selected.insert(*year) {
            return Err(ValidationError::DuplicateYear(*year));
        }
    }

    let mut submitted: BTreeMap<i32, &YearlyRole> = BTreeMap::new();
    for role in yearly_roles {
        validate_academic_year(role.academic_year)?;
        if submitted.insert(role.year, role).is_some() {
            return Err(ValidationError::DuplicateYear(role.year));
        }
    }

    Ok(selected
        .into_iter()
        .map(|year| match submitted.get(&year) {
            Some(role) => (*role).clone(),
            None => YearlyRole::default_for(year),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_adds_default_role() {
        let mut editor = TeamYearsEditor::new();
        assert!(editor.toggle_year(2024));

        let payload = editor.build_payload().unwrap();
        assert_eq!(payload.team_years, vec![2024]);
        assert_eq!(payload.yearly_roles, vec![YearlyRole::default_for(2024)]);
    }

    #[test]
    fn test_toggle_off_then_on_restores_default() {
        let mut editor = TeamYearsEditor::new();
        editor.toggle_year(2024);
        editor.set_role(2024, SystemRole::Lead).unwrap();
        editor.set_team_role(2024, "Tech Lead").unwrap();
        editor.set_academic_year(2024, Some(3)).unwrap();

        assert!(!editor.toggle_year(2024));
        assert!(editor.toggle_year(2024));

        let payload = editor.build_payload().unwrap();
        assert_eq!(payload.yearly_roles, vec![YearlyRole::default_for(2024)]);
    }

    #[test]
    fn test_select_year_is_idempotent() {
        let mut editor = TeamYearsEditor::new();
        editor.select_year(2023);
        editor.set_team_role(2023, "Treasurer").unwrap();
        editor.select_year(2023);

        assert_eq!(
            editor.draft(2023).unwrap().team_role.as_deref(),
            Some("Treasurer")
        );
    }

    #[test]
    fn test_no_years_is_rejected() {
        let mut editor = TeamYearsEditor::new();
        assert_eq!(editor.build_payload(), Err(ValidationError::NoTeamYears));

        editor.toggle_year(2022);
        editor.toggle_year(2022);
        assert_eq!(editor.build_payload(), Err(ValidationError::NoTeamYears));
    }

    #[test]
    fn test_editing_unselected_year_fails() {
        let mut editor = TeamYearsEditor::new();
        assert_eq!(
            editor.set_role(2021, SystemRole::Ceo),
            Err(ValidationError::YearNotSelected(2021))
        );
    }

    #[test]
    fn test_unset_fields_default_on_submission() {
        let member = Member {
            id: "m1".to_string(),
            name: "Kiran".to_string(),
            email: "kiran@example.com".to_string(),
            role: SystemRole::Coordinator,
            team_role: "Events".to_string(),
            department: None,
            phone_number: None,
            linkedin: None,
            github: None,
            profile_image: None,
            active: true,
            display_order: Some(4),
            team_years: vec![2023, 2024],
            yearly_roles: vec![YearlyRole {
                year: 2024,
                role: SystemRole::Lead,
                team_role: "Events Lead".to_string(),
                academic_year: Some(4),
            }],
            created_at: String::new(),
            updated_at: String::new(),
        };

        let editor = TeamYearsEditor::from_member(&member);
        assert_eq!(editor.draft(2023), Some(&YearlyRoleDraft::default()));

        let payload = editor.build_payload().unwrap();
        assert_eq!(payload.team_years, vec![2023, 2024]);
        assert_eq!(payload.yearly_roles[0], YearlyRole::default_for(2023));
        assert_eq!(payload.yearly_roles[1], member.yearly_roles[0]);
    }

    #[test]
    fn test_invalid_academic_year() {
        let mut editor = TeamYearsEditor::new();
        editor.toggle_year(2024);
        assert_eq!(
            editor.set_academic_year(2024, Some(7)),
            Err(ValidationError::InvalidAcademicYear(7))
        );
    }

    #[test]
    fn test_reconcile_fills_and_drops() {
        let submitted = vec![
            YearlyRole {
                year: 2024,
                role: SystemRole::CoLead,
                team_role: "Co-Lead".to_string(),
                academic_year: None,
            },
            YearlyRole::default_for(2019),
        ];

        let roles = reconcile_yearly_roles(&[2025, 2024], &submitted).unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0], submitted[0]);
        assert_eq!(roles[1], YearlyRole::default_for(2025));
    }

    #[test]
    fn test_reconcile_rejects_duplicates_and_empty() {
        assert_eq!(
            reconcile_yearly_roles(&[], &[]),
            Err(ValidationError::NoTeamYears)
        );
        assert_eq!(
            reconcile_yearly_roles(&[2024, 2024], &[]),
            Err(ValidationError::DuplicateYear(2024))
        );
        assert_eq!(
            reconcile_yearly_roles(
                &[2024],
                &[YearlyRole::default_for(2024), YearlyRole::default_for(2024)]
            ),
            Err(ValidationError::DuplicateYear(2024))
        );
    }
}
