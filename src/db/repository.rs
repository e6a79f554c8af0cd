//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. Every write
//! bumps the global revision exactly once.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::errors::AppError;
use crate::media::StoredMedia;
use crate::models::{
    CreateMemberRequest, CreateRegistrationRequest, DisplayOrderUpdate, Member, Registration,
    RevisionInfo, SystemRole, UpdateMemberRequest, YearlyRole,
};

const MEMBER_COLUMNS: &str = "id, name, email, role, team_role, department, phone_number, linkedin, github, profile_image, active, display_order, created_at, updated_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    // ==================== MEMBER OPERATIONS ====================

    /// List all members in display order.
    pub async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM members ORDER BY COALESCE(display_order, 0), created_at, id",
            MEMBER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let role_rows = sqlx::query(
            "SELECT member_id, year, role, team_role, academic_year FROM yearly_roles ORDER BY year",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut roles_by_member: HashMap<String, Vec<YearlyRole>> = HashMap::new();
        for row in &role_rows {
            roles_by_member
                .entry(row.get("member_id"))
                .or_default()
                .push(yearly_role_from_row(row));
        }

        Ok(rows
            .iter()
            .map(|row| {
                let id: String = row.get("id");
                let roles = roles_by_member.remove(&id).unwrap_or_default();
                member_from_row(row, roles)
            })
            .collect())
    }

    /// Active members holding a yearly role for `year`, in display order.
    pub async fn list_team(&self, year: i32) -> Result<Vec<Member>, AppError> {
        Ok(self
            .list_members()
            .await?
            .into_iter()
            .filter(|m| m.active && m.belongs_to_year(year))
            .collect())
    }

    /// Distinct team years, most recent first.
    pub async fn list_team_years(&self) -> Result<Vec<i32>, AppError> {
        let rows = sqlx::query(
            "SELECT DISTINCT y.year FROM yearly_roles y JOIN members m ON m.id = y.member_id WHERE m.active = 1 ORDER BY y.year DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|row| row.get("year")).collect())
    }

    /// Get a member by ID.
    pub async fn get_member(&self, id: &str) -> Result<Option<Member>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM members WHERE id = ?", MEMBER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let roles = self.yearly_roles_for(id).await?;
                Ok(Some(member_from_row(&row, roles)))
            }
            None => Ok(None),
        }
    }

    /// Look up a member and their password hash by email, for login.
    pub async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(Member, Option<String>)>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {}, password_hash FROM members WHERE email = ?",
            MEMBER_COLUMNS
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let id: String = row.get("id");
                let roles = self.yearly_roles_for(&id).await?;
                let hash: Option<String> = row.get("password_hash");
                Ok(Some((member_from_row(&row, roles), hash)))
            }
            None => Ok(None),
        }
    }

    /// Create a member with their yearly roles.
    pub async fn create_member(
        &self,
        request: &CreateMemberRequest,
        yearly_roles: &[YearlyRole],
        password_hash: &str,
    ) -> Result<Member, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let role = request.role.unwrap_or_default();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO members (id, name, email, password_hash, role, team_role, department, phone_number, linkedin, github, active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, '', ?, ?, ?, ?, 1, ?, ?)"
        )
        .bind(&id)
        .bind(request.name.trim())
        .bind(request.email.trim())
        .bind(password_hash)
        .bind(role.as_str())
        .bind(&request.department)
        .bind(&request.phone_number)
        .bind(&request.linkedin)
        .bind(&request.github)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        insert_yearly_roles(&mut tx, &id, yearly_roles).await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(Member {
            id,
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            role,
            team_role: String::new(),
            department: request.department.clone(),
            phone_number: request.phone_number.clone(),
            linkedin: request.linkedin.clone(),
            github: request.github.clone(),
            profile_image: None,
            active: true,
            display_order: None,
            team_years: yearly_roles.iter().map(|r| r.year).collect(),
            yearly_roles: yearly_roles.to_vec(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Create the bootstrap admin unless an account with that email exists.
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, email: &str, password_hash: &str) -> Result<bool, AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT OR IGNORE INTO members (id, name, email, password_hash, role, team_role, active, created_at, updated_at) VALUES (?, 'Administrator', ?, ?, 'admin', '', 1, ?, ?)"
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(email.trim())
        .bind(password_hash)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Apply an edit. `yearly_roles`, when given, replaces the stored set;
    /// `profile`, when given, replaces the profile picture.
    pub async fn update_member(
        &self,
        id: &str,
        request: &UpdateMemberRequest,
        yearly_roles: Option<&[YearlyRole]>,
        profile: Option<&StoredMedia>,
    ) -> Result<Member, AppError> {
        let existing = self
            .get_member(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;

        let now = Utc::now().to_rfc3339();

        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.name);
        let email = request
            .email
            .as_deref()
            .map(str::trim)
            .unwrap_or(&existing.email);
        let role = request.role.unwrap_or(existing.role);
        let team_role = request.team_role.as_ref().unwrap_or(&existing.team_role);
        let department = request.department.clone().or(existing.department.clone());
        let phone_number = request.phone_number.clone().or(existing.phone_number.clone());
        let linkedin = request.linkedin.clone().or(existing.linkedin.clone());
        let github = request.github.clone().or(existing.github.clone());
        let active = request.active.unwrap_or(existing.active);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE members SET name = ?, email = ?, role = ?, team_role = ?, department = ?, phone_number = ?, linkedin = ?, github = ?, active = ?, updated_at = ? WHERE id = ?"
        )
        .bind(name)
        .bind(email)
        .bind(role.as_str())
        .bind(team_role)
        .bind(&department)
        .bind(&phone_number)
        .bind(&linkedin)
        .bind(&github)
        .bind(active as i32)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(media) = profile {
            sqlx::query("UPDATE members SET profile_image = ?, profile_image_id = ? WHERE id = ?")
                .bind(&media.secure_url)
                .bind(&media.public_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(roles) = yearly_roles {
            sqlx::query("DELETE FROM yearly_roles WHERE member_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_yearly_roles(&mut tx, id, roles).await?;
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        let yearly_roles = match yearly_roles {
            Some(roles) => roles.to_vec(),
            None => existing.yearly_roles,
        };

        Ok(Member {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            team_role: team_role.clone(),
            department,
            phone_number,
            linkedin,
            github,
            profile_image: profile
                .map(|m| m.secure_url.clone())
                .or(existing.profile_image),
            active,
            display_order: existing.display_order,
            team_years: yearly_roles.iter().map(|r| r.year).collect(),
            yearly_roles,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    /// Flip the active flag.
    pub async fn toggle_active(&self, id: &str) -> Result<Member, AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE members SET active = CASE active WHEN 0 THEN 1 ELSE 0 END, updated_at = ? WHERE id = ?",
        )
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member {} not found", id)));
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        self.get_member(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))
    }

    /// Delete a member. Yearly roles and sessions go with it.
    pub async fn delete_member(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM yearly_roles WHERE member_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE member_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM members WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member {} not found", id)));
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Write a batch of display orders atomically. Unknown ids abort the batch.
    pub async fn batch_update_display_order(
        &self,
        updates: &[DisplayOrderUpdate],
    ) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();

        // Use a transaction for atomicity
        let mut tx = self.pool.begin().await?;

        for update in updates {
            let result =
                sqlx::query("UPDATE members SET display_order = ?, updated_at = ? WHERE id = ?")
                    .bind(update.display_order)
                    .bind(&now)
                    .bind(&update.user_id)
                    .execute(&mut *tx)
                    .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::NotFound(format!(
                    "Member {} not found",
                    update.user_id
                )));
            }
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn set_password(&self, id: &str, password_hash: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("UPDATE members SET password_hash = ?, updated_at = ? WHERE id = ?")
                .bind(password_hash)
                .bind(&now)
                .bind(id)
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member {} not found", id)));
        }

        // Existing logins end with the old password
        sqlx::query("DELETE FROM sessions WHERE member_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    // ==================== SESSION OPERATIONS ====================

    pub async fn create_session(&self, token_digest: &str, member_id: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO sessions (token_digest, member_id, created_at) VALUES (?, ?, ?)")
            .bind(token_digest)
            .bind(member_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The active member owning a session token digest.
    pub async fn session_member(&self, token_digest: &str) -> Result<Option<Member>, AppError> {
        let row = sqlx::query("SELECT member_id FROM sessions WHERE token_digest = ?")
            .bind(token_digest)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let member_id: String = row.get("member_id");

        Ok(self.get_member(&member_id).await?.filter(|m| m.active))
    }

    pub async fn delete_session(&self, token_digest: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE token_digest = ?")
            .bind(token_digest)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ==================== REGISTRATION OPERATIONS ====================

    /// List registrations, newest first.
    pub async fn list_registrations(&self) -> Result<Vec<Registration>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, email, phone_number, department, academic_year, interest, message, created_at FROM registrations ORDER BY created_at DESC, rowid DESC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(registration_from_row).collect())
    }

    pub async fn create_registration(
        &self,
        request: &CreateRegistrationRequest,
    ) -> Result<Registration, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO registrations (id, name, email, phone_number, department, academic_year, interest, message, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(request.name.trim())
        .bind(request.email.trim())
        .bind(&request.phone_number)
        .bind(&request.department)
        .bind(request.academic_year.map(i64::from))
        .bind(&request.interest)
        .bind(&request.message)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(Registration {
            id,
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            phone_number: request.phone_number.clone(),
            department: request.department.clone(),
            academic_year: request.academic_year,
            interest: request.interest.clone(),
            message: request.message.clone(),
            created_at: now,
        })
    }

    pub async fn delete_registration(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM registrations WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Registration {} not found", id)));
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn yearly_roles_for(&self, member_id: &str) -> Result<Vec<YearlyRole>, AppError> {
        let rows = sqlx::query(
            "SELECT year, role, team_role, academic_year FROM yearly_roles WHERE member_id = ? ORDER BY year",
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(yearly_role_from_row).collect())
    }
}

async fn insert_yearly_roles(
    tx: &mut Transaction<'_, Sqlite>,
    member_id: &str,
    roles: &[YearlyRole],
) -> Result<(), AppError> {
    for role in roles {
        sqlx::query(
            "INSERT INTO yearly_roles (member_id, year, role, team_role, academic_year) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(member_id)
        .bind(role.year)
        .bind(role.role.as_str())
        .bind(&role.team_role)
        .bind(role.academic_year.map(i64::from))
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn bump_revision(tx: &mut Transaction<'_, Sqlite>) -> Result<(), AppError> {
    sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
        .bind(Utc::now().to_rfc3339())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

// Helper functions for row conversion

fn parse_role(value: &str) -> SystemRole {
    value.parse().unwrap_or_else(|e| {
        tracing::warn!("Stored role not recognised, treating as member: {}", e);
        SystemRole::Member
    })
}

fn member_from_row(row: &SqliteRow, yearly_roles: Vec<YearlyRole>) -> Member {
    let active: i32 = row.get("active");
    let role: String = row.get("role");
    Member {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role: parse_role(&role),
        team_role: row.get("team_role"),
        department: row.get("department"),
        phone_number: row.get("phone_number"),
        linkedin: row.get("linkedin"),
        github: row.get("github"),
        profile_image: row.get("profile_image"),
        active: active != 0,
        display_order: row.get("display_order"),
        team_years: yearly_roles.iter().map(|r| r.year).collect(),
        yearly_roles,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn yearly_role_from_row(row: &SqliteRow) -> YearlyRole {
    let role: String = row.get("role");
    let academic_year: Option<i64> = row.get("academic_year");
    YearlyRole {
        year: row.get("year"),
        role: parse_role(&role),
        team_role: row.get("team_role"),
        academic_year: academic_year.and_then(|y| u8::try_from(y).ok()),
    }
}

fn registration_from_row(row: &SqliteRow) -> Registration {
    let academic_year: Option<i64> = row.get("academic_year");
    Registration {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone_number: row.get("phone_number"),
        department: row.get("department"),
        academic_year: academic_year.and_then(|y| u8::try_from(y).ok()),
        interest: row.get("interest"),
        message: row.get("message"),
        created_at: row.get("created_at"),
    }
}
