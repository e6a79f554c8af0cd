//! Typed client for the club API.
//!
//! Authentication is explicit: calls that need a login take an
//! [`AuthContext`]. Inputs are validated locally before anything is sent, and
//! local state (such as an [`OrderBoard`]) only changes after the server has
//! accepted a request.

mod error;

pub use error::{ClientError, Result};

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::{InviteResponse, TeamRoster};
use crate::crop::CropSpec;
use crate::models::{
    BatchDisplayOrderRequest, CreateMemberRequest, CreateRegistrationRequest, LoginRequest,
    LoginResponse, Member, PasswordResetRequest, Registration, UpdateMemberRequest,
    UploadResponse,
};
use crate::team::{OrderBoard, TeamYearsEditor};
use crate::validation::{
    require, validate_academic_year, validate_email, validate_password, ValidationError,
};

/// Bearer credentials for authenticated calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    token: String,
}

impl AuthContext {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// A file to send in a multipart request.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Serialize)]
struct NoBody {}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Client for a server at `base_url`, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let err = ClientError::from_response(status.as_u16(), &body);
            tracing::debug!(status = status.as_u16(), "API request failed: {}", err);
            return Err(err);
        }

        let envelope: Envelope<T> = serde_json::from_slice(&body)?;
        Ok(envelope.data)
    }

    // ==================== PUBLIC ====================

    /// Log in and return the credentials for later calls.
    pub async fn login(&self, email: &str, password: &str) -> Result<(AuthContext, Member)> {
        validate_email(email)?;
        require("Password", password)?;

        let response: LoginResponse = self
            .send(self.http.post(self.url("/auth/login")).json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            }))
            .await?;

        Ok((AuthContext::new(response.token), response.member))
    }

    /// Roster for a team year; the latest year when `year` is `None`.
    pub async fn list_team(&self, year: Option<i32>) -> Result<TeamRoster> {
        let mut request = self.http.get(self.url("/team"));
        if let Some(year) = year {
            request = request.query(&[("year", year)]);
        }
        self.send(request).await
    }

    pub async fn team_years(&self) -> Result<Vec<i32>> {
        self.send(self.http.get(self.url("/team/years"))).await
    }

    pub async fn submit_registration(
        &self,
        request: &CreateRegistrationRequest,
    ) -> Result<Registration> {
        require("Name", &request.name)?;
        validate_email(&request.email)?;
        validate_academic_year(request.academic_year)?;

        self.send(self.http.post(self.url("/registrations")).json(request))
            .await
    }

    // ==================== MEMBER ====================

    pub async fn logout(&self, auth: &AuthContext) -> Result<()> {
        self.send(
            self.http
                .post(self.url("/auth/logout"))
                .bearer_auth(auth.token()),
        )
        .await
    }

    pub async fn me(&self, auth: &AuthContext) -> Result<Member> {
        self.send(self.http.get(self.url("/me")).bearer_auth(auth.token()))
            .await
    }

    /// Upload images to the media host through the server.
    pub async fn upload_images(
        &self,
        auth: &AuthContext,
        files: Vec<FileUpload>,
        folder: Option<&str>,
    ) -> Result<UploadResponse> {
        let mut form = Form::new();
        for file in files {
            form = form.part("images", Part::bytes(file.bytes).file_name(file.file_name));
        }
        if let Some(folder) = folder {
            form = form.text("folder", folder.to_string());
        }

        self.send(
            self.http
                .post(self.url("/uploads"))
                .bearer_auth(auth.token())
                .multipart(form),
        )
        .await
    }

    // ==================== ADMIN ====================

    pub async fn list_members(&self, auth: &AuthContext) -> Result<Vec<Member>> {
        self.send(self.http.get(self.url("/members")).bearer_auth(auth.token()))
            .await
    }

    /// Invite a member with the team years staged in `editor`.
    ///
    /// Fails with [`ClientError::Validation`] before any request when no year
    /// is selected.
    pub async fn invite_member(
        &self,
        auth: &AuthContext,
        mut request: CreateMemberRequest,
        editor: &TeamYearsEditor,
    ) -> Result<InviteResponse> {
        let payload = editor.build_payload()?;
        require("Name", &request.name)?;
        validate_email(&request.email)?;

        request.team_years = payload.team_years;
        request.yearly_roles = payload.yearly_roles;

        self.send(
            self.http
                .post(self.url("/members"))
                .bearer_auth(auth.token())
                .json(&request),
        )
        .await
    }

    /// Admin edit with an optional profile picture and crop. Fields present
    /// in `data` are checked before anything is sent; a `teamYears` list
    /// must not be empty.
    pub async fn update_member(
        &self,
        auth: &AuthContext,
        member_id: &str,
        data: &UpdateMemberRequest,
        picture: Option<FileUpload>,
        crop: Option<CropSpec>,
    ) -> Result<Member> {
        if let Some(name) = &data.name {
            require("Name", name)?;
        }
        if let Some(email) = &data.email {
            validate_email(email)?;
        }
        if data.team_years.as_ref().is_some_and(|years| years.is_empty()) {
            return Err(ValidationError::NoTeamYears.into());
        }

        let mut form = Form::new().text("data", serde_json::to_string(data)?);
        if let Some(picture) = picture {
            form = form.part(
                "profilePicture",
                Part::bytes(picture.bytes).file_name(picture.file_name),
            );
        }
        if let Some(crop) = crop {
            form = form.text("crop", serde_json::to_string(&crop)?);
        }

        self.send(
            self.http
                .put(self.url(&format!("/members/{}", member_id)))
                .bearer_auth(auth.token())
                .multipart(form),
        )
        .await
    }

    /// Persist the board's staged order. Returns how many members were
    /// updated; a clean board sends nothing. On failure the board stays dirty.
    pub async fn save_display_order(
        &self,
        auth: &AuthContext,
        board: &mut OrderBoard,
    ) -> Result<usize> {
        if !board.is_dirty() {
            return Ok(0);
        }

        let updates = board.pending_updates();
        let count = updates.len();
        self.send::<()>(
            self.http
                .put(self.url("/members/display-order"))
                .bearer_auth(auth.token())
                .json(&BatchDisplayOrderRequest { updates }),
        )
        .await?;

        board.mark_saved();
        Ok(count)
    }

    pub async fn toggle_active(&self, auth: &AuthContext, member_id: &str) -> Result<Member> {
        self.send(
            self.http
                .patch(self.url(&format!("/members/{}/active", member_id)))
                .bearer_auth(auth.token())
                .json(&NoBody {}),
        )
        .await
    }

    /// Delete a member. Deleting your own account fails with
    /// [`ClientError::CannotDeleteSelf`].
    pub async fn delete_member(&self, auth: &AuthContext, member_id: &str) -> Result<()> {
        self.send(
            self.http
                .delete(self.url(&format!("/members/{}", member_id)))
                .bearer_auth(auth.token()),
        )
        .await
    }

    pub async fn reset_password(
        &self,
        auth: &AuthContext,
        member_id: &str,
        new_password: &str,
    ) -> Result<()> {
        validate_password(new_password)?;

        self.send(
            self.http
                .post(self.url(&format!("/members/{}/password", member_id)))
                .bearer_auth(auth.token())
                .json(&PasswordResetRequest {
                    new_password: new_password.to_string(),
                }),
        )
        .await
    }

    pub async fn list_registrations(&self, auth: &AuthContext) -> Result<Vec<Registration>> {
        self.send(
            self.http
                .get(self.url("/registrations"))
                .bearer_auth(auth.token()),
        )
        .await
    }

    pub async fn delete_registration(&self, auth: &AuthContext, id: &str) -> Result<()> {
        self.send(
            self.http
                .delete(self.url(&format!("/registrations/{}", id)))
                .bearer_auth(auth.token()),
        )
        .await
    }
}
