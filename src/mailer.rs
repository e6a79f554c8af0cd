//! Invitation delivery.

use async_trait::async_trait;

use crate::errors::AppError;

/// An invitation to a newly created member.
#[derive(Debug, Clone)]
pub struct Invitation {
    pub name: String,
    pub email: String,
    pub temporary_password: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_invitation(&self, invitation: &Invitation) -> Result<(), AppError>;
}

/// Records invitations in the log instead of sending mail. The temporary
/// password is never logged.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_invitation(&self, invitation: &Invitation) -> Result<(), AppError> {
        tracing::info!(
            name = %invitation.name,
            email = %invitation.email,
            "Invitation ready for delivery"
        );
        Ok(())
    }
}
