//! Sign-up, sign-in and password reset.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    application::repos::{CreateUserParams, RepoError, UsersRepo},
    domain::entities::UserRecord,
    infra::error::InfraError,
    util::clock::Clock,
};

const USERNAME_MAX_CHARS: usize = 100;

#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, password: &str) -> Result<String, InfraError>;
    async fn verify(&self, password: &str, hash: &str) -> Result<bool, InfraError>;
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("username `{0}` is already registered")]
    UsernameTaken(String),
    #[error("sign-up form is incomplete: {0}")]
    InvalidSignup(&'static str),
    #[error("sign-in form is incomplete")]
    InvalidLogin,
    #[error("no account named `{0}`")]
    UnknownUsername(String),
    #[error("password does not match")]
    WrongPassword,
    #[error("username and email do not belong to the same account")]
    EmailMismatch,
    #[error("password reset form is incomplete")]
    InvalidReset,
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Infra(#[from] InfraError),
}

impl AccountError {
    /// Inline message for the form that failed, or `None` for infrastructure
    /// failures that should surface as an error response.
    pub fn form_message(&self) -> Option<&'static str> {
        match self {
            AccountError::UsernameTaken(_) | AccountError::InvalidSignup(_) => {
                Some("Username Already exists")
            }
            AccountError::InvalidLogin => Some("Incorrect Username/Password"),
            AccountError::UnknownUsername(_) => Some("Incorrect Username"),
            AccountError::WrongPassword => Some("Incorrect Password"),
            AccountError::EmailMismatch => Some("Incorrect Username-Email combination"),
            AccountError::InvalidReset => Some("Error. Try again"),
            AccountError::Repo(_) | AccountError::Infra(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct AccountsService {
    users: Arc<dyn UsersRepo>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
}

impl AccountsService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            hasher,
            clock,
        }
    }

    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserRecord, AccountError> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() || username.chars().count() > USERNAME_MAX_CHARS {
            return Err(AccountError::InvalidSignup("username"));
        }
        if !looks_like_email(email) {
            return Err(AccountError::InvalidSignup("email"));
        }
        if password.is_empty() {
            return Err(AccountError::InvalidSignup("password"));
        }

        let password_hash = self.hasher.hash(password).await?;
        let user = self
            .users
            .create_user(CreateUserParams {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                created_at: self.clock.now(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AccountError::UsernameTaken(username.to_string()),
                other => AccountError::Repo(other),
            })?;

        info!(
            target = "asksniff::application::accounts",
            user_id = user.id,
            "Account created"
        );
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserRecord, AccountError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AccountError::InvalidLogin);
        }

        let user = self
            .users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AccountError::UnknownUsername(username.to_string()))?;

        if !self.hasher.verify(password, &user.password_hash).await? {
            warn!(
                target = "asksniff::application::accounts",
                user_id = user.id,
                "Rejected sign-in with wrong password"
            );
            return Err(AccountError::WrongPassword);
        }
        Ok(user)
    }

    /// Set a new password when `username` and `email` identify the same account.
    pub async fn reset_password(
        &self,
        username: &str,
        email: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() || !looks_like_email(email) || new_password.is_empty() {
            return Err(AccountError::InvalidReset);
        }

        let user = self
            .users
            .find_user_by_username(username)
            .await?
            .filter(|user| user.email.eq_ignore_ascii_case(email))
            .ok_or(AccountError::EmailMismatch)?;

        let password_hash = self.hasher.hash(new_password).await?;
        self.users.update_password(user.id, &password_hash).await?;
        info!(
            target = "asksniff::application::accounts",
            user_id = user.id,
            "Password reset"
        );
        Ok(())
    }

    pub async fn current_user(&self, user_id: i64) -> Result<Option<UserRecord>, RepoError> {
        self.users.find_user(user_id).await
    }

    pub async fn set_editor(&self, username: &str, is_editor: bool) -> Result<bool, RepoError> {
        self.users.set_editor(username.trim(), is_editor).await
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}
