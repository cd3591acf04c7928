//! Demo sign-in gate.
//!
//! The access code is a shared string compared in plaintext. It separates the
//! admin views from the public ones for demonstration only and provides no
//! access control.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoginState {
    LoggedOut,
    User { username: String },
    Admin,
}

impl LoginState {
    pub fn is_admin(&self) -> bool {
        matches!(self, LoginState::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInError {
    InvalidAccessCode,
    MissingCredentials,
}

impl fmt::Display for SignInError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignInError::InvalidAccessCode => {
                f.write_str("Invalid Access Code for Admin. Leave empty for User login.")
            }
            SignInError::MissingCredentials => f.write_str("Please enter username and password"),
        }
    }
}

impl std::error::Error for SignInError {}

#[derive(Debug, Clone)]
pub struct AccessGate {
    admin_code: String,
}

impl AccessGate {
    pub fn new(admin_code: impl Into<String>) -> Self {
        Self {
            admin_code: admin_code.into(),
        }
    }

    pub fn sign_in(
        &self,
        username: &str,
        password: &str,
        access_code: &str,
    ) -> Result<LoginState, SignInError> {
        if access_code == self.admin_code {
            return Ok(LoginState::Admin);
        }

        if username.is_empty() || password.is_empty() {
            return Err(SignInError::MissingCredentials);
        }
        if !access_code.is_empty() {
            return Err(SignInError::InvalidAccessCode);
        }

        Ok(LoginState::User {
            username: username.to_string(),
        })
    }
}
