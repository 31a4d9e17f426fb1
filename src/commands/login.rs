//! [`Login`] step, the credential exchange that opens every script.

use crate::command::{Context, ScriptStep};
use crate::error::SessionError;
use async_trait::async_trait;
use std::fmt;

/// Answers the login and password prompts and waits for the command prompt.
pub struct Login {
    pub username: String,
    password: String,
}

impl Login {
    pub const LABEL: &'static str = "login";

    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Login {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Login")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[async_trait(?Send)]
impl ScriptStep for Login {
    fn label(&self) -> &str {
        Self::LABEL
    }

    async fn execute(&self, ctx: &mut Context) -> Result<String, SessionError> {
        let timeout = ctx.timeout();
        ctx.session()
            .login(&self.username, &self.password, timeout)
            .await
    }
}
