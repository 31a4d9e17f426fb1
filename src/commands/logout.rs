//! [`Logout`] step, run after the last command or after a failure.

use crate::command::{Context, ScriptStep};
use crate::error::SessionError;
use crate::session::LOGOUT_COMMAND;
use async_trait::async_trait;

/// Sends `quit` and closes the session. Never fails.
///
/// The transcript is the command echoed back followed by the confirmation,
/// e.g. `"quit\nUser is logged out"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Logout;

#[async_trait(?Send)]
impl ScriptStep for Logout {
    fn label(&self) -> &str {
        LOGOUT_COMMAND
    }

    async fn execute(&self, ctx: &mut Context) -> Result<String, SessionError> {
        let timeout = ctx.timeout();
        let confirmation = ctx.session().logout(timeout).await;
        Ok(format!("{LOGOUT_COMMAND}\n{confirmation}"))
    }
}
