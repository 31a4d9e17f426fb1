//! [`SendCommand`] step, one line of the command file.

use crate::command::{Context, ScriptStep};
use crate::error::SessionError;
use async_trait::async_trait;

/// Sends a console command and collects its output up to the next prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendCommand {
    pub line: String,
}

impl SendCommand {
    pub fn new(line: impl Into<String>) -> Self {
        Self { line: line.into() }
    }
}

#[async_trait(?Send)]
impl ScriptStep for SendCommand {
    fn label(&self) -> &str {
        &self.line
    }

    async fn execute(&self, ctx: &mut Context) -> Result<String, SessionError> {
        let timeout = ctx.timeout();
        ctx.session().send_command(&self.line, timeout).await
    }
}
