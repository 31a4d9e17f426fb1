//! Runs a command file against a console: login, each command, logout.

use crate::command::{Context, OutputHandler, ScriptStep, Transport, stdout_handler};
use crate::commands::{Login, Logout};
use crate::error::{RunError, SessionError};
use crate::options::Options;
use crate::parser::parse_file;
use crate::session::{DEFAULT_TIMEOUT, open_stream};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Runs a command file against a console described by an options file.
pub struct ScriptRunner {
    options_path: PathBuf,
    command_path: PathBuf,
    timeout_override: Option<Duration>,
    output_handler: OutputHandler,
    script: Option<Script>,
}

struct Script {
    options: Options,
    steps: Vec<Box<dyn ScriptStep>>,
}

impl ScriptRunner {
    /// Create a runner. Nothing is read until [`init`](Self::init).
    ///
    /// Output goes to stdout unless replaced with
    /// [`with_result_handler`](Self::with_result_handler).
    pub fn new(options_path: impl Into<PathBuf>, command_path: impl Into<PathBuf>) -> Self {
        Self {
            options_path: options_path.into(),
            command_path: command_path.into(),
            timeout_override: None,
            output_handler: stdout_handler(),
            script: None,
        }
    }

    /// Use `timeout` for every operation instead of `OperationTimeoutMS`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_override = Some(timeout);
        self
    }

    /// Post-process each step's output with `handler(label, transcript)`.
    pub fn with_result_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.output_handler = Arc::new(handler);
        self
    }

    /// Load the command file and the options file.
    pub fn init(&mut self) -> Result<(), RunError> {
        let steps = parse_file(&self.command_path).map_err(RunError::InitFailed)?;
        let options = Options::load(&self.options_path).map_err(RunError::InitFailed)?;
        debug!(commands = steps.len(), ?options, "script initialized");
        self.script = Some(Script { options, steps });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.script.is_some()
    }

    /// Connect, log in, run every command, and log out.
    ///
    /// The first failing step aborts the rest of the script. Logout is still
    /// attempted and the failure is returned afterwards.
    pub async fn run(&self) -> Result<(), RunError> {
        let script = self.script()?;
        let options = &script.options;
        info!(
            host = %options.server_host_name,
            port = options.telnet_port,
            user = %options.username,
            "connecting"
        );
        let stream = open_stream(
            &options.server_host_name,
            options.telnet_port,
            self.timeout(),
        )
        .await?;
        self.run_on(stream).await
    }

    /// Like [`run`](Self::run), over an already connected stream.
    pub async fn run_on(&self, stream: impl Transport) -> Result<(), RunError> {
        let script = self.script()?;
        let mut ctx = Context::over(stream, self.timeout(), Arc::clone(&self.output_handler));

        let login = Login::new(&script.options.username, &script.options.password);
        let outcome = run_steps(&mut ctx, &login, &script.steps).await;

        match Logout.execute(&mut ctx).await {
            Ok(output) => ctx.emit(Logout.label(), &output),
            Err(err) => debug!(error = %err, "logout failed"),
        }

        outcome.map_err(RunError::from)
    }

    fn script(&self) -> Result<&Script, RunError> {
        self.script.as_ref().ok_or(RunError::NotInitialized)
    }

    fn timeout(&self) -> Duration {
        self.timeout_override
            .or_else(|| self.script.as_ref().map(|s| s.options.operation_timeout))
            .unwrap_or(DEFAULT_TIMEOUT)
    }
}

async fn run_steps(
    ctx: &mut Context,
    login: &Login,
    steps: &[Box<dyn ScriptStep>],
) -> Result<(), SessionError> {
    run_step(ctx, login).await?;
    for step in steps {
        run_step(ctx, step.as_ref()).await?;
    }
    Ok(())
}

async fn run_step(ctx: &mut Context, step: &dyn ScriptStep) -> Result<(), SessionError> {
    match step.execute(ctx).await {
        Ok(output) => {
            ctx.emit(step.label(), &output);
            Ok(())
        }
        Err(err) => {
            warn!(
                step = step.label(),
                error = %err,
                "step failed, skipping remaining commands"
            );
            Err(err)
        }
    }
}
