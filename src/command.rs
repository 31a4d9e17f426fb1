//! The [`ScriptStep`] trait and the [`Context`] steps receive when executed.

use crate::error::SessionError;
use crate::session::SessionClient;
use async_trait::async_trait;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// Receives `(label, transcript)` for every completed step.
pub type OutputHandler = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Default handler: transcripts go to stdout unchanged.
pub fn stdout_handler() -> OutputHandler {
    Arc::new(|_: &str, output: &str| {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(output.as_bytes());
        let _ = stdout.flush();
    })
}

/// Handler that drops everything.
pub fn discard_output() -> OutputHandler {
    Arc::new(|_: &str, _: &str| {})
}

/// Any bidirectional byte stream a session can run over.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

pub type BoxedTransport = Box<dyn Transport>;

/// Execution context passed to [`ScriptStep::execute`].
///
/// Holds the session, the per-operation timeout and the handler that
/// post-processes step output.
pub struct Context {
    pub(crate) session: SessionClient<BoxedTransport>,
    pub(crate) timeout: Duration,
    pub(crate) output_handler: OutputHandler,
}

impl Context {
    pub fn new(
        session: SessionClient<BoxedTransport>,
        timeout: Duration,
        output_handler: OutputHandler,
    ) -> Self {
        Self {
            session,
            timeout,
            output_handler,
        }
    }

    /// Session on a boxed stream, typically a TCP connection.
    pub fn over(stream: impl Transport, timeout: Duration, output_handler: OutputHandler) -> Self {
        let stream: BoxedTransport = Box::new(stream);
        Self::new(SessionClient::new(stream), timeout, output_handler)
    }

    pub fn session(&mut self) -> &mut SessionClient<BoxedTransport> {
        &mut self.session
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Pass a step's output through the output handler.
    pub fn emit(&self, label: &str, output: &str) {
        (self.output_handler)(label, output);
    }
}

/// One step of a console script.
///
/// The runner executes the login step, one step per command line, and
/// finally the logout step, handing each transcript to the output handler
/// under the step's [`label`](Self::label).
#[async_trait(?Send)]
pub trait ScriptStep: 'static {
    /// Label the output is reported under. Never contains credentials.
    fn label(&self) -> &str;

    /// Run the step and return its transcript.
    async fn execute(&self, ctx: &mut Context) -> Result<String, SessionError>;
}
