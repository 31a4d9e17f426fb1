//! Console sessions over a byte stream.

use crate::bounded_wait::{SharedReader, wait_for_delimiter};
use crate::error::SessionError;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

/// Command prompt printed by the console after every response: CR, LF, `>`.
pub const PROMPT: &str = "\r\n>";
pub const LOGIN_PROMPT: &str = "Login: ";
pub const PASSWORD_PROMPT: &str = "Password: ";
pub const LOGOUT_COMMAND: &str = "quit";
/// Returned by [`SessionClient::logout`] whatever happened on the wire.
pub const LOGOUT_CONFIRMATION: &str = "User is logged out";
/// Appended to every line sent.
pub const LINE_TERMINATOR: &str = "\r\n";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

const REDACTED: &str = "********";

/// Lifecycle of a session. Nothing leaves `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unconnected,
    Connected,
    LoggedIn,
    Closed,
}

/// Open a TCP connection to `host:port`, giving up after `timeout`.
pub async fn open_stream(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<TcpStream, SessionError> {
    let address = format!("{host}:{port}");
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            info!(%address, "connected");
            Ok(stream)
        }
        Ok(Err(err)) => Err(SessionError::Connect {
            address,
            message: err.to_string(),
        }),
        Err(_) => Err(SessionError::Connect {
            address,
            message: format!("no answer within {}ms", timeout.as_millis()),
        }),
    }
}

/// A single console session.
///
/// The session owns its stream exclusively. Every exchange takes `&mut self`,
/// so at most one command is ever in flight.
pub struct SessionClient<S> {
    reader: Option<SharedReader<BufReader<ReadHalf<S>>>>,
    writer: Option<WriteHalf<S>>,
    state: SessionState,
}

impl SessionClient<TcpStream> {
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, SessionError> {
        Ok(Self::new(open_stream(host, port, timeout).await?))
    }
}

impl<S> SessionClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap an already connected stream.
    pub fn new(stream: S) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: Some(Arc::new(Mutex::new(BufReader::new(read_half)))),
            writer: Some(write_half),
            state: SessionState::Connected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Write `line` followed by [`LINE_TERMINATOR`]. Does not wait for output.
    ///
    /// A failed write is unrecoverable and closes the session.
    pub async fn send(&mut self, line: &str) -> Result<(), SessionError> {
        let writer = self.writer.as_mut().ok_or(SessionError::Closed)?;
        let mut bytes = Vec::with_capacity(line.len() + LINE_TERMINATOR.len());
        bytes.extend_from_slice(line.as_bytes());
        bytes.extend_from_slice(LINE_TERMINATOR.as_bytes());
        trace!(len = line.len(), "sending line");

        let written = match writer.write_all(&bytes).await {
            Ok(()) => writer.flush().await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            warn!(error = %err, "write failed, closing session");
            self.close().await;
            return Err(SessionError::Write(err));
        }
        Ok(())
    }

    /// Wait up to `timeout` for `delimiter` and return the transcript.
    ///
    /// A read failure means the stream is gone and closes the session; a
    /// timeout leaves it open.
    pub async fn wait_for(
        &mut self,
        delimiter: &str,
        timeout: Duration,
    ) -> Result<String, SessionError> {
        let reader = self.reader.as_ref().ok_or(SessionError::Closed)?;
        match wait_for_delimiter(reader, delimiter.as_bytes(), timeout).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err @ SessionError::Read { .. }) => {
                warn!(error = %err, "stream failed, closing session");
                self.close().await;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn send_and_wait(
        &mut self,
        line: &str,
        delimiter: &str,
        timeout: Duration,
    ) -> Result<String, SessionError> {
        self.send(line).await?;
        self.wait_for(delimiter, timeout).await
    }

    /// Run the credential exchange and return the combined transcript.
    ///
    /// Each step gets its own `timeout`. A read failure or timeout during the
    /// exchange becomes [`SessionError::InvalidLogin`] carrying the partial
    /// output of the failed step, with both credentials masked.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<String, SessionError> {
        let mut transcript = String::new();
        match self
            .credential_exchange(username, password, timeout, &mut transcript)
            .await
        {
            Ok(()) => {
                self.state = SessionState::LoggedIn;
                info!(user = username, "logged in");
                Ok(transcript)
            }
            Err(SessionError::Read { partial, .. })
            | Err(SessionError::Timeout { partial, .. }) => Err(SessionError::InvalidLogin {
                partial: redact(&partial, &[username, password]),
            }),
            Err(err) => Err(err),
        }
    }

    async fn credential_exchange(
        &mut self,
        username: &str,
        password: &str,
        timeout: Duration,
        transcript: &mut String,
    ) -> Result<(), SessionError> {
        transcript.push_str(&self.wait_for(LOGIN_PROMPT, timeout).await?);
        transcript.push_str(&self.send_and_wait(username, PASSWORD_PROMPT, timeout).await?);
        transcript.push_str(&self.send_and_wait(password, PROMPT, timeout).await?);
        Ok(())
    }

    /// Send one console command and return everything up to the next prompt.
    pub async fn send_command(
        &mut self,
        line: &str,
        timeout: Duration,
    ) -> Result<String, SessionError> {
        debug!(command = line, "sending command");
        self.send_and_wait(line, PROMPT, timeout).await
    }

    /// Best-effort logout. Always closes the session and returns
    /// [`LOGOUT_CONFIRMATION`]; failures are logged and dropped.
    pub async fn logout(&mut self, timeout: Duration) -> String {
        if !self.is_closed() {
            if let Err(err) = self.send_and_wait(LOGOUT_COMMAND, PROMPT, timeout).await {
                debug!(error = %err, "logout exchange did not complete");
            }
        }
        self.close().await;
        LOGOUT_CONFIRMATION.to_string()
    }

    /// Release the stream. Safe to call any number of times.
    pub async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(err) = writer.shutdown().await {
                trace!(error = %err, "shutdown failed");
            }
        }
        self.reader = None;
        if self.state != SessionState::Closed {
            self.state = SessionState::Closed;
            debug!("session closed");
        }
    }
}

/// Mask every occurrence of each non-empty secret, longest first so a secret
/// contained in another is not left half visible.
fn redact(text: &str, secrets: &[&str]) -> String {
    let mut secrets: Vec<&str> = secrets.iter().copied().filter(|s| !s.is_empty()).collect();
    secrets.sort_by_key(|secret| std::cmp::Reverse(secret.len()));
    secrets
        .into_iter()
        .fold(text.to_string(), |text, secret| text.replace(secret, REDACTED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, DuplexStream, Lines};

    type ServerLines = Lines<BufReader<ReadHalf<DuplexStream>>>;

    fn pair() -> (SessionClient<DuplexStream>, ServerLines, WriteHalf<DuplexStream>) {
        let (client, server) = tokio::io::duplex(1024);
        let (read_half, write_half) = tokio::io::split(server);
        (SessionClient::new(client), BufReader::new(read_half).lines(), write_half)
    }

    async fn next_line(lines: &mut ServerLines) -> String {
        lines.next_line().await.unwrap().unwrap()
    }

    const SHORT: Duration = Duration::from_millis(150);
    const LONG: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_login_transcript_concatenates_fragments() {
        let (mut client, mut lines, mut out) = pair();
        let server = tokio::spawn(async move {
            out.write_all(b"Login: ").await.unwrap();
            assert_eq!(next_line(&mut lines).await, "alice");
            out.write_all(b"Password: ").await.unwrap();
            assert_eq!(next_line(&mut lines).await, "secret");
            out.write_all(b"\r\n>").await.unwrap();
            (lines, out)
        });

        let transcript = client.login("alice", "secret", LONG).await.unwrap();
        assert_eq!(transcript, "Login: Password: \r\n>");
        assert_eq!(client.state(), SessionState::LoggedIn);
        let _keep_open = server.await.unwrap();
    }

    #[tokio::test]
    async fn test_login_timeout_becomes_invalid_login() {
        let (mut client, mut lines, mut out) = pair();
        let server = tokio::spawn(async move {
            out.write_all(b"Login: ").await.unwrap();
            next_line(&mut lines).await;
            out.write_all(b"  unknown user  ").await.unwrap();
            (lines, out)
        });

        let err = client.login("mallory", "hunter2", SHORT).await.unwrap_err();
        match err {
            SessionError::InvalidLogin { partial } => assert_eq!(partial, "unknown user"),
            other => panic!("expected invalid login, got {other:?}"),
        }
        // A timed out login leaves the connection itself intact.
        assert_eq!(client.state(), SessionState::Connected);
        let _keep_open = server.await.unwrap();
    }

    #[tokio::test]
    async fn test_login_read_failure_masks_password() {
        let (mut client, mut lines, mut out) = pair();
        tokio::spawn(async move {
            out.write_all(b"Login: ").await.unwrap();
            next_line(&mut lines).await;
            out.write_all(b"Password: ").await.unwrap();
            let password = next_line(&mut lines).await;
            out.write_all(format!("{password}\r\nLogin failed\r\n").as_bytes())
                .await
                .unwrap();
        });

        let err = client.login("admin", "s3cr3t", LONG).await.unwrap_err();
        match &err {
            SessionError::InvalidLogin { partial } => {
                assert!(!partial.contains("s3cr3t"), "password leaked: {partial}");
                assert!(partial.contains("Login failed"), "got: {partial}");
            }
            other => panic!("expected invalid login, got {other:?}"),
        }
        assert!(!err.to_string().contains("s3cr3t"));
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_send_appends_line_terminator() {
        let (client, server) = tokio::io::duplex(64);
        let mut client = SessionClient::new(client);
        let (mut server_read, _server_write) = tokio::io::split(server);

        client.send("jump 0").await.unwrap();
        let mut received = [0u8; 8];
        tokio::io::AsyncReadExt::read_exact(&mut server_read, &mut received)
            .await
            .unwrap();
        assert_eq!(&received, b"jump 0\r\n");
    }

    #[tokio::test]
    async fn test_send_command_returns_output_through_prompt() {
        let (mut client, mut lines, mut out) = pair();
        let server = tokio::spawn(async move {
            let command = next_line(&mut lines).await;
            out.write_all(format!("{command}\r\nserver node 0 running\r\n>").as_bytes())
                .await
                .unwrap();
            (lines, out)
        });

        let transcript = client.send_command("lsc", LONG).await.unwrap();
        assert_eq!(transcript, "lsc\r\nserver node 0 running\r\n>");
        let _keep_open = server.await.unwrap();
    }

    #[tokio::test]
    async fn test_command_timeout_keeps_session_open() {
        let (mut client, mut lines, mut out) = pair();

        let err = client.send_command("slow", SHORT).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(client.state(), SessionState::Connected);

        assert_eq!(next_line(&mut lines).await, "slow");
        out.write_all(b"done\r\n>").await.unwrap();
        let transcript = client.wait_for(PROMPT, LONG).await.unwrap();
        assert_eq!(transcript, "done\r\n>");
    }

    #[tokio::test]
    async fn test_logout_after_peer_vanished() {
        let (mut client, lines, out) = pair();
        drop(lines);
        drop(out);

        let confirmation = client.logout(SHORT).await;
        assert_eq!(confirmation, LOGOUT_CONFIRMATION);
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_logout_sends_quit_and_closes() {
        let (mut client, mut lines, mut out) = pair();
        let server = tokio::spawn(async move {
            let line = next_line(&mut lines).await;
            out.write_all(b"bye\r\n>").await.unwrap();
            // After close the client side reports end of stream.
            let after = lines.next_line().await.unwrap();
            (line, after)
        });

        assert_eq!(client.logout(LONG).await, LOGOUT_CONFIRMATION);
        let (line, after) = server.await.unwrap();
        assert_eq!(line, LOGOUT_COMMAND);
        assert_eq!(after, None);
    }

    #[tokio::test]
    async fn test_logout_on_silent_peer_returns_after_timeout() {
        let (mut client, _lines, _out) = pair();
        let started = std::time::Instant::now();
        assert_eq!(client.logout(SHORT).await, LOGOUT_CONFIRMATION);
        assert!(started.elapsed() < LONG);
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_final() {
        let (mut client, _lines, _out) = pair();
        client.close().await;
        client.close().await;
        assert_eq!(client.state(), SessionState::Closed);

        assert!(matches!(client.send("lsc").await, Err(SessionError::Closed)));
        assert!(matches!(
            client.send_command("lsc", SHORT).await,
            Err(SessionError::Closed)
        ));
        assert_eq!(client.logout(SHORT).await, LOGOUT_CONFIRMATION);
        assert_eq!(client.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_login_timeout_masks_echoed_username() {
        let (mut client, mut lines, mut out) = pair();
        let server = tokio::spawn(async move {
            out.write_all(b"Login: ").await.unwrap();
            let username = next_line(&mut lines).await;
            // Echo the name back and never ask for the password.
            out.write_all(format!("{username}\r\n").as_bytes()).await.unwrap();
            (lines, out)
        });

        let err = client.login("alice", "secret", SHORT).await.unwrap_err();
        match &err {
            SessionError::InvalidLogin { partial } => assert_eq!(partial, REDACTED),
            other => panic!("expected invalid login, got {other:?}"),
        }
        assert!(!err.to_string().contains("alice"), "username leaked: {err}");
        let _keep_open = server.await.unwrap();
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("pw is abc", &["", "abc"]), "pw is ********");
        assert_eq!(redact("nothing", &["", ""]), "nothing");
        assert_eq!(
            redact("admin tried admin123", &["admin", "admin123"]),
            "******** tried ********"
        );
    }
}
