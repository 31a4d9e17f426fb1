//! # Telscript
//!
//! Scripted sessions against line-oriented administrative consoles.
//!
//! Telscript connects to a console over TCP, answers its login prompts,
//! sends a list of commands one at a time and collects the output of each,
//! then logs out. Every wait for output is bounded by a timeout, even when
//! the console never answers.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::time::Duration;
//! use telscript::SessionClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let timeout = Duration::from_secs(10);
//!     let mut session = SessionClient::connect("localhost", 50008, timeout).await?;
//!
//!     print!("{}", session.login("Administrator", "secret", timeout).await?);
//!     print!("{}", session.send_command("jump 0", timeout).await?);
//!     print!("{}", session.send_command("lsc", timeout).await?);
//!     println!("{}", session.logout(timeout).await);
//!     Ok(())
//! }
//! ```
//!
//! ## Running a command file
//!
//! [`ScriptRunner`] reads connection settings from an options file and one
//! command per line from a command file, as the `telscript` binary does:
//!
//! ```no_run
//! use telscript::ScriptRunner;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut runner = ScriptRunner::new("console.properties", "commands.txt")
//!         .with_result_handler(|command, output| eprintln!("[{command}]\n{output}"));
//!
//!     let result = match runner.init() {
//!         Ok(()) => runner.run().await,
//!         Err(err) => Err(err),
//!     };
//!     if let Err(err) = result {
//!         eprintln!("{err}");
//!         std::process::exit(err.exit_code());
//!     }
//! }
//! ```
//!
//! ## Bounded waits
//!
//! [`wait_for_delimiter`] is the building block underneath every exchange.
//! It runs the read as a task, races it against a timer through a
//! [`result_slot`], and returns whichever resolves first. A read that misses
//! its deadline is cancelled before the call returns, so it never competes
//! with the next exchange for the stream.
//!
//! ## Custom steps
//!
//! Implement [`ScriptStep`] to run something other than a plain command
//! inside a scripted session:
//!
//! ```no_run
//! use async_trait::async_trait;
//! use telscript::{Context, ScriptStep, SessionError};
//!
//! /// Switch to a server node before running the remaining commands.
//! pub struct Jump(pub u32);
//!
//! #[async_trait(?Send)]
//! impl ScriptStep for Jump {
//!     fn label(&self) -> &str {
//!         "jump"
//!     }
//!
//!     async fn execute(&self, ctx: &mut Context) -> Result<String, SessionError> {
//!         let timeout = ctx.timeout();
//!         ctx.session().send_command(&format!("jump {}", self.0), timeout).await
//!     }
//! }
//! ```

pub mod bounded_wait;
pub mod command;
pub mod commands;
pub mod delimiter;
pub mod error;
pub mod logging;
pub mod options;
pub mod parser;
pub mod runner;
pub mod session;
pub mod slot;

pub use bounded_wait::wait_for_delimiter;
pub use command::{Context, OutputHandler, ScriptStep, Transport};
pub use commands::{Login, Logout, SendCommand};
pub use delimiter::PendingRead;
pub use error::{RunError, SessionError};
pub use options::Options;
pub use parser::{parse_duration, parse_file, parse_str};
pub use runner::ScriptRunner;
pub use session::{SessionClient, SessionState};
pub use slot::{SlotPublisher, SlotWaiter, result_slot};
