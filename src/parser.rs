//! Command file parser.
//!
//! The top-level entry points are [`parse_str`] and [`parse_file`].

use crate::command::ScriptStep;
use crate::commands::SendCommand;
use anyhow::{Context as _, Result, anyhow};
use std::path::Path;
use std::time::Duration;

/// Prefixes that mark a whole line as a comment.
const COMMENT_PREFIXES: &[&str] = &["#", "//"];

/// Parse a command file from a string slice and return one step per command.
///
/// Every line is one console command, sent verbatim after trimming. Empty
/// lines and lines starting with `#` or `//` are skipped. There is no inline
/// comment syntax: a `#` later in the line is part of the command.
///
/// # Example
///
/// ```
/// use telscript::parse_str;
///
/// let steps = parse_str("# switch to the server node\njump 0\n\nlsc\n");
/// assert_eq!(steps.len(), 2);
/// assert_eq!(steps[0].label(), "jump 0");
/// ```
pub fn parse_str(content: &str) -> Vec<Box<dyn ScriptStep>> {
    command_lines(content)
        .map(|line| Box::new(SendCommand::new(line)) as Box<dyn ScriptStep>)
        .collect()
}

/// Parse a command file from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
///
/// # Example
///
/// ```no_run
/// use telscript::parse_file;
///
/// let steps = parse_file("commands.txt").unwrap();
/// ```
pub fn parse_file(path: impl AsRef<Path>) -> Result<Vec<Box<dyn ScriptStep>>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read command file: {}", path.display()))?;
    Ok(parse_str(&content))
}

fn command_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_comment(line))
}

fn is_comment(line: &str) -> bool {
    COMMENT_PREFIXES
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

/// Parse a duration string such as `1s`, `500ms` or `1.5s`, as given to
/// the `--timeout` flag.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if let Some(ms_str) = s.strip_suffix("ms") {
        let ms: u64 = ms_str
            .trim()
            .parse()
            .context("Invalid milliseconds value")?;
        Ok(Duration::from_millis(ms))
    } else if let Some(s_str) = s.strip_suffix('s') {
        let secs: f64 = s_str.trim().parse().context("Invalid seconds value")?;
        Duration::try_from_secs_f64(secs).map_err(|err| anyhow!("Invalid seconds value: {err}"))
    } else {
        Err(anyhow!("Duration must end with 's' or 'ms', got: {}", s))
    }
}
