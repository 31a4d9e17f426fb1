//! Connection options for a script run.
//!
//! Options are read from a properties-style file:
//!
//! ```text
//! # console of the dispatcher node
//! ServerHostName = sap-prod-01
//! TelnetPort     = 50008
//! Username       = Administrator
//! Password       = secret
//! OperationTimeoutMS = 20000
//! ```
//!
//! `key: value` and `key value` are accepted too, and lines starting with `#`
//! or `!` are comments. A file ending in `.toml` is read as TOML with the
//! same keys.

use crate::session::DEFAULT_TIMEOUT;
use anyhow::{Context as _, Result, anyhow, bail};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

pub const SERVER_HOST_NAME: &str = "ServerHostName";
pub const TELNET_PORT: &str = "TelnetPort";
pub const USERNAME: &str = "Username";
pub const PASSWORD: &str = "Password";
pub const OPERATION_TIMEOUT_MS: &str = "OperationTimeoutMS";

/// Validated connection options.
#[derive(Clone, PartialEq, Eq)]
pub struct Options {
    pub server_host_name: String,
    pub telnet_port: u16,
    pub username: String,
    pub password: String,
    pub operation_timeout: Duration,
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("server_host_name", &self.server_host_name)
            .field("telnet_port", &self.telnet_port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl Options {
    /// Load options from `path`, picking the format from the extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Problems reading options from {}", path.display()))?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&content)
                .with_context(|| format!("Problems reading options from {}", path.display()))
        } else {
            Self::from_properties_str(&content)
        }
    }

    /// Parse properties-style content.
    pub fn from_properties_str(content: &str) -> Result<Self> {
        let mut raw = RawOptions::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = split_property(line);
            let value = Some(Scalar::Text(value.to_string()));
            match key {
                SERVER_HOST_NAME => raw.server_host_name = value,
                TELNET_PORT => raw.telnet_port = value,
                USERNAME => raw.username = value,
                PASSWORD => raw.password = value,
                OPERATION_TIMEOUT_MS => raw.operation_timeout_ms = value,
                other => debug!(key = other, "ignoring unknown option"),
            }
        }
        raw.validate()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawOptions = toml::from_str(content)?;
        raw.validate()
    }
}

/// A value as written in the file: TOML may give numbers, properties never do.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Integer(i64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(n) => write!(f, "{n}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawOptions {
    #[serde(rename = "ServerHostName")]
    server_host_name: Option<Scalar>,
    #[serde(rename = "TelnetPort")]
    telnet_port: Option<Scalar>,
    #[serde(rename = "Username")]
    username: Option<Scalar>,
    #[serde(rename = "Password")]
    password: Option<Scalar>,
    #[serde(rename = "OperationTimeoutMS")]
    operation_timeout_ms: Option<Scalar>,
}

impl RawOptions {
    fn validate(self) -> Result<Options> {
        let (Some(host), Some(port), Some(username), Some(password)) = (
            &self.server_host_name,
            &self.telnet_port,
            &self.username,
            &self.password,
        ) else {
            bail!(self.missing_report());
        };

        let port = port.to_string();
        let telnet_port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| anyhow!("Telnet port is not an integer, but {port}"))?;

        Ok(Options {
            server_host_name: host.to_string(),
            telnet_port,
            username: username.to_string(),
            password: password.to_string(),
            operation_timeout: self.operation_timeout(),
        })
    }

    fn operation_timeout(&self) -> Duration {
        let Some(value) = &self.operation_timeout_ms else {
            return DEFAULT_TIMEOUT;
        };
        match value.to_string().trim().parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    value = %value,
                    default_ms = DEFAULT_TIMEOUT.as_millis() as u64,
                    "{OPERATION_TIMEOUT_MS} is not a valid number of milliseconds, using the default"
                );
                DEFAULT_TIMEOUT
            }
        }
    }

    fn missing_report(&self) -> String {
        let status = |present: bool| if present { "OK" } else { "MISSING" };
        format!(
            "One or more mandatory properties are missing in the options file.\
             \n{SERVER_HOST_NAME}: {}\n{USERNAME}: {}\n{PASSWORD}: {}\n{TELNET_PORT}: {}",
            status(self.server_host_name.is_some()),
            status(self.username.is_some()),
            status(self.password.is_some()),
            status(self.telnet_port.is_some()),
        )
    }
}

/// Split a property line into key and value.
///
/// The key ends at the first `=`, `:` or whitespace; one `=` or `:` may
/// follow, surrounded by optional whitespace.
fn split_property(line: &str) -> (&str, &str) {
    let end = line
        .find(|c: char| c == '=' || c == ':' || c.is_whitespace())
        .unwrap_or(line.len());
    let (key, rest) = line.split_at(end);
    let rest = rest.trim_start();
    let rest = rest.strip_prefix(['=', ':']).unwrap_or(rest);
    (key, rest.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const COMPLETE: &str = "\
# dispatcher
ServerHostName=localhost
TelnetPort = 50008
Username: Administrator
Password   abc=123
";

    #[test]
    fn test_split_property() {
        assert_eq!(split_property("a=b"), ("a", "b"));
        assert_eq!(split_property("a = b"), ("a", "b"));
        assert_eq!(split_property("a:b"), ("a", "b"));
        assert_eq!(split_property("a   b c"), ("a", "b c"));
        assert_eq!(split_property("a = x=y"), ("a", "x=y"));
        assert_eq!(split_property("flag"), ("flag", ""));
    }

    #[test]
    fn test_complete_properties() {
        let options = Options::from_properties_str(COMPLETE).unwrap();
        assert_eq!(options.server_host_name, "localhost");
        assert_eq!(options.telnet_port, 50008);
        assert_eq!(options.username, "Administrator");
        assert_eq!(options.password, "abc=123");
        assert_eq!(options.operation_timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_operation_timeout() {
        let content = format!("{COMPLETE}OperationTimeoutMS=2500\n");
        let options = Options::from_properties_str(&content).unwrap();
        assert_eq!(options.operation_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_bad_timeout_falls_back_to_default() {
        let content = format!("{COMPLETE}OperationTimeoutMS=soon\n");
        let options = Options::from_properties_str(&content).unwrap();
        assert_eq!(options.operation_timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_missing_keys_are_listed() {
        let err = Options::from_properties_str("ServerHostName=localhost\n! comment\nPassword=x\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("ServerHostName: OK"), "got: {err}");
        assert!(err.contains("Username: MISSING"), "got: {err}");
        assert!(err.contains("Password: OK"), "got: {err}");
        assert!(err.contains("TelnetPort: MISSING"), "got: {err}");
    }

    #[test]
    fn test_port_must_be_numeric() {
        let content = COMPLETE.replace("50008", "telnet");
        let err = Options::from_properties_str(&content).unwrap_err().to_string();
        assert_eq!(err, "Telnet port is not an integer, but telnet");
    }

    #[test]
    fn test_debug_hides_password() {
        let options = Options::from_properties_str(COMPLETE).unwrap();
        assert!(!format!("{options:?}").contains("abc=123"));
    }

    #[test]
    fn test_toml_options() {
        let options = Options::from_toml_str(
            "ServerHostName = \"console.local\"\nTelnetPort = 50008\nUsername = \"admin\"\n\
             Password = \"pw\"\nOperationTimeoutMS = 750\n",
        )
        .unwrap();
        assert_eq!(options.server_host_name, "console.local");
        assert_eq!(options.telnet_port, 50008);
        assert_eq!(options.operation_timeout, Duration::from_millis(750));
    }

    #[test]
    fn test_load_picks_format_from_extension() {
        let mut toml_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            toml_file,
            "ServerHostName = \"h\"\nTelnetPort = \"1\"\nUsername = \"u\"\nPassword = \"p\"\n"
        )
        .unwrap();
        assert_eq!(Options::load(toml_file.path()).unwrap().telnet_port, 1);

        let mut properties = tempfile::NamedTempFile::new().unwrap();
        properties.write_all(COMPLETE.as_bytes()).unwrap();
        assert_eq!(Options::load(properties.path()).unwrap().username, "Administrator");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Options::load("/definitely/not/here.properties").unwrap_err();
        assert!(format!("{err:#}").contains("Problems reading options"));
    }
}
