use crate::args::ParseOptions;
use crate::error::{ClyError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const CONFIG_FILENAME: &str = "cly.json";

/// What `run` does when the first positional token names no command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Print the unknown-command message.
    Error,
    /// Run the default handler, if there is one.
    DefaultHandler,
    /// Print the help text.
    Help,
}

/// Produces the unknown-command message from the unresolved token, if any.
pub type UnknownMsg = Arc<dyn Fn(Option<&str>) -> String + Send + Sync>;

fn default_unknown_msg() -> UnknownMsg {
    Arc::new(|cmd: Option<&str>| match cmd {
        Some(cmd) if !cmd.is_empty() => format!("unknown command: {}", cmd),
        _ => "unknown command".to_string(),
    })
}

/// Application configuration, fixed once handed to [`crate::App::new`].
///
/// Can be stored as `cly.json`; the message producer is code and is never serialized.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Forwarded verbatim to the argument source.
    pub parse_options: ParseOptions,

    /// Long description, shown at the top of the help text.
    pub description: Option<String>,

    /// Executable name used in the usage line.
    pub exec_name: Option<String>,

    pub version: Option<String>,

    /// Static help text. When non-empty it replaces the generated help entirely.
    pub help: String,

    /// Unset behaves as [`UnknownPolicy::Help`].
    pub for_unknown_show: Option<UnknownPolicy>,

    /// Reject aliases and names already used by another command.
    pub strict_aliases: bool,

    #[serde(skip, default = "default_unknown_msg")]
    unknown_msg: UnknownMsg,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            parse_options: ParseOptions::default(),
            description: None,
            exec_name: None,
            version: None,
            help: String::new(),
            for_unknown_show: None,
            strict_aliases: false,
            unknown_msg: default_unknown_msg(),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("parse_options", &self.parse_options)
            .field("description", &self.description)
            .field("exec_name", &self.exec_name)
            .field("version", &self.version)
            .field("help", &self.help)
            .field("for_unknown_show", &self.for_unknown_show)
            .field("strict_aliases", &self.strict_aliases)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn exec_name(mut self, exec_name: impl Into<String>) -> Self {
        self.exec_name = Some(exec_name.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn for_unknown_show(mut self, policy: UnknownPolicy) -> Self {
        self.for_unknown_show = Some(policy);
        self
    }

    pub fn strict_aliases(mut self, strict: bool) -> Self {
        self.strict_aliases = strict;
        self
    }

    pub fn unknown_msg<F>(mut self, producer: F) -> Self
    where
        F: Fn(Option<&str>) -> String + Send + Sync + 'static,
    {
        self.unknown_msg = Arc::new(producer);
        self
    }

    pub fn unknown_policy(&self) -> UnknownPolicy {
        self.for_unknown_show.unwrap_or(UnknownPolicy::Help)
    }

    pub fn unknown_message(&self, cmd: Option<&str>) -> String {
        (self.unknown_msg)(cmd)
    }

    /// Reads `<dir>/cly.json` over the defaults. A missing file is not an error.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::default().overlay(dir)
    }

    /// Applies the top-level keys present in `<dir>/cly.json` on top of `self`.
    ///
    /// Keys the file leaves out keep their current values, and the unknown-command
    /// message producer is never stored, so it always survives.
    pub fn overlay<P: AsRef<Path>>(self, dir: P) -> Result<Self> {
        let path = dir.as_ref().join(CONFIG_FILENAME);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(self),
            Err(e) => return Err(ClyError::Io(e)),
        };

        let file: Map<String, Value> = serde_json::from_str(&text)?;
        let mut merged = match serde_json::to_value(&self)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        merged.extend(file);

        let mut config: AppConfig = serde_json::from_value(Value::Object(merged))?;
        config.unknown_msg = self.unknown_msg;
        debug!(path = %path.display(), "applied config file");
        Ok(config)
    }

    /// Writes `<dir>/cly.json`, creating `dir` as needed.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        fs::write(dir.join(CONFIG_FILENAME), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
