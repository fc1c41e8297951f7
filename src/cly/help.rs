//! Help text, generated from the registry and config.
//!
//! ```text
//! A tiny solution for tiny CLI applications.
//!
//! Usage: cly command [options]
//!
//! ┌ AVAILABLE COMMANDS
//! ├──── help
//! ├──── joke
//! │ Prints out a joke.
//! │ Aliases: tell-joke
//!
//! CLY v1.0.0
//! ```

use crate::config::AppConfig;
use crate::registry::CommandRegistry;

const COMMANDS_HEADING: &str = "┌ AVAILABLE COMMANDS";
const COMMAND_PREFIX: &str = "├──── ";
const DETAIL_PREFIX: &str = "│ ";

/// Renders the help text. A static help string in the config wins outright.
pub fn render_help(app_name: &str, config: &AppConfig, registry: &CommandRegistry) -> String {
    if !config.help.is_empty() {
        return config.help.clone();
    }

    let mut output = String::new();

    if let Some(description) = non_empty(&config.description) {
        output.push_str(&format!("{description}\n\n"));
    }

    if let Some(exec_name) = non_empty(&config.exec_name) {
        output.push_str(&format!("Usage: {exec_name} command [options]\n\n"));
    }

    if !registry.is_empty() {
        output.push_str(COMMANDS_HEADING);
        for entry in registry.iter() {
            output.push_str(&format!("\n{COMMAND_PREFIX}{}", entry.name()));
            if let Some(description) = entry.description() {
                for line in description.split('\n') {
                    output.push_str(&format!("\n{DETAIL_PREFIX}{line}"));
                }
            }
            if !entry.aliases().is_empty() {
                output.push_str(&format!(
                    "\n{DETAIL_PREFIX}Aliases: {}",
                    entry.aliases().join(", ")
                ));
            }
        }
        output.push_str("\n\n");
    }

    output.push_str(app_name);
    if let Some(version) = non_empty(&config.version) {
        output.push_str(&format!(" v{version}"));
    }

    output
}

/// Description of the command `token` names (by alias or primary name).
/// Registered commands without a description yield an empty string.
pub fn describe<'a>(registry: &'a CommandRegistry, token: &str) -> Option<&'a str> {
    registry
        .find(token)
        .map(|entry| entry.description().unwrap_or(""))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
