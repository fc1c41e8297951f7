//! # Dispatch
//!
//! Turns parsed arguments into exactly one [`Dispatch`] decision:
//!
//! ```text
//! first positional ──► alias? ──► rewrite to primary name
//!        │
//!        ├─ absent, default handler set ──────────► InvokeDefault
//!        ├─ registered primary name ──────────────► InvokeCommand(name)
//!        └─ anything else, by unknown policy:
//!              default_handler ───────────────────► InvokeDefault (no-op without one)
//!              error ─────────────────────────────► ReportUnknown(token)
//!              help / unset ──────────────────────► ShowHelp
//! ```
//!
//! Resolution is a pure read of the registry; [`crate::App`] carries out the decision.

use crate::args::ParsedArgs;
use crate::config::UnknownPolicy;
use crate::registry::CommandRegistry;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    InvokeDefault,
    InvokeCommand(String),
    /// Carries the unresolved token, absent when there was none.
    ReportUnknown(Option<String>),
    ShowHelp,
}

/// The decision `run` made, along with the arguments handed to the handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub decision: Dispatch,
    pub args: ParsedArgs,
}

pub fn resolve(
    registry: &CommandRegistry,
    has_default: bool,
    policy: UnknownPolicy,
    args: &ParsedArgs,
) -> Dispatch {
    let candidate = args.command().map(|token| match registry.resolve_alias(&token) {
        Some(name) => {
            debug!(alias = %token, command = %name, "resolved alias");
            name.to_string()
        }
        None => token,
    });

    let decision = match candidate {
        None if has_default => Dispatch::InvokeDefault,
        Some(name) if registry.contains(&name) => Dispatch::InvokeCommand(name),
        candidate => match policy {
            UnknownPolicy::DefaultHandler => Dispatch::InvokeDefault,
            UnknownPolicy::Error => Dispatch::ReportUnknown(candidate),
            UnknownPolicy::Help => Dispatch::ShowHelp,
        },
    };

    debug!(?decision, "dispatch resolved");
    decision
}
