//! # Cly Architecture
//!
//! Cly is a **tiny command dispatcher** for tiny CLI applications: register named
//! handlers (with aliases and descriptions), hand it an argument vector, and it runs
//! the matching handler, a default handler, or prints help.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  App (app.rs)                                               │
//! │  - Registration API, fluent: command(..)?.command(..)?      │
//! │  - run(): parse → resolve → execute                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Dispatch (dispatch.rs) + Help (help.rs)                    │
//! │  - Pure reads of registry and config                        │
//! │  - One Dispatch decision per run, help as a String          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Registry (registry.rs) + Commands (command.rs)             │
//! │  - Validated entries in registration order                  │
//! │  - Alias resolution                                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Argument Source (args.rs)                                  │
//! │  - Raw tokens → ParsedArgs (positionals + options)          │
//! │  - Injected; FlagParser by default                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: Explicit Inputs
//!
//! Nothing below `App::run_env` reads process state. `run` takes the argument vector
//! as a parameter and writes its own text (help, unknown-command messages) through an
//! [`Output`], so tests drive everything with synthetic vectors and a [`Captured`]
//! output.
//!
//! ## Lifecycle
//!
//! Registration happens first and can fail ([`ClyError`]); a failed registration
//! changes nothing. After setup the registry is only read. Each `run` is independent
//! and awaits at most one handler.
//!
//! ## Module Overview
//!
//! - [`app`]: The `App` facade
//! - [`args`]: Argument source trait, parsed arguments, default flag parser
//! - [`command`]: Command specs, handlers, registered entries
//! - [`config`]: `AppConfig` and the unknown-command policy
//! - [`dispatch`]: The resolution algorithm
//! - [`error`]: Error types
//! - [`help`]: Help text rendering
//! - [`output`]: Where dispatch writes its text
//! - [`registry`]: The command registry

pub mod app;
pub mod args;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod help;
pub mod output;
pub mod registry;

pub use app::App;
pub use args::{ArgValue, ArgumentSource, FlagParser, ParseOptions, ParsedArgs};
pub use command::{CommandEntry, CommandSpec, Handler};
pub use config::{AppConfig, UnknownPolicy};
pub use dispatch::{Dispatch, Outcome};
pub use error::{ClyError, HandlerResult, Result};
pub use output::{Captured, Emission, Output, Terminal};
pub use registry::CommandRegistry;
