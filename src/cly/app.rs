//! # Application
//!
//! [`App`] is what embedding code talks to. Setup registers commands and at most
//! one default handler; `run` then parses an argument vector, resolves it, and
//! carries out the decision:
//!
//! ```rust
//! use cly::{App, AppConfig, UnknownPolicy};
//!
//! let mut app = App::new(
//!     "CLY",
//!     AppConfig::new()
//!         .version("1.0.0")
//!         .for_unknown_show(UnknownPolicy::Error),
//! );
//!
//! app.default_handler(|_| Ok(()))?
//!     .command("greet", |args| {
//!         println!("hello {}", args.positional(1).unwrap_or_default());
//!         Ok(())
//!     })?
//!     .command(["bye", "farewell"], |_| Ok(()))?;
//!
//! let outcome = app.run_blocking(["farewell"])?;
//! assert_eq!(outcome.decision, cly::Dispatch::InvokeCommand("bye".into()));
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Setup errors come back as [`ClyError`] and leave the app as it was. Errors from
//! handlers come back from `run` exactly as the handler returned them.

use crate::args::{ArgumentSource, FlagParser, ParsedArgs};
use crate::command::{Action, CommandSpec, Handler};
use crate::config::AppConfig;
use crate::dispatch::{self, Dispatch, Outcome};
use crate::error::{ClyError, HandlerResult, Result};
use crate::help;
use crate::output::{Emission, Output, Terminal};
use crate::registry::CommandRegistry;
use std::fmt;
use std::future::Future;
use tracing::{debug, warn};

pub struct App {
    name: String,
    config: AppConfig,
    registry: CommandRegistry,
    default_handler: Option<Handler>,
    source: Box<dyn ArgumentSource>,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("default_handler", &self.default_handler)
            .finish_non_exhaustive()
    }
}

impl App {
    pub fn new(name: impl Into<String>, config: AppConfig) -> Self {
        let registry = CommandRegistry::new().with_strict_aliases(config.strict_aliases);
        Self {
            name: name.into(),
            config,
            registry,
            default_handler: None,
            source: Box::new(FlagParser),
        }
    }

    /// Replaces the argument source (defaults to [`FlagParser`]).
    pub fn with_source<S: ArgumentSource + 'static>(mut self, source: S) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Read-only view of the registered commands.
    pub fn commands(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn has_default_handler(&self) -> bool {
        self.default_handler.is_some()
    }

    pub fn command<F>(&mut self, spec: impl Into<CommandSpec>, handler: F) -> Result<&mut Self>
    where
        F: Fn(&ParsedArgs) -> HandlerResult + 'static,
    {
        self.register(spec.into(), Action::Run(Handler::from_fn(handler)))
    }

    pub fn command_async<F, Fut>(
        &mut self,
        spec: impl Into<CommandSpec>,
        handler: F,
    ) -> Result<&mut Self>
    where
        F: Fn(ParsedArgs) -> Fut + 'static,
        Fut: Future<Output = HandlerResult> + 'static,
    {
        self.register(spec.into(), Action::Run(Handler::from_async(handler)))
    }

    /// Registers the built-in help command.
    ///
    /// `<help> <command>` prints that command's description; anything else prints
    /// the full help text.
    pub fn help_command(&mut self, spec: impl Into<CommandSpec>) -> Result<&mut Self> {
        self.register(spec.into(), Action::Help)
    }

    fn register(&mut self, spec: CommandSpec, action: Action) -> Result<&mut Self> {
        self.registry.register(spec, action)?;
        Ok(self)
    }

    pub fn default_handler<F>(&mut self, handler: F) -> Result<&mut Self>
    where
        F: Fn(&ParsedArgs) -> HandlerResult + 'static,
    {
        self.set_default(Handler::from_fn(handler))
    }

    pub fn default_handler_async<F, Fut>(&mut self, handler: F) -> Result<&mut Self>
    where
        F: Fn(ParsedArgs) -> Fut + 'static,
        Fut: Future<Output = HandlerResult> + 'static,
    {
        self.set_default(Handler::from_async(handler))
    }

    fn set_default(&mut self, handler: Handler) -> Result<&mut Self> {
        if self.default_handler.is_some() {
            let err = ClyError::DefaultAlreadyRegistered;
            warn!(error = %err, "default handler registration rejected");
            return Err(err);
        }
        debug!("registered default handler");
        self.default_handler = Some(handler);
        Ok(self)
    }

    pub fn render_help(&self) -> String {
        help::render_help(&self.name, &self.config, &self.registry)
    }

    /// Description of a command, looked up by name or alias.
    pub fn describe(&self, token: &str) -> Option<&str> {
        help::describe(&self.registry, token)
    }

    pub fn parse<I, S>(&self, raw: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw: Vec<String> = raw.into_iter().map(Into::into).collect();
        self.source.parse(&raw, &self.config.parse_options)
    }

    pub fn resolve(&self, args: &ParsedArgs) -> Dispatch {
        dispatch::resolve(
            &self.registry,
            self.default_handler.is_some(),
            self.config.unknown_policy(),
            args,
        )
    }

    /// Parses `raw`, dispatches, and writes help or unknown-command text to `output`.
    pub async fn run_with<I, S>(&self, raw: I, output: &mut dyn Output) -> anyhow::Result<Outcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = self.parse(raw);
        let decision = self.resolve(&args);
        self.execute(&decision, &args, output).await?;
        Ok(Outcome { decision, args })
    }

    /// Like [`App::run_with`], writing to stdout.
    pub async fn run<I, S>(&self, raw: I) -> anyhow::Result<Outcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut terminal = Terminal;
        self.run_with(raw, &mut terminal).await
    }

    /// Runs with the process arguments (program name excluded).
    pub async fn run_env(&self) -> anyhow::Result<Outcome> {
        self.run(std::env::args().skip(1)).await
    }

    pub fn run_blocking<I, S>(&self, raw: I) -> anyhow::Result<Outcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        futures::executor::block_on(self.run(raw))
    }

    async fn execute(
        &self,
        decision: &Dispatch,
        args: &ParsedArgs,
        output: &mut dyn Output,
    ) -> HandlerResult {
        match decision {
            Dispatch::InvokeDefault => match &self.default_handler {
                Some(handler) => handler.call(args).await,
                None => Ok(()),
            },
            Dispatch::InvokeCommand(name) => {
                let Some(entry) = self.registry.get(name) else {
                    return Ok(());
                };
                match entry.action() {
                    Action::Run(handler) => handler.call(args).await,
                    Action::Help => {
                        self.show_help_for(args, output);
                        Ok(())
                    }
                }
            }
            Dispatch::ReportUnknown(cmd) => {
                output.emit(Emission::Unknown, &self.config.unknown_message(cmd.as_deref()));
                Ok(())
            }
            Dispatch::ShowHelp => {
                output.emit(Emission::Help, &self.render_help());
                Ok(())
            }
        }
    }

    fn show_help_for(&self, args: &ParsedArgs, output: &mut dyn Output) {
        let target = args.positional(1);
        match target.as_deref().and_then(|t| self.describe(t)) {
            Some(description) => output.emit(Emission::Description, description),
            None => output.emit(Emission::Help, &self.render_help()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ParseOptions;
    use crate::config::UnknownPolicy;
    use crate::output::Captured;
    use futures::executor::block_on;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    /// A handler that logs `label:<positionals joined by spaces>`.
    fn record(log: &Log, label: &'static str) -> impl Fn(&ParsedArgs) -> HandlerResult + 'static {
        let log = log.clone();
        move |args: &ParsedArgs| {
            log.borrow_mut()
                .push(format!("{label}:{}", args.positionals_as_strings().join(" ")));
            Ok(())
        }
    }

    fn run(app: &App, raw: &[&str]) -> (Outcome, Captured) {
        let mut out = Captured::new();
        let outcome = block_on(app.run_with(raw.iter().copied(), &mut out)).unwrap();
        (outcome, out)
    }

    fn app_with(policy: UnknownPolicy) -> App {
        App::new("CLY", AppConfig::new().for_unknown_show(policy))
    }

    #[test]
    fn greet_and_farewell_scenario() {
        let log = Log::default();
        let mut app = App::new("CLY", AppConfig::default());
        app.command("greet", record(&log, "h1"))
            .unwrap()
            .command(["bye", "farewell"], record(&log, "h2"))
            .unwrap();

        let (outcome, out) = run(&app, &["farewell"]);
        assert_eq!(outcome.decision, Dispatch::InvokeCommand("bye".into()));
        assert_eq!(*log.borrow(), vec!["h2:farewell"]);
        assert!(out.is_empty());
    }

    #[test]
    fn alias_and_primary_reach_same_handler() {
        let log = Log::default();
        let mut app = App::new("CLY", AppConfig::default());
        app.command(["remove", "rm", "del"], record(&log, "remove"))
            .unwrap();

        for token in ["remove", "rm", "del"] {
            let (outcome, _) = run(&app, &[token, "file"]);
            assert_eq!(outcome.decision, Dispatch::InvokeCommand("remove".into()));
        }
        assert_eq!(
            *log.borrow(),
            vec!["remove:remove file", "remove:rm file", "remove:del file"]
        );
    }

    #[test]
    fn duplicate_command_keeps_first_dispatchable() {
        let log = Log::default();
        let mut app = App::new("CLY", AppConfig::default());
        app.command("greet", record(&log, "first")).unwrap();
        let err = app.command("greet", record(&log, "second")).unwrap_err();
        assert!(matches!(err, ClyError::DuplicateCommand(_)));

        run(&app, &["greet"]);
        assert_eq!(*log.borrow(), vec!["first:greet"]);
        assert_eq!(app.commands().len(), 1);
    }

    #[test]
    fn whitespace_rejected_before_mutation() {
        let log = Log::default();
        let mut app = App::new("CLY", AppConfig::default());
        assert!(matches!(
            app.command("two words", record(&log, "x")).unwrap_err(),
            ClyError::InvalidCommandName(_)
        ));
        assert!(matches!(
            app.command(["ok", "bad alias"], record(&log, "x")).unwrap_err(),
            ClyError::InvalidAlias { .. }
        ));
        assert!(app.commands().is_empty());
        assert!(!app.render_help().contains("ok"));
    }

    #[test]
    fn second_default_handler_fails() {
        let log = Log::default();
        let mut app = App::new("CLY", AppConfig::default());
        app.default_handler(record(&log, "first")).unwrap();
        let err = app.default_handler(record(&log, "second")).unwrap_err();
        assert!(matches!(err, ClyError::DefaultAlreadyRegistered));

        let err = app
            .default_handler_async(|_| async { Ok(()) })
            .unwrap_err();
        assert!(matches!(err, ClyError::DefaultAlreadyRegistered));

        run(&app, &[]);
        assert_eq!(*log.borrow(), vec!["first:"]);
    }

    #[test]
    fn no_token_runs_default_with_empty_positionals() {
        let log = Log::default();
        let mut app = app_with(UnknownPolicy::Error);
        app.default_handler(record(&log, "default")).unwrap();
        app.command("greet", record(&log, "greet")).unwrap();

        let (outcome, out) = run(&app, &["--verbose"]);
        assert_eq!(outcome.decision, Dispatch::InvokeDefault);
        assert!(outcome.args.positionals.is_empty());
        assert_eq!(outcome.args.get_bool("verbose"), Some(true));
        assert_eq!(*log.borrow(), vec!["default:"]);
        assert!(out.is_empty());
    }

    #[test]
    fn no_token_no_default_error_policy_reports() {
        let log = Log::default();
        let mut app = app_with(UnknownPolicy::Error);
        app.command("greet", record(&log, "greet")).unwrap();

        let (outcome, out) = run(&app, &[]);
        assert_eq!(outcome.decision, Dispatch::ReportUnknown(None));
        assert_eq!(
            out.emissions,
            vec![(Emission::Unknown, "unknown command".to_string())]
        );
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn unknown_token_uses_custom_message() {
        let config = AppConfig::new()
            .for_unknown_show(UnknownPolicy::Error)
            .unknown_msg(|cmd| format!("Command not found: '{}'", cmd.unwrap_or_default()));
        let app = App::new("CLY", config);

        let (_, out) = run(&app, &["nope"]);
        assert_eq!(out.texts(), vec!["Command not found: 'nope'"]);
    }

    #[test]
    fn default_handler_policy_forwards_unknown_token() {
        let log = Log::default();
        let mut app = app_with(UnknownPolicy::DefaultHandler);
        app.default_handler(record(&log, "default")).unwrap();
        app.command("greet", record(&log, "greet")).unwrap();

        let (outcome, out) = run(&app, &["nope"]);
        assert_eq!(outcome.decision, Dispatch::InvokeDefault);
        assert_eq!(outcome.args.positionals_as_strings(), vec!["nope"]);
        assert_eq!(*log.borrow(), vec!["default:nope"]);
        assert!(out.is_empty());
    }

    #[test]
    fn default_handler_policy_without_default_is_noop() {
        let app = app_with(UnknownPolicy::DefaultHandler);
        let (outcome, out) = run(&app, &["nope"]);
        assert_eq!(outcome.decision, Dispatch::InvokeDefault);
        assert!(out.is_empty());
    }

    #[test]
    fn unset_policy_shows_help() {
        let mut app = App::new("CLY", AppConfig::new().version("1.0.0"));
        app.command("greet", |_| Ok(())).unwrap();

        let (outcome, out) = run(&app, &["nope"]);
        assert_eq!(outcome.decision, Dispatch::ShowHelp);
        assert_eq!(
            out.emissions,
            vec![(Emission::Help, app.render_help())]
        );
        assert!(out.texts()[0].ends_with("CLY v1.0.0"));
    }

    #[test]
    fn static_help_ignores_registry() {
        let mut app = App::new("CLY", AppConfig::new().help("Just this."));
        assert_eq!(app.render_help(), "Just this.");
        app.command(["greet", "hi"], |_| Ok(())).unwrap();
        assert_eq!(app.render_help(), "Just this.");
    }

    #[test]
    fn help_lists_names_and_aliases() {
        let mut app = App::new("CLY", AppConfig::default());
        app.command("greet", |_| Ok(()))
            .unwrap()
            .command(["bye", "farewell", "ciao"], |_| Ok(()))
            .unwrap();

        let help = app.render_help();
        assert!(help.contains("greet"));
        assert!(help.contains("bye"));
        assert!(help.contains("farewell, ciao"));
    }

    #[test]
    fn help_command_describes_or_shows_help() {
        let mut app = App::new("CLY", AppConfig::new().version("1.0.0"));
        app.help_command(["help", "h"])
            .unwrap()
            .command(
                CommandSpec::new(["joke", "tell-joke"]).description("Prints out a joke."),
                |_| Ok(()),
            )
            .unwrap();

        let (outcome, out) = run(&app, &["help", "tell-joke"]);
        assert_eq!(outcome.decision, Dispatch::InvokeCommand("help".into()));
        assert_eq!(
            out.emissions,
            vec![(Emission::Description, "Prints out a joke.".to_string())]
        );

        let (_, out) = run(&app, &["h"]);
        assert_eq!(out.emissions, vec![(Emission::Help, app.render_help())]);

        let (_, out) = run(&app, &["help", "nope"]);
        assert_eq!(out.last().unwrap().0, Emission::Help);
    }

    #[test]
    fn async_handlers_are_awaited() {
        let log = Log::default();
        let sink = log.clone();
        let mut app = App::new("CLY", AppConfig::default());
        app.command_async("later", move |args| {
            let sink = sink.clone();
            async move {
                futures::future::ready(()).await;
                sink.borrow_mut().push(args.positionals_as_strings().join(" "));
                Ok(())
            }
        })
        .unwrap();

        let outcome = app.run_blocking(["later", "on"]).unwrap();
        assert_eq!(outcome.decision, Dispatch::InvokeCommand("later".into()));
        assert_eq!(*log.borrow(), vec!["later on"]);
    }

    #[test]
    fn async_default_handler_is_awaited() {
        let log = Log::default();
        let sink = log.clone();
        let mut app = App::new("CLY", AppConfig::default());
        app.default_handler_async(move |_| {
            let sink = sink.clone();
            async move {
                sink.borrow_mut().push("default".to_string());
                Ok(())
            }
        })
        .unwrap();

        app.run_blocking(Vec::<String>::new()).unwrap();
        assert_eq!(*log.borrow(), vec!["default"]);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("handler exploded")]
    struct Exploded;

    #[test]
    fn handler_errors_propagate_unchanged() {
        let mut app = App::new("CLY", AppConfig::default());
        app.command("boom", |_| Err(Exploded.into())).unwrap();
        app.command_async("later-boom", |_| async { Err(anyhow::Error::from(Exploded)) })
            .unwrap();

        for cmd in ["boom", "later-boom"] {
            let mut out = Captured::new();
            let err = block_on(app.run_with([cmd], &mut out)).unwrap_err();
            assert!(err.downcast_ref::<Exploded>().is_some());
            assert_eq!(err.to_string(), "handler exploded");
        }
    }

    #[test]
    fn parse_options_reach_the_source() {
        let log = Log::default();
        let config = AppConfig::new().parse_options(ParseOptions::new().with_boolean("v"));
        let mut app = App::new("CLY", config);
        app.command("joke", record(&log, "joke")).unwrap();

        let (outcome, _) = run(&app, &["-v", "joke"]);
        assert_eq!(outcome.decision, Dispatch::InvokeCommand("joke".into()));
        assert_eq!(outcome.args.get_bool("v"), Some(true));
    }

    #[test]
    fn injected_source_replaces_parser() {
        let log = Log::default();
        let mut app = App::new("CLY", AppConfig::default()).with_source(
            |_: &[String], _: &ParseOptions| ParsedArgs::from_positionals(["greet", "fixed"]),
        );
        app.command("greet", record(&log, "greet")).unwrap();

        run(&app, &["ignored"]);
        assert_eq!(*log.borrow(), vec!["greet:greet fixed"]);
    }

    #[test]
    fn strict_aliases_come_from_config() {
        let mut app = App::new("CLY", AppConfig::new().strict_aliases(true));
        app.command("list", |_| Ok(())).unwrap();
        let err = app.command(["ls", "list"], |_| Ok(())).unwrap_err();
        assert!(matches!(err, ClyError::AliasConflict { .. }));

        let mut loose = App::new("CLY", AppConfig::default());
        loose.command("list", |_| Ok(())).unwrap();
        loose.command(["ls", "list"], |_| Ok(())).unwrap();
        assert_eq!(
            loose.resolve(&ParsedArgs::from_positionals(["list"])),
            Dispatch::InvokeCommand("ls".into())
        );
    }

    #[test]
    fn runs_are_independent() {
        let log = Log::default();
        let mut app = app_with(UnknownPolicy::Error);
        app.default_handler(record(&log, "default")).unwrap();
        app.command("greet", record(&log, "greet")).unwrap();

        run(&app, &["greet"]);
        run(&app, &[]);
        run(&app, &["greet", "again"]);
        assert_eq!(
            *log.borrow(),
            vec!["greet:greet", "default:", "greet:greet again"]
        );
    }

    #[test]
    fn debug_output_names_the_app() {
        let mut app = App::new("CLY", AppConfig::default());
        app.command("greet", |_| Ok(())).unwrap();
        let rendered = format!("{app:?}");
        assert!(rendered.starts_with("App {"));
        assert!(rendered.contains("\"CLY\""));
        assert!(rendered.contains("greet"));
    }

    #[test]
    fn describe_reads_registry() {
        let mut app = App::new("CLY", AppConfig::default());
        app.command(CommandSpec::new("update").description("Update things."), |_| Ok(()))
            .unwrap();
        assert_eq!(app.describe("update"), Some("Update things."));
        assert_eq!(app.describe("nope"), None);
        assert_eq!(
            app.commands().get("update").unwrap().description(),
            Some("Update things.")
        );
    }
}
