use cly::{App, AppConfig, CommandSpec, ParseOptions, UnknownPolicy};
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> anyhow::Result<()> {
    let app = build_app()?;
    futures::executor::block_on(app.run_env())?;
    Ok(())
}

/// Directory holding an optional `cly.json` that overrides the built-in config.
const CONFIG_DIR_ENV: &str = "CLY_CONFIG_DIR";

fn build_app() -> cly::Result<App> {
    let mut config = AppConfig::new()
        .version(env!("CARGO_PKG_VERSION"))
        .exec_name("cly")
        .description(
            "A tiny solution for tiny CLI applications.\n\
             Commands are plain functions; options are whatever you pass.",
        )
        .for_unknown_show(UnknownPolicy::Error)
        .unknown_msg(|cmd| format!("Command not found: '{}'", cmd.unwrap_or_default()))
        .parse_options(
            ParseOptions::new()
                .with_boolean("upper")
                .with_alias("upper", ["u"]),
        );
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        config = config.overlay(dir)?;
    }

    let mut app = App::new("CLY", config);

    app.default_handler(|_| {
        println!("Hello, from CLY!");
        Ok(())
    })?
    .help_command(CommandSpec::new("help").description(
        "Prints help, or the description of the command named after it.",
    ))?
    .command(
        CommandSpec::new(["echo", "say"])
            .description("Prints its arguments.\nUse -u or --upper to shout."),
        |args| {
            let words: Vec<String> = args.positionals_as_strings().into_iter().skip(1).collect();
            let text = words.join(" ");
            if args.get_bool("upper").unwrap_or(false) {
                println!("{}", text.to_uppercase());
            } else {
                println!("{}", text);
            }
            Ok(())
        },
    )?
    .command_async(
        CommandSpec::new(["args", "inspect"]).description("Prints the parsed arguments as JSON."),
        |args| async move {
            println!("{}", serde_json::to_string_pretty(&args)?);
            anyhow::Ok(())
        },
    )?;

    Ok(app)
}
