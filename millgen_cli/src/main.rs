use clap::Parser;
use millgen_config::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

mod cli;
mod error_fmt;
mod generate;

use cli::{Cli, Commands, JSON_MODE};
use error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: could not install error hooks: {e}");
    }
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    // Load the config before logging so `[logging]` can configure the file sink
    let cfg = generate::load_config(&cli.config);
    let guard = init_tracing(&cli, cfg.as_ref().ok());

    if let Err(err) = run(cli, cfg) {
        tracing::error!(error = %err, "command failed");
        if cli::json_mode() {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        // flush the file sink; process::exit skips destructors
        drop(guard);
        std::process::exit(exit_code_for_error(&err));
    }
}

fn run(cli: Cli, cfg: millgen_core::Result<Config>) -> millgen_core::Result<()> {
    let cfg = cfg?;
    let base = generate::config_base(&cli.config);
    let ctx = generate::load_context(cfg, base)?;
    match cli.cmd {
        Commands::Generate { seed, out_dir } => generate::run_generate(ctx, seed, out_dir),
        Commands::Check => generate::run_check(ctx),
        Commands::Plan => generate::run_plan(ctx),
    }
}

/// Console logs go to stderr, pretty or JSON; `[logging] file` adds a JSON-lines file sink.
fn init_tracing(cli: &Cli, cfg: Option<&Config>) -> Option<WorkerGuard> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (pretty, json) = if cli.json {
        let layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter);
        (None, Some(layer))
    } else {
        let layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter);
        (Some(layer), None)
    };

    let base = generate::config_base(&cli.config);
    let (file, guard) = match cfg.and_then(|c| file_layer(&c.logging, &base)) {
        Some((layer, guard)) => (Some(layer), Some(guard)),
        None => (None, None),
    };

    let _ = tracing_subscriber::registry().with(pretty).with(json).with(file).try_init();
    guard
}

fn file_layer<S>(
    logging: &millgen_config::Logging,
    base: &std::path::Path,
) -> Option<(impl Layer<S> + use<S>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let path = base.join(logging.file.as_deref()?);
    let dir = path.parent()?.to_path_buf();
    let name = path.file_name()?.to_os_string();
    let appender = match logging.rotation.as_deref() {
        Some("daily") => tracing_appender::rolling::daily(dir, name),
        Some("hourly") => tracing_appender::rolling::hourly(dir, name),
        _ => tracing_appender::rolling::never(dir, name),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter);
    Some((layer, guard))
}
