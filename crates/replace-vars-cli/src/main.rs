//! replace-vars CLI entry point.
//!
//! Renders a template with variables read from a `KEY=VALUE` file:
//! `replace-vars <variables_file> <template_file> <output_file>`

mod commands;
mod output;

use std::io;
use std::process::exit;

use clap::error::ErrorKind as ClapErrorKind;
use clap::{Parser, ValueEnum};
use commands::{RenderArgs, USAGE, run_render};
use tracing_subscriber::EnvFilter;

/// Render a template with variables from a KEY=VALUE file.
#[derive(Debug, Parser)]
#[command(name = "replace-vars")]
#[command(about = "Render a template with variables from a KEY=VALUE file", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Color output control
    #[arg(long, value_enum, default_value_t = ColorWhen::Auto)]
    pub color: ColorWhen,

    /// Enable verbose logging on stderr
    #[arg(short, long)]
    pub verbose: bool,

    #[command(flatten)]
    pub render: RenderArgs,
}

/// When to use colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorWhen {
    Auto,
    Always,
    Never,
}

/// Set up color output based on user preference.
fn setup_colors(color_when: ColorWhen) {
    match color_when {
        ColorWhen::Auto => {
            // owo-colors automatically checks TTY, NO_COLOR, FORCE_COLOR
        }
        ColorWhen::Always => {
            owo_colors::set_override(true);
        }
        ColorWhen::Never => {
            owo_colors::set_override(false);
        }
    }
}

/// Log to stderr so diagnostics on stdout stay clean. `RUST_LOG` wins over
/// `--verbose`.
fn init_logging(verbose: bool, color_when: ColorWhen) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(color_when != ColorWhen::Never)
        .with_target(false)
        .init();
}

fn main() -> miette::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.kind() == ClapErrorKind::MissingRequiredArgument => {
            println!("{USAGE}");
            exit(exitcode::USAGE);
        }
        Err(e) => e.exit(),
    };
    setup_colors(cli.color);
    init_logging(cli.verbose, cli.color);

    let color = cli.color;
    miette::set_hook(Box::new(move |_| {
        let opts = miette::MietteHandlerOpts::new()
            .terminal_links(false)
            .unicode(true)
            .context_lines(2);
        let opts = match color {
            ColorWhen::Auto => opts,
            ColorWhen::Always => opts.color(true),
            ColorWhen::Never => opts.color(false),
        };
        Box::new(opts.build())
    }))?;

    exit(run_render(cli.render));
}
