#![deny(clippy::all, warnings)]
#![allow(clippy::missing_errors_doc)]

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use color_eyre::Result;

use vpy_core::{run_session, SessionRequest};
use vpy_domain::UserOptions;

/// Create isolated python environments.
#[derive(Debug, Parser)]
#[command(name = "vpy", version, about)]
struct VpyCli {
    /// Directory to create the environment in.
    dest: Utf8PathBuf,

    /// Interpreter to base the environment on: a version (`3.12`, `311`),
    /// an implementation (`pypy3.10`), a PEP 440 range (`>=3.10,<3.13`) or
    /// a path.
    #[arg(short, long)]
    python: Option<String>,

    /// Give the environment access to the host's site-packages.
    #[arg(long)]
    system_site_packages: bool,

    /// Copy files into the environment instead of symlinking.
    #[arg(long, visible_alias = "always-copy")]
    copies: bool,

    /// Prompt prefix the activation scripts advertise; defaults to the
    /// destination directory name.
    #[arg(long)]
    prompt: Option<String>,

    /// Remove the destination's contents before creating.
    #[arg(long)]
    clear: bool,

    /// Skip installing pip into the environment.
    #[arg(long = "no-seed", visible_alias = "without-pip")]
    no_seed: bool,

    /// Use the builtin creators even when the host ships `venv`.
    #[arg(long)]
    force_builtin: bool,

    /// More log output; repeat for trace level.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// No output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = VpyCli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let mut options = UserOptions::new(cli.dest.clone());
    options.system_site_packages = cli.system_site_packages;
    options.copies = cli.copies;
    options.prompt = cli.prompt.clone();
    options.clear = cli.clear;
    options.force_builtin = cli.force_builtin;
    options.seed = !cli.no_seed;

    let request = SessionRequest {
        python: cli.python.clone(),
        options,
    };
    match run_session(&request) {
        Ok(env) => {
            if !cli.quiet {
                println!("created environment at {}", env.dest());
            }
            Ok(())
        }
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(error.exit_code());
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = std::env::var("VPY_LOG")
        .unwrap_or_else(|_| format!("vpy={level},vpy_core={level},vpy_domain={level}"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
