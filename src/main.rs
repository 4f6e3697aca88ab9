use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process;

use assemble_installer::config::{DEFAULT_CONFIG_FILE, ReleaseConfig};
use assemble_installer::git::GitRepo;
use assemble_installer::hydra::HydraClient;
use assemble_installer::output;
use assemble_installer::publish::GhCli;
use assemble_installer::release::{Assembler, Outcome};
use assemble_installer::store::NixStore;

/// Assemble installer binaries from Hydra builds into a draft GitHub release.
///
/// Without EVAL_ID the latest evaluation of the jobset is used, and it must
/// have been built from the current git HEAD.
#[derive(Parser, Debug)]
#[command(
    name = "assemble-installer",
    version,
    about,
    after_help = "Examples:\n  assemble-installer\n  assemble-installer 1809234\n  assemble-installer --verbose --config release.toml"
)]
struct Cli {
    /// Hydra evaluation ID to release (defaults to the latest, matching HEAD).
    eval_id: Option<String>,

    /// Path to the TOML config file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Hydra base URL (overrides config and ASSEMBLE_INSTALLER_HYDRA_URL).
    #[arg(long)]
    hydra_url: Option<String>,

    /// Print HTTP requests and subprocess invocations.
    #[arg(long, short)]
    verbose: bool,
}

fn run(cli: &Cli) -> Result<Outcome> {
    let settings = ReleaseConfig::load_from(&cli.config)?.resolve(cli.hydra_url.as_deref())?;
    let hydra = HydraClient::new(&settings.hydra_url, &settings.jobset)?;
    let git = GitRepo::current_dir();
    let store = NixStore;
    let gh = GhCli::default();

    Assembler::new(&settings, &hydra, &git, &store, &gh).run(cli.eval_id.as_deref())
}

/// Exit status for a finished run: an unfinished build is not a failure.
fn exit_code(outcome: &Outcome) -> i32 {
    match outcome {
        Outcome::Published { .. } | Outcome::NotReady { .. } => 0,
    }
}

fn main() {
    let cli = Cli::parse();
    output::set_verbose(cli.verbose);

    match run(&cli) {
        Ok(outcome) => process::exit(exit_code(&outcome)),
        Err(e) => {
            output::fail(&format!("{e:#}"));
            process::exit(1);
        }
    }
}
