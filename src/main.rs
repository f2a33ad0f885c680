use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::info;

mod app;
mod checksum;
mod copy;
mod download;
mod env;
mod error;
mod extract;
mod platform;
mod probe;
mod report;
mod util;

use app::{Installer, Outcome, RunOptions};
use extract::SevenZip;
use platform::Platform;
use probe::SystemLocator;
use report::Reporter;

#[derive(Parser, Debug)]
#[command(
    name = "helium-widevine",
    author,
    version,
    about = "Copy Chrome's WidevineCdm module into the Helium browser"
)]
struct Cli {
    /// Only report where the module and the Helium slot were found.
    #[arg(long)]
    check: bool,

    /// Print what would be copied without touching Helium.
    #[arg(long)]
    dry_run: bool,

    /// Show every step and enable debug logging.
    #[arg(long, visible_alias = "debug")]
    verbose: bool,

    /// Use this WidevineCdm directory instead of searching for Chrome.
    #[arg(long, value_name = "PATH")]
    chrome_path: Option<PathBuf>,

    /// Copy into this directory instead of Helium's detected WidevineCdm slot.
    #[arg(long, value_name = "PATH")]
    helium_path: Option<PathBuf>,

    /// Ignore the local Chrome and any cached installer and download a fresh one.
    #[arg(long)]
    force_download: bool,
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            check: self.check,
            dry_run: self.dry_run,
            force_download: self.force_download,
            chrome_path: self.chrome_path.clone(),
            helium_path: self.helium_path.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "warn,helium_widevine=debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();

    let reporter = Reporter::new(cli.verbose);
    let platform = match Platform::current() {
        Ok(platform) => platform,
        Err(err) => {
            reporter.problem(format!("Error: {err}"));
            return ExitCode::FAILURE;
        }
    };

    let locator = SystemLocator::new(platform.os);
    let unpacker = env::seven_zip_override()
        .map(SevenZip::new)
        .unwrap_or_default();
    let installer = Installer::new(platform, reporter, &locator, &unpacker);

    match installer.run(&cli.run_options()).await {
        Ok(outcome) => {
            if let Outcome::Copied { files } = outcome {
                info!("main: finished after copying {files} files");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            reporter.problem(format!("Error: {err}"));
            ExitCode::FAILURE
        }
    }
}
