use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use quickscript::interactive::{report_error, report_load_failures, run_interactive};
use quickscript::utils::{self, ListingTable};
use quickscript::{Launcher, Registry, SettingsStore};

#[derive(Debug, Parser)]
#[command(
    version,
    about = "Discover small Python scripts, list them and run the one you pick.",
    long_about = "quickscript loads every script in a scripts directory, lists them by name, tags and description, and runs the one you select. Each script may define NAME, DESCRIPTION, TAGS and a main() taking zero arguments or one context argument. Run counts and preferences are kept in a JSON settings file."
)]
struct Args {
    #[arg(short = '!', long, long_help = "Enable debug logging", default_value = "false")]
    debug: bool,

    #[arg(
        short = 's',
        long,
        env = "QUICKSCRIPT_SCRIPTS",
        long_help = "Directory to load scripts from [default: ./scripts, else ~/.quickscript/scripts]"
    )]
    scripts_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "QUICKSCRIPT_SETTINGS",
        default_value = "settings.json",
        long_help = "Settings file holding run counts and preferences"
    )]
    settings: PathBuf,

    #[arg(short = 'l', long, long_help = "List all scripts and exit", conflicts_with_all = ["search", "run", "info"])]
    list: bool,

    #[arg(short = 'q', long, value_name = "QUERY", long_help = "List scripts matching any term of QUERY and exit")]
    search: Option<String>,

    #[arg(short = 'r', long, value_name = "SCRIPT", long_help = "Run SCRIPT (file name or display name) and exit", conflicts_with = "info")]
    run: Option<String>,

    #[arg(short = 'i', long, value_name = "SCRIPT", long_help = "Show details about SCRIPT and exit")]
    info: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    utils::logging::init(args.debug);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[-] {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let scripts_dir = args.scripts_dir.unwrap_or_else(utils::default_scripts_dir);

    let bar = ProgressBar::new_spinner();
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_message(format!("Loading scripts from {}...", scripts_dir.display()));
    let registry = Registry::discover(&scripts_dir);
    bar.finish_and_clear();

    let registry = registry?;
    let store = SettingsStore::open(&args.settings)
        .with_context(|| format!("opening settings file {}", args.settings.display()))?;
    let mut launcher = Launcher::new(registry, store);

    let code = if let Some(selection) = args.run {
        report_load_failures(&launcher);
        match launcher.launch(&selection) {
            Ok(outcome) => {
                println!("[+] Finished {} (runs: {})", outcome.file_name, outcome.run_count);
                ExitCode::SUCCESS
            }
            Err(e) => {
                report_error(&e);
                ExitCode::FAILURE
            }
        }
    } else if let Some(selection) = args.info {
        match launcher.info(&selection) {
            Ok(listing) => {
                print!("{}", listing);
                ExitCode::SUCCESS
            }
            Err(e) => {
                report_error(&e);
                ExitCode::FAILURE
            }
        }
    } else if args.list || args.search.is_some() {
        report_load_failures(&launcher);
        let query = args.search.unwrap_or_default();
        println!("{}", ListingTable(launcher.listing(&query)));
        ExitCode::SUCCESS
    } else {
        run_interactive(&mut launcher)?;
        ExitCode::SUCCESS
    };

    launcher.shutdown();
    Ok(code)
}
