#![cfg_attr(not(windows), forbid(unsafe_code))]

mod config;
mod constants;
mod engine;
mod error;
mod listing;
mod platform;
#[cfg(test)]
mod testing;
mod types;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use clap::error::ErrorKind;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level as TraceLevel, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use config::ConfigFile;
use constants::exit;
use engine::events::{EventSink, Sleeper};
use engine::{ApplyOutcome, IdentityIndex, Supervisor};
use error::ConfigError;
use platform::{DisplayConfigService, NativeService};
use types::ResolvedMode;

#[derive(Parser, Debug)]
#[command(name = "monitor-modes", version, about = "Switch between named multi-monitor layouts")]
#[command(group(ArgGroup::new("action").required(true).args(["mode", "list", "modes", "check"])))]
struct Cli {
    /// Mode name, or its 1-based position in the config file
    mode: Option<String>,

    /// List detected monitors and their config serials
    #[arg(long)]
    list: bool,

    /// List configured modes
    #[arg(long)]
    modes: bool,

    /// Validate the config file and exit
    #[arg(long)]
    check: bool,

    /// Config file to use instead of the default locations
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Debug logging, overrides LOG_LEVEL
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) -> Result<()> {
    let log_level = if verbose {
        TraceLevel::DEBUG
    } else {
        match std::env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string())
            .to_lowercase()
            .as_str()
        {
            "trace" => TraceLevel::TRACE,
            "debug" => TraceLevel::DEBUG,
            "warn" => TraceLevel::WARN,
            "error" => TraceLevel::ERROR,
            _ => TraceLevel::INFO,
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn list_monitors(config_path: &Path) -> Result<u8> {
    let identity = match ConfigFile::load(config_path) {
        Ok(config) => IdentityIndex::new(config.monitors.values()),
        Err(ConfigError::NotFound(path)) => {
            warn!(path = %path.display(), "no config file, listing monitors without serials");
            IdentityIndex::default()
        }
        Err(e) => return Err(e.into()),
    };

    let rows = listing::detected_monitors(&NativeService::new(), &identity)
        .context("failed to query display paths")?;
    listing::write_rows(&mut io::stdout().lock(), &rows)?;
    Ok(exit::SUCCESS)
}

fn list_modes(config: &ConfigFile) -> Result<u8> {
    let mut out = io::stdout().lock();
    for summary in config.mode_summaries() {
        writeln!(out, "{:>3}  {}  [{}]", summary.index, summary.name, summary.enabled_monitors.join(", "))?;
    }
    Ok(exit::SUCCESS)
}

fn apply(config: &ConfigFile, requested: &str) -> Result<u8> {
    let mode = config.resolve_mode(requested)?;
    let identity = IdentityIndex::new(config.monitors.values());
    let mut supervisor = Supervisor::new(NativeService::new(), identity);
    Ok(apply_resolved(&mut supervisor, &mode))
}

/// Run the supervisor and turn its verdict into an exit code
fn apply_resolved<S, Z, E>(supervisor: &mut Supervisor<S, Z, E>, mode: &ResolvedMode) -> u8
where
    S: DisplayConfigService,
    Z: Sleeper,
    E: EventSink,
{
    match supervisor.apply_mode(mode) {
        ApplyOutcome::Applied { attempt } => {
            let primary = mode.displays.iter().find(|d| d.is_primary).map_or("", |d| d.display_name.as_str());
            info!(mode = %mode.name, primary = %primary, attempt, "done");
            exit::SUCCESS
        }
        ApplyOutcome::Failed { last_error, restore } => {
            error!(mode = %mode.name, error = %last_error, restored = restore.is_ok(), "failed to apply mode");
            exit::APPLY_FAILED
        }
    }
}

fn run(cli: &Cli) -> Result<u8> {
    let config_path = ConfigFile::locate(cli.config.as_deref());
    if cli.list {
        return list_monitors(&config_path);
    }

    let config = ConfigFile::load_validated(&config_path)?;
    if cli.check {
        println!("{}: ok", config_path.display());
        return Ok(exit::SUCCESS);
    }
    if cli.modes {
        return list_modes(&config);
    }

    let requested = cli.mode.as_deref().context("no mode given")?;
    apply(&config, requested)
}

fn exit_code_for(e: &anyhow::Error) -> u8 {
    if e.downcast_ref::<ConfigError>().is_some() {
        exit::CONFIG_ERROR
    } else {
        exit::UNHANDLED
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::from(exit::SUCCESS),
                _ => ExitCode::from(exit::CONFIG_ERROR),
            };
        }
    };

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("failed to initialise logging: {e}");
    }

    let code = match std::panic::catch_unwind(|| run(&cli)) {
        Ok(Ok(code)) => code,
        Ok(Err(e)) => {
            error!("{e:#}");
            exit_code_for(&e)
        }
        Err(_) => exit::UNHANDLED,
    };
    ExitCode::from(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::events::{RecordingSink, RecordingSleeper};
    use crate::platform::ApplyFlags;
    use crate::testing::FakeService;

    const CONFIG: &str = r#"{
        "monitors": {
            "left":  { "serial": "S1", "uid": "UID1", "name": "Dell" },
            "right": { "serial": "S2", "uid": "UID2", "name": "LG" },
            "spare": { "serial": "S9", "uid": "UID9", "name": "Old TV" }
        },
        "modes": {
            "desk": { "displays": [
                { "monitor": "left", "enabled": true, "primary": true,
                  "width": 2560, "height": 1440, "refreshRate": 144,
                  "position": { "x": 0, "y": 0 } },
                { "monitor": "right", "enabled": true, "primary": false,
                  "width": 1920, "height": 1080, "refreshRate": 60,
                  "position": { "x": 2560, "y": 0 } }
            ] },
            "tv": { "displays": [
                { "monitor": "spare", "enabled": true, "primary": true,
                  "width": 1920, "height": 1080, "refreshRate": 60,
                  "position": { "x": 0, "y": 0 } }
            ] }
        }
    }"#;

    /// Exit code plus the flags of every apply call the fake saw
    fn exit_code_for_mode(requested: &str) -> (u8, Vec<ApplyFlags>) {
        let config = ConfigFile::parse(CONFIG).unwrap();
        config.validate().unwrap();
        let mode = config.resolve_mode(requested).unwrap();

        let mut fake = FakeService::new();
        fake.add_path("S1", "UID1", 10, 1, true);
        fake.add_path("S1", "UID1", 11, 1, false);
        fake.add_path("S2", "UID2", 10, 2, false);
        fake.add_path("S2", "UID2", 12, 2, false);

        let identity = IdentityIndex::new(config.monitors.values());
        let mut supervisor =
            Supervisor::with_seams(fake, identity, RecordingSleeper::default(), RecordingSink::default());
        let code = apply_resolved(&mut supervisor, &mode);
        let (fake, _, _) = supervisor.parts();
        (code, fake.applies.iter().map(|(flags, _)| *flags).collect())
    }

    #[test]
    fn test_applied_mode_exits_zero() {
        let (code, applies) = exit_code_for_mode("desk");
        assert_eq!(code, exit::SUCCESS);
        assert_eq!(applies, vec![ApplyFlags::validate(), ApplyFlags::commit()]);
    }

    #[test]
    fn test_absent_monitor_exits_two_after_restore() {
        // "tv" drives S9, which is not connected
        let (code, applies) = exit_code_for_mode("2");
        assert_eq!(code, exit::APPLY_FAILED);
        assert_eq!(applies, vec![ApplyFlags::restore()]);
    }

    #[test]
    fn test_mode_and_list_are_exclusive() {
        let err = Cli::try_parse_from(["monitor-modes", "work", "--list"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_an_action_is_required() {
        let err = Cli::try_parse_from(["monitor-modes", "--config", "x.json"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_mode_by_index_parses_as_name() {
        let cli = Cli::try_parse_from(["monitor-modes", "-v", "2"]).unwrap();
        assert_eq!(cli.mode.as_deref(), Some("2"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_config_errors_map_to_exit_one() {
        let e = anyhow::Error::from(ConfigError::Invalid(vec!["bad".to_string()]));
        assert_eq!(exit_code_for(&e), exit::CONFIG_ERROR);

        let wrapped = anyhow::Error::from(ConfigError::NotFound(PathBuf::from("c.json"))).context("loading");
        assert_eq!(exit_code_for(&wrapped), exit::CONFIG_ERROR);

        assert_eq!(exit_code_for(&anyhow::anyhow!("boom")), exit::UNHANDLED);
    }
}
