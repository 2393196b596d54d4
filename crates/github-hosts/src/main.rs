// # github-hosts
//
// Thin command-line front end. All hosts editing, backup, scheduling and
// verification logic lives in github-hosts-core; this binary only:
//
// 1. Parses one positional command
// 2. Reads configuration from environment variables
// 3. Initializes logging (stderr plus a daily file under `<home>/logs`) and
//    the tokio runtime
// 4. Builds an `Updater` and runs the command
//
// ## Configuration
//
// - `GITHUB_HOSTS_FILE`: hosts file (default `/etc/hosts`, or
//   `C:\Windows\System32\drivers\etc\hosts` on Windows)
// - `GITHUB_HOSTS_HOME`: base directory for backups, logs, config and the
//   refresh script (default `~/.github-hosts`)
// - `GITHUB_HOSTS_SOURCE_URL`: override document URL
// - `GITHUB_HOSTS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `GITHUB_HOSTS_VERIFY_TIMEOUT_SECS`: per-host verification budget (default 10)
// - `GITHUB_HOSTS_VERIFY_CONCURRENCY`: hosts verified at once (default 8)
//
// ## Commands
//
// ```text
// github-hosts update                  fetch entries and rewrite the managed block
// github-hosts clean                   remove the managed block
// github-hosts status                  show config, scheduled job and block state
// github-hosts verify                  resolve and probe every managed host
// github-hosts enable [30|60|120]      install the recurring refresh job
// github-hosts disable                 remove the recurring refresh job
// github-hosts interval <30|60|120>    change the refresh interval
// github-hosts backup list|create
// github-hosts backup restore <name>
// github-hosts backup delete <name>
// github-hosts diagnose                check directories, hosts file and config
// github-hosts config export           copy config to config_export_<time>.json
// github-hosts config import <path>    load config from a file
// github-hosts uninstall               remove block, job, script and config
// ```
//
// Most commands write system files and need root (Administrator on Windows).

use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use github_hosts_core::config::{ENV_HOME, ENV_HOSTS_FILE, ENV_SOURCE_URL};
use github_hosts_core::scheduler::SystemCommandRunner;
use github_hosts_core::verify::SystemResolver;
use github_hosts_core::workflow::{ConfigStatus, DirectoryStatus, HostsFileStatus};
use github_hosts_core::{
    CommandRunner, FileConfigStore, NetworkVerifier, Platform, SchedulerRegistry, Settings,
    UpdateInterval, Updater, VerificationStatus, VerifyConfig,
};
use github_hosts_http::{HttpHostsSource, HttpProber};

const ENV_LOG_LEVEL: &str = "GITHUB_HOSTS_LOG_LEVEL";
const ENV_VERIFY_TIMEOUT: &str = "GITHUB_HOSTS_VERIFY_TIMEOUT_SECS";
const ENV_VERIFY_CONCURRENCY: &str = "GITHUB_HOSTS_VERIFY_CONCURRENCY";

const USAGE: &str = "usage: github-hosts <update|clean|status|verify|enable [30|60|120]|disable|interval <30|60|120>|backup <list|create|restore NAME|delete NAME>|diagnose|config <export|import PATH>|uninstall>";

/// Daily log files are named `update.<date>.log`
const LOG_FILE_PREFIX: &str = "update";

/// Exit codes
///
/// - 0: Command succeeded
/// - 1: Usage or configuration error
/// - 2: Runtime error
#[derive(Debug, Clone, Copy)]
enum HostsExitCode {
    /// Command succeeded
    Success = 0,
    /// Usage or configuration error
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<HostsExitCode> for ExitCode {
    fn from(code: HostsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Update,
    Clean,
    Status,
    Verify,
    Enable(UpdateInterval),
    Disable,
    Interval(UpdateInterval),
    BackupList,
    BackupCreate,
    BackupRestore(String),
    BackupDelete(String),
    Diagnose,
    ConfigExport,
    ConfigImport(PathBuf),
    Uninstall,
}

impl Command {
    fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let command = match args.as_slice() {
            ["update"] => Self::Update,
            ["clean"] => Self::Clean,
            ["status"] => Self::Status,
            ["verify"] => Self::Verify,
            ["enable"] => Self::Enable(UpdateInterval::default()),
            ["enable", minutes] => Self::Enable(parse_interval(minutes)?),
            ["disable"] => Self::Disable,
            ["interval", minutes] => Self::Interval(parse_interval(minutes)?),
            ["backup", "list"] | ["backups"] => Self::BackupList,
            ["backup", "create"] => Self::BackupCreate,
            ["backup", "restore", name] => Self::BackupRestore(name.to_string()),
            ["backup", "delete", name] => Self::BackupDelete(name.to_string()),
            ["diagnose"] => Self::Diagnose,
            ["config", "export"] => Self::ConfigExport,
            ["config", "import", path] => Self::ConfigImport(PathBuf::from(path)),
            ["uninstall"] => Self::Uninstall,
            [] => anyhow::bail!("missing command\n{USAGE}"),
            _ => anyhow::bail!("unknown command: {}\n{USAGE}", args.join(" ")),
        };
        Ok(command)
    }
}

fn parse_interval(value: &str) -> Result<UpdateInterval> {
    let minutes: u32 = value
        .parse()
        .map_err(|_| anyhow::anyhow!("interval must be a number of minutes, got: {value}"))?;
    UpdateInterval::try_from(minutes)
        .map_err(|_| anyhow::anyhow!("interval must be 30, 60 or 120 minutes, got: {minutes}"))
}

/// Application configuration
struct AppConfig {
    hosts_file: Option<PathBuf>,
    home: Option<PathBuf>,
    source_url: Option<String>,
    log_level: String,
    verify_timeout_secs: Option<u64>,
    verify_concurrency: Option<usize>,
}

impl AppConfig {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            hosts_file: env::var_os(ENV_HOSTS_FILE).map(PathBuf::from),
            home: env::var_os(ENV_HOME).map(PathBuf::from),
            source_url: env::var(ENV_SOURCE_URL).ok(),
            log_level: env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| "info".to_string()),
            verify_timeout_secs: parse_env(ENV_VERIFY_TIMEOUT)?,
            verify_concurrency: parse_env(ENV_VERIFY_CONCURRENCY)?,
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "{ENV_LOG_LEVEL} '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        if let Some(timeout) = self.verify_timeout_secs
            && !(1..=120).contains(&timeout)
        {
            anyhow::bail!("{ENV_VERIFY_TIMEOUT} must be between 1 and 120 seconds. Got: {timeout}");
        }

        if let Some(concurrency) = self.verify_concurrency
            && !(1..=64).contains(&concurrency)
        {
            anyhow::bail!("{ENV_VERIFY_CONCURRENCY} must be between 1 and 64. Got: {concurrency}");
        }

        Ok(())
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// Build core settings for `platform`
    fn settings(&self, platform: Platform) -> Result<Settings> {
        let home = match &self.home {
            Some(home) => home.clone(),
            None => dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("cannot determine home directory; set {ENV_HOME}"))?
                .join(".github-hosts"),
        };

        let mut settings = Settings::new(platform, home);
        if let Some(hosts_file) = &self.hosts_file {
            settings = settings.with_hosts_file(hosts_file.clone());
        }
        if let Some(url) = &self.source_url {
            settings = settings.with_source_url(url.clone());
        }

        let defaults = VerifyConfig::default();
        settings = settings.with_verify(VerifyConfig {
            timeout_secs: self.verify_timeout_secs.unwrap_or(defaults.timeout_secs),
            max_concurrency: self.verify_concurrency.unwrap_or(defaults.max_concurrency),
        });

        if let Ok(executable) = env::current_exe() {
            settings = settings.with_executable(executable);
        }

        settings.validate()?;
        Ok(settings)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{name} is not a valid number: {value}")),
        Err(_) => Ok(None),
    }
}

fn main() -> ExitCode {
    let command = match Command::parse(env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}");
            return HostsExitCode::ConfigError.into();
        }
    };

    let config = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return HostsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {e}");
        return HostsExitCode::ConfigError.into();
    }

    let settings = match Platform::detect()
        .map_err(anyhow::Error::from)
        .and_then(|platform| config.settings(platform))
    {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return HostsExitCode::ConfigError.into();
        }
    };

    // Held until exit so buffered file lines are flushed
    let _log_guard = match init_logging(config.log_level(), &settings.log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to set tracing subscriber: {e}");
            return HostsExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return HostsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run(command, settings).await {
            Ok(()) => HostsExitCode::Success,
            Err(e) => {
                error!("{e:#}");
                if e
                    .downcast_ref::<github_hosts_core::Error>()
                    .is_some_and(github_hosts_core::Error::is_permission_denied)
                {
                    eprintln!("Permission denied: run github-hosts as root (Administrator on Windows)");
                }
                HostsExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Install the stderr layer and, when the log directory is usable, a daily
/// rolling file layer
fn init_logging(level: Level, log_dir: &Path) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard, file_error) = match open_log_file(log_dir) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()?;

    if let Some(e) = file_error {
        warn!(dir = %log_dir.display(), error = %e, "Log directory unavailable, logging to stderr only");
    }
    Ok(guard)
}

fn open_log_file(log_dir: &Path) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(log_dir)?;
    Ok(RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(log_dir)?)
}

/// Build the updater from settings
fn build_updater(settings: Settings) -> Result<Updater> {
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner::new());
    let scheduler = SchedulerRegistry::with_defaults().create(&settings, runner.clone())?;

    let source = HttpHostsSource::new(settings.source_url.clone())?;
    let prober = HttpProber::new(Duration::from_secs(settings.verify.timeout_secs))?;
    let verifier = NetworkVerifier::new(
        Arc::new(SystemResolver::new()),
        Arc::new(prober),
        &settings.verify,
    );
    let store = FileConfigStore::new(settings.config_file.clone());

    info!(
        platform = %settings.platform,
        backend = scheduler.backend_name(),
        hosts = %settings.hosts_file.display(),
        "Starting github-hosts"
    );

    Ok(Updater::new(
        settings,
        Box::new(source),
        scheduler,
        Box::new(store),
        runner,
        verifier,
    )?)
}

/// Run one command
async fn run(command: Command, settings: Settings) -> Result<()> {
    let updater = build_updater(settings)?;

    match command {
        Command::Update => {
            let report = updater.refresh().await?;
            println!(
                "Updated {} entries (backup: {})",
                report.entries, report.backup.name
            );
            if !report.dns_flushed {
                println!("Warning: DNS cache was not flushed; changes apply once cached answers expire");
            }
            if report.config_saved == Some(false) {
                println!("Warning: hosts updated but the last update time could not be saved");
            }
        }
        Command::Clean => match updater.clean().await? {
            Some(backup) => println!("Removed managed block (backup: {})", backup.name),
            None => println!("No managed block present"),
        },
        Command::Status => {
            let status = updater.status().await?;
            println!("Hosts file:     {}", updater.settings().hosts_file.display());
            println!("Managed block:  {} entries", status.managed_entries);
            if let Some(updated) = &status.block_updated {
                println!("Block updated:  {updated}");
            }
            println!("Scheduler:      {} ({})", status.backend, status.job);
            match &status.config {
                Some(config) => {
                    println!(
                        "Auto-update:    {}",
                        if config.auto_update { "enabled" } else { "disabled" }
                    );
                    println!("Interval:       {}", config.update_interval);
                    println!("Last update:    {}", config.last_update.format("%Y-%m-%d %H:%M:%S UTC"));
                }
                None => println!("Config:         not initialized"),
            }
        }
        Command::Verify => {
            let report = updater.verify().await?;
            for result in &report.results {
                let observed = result
                    .observed_address
                    .map(|ip| ip.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let mark = if result.status == VerificationStatus::Ok { "✓" } else { "✗" };
                println!(
                    "{mark} {:<40} {:<16} {:<16} {:<16} {:>6}ms",
                    result.entry.hostname,
                    result.entry.address,
                    observed,
                    result.status,
                    result.elapsed.as_millis()
                );
                if let Some(detail) = &result.detail {
                    println!("    {detail}");
                }
            }
            println!(
                "{} passed, {} failed",
                report.success_count, report.fail_count
            );
        }
        Command::Enable(interval) => {
            let config = updater.enable_auto_update(interval).await?;
            println!("Auto-update enabled every {}", config.update_interval);
        }
        Command::Disable => {
            updater.disable_auto_update().await?;
            println!("Auto-update disabled");
        }
        Command::Interval(interval) => {
            let config = updater.change_interval(interval).await?;
            println!("Update interval set to {}", config.update_interval);
        }
        Command::BackupList => {
            let backups = updater.backups().await?;
            if backups.is_empty() {
                println!("No backups in {}", updater.backup_store().dir().display());
            }
            for backup in backups {
                let created = backup
                    .created_at()
                    .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_default();
                println!("{:<24} {:>10} bytes  {created}", backup.name, backup.size_bytes);
            }
        }
        Command::BackupCreate => {
            let backup = updater.create_backup().await?;
            println!("Created backup {}", backup.name);
        }
        Command::BackupRestore(name) => {
            let safety = updater.restore(&name).await?;
            println!("Restored {name} (previous file saved as {})", safety.name);
        }
        Command::BackupDelete(name) => {
            updater.delete_backup(&name).await?;
            println!("Deleted backup {name}");
        }
        Command::Diagnose => {
            let report = updater.diagnose().await;
            println!("Platform:       {}", report.platform);
            println!("Scheduler:      {}", report.backend);
            match &report.hosts {
                HostsFileStatus::Ok {
                    managed_entries,
                    writable,
                } => println!(
                    "Hosts file:     {} ({managed_entries} managed entries, {})",
                    report.hosts_file.display(),
                    if *writable { "writable" } else { "NOT writable" }
                ),
                HostsFileStatus::Malformed(reason) => {
                    println!("Hosts file:     {} malformed: {reason}", report.hosts_file.display())
                }
                HostsFileStatus::Unreadable(reason) => {
                    println!("Hosts file:     {} unreadable: {reason}", report.hosts_file.display())
                }
            }
            for check in &report.directories {
                let state = match &check.status {
                    DirectoryStatus::Writable => "writable".to_string(),
                    DirectoryStatus::Missing => "missing (created on first use)".to_string(),
                    DirectoryStatus::NotWritable(reason) => format!("NOT writable: {reason}"),
                };
                println!("{:<15} {} {state}", format!("{} dir:", check.role), check.path.display());
            }
            match &report.config {
                ConfigStatus::Ok(config) => println!(
                    "Config:         ok (auto-update {}, every {})",
                    if config.auto_update { "on" } else { "off" },
                    config.update_interval
                ),
                ConfigStatus::Missing => println!("Config:         not initialized"),
                ConfigStatus::Unreadable(reason) => println!("Config:         unreadable: {reason}"),
            }
            if !report.is_healthy() {
                anyhow::bail!("diagnostics found problems");
            }
        }
        Command::ConfigExport => {
            let path = updater.export_config().await?;
            println!("Exported config to {}", path.display());
        }
        Command::ConfigImport(path) => {
            let config = updater.import_config(&path).await?;
            println!(
                "Imported config from {} (auto-update {}, every {})",
                path.display(),
                if config.auto_update { "on" } else { "off" },
                config.update_interval
            );
        }
        Command::Uninstall => {
            updater.uninstall().await?;
            println!(
                "Uninstalled. Backups kept in {}",
                updater.backup_store().dir().display()
            );
        }
    }

    Ok(())
}
