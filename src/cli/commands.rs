//! CLI command implementations
//!
//! Commands are thin wiring over the subsystems. The privilege split is
//! visible here: `backup` and `restore` open the object store write-only
//! (the producing principal), and only `sweep` opens it with delete
//! capability (the retention principal). The scheduler loop runs backups
//! through the write-only handle too; a sweep tick is the single place a
//! delete-capable handle is constructed.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command as ProcessCommand, Stdio};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, NaiveTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::changelog::FsChangeLogSource;
use crate::config::Config;
use crate::object_store::{LocalFsStore, SweeperHandle, WriterHandle};
use crate::observability::{AlertSink, CommandAlertSink, LogAlertSink, Logger};
use crate::pipeline::BackupRunner;
use crate::restore::{
    ArtifactSelector, EngineControl, RestoreError, RestoreOrchestrator, RestoreRequest,
    RestoreResult, RestoreStatus,
};
use crate::retention::{AgePolicy, RetentionManager};
use crate::scheduler::{Schedule, Scheduler};
use crate::secrets::{EnvSecretStore, FileSecretStore, SecretStore};
use crate::volume::{LocalVolumeService, VolumeSnapshotManager};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::write_response;

/// Daily anchor for the retention sweep tick in the scheduler loop
const SWEEP_ANCHOR: &str = "03:30";

/// Environment variable selecting a file-backed secret store
const SECRETS_FILE_ENV_VAR: &str = "SNAPVAULT_SECRETS_FILE";

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Run { config } => run_loop(&config),
        Command::Backup { config, job } => backup(&config, &job),
        Command::Sweep { config } => sweep(&config),
        Command::VolumeSnapshot { config } => volume_snapshot(&config),
        Command::Restore {
            config,
            job,
            key,
            before,
            recover_to,
            changelog_dir,
            data_dir,
            stop_command,
            start_command,
            health_command,
            load_command,
            apply_command,
        } => restore(RestoreArgs {
            config_path: config,
            job,
            key,
            before,
            recover_to,
            changelog_dir,
            data_dir,
            stop_command,
            start_command,
            health_command,
            load_command,
            apply_command,
        }),
    }
}

/// The producing principal: create/read/list, never delete
fn writer_handle(config: &Config) -> CliResult<WriterHandle> {
    let store = LocalFsStore::open_write_only(config.backup_root_path())
        .map_err(|e| CliError::io_error(e.to_string()))?;
    Ok(WriterHandle::new(Arc::new(store)))
}

/// The retention principal: enumerate and delete
fn sweeper_handle(config: &Config) -> CliResult<SweeperHandle> {
    let store = LocalFsStore::open(config.backup_root_path())
        .map_err(|e| CliError::io_error(e.to_string()))?;
    Ok(SweeperHandle::new(Arc::new(store)))
}

/// Secret store for backup runs: file-backed when
/// `SNAPVAULT_SECRETS_FILE` is set, process environment otherwise
fn secret_store() -> Box<dyn SecretStore> {
    match std::env::var(SECRETS_FILE_ENV_VAR) {
        Ok(path) if !path.is_empty() => Box::new(FileSecretStore::new(path)),
        _ => Box::new(EnvSecretStore),
    }
}

/// Alert sink for this deployment: command delivery when configured,
/// ERROR log lines otherwise
fn alert_sink(config: &Config) -> Box<dyn AlertSink> {
    match &config.alert_command {
        Some(command) => Box::new(CommandAlertSink::new(
            config.environment.clone(),
            command.clone(),
        )),
        None => Box::new(LogAlertSink),
    }
}

/// Validate configuration and create the local directories
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;

    std::fs::create_dir_all(config.spool_path())
        .map_err(|e| CliError::io_error(format!("create spool dir: {}", e)))?;
    // Opening the store creates the backup root and its staging area
    writer_handle(&config)?;

    write_response(json!({
        "initialized": true,
        "environment": config.environment,
        "jobs": config.jobs.len(),
        "volumes": config.volumes.len(),
    }))
}

/// Execute one backup run of a named job and exit
pub fn backup(config_path: &Path, job_name: &str) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let job = config
        .job(job_name)
        .ok_or_else(|| CliError::invalid_request(format!("unknown job '{}'", job_name)))?;

    let runner = BackupRunner::new(
        config.environment.clone(),
        writer_handle(&config)?,
        config.spool_path(),
    );
    let outcome = runner
        .run(job, secret_store().as_ref(), alert_sink(&config).as_ref())
        .map_err(|e| CliError::backup_failed(e.to_string()))?;

    write_response(json!({
        "job": job_name,
        "key": outcome.key,
        "manifest_key": outcome.manifest_key,
        "logical_size": outcome.logical_size,
        "uploaded_size": outcome.uploaded_size,
        "flushed_retained": outcome.flushed_retained,
    }))
}

/// Run one retention sweep over every job's prefix and exit
pub fn sweep(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let (reports, failed) = sweep_all(&config, sweeper_handle(&config)?, Utc::now());
    write_response(json!({ "sweeps": reports, "failed": failed }))?;
    if failed > 0 {
        return Err(CliError::sweep_failed(format!("{} job sweep(s) failed", failed)));
    }
    Ok(())
}

/// Sweep every job's prefix; one job's failure never blocks the others.
/// Returns the per-job reports and how many sweeps failed.
fn sweep_all(
    config: &Config,
    handle: SweeperHandle,
    now: DateTime<Utc>,
) -> (Vec<serde_json::Value>, usize) {
    let mut reports = Vec::new();
    let mut failed = 0;
    for job in &config.jobs {
        let manager = RetentionManager::new(
            handle.clone(),
            AgePolicy {
                max_age_days: job.retention_days,
            },
        );
        let prefix = format!("{}/{}/", config.environment, job.name);
        match manager.sweep(&prefix, now) {
            Ok(report) => reports.push(json!({
                "prefix": prefix,
                "examined": report.examined,
                "deleted": report.deleted,
                "kept": report.kept,
                "foreign": report.foreign,
            })),
            Err(e) => {
                // The next sweep tick retries this prefix
                Logger::error(
                    "SWEEP_FAILED",
                    &[("prefix", prefix.as_str()), ("detail", &e.to_string())],
                );
                failed += 1;
                reports.push(json!({
                    "prefix": prefix,
                    "error": e.to_string(),
                }));
            }
        }
    }
    (reports, failed)
}

/// Execute every volume snapshot plan once and exit
pub fn volume_snapshot(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;

    let mut reports = Vec::new();
    for plan in &config.volumes {
        let report = run_volume_plan(&config, &plan.volume_id)?;
        reports.push(report);
    }
    write_response(json!({ "volumes": reports }))
}

fn run_volume_plan(config: &Config, volume_id: &str) -> CliResult<serde_json::Value> {
    let plan = config
        .volumes
        .iter()
        .find(|p| p.volume_id == volume_id)
        .ok_or_else(|| CliError::invalid_request(format!("unknown volume '{}'", volume_id)))?;

    let root = config.backup_root_path();
    let primary = Arc::new(
        LocalVolumeService::open(root.join("volume-snapshots"))
            .map_err(|e| CliError::volume_failed(e.to_string()))?,
    );

    let mut manager = VolumeSnapshotManager::new(config.environment.clone(), primary);
    if let Some(region) = &plan.copy_region {
        let dest = Arc::new(
            LocalVolumeService::open(root.join(format!("volume-snapshots-{}", region)))
                .map_err(|e| CliError::volume_failed(e.to_string()))?,
        );
        manager = manager.with_copy_region(region.clone(), dest);
    }

    let report = manager
        .run_plan(plan, alert_sink(config).as_ref())
        .map_err(|e| CliError::volume_failed(e.to_string()))?;

    Ok(json!({
        "volume": plan.volume_id,
        "snapshot": report.snapshot_id,
        "pruned": report.pruned,
        "copy": report.copy_id,
        "copy_pruned": report.copy_pruned,
    }))
}

/// What a scheduler entry executes when its tick fires
enum Task {
    Backup(String),
    Sweep,
    Volume(String),
}

/// Run the scheduler loop: backups on their schedules, a daily retention
/// sweep, and daily volume snapshots. Runs until the process is killed.
pub fn run_loop(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let scheduler = Scheduler::new();
    let mut tasks: HashMap<Uuid, Task> = HashMap::new();
    let now = Utc::now();

    for job in &config.jobs {
        let schedule = Schedule::from_job(job)
            .map_err(|e| CliError::scheduler_failed(e.to_string()))?;
        let id = scheduler
            .register(job.name.clone(), schedule, now)
            .map_err(|e| CliError::scheduler_failed(e.to_string()))?;
        tasks.insert(id, Task::Backup(job.name.clone()));
    }

    let sweep_anchor = NaiveTime::parse_from_str(SWEEP_ANCHOR, "%H:%M")
        .map_err(|e| CliError::scheduler_failed(e.to_string()))?;
    let id = scheduler
        .register(
            "sweep",
            Schedule::Interval {
                hours: 24,
                anchor: sweep_anchor,
            },
            now,
        )
        .map_err(|e| CliError::scheduler_failed(e.to_string()))?;
    tasks.insert(id, Task::Sweep);

    for plan in &config.volumes {
        let anchor = NaiveTime::parse_from_str(&plan.time_of_day, "%H:%M")
            .map_err(|e| CliError::config_error(e.to_string()))?;
        let id = scheduler
            .register(
                format!("volume:{}", plan.volume_id),
                Schedule::Interval { hours: 24, anchor },
                now,
            )
            .map_err(|e| CliError::scheduler_failed(e.to_string()))?;
        tasks.insert(id, Task::Volume(plan.volume_id.clone()));
    }

    Logger::info(
        "SCHEDULER_STARTED",
        &[
            ("jobs", &config.jobs.len().to_string()),
            ("volumes", &config.volumes.len().to_string()),
        ],
    );

    loop {
        let now = Utc::now();
        let due = scheduler
            .due_jobs(now)
            .map_err(|e| CliError::scheduler_failed(e.to_string()))?;

        for id in due {
            let claimed = scheduler
                .try_begin_run(id, now)
                .map_err(|e| CliError::scheduler_failed(e.to_string()))?;
            if !claimed {
                continue;
            }

            // A task failure is contained to this tick; the pipeline
            // already alerted and the next fire is the retry
            if let Some(task) = tasks.get(&id) {
                if let Err(e) = execute_task(&config, task) {
                    Logger::error("SCHEDULED_TASK_FAILED", &[("detail", e.message())]);
                }
            }

            scheduler
                .complete_run(id, Utc::now())
                .map_err(|e| CliError::scheduler_failed(e.to_string()))?;
        }

        let wakeup = scheduler
            .next_wakeup()
            .map_err(|e| CliError::scheduler_failed(e.to_string()))?;
        let sleep = match wakeup {
            Some(at) => (at - Utc::now())
                .to_std()
                .unwrap_or(StdDuration::from_secs(1))
                .min(StdDuration::from_secs(60)),
            None => StdDuration::from_secs(60),
        };
        std::thread::sleep(sleep);
    }
}

fn execute_task(config: &Config, task: &Task) -> CliResult<()> {
    match task {
        Task::Backup(name) => {
            let job = config
                .job(name)
                .ok_or_else(|| CliError::invalid_request(format!("unknown job '{}'", name)))?;
            let runner = BackupRunner::new(
                config.environment.clone(),
                writer_handle(config)?,
                config.spool_path(),
            );
            runner
                .run(job, secret_store().as_ref(), alert_sink(config).as_ref())
                .map_err(|e| CliError::backup_failed(e.to_string()))?;
            Ok(())
        }
        Task::Sweep => {
            let (_, failed) = sweep_all(config, sweeper_handle(config)?, Utc::now());
            if failed > 0 {
                return Err(CliError::sweep_failed(format!("{} job sweep(s) failed", failed)));
            }
            Ok(())
        }
        Task::Volume(volume_id) => {
            run_volume_plan(config, volume_id)?;
            Ok(())
        }
    }
}

/// Arguments for the restore command
pub struct RestoreArgs {
    pub config_path: PathBuf,
    pub job: String,
    pub key: Option<String>,
    pub before: Option<String>,
    pub recover_to: Option<String>,
    pub changelog_dir: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub stop_command: String,
    pub start_command: String,
    pub health_command: Option<String>,
    pub load_command: Option<String>,
    pub apply_command: Option<String>,
}

/// Restore a logical store from an artifact
pub fn restore(args: RestoreArgs) -> CliResult<()> {
    let config = Config::load(&args.config_path)?;
    config
        .job(&args.job)
        .ok_or_else(|| CliError::invalid_request(format!("unknown job '{}'", args.job)))?;

    let selector = match (&args.key, &args.before) {
        (Some(key), None) => ArtifactSelector::Key(key.clone()),
        (None, Some(before)) => ArtifactSelector::LatestBefore(parse_time(before)?),
        (None, None) => {
            return Err(CliError::invalid_request("either --key or --before is required"))
        }
        (Some(_), Some(_)) => unreachable!("clap rejects --key with --before"),
    };

    let recover_to = args.recover_to.as_deref().map(parse_time).transpose()?;
    let log_source = match (&recover_to, &args.changelog_dir) {
        (Some(_), Some(dir)) => Some(FsChangeLogSource::new(dir)),
        (Some(_), None) => {
            return Err(CliError::invalid_request(
                "--recover-to requires --changelog-dir",
            ))
        }
        (None, _) => None,
    };
    if recover_to.is_some() && args.apply_command.is_none() {
        return Err(CliError::invalid_request(
            "--recover-to requires --apply-command",
        ));
    }

    let orchestrator = RestoreOrchestrator::new(
        config.environment.clone(),
        writer_handle(&config)?,
        config.spool_path(),
    );
    let mut engine = ProcessEngineControl {
        data_dir: args.data_dir,
        stop: args.stop_command,
        start: args.start_command,
        health: args.health_command,
        load: args.load_command,
        apply: args.apply_command,
    };

    let request = RestoreRequest {
        logical_name: args.job.clone(),
        selector,
        recover_to,
    };
    let result = orchestrator.execute(
        &request,
        &mut engine,
        log_source
            .as_ref()
            .map(|s| s as &dyn crate::changelog::ChangeLogSource),
    );
    let status = RestoreStatus::from_result(&result);

    match result {
        Ok(report) => write_response(json!({
            "restore_status": status.as_str(),
            "key": report.key,
            "snapshot_time": report.snapshot_time.to_rfc3339(),
            "replayed_entries": report.replayed_entries,
        })),
        Err(e) => {
            // The terminal status stays machine readable even on failure
            let line = json!({
                "status": "error",
                "restore_status": status.as_str(),
                "code": e.code().as_str(),
                "message": e.message(),
            });
            let mut stdout = std::io::stdout();
            serde_json::to_writer(&mut stdout, &line)?;
            writeln!(stdout)?;
            Err(CliError::restore_failed(e.to_string()))
        }
    }
}

fn parse_time(value: &str) -> CliResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CliError::invalid_request(format!("bad timestamp '{}': {}", value, e)))
}

/// Engine control that shells out to operator-supplied commands
struct ProcessEngineControl {
    data_dir: PathBuf,
    stop: String,
    start: String,
    health: Option<String>,
    load: Option<String>,
    apply: Option<String>,
}

impl ProcessEngineControl {
    fn run_shell(command: &str) -> RestoreResult<()> {
        let status = ProcessCommand::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .map_err(|e| RestoreError::engine(format!("spawn '{}': {}", command, e)))?;
        if !status.success() {
            return Err(RestoreError::engine(format!("'{}' exited {}", command, status)));
        }
        Ok(())
    }

    fn run_shell_with_stdin(command: &str, input: &[u8]) -> RestoreResult<()> {
        let mut child = ProcessCommand::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| RestoreError::engine(format!("spawn '{}': {}", command, e)))?;
        child
            .stdin
            .take()
            .ok_or_else(|| RestoreError::engine("child stdin unavailable"))?
            .write_all(input)
            .map_err(|e| RestoreError::engine(format!("write to '{}': {}", command, e)))?;
        let status = child
            .wait()
            .map_err(|e| RestoreError::engine(format!("wait for '{}': {}", command, e)))?;
        if !status.success() {
            return Err(RestoreError::engine(format!("'{}' exited {}", command, status)));
        }
        Ok(())
    }
}

impl EngineControl for ProcessEngineControl {
    fn stop(&mut self) -> RestoreResult<()> {
        Self::run_shell(&self.stop)
    }

    fn start(&mut self) -> RestoreResult<()> {
        Self::run_shell(&self.start)
    }

    fn is_ready(&self) -> bool {
        match &self.health {
            Some(cmd) => Self::run_shell(cmd).is_ok(),
            None => true,
        }
    }

    fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn load_dump(&mut self, dump: &[u8]) -> RestoreResult<()> {
        let cmd = self.load.as_deref().ok_or_else(|| {
            RestoreError::engine("sql artifact requires --load-command")
        })?;
        Self::run_shell_with_stdin(cmd, dump)
    }

    fn apply(&mut self, entry: &crate::changelog::ChangeLogEntry) -> RestoreResult<()> {
        let cmd = self.apply.as_deref().ok_or_else(|| {
            RestoreError::engine("point-in-time recovery requires --apply-command")
        })?;
        let line = serde_json::to_vec(entry)
            .map_err(|e| RestoreError::engine(format!("encode entry: {}", e)))?;
        Self::run_shell_with_stdin(cmd, &line)
    }
}
