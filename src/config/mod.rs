//! Configuration for snapvault
//!
//! A single JSON file describes the whole deployment: the environment
//! name, the object-store backup root, the spool directory for local
//! staging, the backup jobs, and the volume snapshot plans.
//!
//! Loading follows a strict sequence:
//! 1. Read file
//! 2. Parse JSON
//! 3. Validate every job and volume plan
//! 4. Fail fast on the first violation
//!
//! Validation includes the point-in-time recovery window rule: the data
//! engine's change-log retention window must be at least twice the gap
//! between two consecutive logical snapshots of the same job. A config
//! that cannot guarantee replay between adjacent snapshots is rejected
//! at load time, not discovered during a restore.

mod errors;

pub use errors::{ConfigError, ConfigResult};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveTime, Utc};
use croner::Cron;
use serde::{Deserialize, Serialize};

use crate::producer::EngineKind;

/// Dump consistency mode for relational engines.
///
/// `Strict` wraps the dump in a single consistent read view. `Relaxed`
/// skips that flag; it is acceptable only for append-mostly workloads
/// and every run using it is logged at WARN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyMode {
    #[default]
    Strict,
    Relaxed,
}

/// One backup job: a schedule, an engine, a logical name, and retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Logical database/collection name; becomes part of the object key
    pub name: String,

    /// Engine kind, selects the snapshot producer strategy
    pub engine: EngineKind,

    /// Identifier of the credential in the secret store
    pub secret_id: String,

    /// Dump command (program + args). For `sql` engines the command must
    /// write the export to stdout; for `native` engines it must write the
    /// artifact to the path given in `SNAPVAULT_OUT`.
    pub command: Vec<String>,

    /// Five-field cron expression (minute hour dom month dow)
    #[serde(default)]
    pub cron: Option<String>,

    /// Fixed interval in hours, alternative to `cron`
    #[serde(default)]
    pub interval_hours: Option<u32>,

    /// Daily anchor time "HH:MM" for interval schedules
    #[serde(default)]
    pub time_of_day: Option<String>,

    /// Age-based retention for uploaded artifacts, in days
    pub retention_days: u32,

    /// Engine-side change-log retention window, in hours
    pub changelog_window_hours: u32,

    /// Dump consistency mode (default strict)
    #[serde(default)]
    pub consistency: ConsistencyMode,
}

impl JobConfig {
    /// Approximate gap in hours between two consecutive runs.
    ///
    /// For interval schedules this is exact. For cron schedules it is the
    /// gap between the next two occurrences from `now`, which is the
    /// window the PITR rule must cover.
    pub fn approx_interval_hours(&self, now: DateTime<Utc>) -> ConfigResult<f64> {
        if let Some(hours) = self.interval_hours {
            return Ok(hours as f64);
        }

        let expr = self.cron.as_deref().ok_or_else(|| {
            ConfigError::invalid_job(&self.name, "either cron or interval_hours is required")
        })?;

        let cron = Cron::new(expr)
            .parse()
            .map_err(|e| ConfigError::InvalidCron(expr.to_string(), e.to_string()))?;

        let first = cron
            .find_next_occurrence(&now, false)
            .map_err(|e| ConfigError::InvalidCron(expr.to_string(), e.to_string()))?;
        let second = cron
            .find_next_occurrence(&first, false)
            .map_err(|e| ConfigError::InvalidCron(expr.to_string(), e.to_string()))?;

        Ok((second - first).num_seconds() as f64 / 3600.0)
    }

    fn validate(&self, now: DateTime<Utc>) -> ConfigResult<()> {
        if self.name.is_empty() {
            return Err(ConfigError::invalid_job(&self.name, "name must not be empty"));
        }
        // The name is embedded in object keys
        if self.name.contains('/') || self.name.contains("..") {
            return Err(ConfigError::invalid_job(
                &self.name,
                "name must not contain '/' or '..'",
            ));
        }
        if self.secret_id.is_empty() {
            return Err(ConfigError::invalid_job(&self.name, "secret_id must not be empty"));
        }
        if self.command.is_empty() {
            return Err(ConfigError::invalid_job(&self.name, "command must not be empty"));
        }
        if self.retention_days == 0 {
            return Err(ConfigError::invalid_job(&self.name, "retention_days must be > 0"));
        }

        match (&self.cron, self.interval_hours) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::invalid_job(
                    &self.name,
                    "cron and interval_hours are mutually exclusive",
                ));
            }
            (None, None) => {
                return Err(ConfigError::invalid_job(
                    &self.name,
                    "either cron or interval_hours is required",
                ));
            }
            (None, Some(0)) => {
                return Err(ConfigError::invalid_job(&self.name, "interval_hours must be > 0"));
            }
            // The daily anchor only yields a stable fire sequence when
            // the interval divides 24; anything else is a cron job
            (None, Some(h)) if 24 % h != 0 => {
                return Err(ConfigError::invalid_job(
                    &self.name,
                    format!("interval_hours ({}) must divide 24; use cron for other cadences", h),
                ));
            }
            _ => {}
        }

        if let Some(tod) = &self.time_of_day {
            if self.cron.is_some() {
                return Err(ConfigError::invalid_job(
                    &self.name,
                    "time_of_day only applies to interval schedules",
                ));
            }
            NaiveTime::parse_from_str(tod, "%H:%M").map_err(|_| {
                ConfigError::invalid_job(&self.name, format!("invalid time_of_day '{}'", tod))
            })?;
        }

        // PITR window rule: replay between any two adjacent snapshots must
        // be possible, so the engine must retain at least 2x the gap.
        let gap = self.approx_interval_hours(now)?;
        if (self.changelog_window_hours as f64) < 2.0 * gap {
            return Err(ConfigError::invalid_job(
                &self.name,
                format!(
                    "changelog_window_hours ({}) is below 2x the snapshot interval ({:.1}h); \
                     point-in-time recovery between adjacent snapshots would not be guaranteed",
                    self.changelog_window_hours, gap
                ),
            ));
        }

        Ok(())
    }
}

/// Volume snapshot plan: block-level snapshots with count-based retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumePlanConfig {
    /// Identifier of the volume at the storage service
    pub volume_id: String,

    /// Daily snapshot time "HH:MM"
    pub time_of_day: String,

    /// Keep the most recent N snapshots
    pub max_count: u32,

    /// Optional second region to copy each snapshot to
    #[serde(default)]
    pub copy_region: Option<String>,

    /// Independent retention count in the copy region
    #[serde(default)]
    pub copy_max_count: Option<u32>,
}

impl VolumePlanConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.volume_id.is_empty() {
            return Err(ConfigError::invalid_volume_plan(
                &self.volume_id,
                "volume_id must not be empty",
            ));
        }
        if self.max_count == 0 {
            return Err(ConfigError::invalid_volume_plan(
                &self.volume_id,
                "max_count must be > 0",
            ));
        }
        NaiveTime::parse_from_str(&self.time_of_day, "%H:%M").map_err(|_| {
            ConfigError::invalid_volume_plan(
                &self.volume_id,
                format!("invalid time_of_day '{}'", self.time_of_day),
            )
        })?;
        if self.copy_region.is_some() && self.copy_max_count.unwrap_or(0) == 0 {
            return Err(ConfigError::invalid_volume_plan(
                &self.volume_id,
                "copy_max_count must be > 0 when copy_region is set",
            ));
        }
        if self.copy_region.is_none() && self.copy_max_count.is_some() {
            return Err(ConfigError::invalid_volume_plan(
                &self.volume_id,
                "copy_max_count requires copy_region",
            ));
        }
        Ok(())
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Environment name (e.g. "prod"); becomes part of every object key
    pub environment: String,

    /// Object store root directory
    pub backup_root: String,

    /// Local spool directory for staging artifacts before upload
    pub spool_dir: String,

    /// Backup jobs
    pub jobs: Vec<JobConfig>,

    /// Volume snapshot plans
    #[serde(default)]
    pub volumes: Vec<VolumePlanConfig>,

    /// Alert delivery command (program + args); each alert is piped to it
    /// as a JSON payload on stdin. Alerts are logged when unset.
    #[serde(default)]
    pub alert_command: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from a file and validate it
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed(e.to_string()))?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: Config =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.validate(Utc::now())?;
        Ok(config)
    }

    fn validate(&self, now: DateTime<Utc>) -> ConfigResult<()> {
        if self.environment.is_empty() {
            return Err(ConfigError::Invalid("environment must not be empty".into()));
        }
        if self.environment.contains('/') {
            return Err(ConfigError::Invalid("environment must not contain '/'".into()));
        }
        if self.backup_root.is_empty() {
            return Err(ConfigError::Invalid("backup_root must not be empty".into()));
        }
        if self.spool_dir.is_empty() {
            return Err(ConfigError::Invalid("spool_dir must not be empty".into()));
        }
        if let Some(command) = &self.alert_command {
            if command.is_empty() {
                return Err(ConfigError::Invalid("alert_command must not be empty".into()));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for job in &self.jobs {
            if !seen.insert(job.name.as_str()) {
                return Err(ConfigError::invalid_job(&job.name, "duplicate job name"));
            }
            job.validate(now)?;
        }

        for plan in &self.volumes {
            plan.validate()?;
        }

        Ok(())
    }

    /// Spool directory as a Path
    pub fn spool_path(&self) -> &Path {
        Path::new(&self.spool_dir)
    }

    /// Backup root as a PathBuf
    pub fn backup_root_path(&self) -> PathBuf {
        PathBuf::from(&self.backup_root)
    }

    /// Look up a job by logical name
    pub fn job(&self, name: &str) -> Option<&JobConfig> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_job() -> JobConfig {
        JobConfig {
            name: "orders".to_string(),
            engine: EngineKind::Sql,
            secret_id: "db/orders".to_string(),
            command: vec!["mysqldump".to_string(), "orders".to_string()],
            cron: None,
            interval_hours: Some(6),
            time_of_day: None,
            retention_days: 7,
            changelog_window_hours: 48,
            consistency: ConsistencyMode::Strict,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_valid_interval_job() {
        assert!(base_job().validate(now()).is_ok());
    }

    #[test]
    fn test_cron_and_interval_mutually_exclusive() {
        let mut job = base_job();
        job.cron = Some("0 3 * * *".to_string());
        assert!(job.validate(now()).is_err());
    }

    #[test]
    fn test_interval_must_divide_day() {
        let mut job = base_job();
        // A 7h lattice re-anchored each day would shift the fire times
        job.interval_hours = Some(7);
        let err = job.validate(now()).unwrap_err();
        assert!(format!("{}", err).contains("divide 24"));

        job.interval_hours = Some(8);
        assert!(job.validate(now()).is_ok());
    }

    #[test]
    fn test_schedule_required() {
        let mut job = base_job();
        job.interval_hours = None;
        assert!(job.validate(now()).is_err());
    }

    #[test]
    fn test_changelog_window_rule() {
        let mut job = base_job();
        // 6h interval requires a window of at least 12h
        job.changelog_window_hours = 11;
        let err = job.validate(now()).unwrap_err();
        assert!(format!("{}", err).contains("2x"));

        job.changelog_window_hours = 12;
        assert!(job.validate(now()).is_ok());
    }

    #[test]
    fn test_changelog_window_rule_for_cron() {
        let mut job = base_job();
        job.interval_hours = None;
        // Daily at 03:00, gap 24h, requires >= 48h
        job.cron = Some("0 3 * * *".to_string());
        job.changelog_window_hours = 24;
        assert!(job.validate(now()).is_err());

        job.changelog_window_hours = 48;
        assert!(job.validate(now()).is_ok());
    }

    #[test]
    fn test_name_must_be_key_safe() {
        let mut job = base_job();
        job.name = "orders/evil".to_string();
        assert!(job.validate(now()).is_err());
    }

    #[test]
    fn test_relaxed_consistency_parses() {
        let json = r#"{"name":"logs","engine":"sql","secret_id":"db/logs",
            "command":["mysqldump","logs"],"interval_hours":6,
            "retention_days":7,"changelog_window_hours":48,
            "consistency":"relaxed"}"#;
        let job: JobConfig = serde_json::from_str(json).unwrap();
        assert_eq!(job.consistency, ConsistencyMode::Relaxed);
    }

    #[test]
    fn test_volume_plan_copy_requires_count() {
        let plan = VolumePlanConfig {
            volume_id: "vol-1".to_string(),
            time_of_day: "02:30".to_string(),
            max_count: 7,
            copy_region: Some("eu-west-1".to_string()),
            copy_max_count: None,
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_full_config_round_trip() {
        let json = r#"{
            "environment": "prod",
            "backup_root": "/backups",
            "spool_dir": "/var/spool/snapvault",
            "jobs": [{
                "name": "orders",
                "engine": "sql",
                "secret_id": "db/orders",
                "command": ["mysqldump", "orders"],
                "interval_hours": 6,
                "retention_days": 7,
                "changelog_window_hours": 48
            }],
            "volumes": [{
                "volume_id": "vol-1",
                "time_of_day": "02:30",
                "max_count": 7
            }]
        }"#;

        let config = Config::from_json(json).unwrap();
        assert_eq!(config.environment, "prod");
        assert_eq!(config.jobs.len(), 1);
        assert!(config.job("orders").is_some());
        assert_eq!(config.jobs[0].consistency, ConsistencyMode::Strict);
    }

    #[test]
    fn test_alert_command_parses_and_rejects_empty() {
        let json = r#"{
            "environment": "prod",
            "backup_root": "/backups",
            "spool_dir": "/spool",
            "jobs": [],
            "alert_command": ["sh", "-c", "mail -s alert ops@example.com"]
        }"#;
        let config = Config::from_json(json).unwrap();
        assert_eq!(config.alert_command.as_ref().unwrap().len(), 3);

        let json = r#"{
            "environment": "prod",
            "backup_root": "/backups",
            "spool_dir": "/spool",
            "jobs": [],
            "alert_command": []
        }"#;
        assert!(Config::from_json(json).is_err());
    }

    #[test]
    fn test_duplicate_job_names_rejected() {
        let json = r#"{
            "environment": "prod",
            "backup_root": "/backups",
            "spool_dir": "/spool",
            "jobs": [
                {"name":"orders","engine":"sql","secret_id":"a","command":["x"],
                 "interval_hours":6,"retention_days":7,"changelog_window_hours":48},
                {"name":"orders","engine":"sql","secret_id":"b","command":["x"],
                 "interval_hours":6,"retention_days":7,"changelog_window_hours":48}
            ]
        }"#;
        assert!(Config::from_json(json).is_err());
    }
}
