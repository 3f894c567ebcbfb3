//! Backup job scheduling
//!
//! A long-lived table of backup jobs, each with its own next-fire time
//! and an explicit in-flight flag. The invariant the flag enforces:
//! **at most one in-flight run per job**. A tick that arrives while the
//! previous run is still executing is skipped and counted, never
//! queued, so overlapping dumps can never race for the same
//! second-resolution object key.
//!
//! Jobs are independent; there is no cross-job or cross-host
//! coordination because each job owns a disjoint logical-name namespace
//! in the object store.

mod errors;
mod schedule;

pub use errors::{SchedulerError, SchedulerResult};
pub use schedule::Schedule;

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::observability::Logger;

/// One scheduled backup job
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    /// Job ID
    pub id: Uuid,
    /// Logical job name (the config job name)
    pub name: String,
    /// Next fire time
    pub next_fire: DateTime<Utc>,
    /// Whether a run is currently executing
    pub in_flight: bool,
    /// Last completed run
    pub last_run: Option<DateTime<Utc>>,
    /// Ticks skipped because a run was still in flight
    pub skipped_ticks: u64,
}

/// Job scheduler
pub struct Scheduler {
    jobs: RwLock<HashMap<Uuid, (ScheduledJob, Schedule)>>,
    by_name: RwLock<HashMap<String, Uuid>>,
}

impl Scheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            by_name: RwLock::new(HashMap::new()),
        }
    }

    /// Register a job; its first fire is the next schedule point after `now`
    pub fn register(
        &self,
        name: impl Into<String>,
        schedule: Schedule,
        now: DateTime<Utc>,
    ) -> SchedulerResult<Uuid> {
        let name = name.into();
        let next_fire = schedule.next_fire(now)?;
        let id = Uuid::new_v4();

        let job = ScheduledJob {
            id,
            name: name.clone(),
            next_fire,
            in_flight: false,
            last_run: None,
            skipped_ticks: 0,
        };

        self.jobs
            .write()
            .map_err(|_| SchedulerError::Internal("lock poisoned".into()))?
            .insert(id, (job, schedule));
        self.by_name
            .write()
            .map_err(|_| SchedulerError::Internal("lock poisoned".into()))?
            .insert(name, id);

        Ok(id)
    }

    /// Look up a job id by name
    pub fn job_id(&self, name: &str) -> Option<Uuid> {
        self.by_name.read().ok()?.get(name).copied()
    }

    /// Snapshot of a job's state
    pub fn job(&self, id: Uuid) -> SchedulerResult<ScheduledJob> {
        self.jobs
            .read()
            .map_err(|_| SchedulerError::Internal("lock poisoned".into()))?
            .get(&id)
            .map(|(job, _)| job.clone())
            .ok_or_else(|| SchedulerError::UnknownJob(id.to_string()))
    }

    /// Jobs whose fire time has arrived
    pub fn due_jobs(&self, now: DateTime<Utc>) -> SchedulerResult<Vec<Uuid>> {
        let jobs = self
            .jobs
            .read()
            .map_err(|_| SchedulerError::Internal("lock poisoned".into()))?;
        Ok(jobs
            .values()
            .filter(|(job, _)| job.next_fire <= now)
            .map(|(job, _)| job.id)
            .collect())
    }

    /// Earliest next fire time across all jobs
    pub fn next_wakeup(&self) -> SchedulerResult<Option<DateTime<Utc>>> {
        let jobs = self
            .jobs
            .read()
            .map_err(|_| SchedulerError::Internal("lock poisoned".into()))?;
        Ok(jobs.values().map(|(job, _)| job.next_fire).min())
    }

    /// Claim a due tick for execution.
    ///
    /// Returns `false` and advances the fire time when a run is still in
    /// flight: the tick is skipped, not queued.
    pub fn try_begin_run(&self, id: Uuid, now: DateTime<Utc>) -> SchedulerResult<bool> {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|_| SchedulerError::Internal("lock poisoned".into()))?;
        let (job, schedule) = jobs
            .get_mut(&id)
            .ok_or_else(|| SchedulerError::UnknownJob(id.to_string()))?;

        if job.in_flight {
            job.skipped_ticks += 1;
            job.next_fire = schedule.next_fire(now)?;
            Logger::warn(
                "BACKUP_TICK_SKIPPED",
                &[
                    ("job", job.name.as_str()),
                    ("skipped_total", &job.skipped_ticks.to_string()),
                ],
            );
            return Ok(false);
        }

        job.in_flight = true;
        Ok(true)
    }

    /// Mark a claimed run finished and compute the next fire time.
    ///
    /// The next fire is computed from `now`, so a run that overran its
    /// own tick does not cause a burst of catch-up runs.
    pub fn complete_run(&self, id: Uuid, now: DateTime<Utc>) -> SchedulerResult<()> {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|_| SchedulerError::Internal("lock poisoned".into()))?;
        let (job, schedule) = jobs
            .get_mut(&id)
            .ok_or_else(|| SchedulerError::UnknownJob(id.to_string()))?;

        job.in_flight = false;
        job.last_run = Some(now);
        job.next_fire = schedule.next_fire(now)?;
        Ok(())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
