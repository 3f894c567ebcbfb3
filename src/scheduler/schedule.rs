//! Schedule expressions
//!
//! Two forms, matching the config surface:
//! - a five-field cron expression (minute hour day-of-month month
//!   day-of-week), parsed with croner
//! - a fixed interval in hours, optionally anchored to a daily
//!   time-of-day (so `interval_hours = 6, time_of_day = "02:00"` fires
//!   at 02:00, 08:00, 14:00, 20:00)

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use croner::Cron;

use crate::config::JobConfig;

use super::errors::{SchedulerError, SchedulerResult};

/// A job's schedule
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Five-field cron expression
    Cron(Cron),
    /// Every `hours`, anchored at `anchor` (midnight when unset).
    /// Config validation guarantees `hours` divides 24, so the fire
    /// lattice is the same regardless of which day it is computed on.
    Interval { hours: u32, anchor: NaiveTime },
}

impl Schedule {
    /// Build the schedule for a validated job config
    pub fn from_job(job: &JobConfig) -> SchedulerResult<Self> {
        if let Some(expr) = &job.cron {
            let cron = Cron::new(expr)
                .parse()
                .map_err(|e| SchedulerError::invalid_schedule(&job.name, e.to_string()))?;
            return Ok(Schedule::Cron(cron));
        }

        let hours = job.interval_hours.ok_or_else(|| {
            SchedulerError::invalid_schedule(&job.name, "no cron and no interval_hours")
        })?;

        let anchor = match &job.time_of_day {
            Some(tod) => NaiveTime::parse_from_str(tod, "%H:%M").map_err(|_| {
                SchedulerError::invalid_schedule(&job.name, format!("bad time_of_day '{}'", tod))
            })?,
            None => NaiveTime::MIN,
        };

        Ok(Schedule::Interval { hours, anchor })
    }

    /// The next fire time strictly after `after`
    pub fn next_fire(&self, after: DateTime<Utc>) -> SchedulerResult<DateTime<Utc>> {
        match self {
            Schedule::Cron(cron) => cron
                .find_next_occurrence(&after, false)
                .map_err(|e| SchedulerError::Internal(e.to_string())),
            Schedule::Interval { hours, anchor } => {
                let step = Duration::hours(*hours as i64);

                // Walk forward from the anchor on `after`'s date; the
                // anchor one day back covers fires earlier today
                let mut fire = Utc
                    .from_utc_datetime(&(after.date_naive() - Duration::days(1)).and_time(*anchor));
                while fire <= after {
                    fire += step;
                }
                Ok(fire)
            }
        }
    }
}
