//! The `[last_run, today]` bound every run/activity query is scoped to.

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::config::WindowConfig;

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("cutoff hour {0} is not a valid hour of day")]
    InvalidCutoffHour(u32),
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
    #[error("cutoff time does not exist on {0} in the configured timezone")]
    NonexistentLocalTime(chrono::NaiveDate),
}

/// Query window. `last_run` is the previous day's cutoff (close to when the
/// monitored pipeline is triggered), `today` is now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDateWindow {
    pub last_run: DateTime<Utc>,
    pub today: DateTime<Utc>,
}

impl RunDateWindow {
    /// Window relative to `now`: today's date in `tz` at `cutoff_hour:00`,
    /// minus `lookback_days` days.
    pub fn at<Z: TimeZone>(
        now: DateTime<Utc>,
        tz: &Z,
        cutoff_hour: u32,
        lookback_days: i64,
    ) -> Result<Self, WindowError> {
        let local_date = now.with_timezone(tz).date_naive();
        let cutoff = local_date
            .and_hms_opt(cutoff_hour, 0, 0)
            .ok_or(WindowError::InvalidCutoffHour(cutoff_hour))?;

        // On a DST fold take the first occurrence.
        let cutoff = tz
            .from_local_datetime(&cutoff)
            .earliest()
            .ok_or(WindowError::NonexistentLocalTime(local_date))?;

        Ok(Self {
            last_run: cutoff.with_timezone(&Utc) - Duration::days(lookback_days),
            today: now,
        })
    }

    /// Window for the current instant, using the configured timezone.
    pub fn current(cfg: &WindowConfig) -> Result<Self, WindowError> {
        let tz: Tz = cfg
            .timezone
            .parse()
            .map_err(|_| WindowError::UnknownTimezone(cfg.timezone.clone()))?;
        let window = Self::at(Utc::now(), &tz, cfg.cutoff_hour, cfg.lookback_days)?;
        tracing::info!(
            last_run = %window.last_run.with_timezone(&tz),
            today = %window.today.with_timezone(&tz),
            "Computed run window"
        );
        Ok(window)
    }
}
