//! Daily scheduler
//!
//! Fires the pipeline once a day at a fixed UTC time. Missed slots are never
//! replayed: a process started after today's slot waits for tomorrow's.

use banvic_common::RunDate;
use chrono::{DateTime, Days, NaiveTime, Utc};
use std::future::Future;
use tracing::{error, info};

use crate::pipeline::{Pipeline, Stages};

/// First slot strictly after `now`
pub fn next_slot_after(now: DateTime<Utc>, daily_at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(daily_at).and_utc();
    if today > now {
        today
    } else {
        let tomorrow = now.date_naive() + Days::new(1);
        tomorrow.and_time(daily_at).and_utc()
    }
}

/// Run date of the slot firing at `slot`
///
/// A daily run covers the day that just ended, so the run date is the day
/// before the slot.
pub fn run_date_for_slot(slot: DateTime<Utc>) -> RunDate {
    let date = slot.date_naive();
    RunDate::new(date.pred_opt().unwrap_or(date))
}

pub struct DailyScheduler<S> {
    pipeline: Pipeline<S>,
    daily_at: NaiveTime,
}

impl<S: Stages> DailyScheduler<S> {
    pub fn new(pipeline: Pipeline<S>, daily_at: NaiveTime) -> Self {
        Self { pipeline, daily_at }
    }

    /// Fire the pipeline at every slot until `shutdown` resolves
    ///
    /// Shutdown is only observed while waiting; a run in progress completes.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(daily_at = %self.daily_at, "Scheduler started");

        loop {
            let slot = next_slot_after(Utc::now(), self.daily_at);
            let run_date = run_date_for_slot(slot);
            info!(next_run = %slot, %run_date, "Waiting for next slot");

            let wait = (slot - Utc::now()).to_std().unwrap_or_default();
            tokio::select! {
                _ = tokio::time::sleep(wait) => {},
                _ = &mut shutdown => {
                    info!("Scheduler stopping");
                    return;
                },
            }

            let report = self.pipeline.run(run_date).await;
            if let Err(e) = report.into_result() {
                error!(%run_date, error = %e, "Scheduled run failed");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_next_slot_later_today() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 6, 0, 0).unwrap();
        assert_eq!(
            next_slot_after(now, at(7, 35)),
            Utc.with_ymd_and_hms(2025, 6, 1, 7, 35, 0).unwrap()
        );
    }

    #[test]
    fn test_missed_slot_is_not_caught_up() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        assert_eq!(
            next_slot_after(now, at(7, 35)),
            Utc.with_ymd_and_hms(2025, 6, 2, 7, 35, 0).unwrap()
        );

        let exactly_now = Utc.with_ymd_and_hms(2025, 6, 1, 7, 35, 0).unwrap();
        assert!(next_slot_after(exactly_now, at(7, 35)) > exactly_now);
    }

    #[test]
    fn test_slot_crosses_month_end() {
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 23, 0, 0).unwrap();
        let slot = next_slot_after(now, at(7, 35));
        assert_eq!(slot, Utc.with_ymd_and_hms(2025, 7, 1, 7, 35, 0).unwrap());
        assert_eq!(run_date_for_slot(slot).to_string(), "2025-06-30");
    }
}
