//! Cron-driven trigger for the import service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tracing::{error, info, warn};

use crate::service::ImportService;

pub struct ImportScheduler {
    schedule: Schedule,
    service: Arc<ImportService>,
}

impl ImportScheduler {
    pub fn new(schedule: Schedule, service: Arc<ImportService>) -> Self {
        Self { schedule, service }
    }

    /// Time of the next fire, `None` for exhausted schedules.
    pub fn next_fire(&self) -> Option<DateTime<Utc>> {
        self.schedule.upcoming(Utc).next()
    }

    /// Sleep-and-fire loop. Runs until the schedule yields no further
    /// fire times (which a recurring cron expression never does).
    pub async fn run(self) {
        loop {
            let Some(next) = self.next_fire() else {
                warn!("schedule has no upcoming fire times, scheduler stopping");
                return;
            };
            info!(next_import = %next, "next import scheduled");

            let wait = (next - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tokio::time::sleep(wait).await;

            match self.service.run_once().await {
                Ok(report) => {
                    info!(files = report.outcomes().len(), "scheduled import finished")
                }
                Err(e) => error!(error = %e, "scheduled import failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn next_fire_is_in_the_future_for_a_recurring_schedule() {
        let schedule = Schedule::from_str("0 0 0 * * *").unwrap();
        let upcoming = schedule.upcoming(Utc).next().unwrap();
        assert!(upcoming > Utc::now());
    }

    #[test]
    fn exhausted_schedules_yield_no_fire_time() {
        // A concrete timestamp in the past never fires again.
        let schedule = Schedule::from_str("0 0 0 1 1 * 2020").unwrap();
        assert!(schedule.upcoming(Utc).next().is_none());
    }
}
