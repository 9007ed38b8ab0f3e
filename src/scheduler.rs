use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use crate::pipeline::RunTrigger;
use crate::service::{PipelineService, TriggerError};
use crate::store::TableStore;

/// Run the pipeline every `period`. The first run happens one period after
/// start. A tick that lands while a run is active is skipped.
pub async fn run_schedule<S: TableStore>(service: Arc<PipelineService<S>>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // first tick completes immediately
    ticker.tick().await;

    info!(period_secs = period.as_secs(), "Pipeline schedule started");

    loop {
        ticker.tick().await;
        match service.trigger(RunTrigger::Scheduled, None).await {
            Ok(report) => info!(run_id = %report.run_id, "Scheduled run finished"),
            Err(TriggerError::Busy) => warn!("Scheduled run skipped, previous run still active"),
            Err(e) => error!(error = %e, "Scheduled run failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RunReport;
    use crate::service::memory_service;
    use tempfile::TempDir;

    const PERIOD: Duration = Duration::from_secs(60);

    async fn wait_for_report<S: TableStore>(service: &PipelineService<S>) -> RunReport {
        for _ in 0..600 {
            if let Some(report) = service.latest_report() {
                return report;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        panic!("no run report recorded");
    }

    #[tokio::test(start_paused = true)]
    async fn first_run_fires_after_one_period() {
        let dir = TempDir::new().unwrap();
        let service = Arc::new(memory_service(dir.path()));
        let schedule = tokio::spawn(run_schedule(service.clone(), PERIOD));

        tokio::time::sleep(PERIOD - Duration::from_secs(1)).await;
        assert!(service.latest_report().is_none());

        let report = wait_for_report(&service).await;
        assert_eq!(report.trigger, RunTrigger::Scheduled);
        schedule.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn tick_during_active_run_is_skipped() {
        let dir = TempDir::new().unwrap();
        let service = Arc::new(memory_service(dir.path()));
        let held = service.hold_run_lock().await;
        let schedule = tokio::spawn(run_schedule(service.clone(), PERIOD));

        tokio::time::sleep(PERIOD * 3 + Duration::from_secs(1)).await;
        assert!(service.latest_report().is_none());

        drop(held);
        let report = wait_for_report(&service).await;
        assert_eq!(report.trigger, RunTrigger::Scheduled);
        schedule.abort();
    }
}
