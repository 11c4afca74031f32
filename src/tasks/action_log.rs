//! Timer action logging background task

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::timer::TimerAction;

/// Background task that logs every timer action until the feed closes
///
/// Returns the number of actions observed.
pub async fn action_log_task(mut actions: broadcast::Receiver<TimerAction>) -> u64 {
    info!("Starting timer action log task");

    let mut seen = 0;
    loop {
        match actions.recv().await {
            Ok(action) => {
                seen += 1;
                match action {
                    TimerAction::Start => info!("Timer run started"),
                    TimerAction::Pause(elapsed) => {
                        info!("Timer paused after {:.3}s", elapsed.as_secs_f64())
                    }
                    TimerAction::Completed => info!("Timer run completed"),
                    TimerAction::Idle => debug!("Timer is idle"),
                    TimerAction::Stop => info!("Timer stopped"),
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Action log lagged behind, skipped {} actions", skipped);
            }
            Err(RecvError::Closed) => {
                debug!("Timer action feed closed");
                break;
            }
        }
    }

    info!("Timer action log task finished after {} actions", seen);
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};
    use crate::timer::{ManualScheduler, Timer};

    #[tokio::test]
    async fn logs_until_the_timer_stops() {
        let scheduler = ManualScheduler::new();
        let timer = Timer::builder(Duration::from_secs(1))
            .autostart(false)
            .scheduler(Arc::new(scheduler.clone()))
            .build()
            .unwrap();
        let task = tokio::spawn(action_log_task(timer.subscribe()));

        timer.start();
        scheduler.fire();
        timer.stop();

        // start, completed, idle, stop
        assert_eq!(task.await.unwrap(), 4);
    }

    #[tokio::test]
    async fn finishes_when_the_timer_is_dropped() {
        let scheduler = ManualScheduler::new();
        let timer = Timer::builder(Duration::from_secs(1))
            .scheduler(Arc::new(scheduler))
            .build()
            .unwrap();
        let task = tokio::spawn(action_log_task(timer.subscribe()));

        drop(timer);
        assert_eq!(task.await.unwrap(), 0);
    }
}
