use std::{collections::HashMap, sync::Arc};

use chrono::{Local, NaiveDateTime};
use tokio::task::{self, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::alarm::AlarmId;

use super::{AlertSink, GatewayError, SchedulingGateway};

struct ArmedTrigger {
    task: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

impl ArmedTrigger {
    fn disarm(self) {
        self.cancellation_token.cancel();
        self.task.abort();
    }
}

/// In-process gateway implementation: one sleeping tokio task per armed
/// trigger, disarmed through a cancellation token. A platform build would
/// put the OS alarm service behind the same trait.
pub struct TaskSchedulingGateway {
    sink: Arc<dyn AlertSink>,
    triggers: HashMap<AlarmId, ArmedTrigger>,
}

impl TaskSchedulingGateway {
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        Self {
            sink,
            triggers: HashMap::new(),
        }
    }

    fn arm(&self, id: AlarmId, trigger: NaiveDateTime) -> ArmedTrigger {
        let cancellation_token = CancellationToken::new();
        let task_token = cancellation_token.child_token();
        let sink = Arc::clone(&self.sink);

        let now = Local::now().naive_local();
        let delay = (trigger - now).to_std().unwrap_or_default();

        log::info!("[ARM] Trigger for alarm {id} in {delay:?}");

        let task = task::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {
                    log::debug!("Trigger task for alarm {id} was cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    sink.alarm_fired(id).await;
                }
            }
        });

        ArmedTrigger {
            task,
            cancellation_token,
        }
    }
}

impl SchedulingGateway for TaskSchedulingGateway {
    fn register(&mut self, id: AlarmId, trigger: NaiveDateTime) -> Result<(), GatewayError> {
        self.triggers.retain(|_, armed| !armed.task.is_finished());

        if let Some(existing) = self.triggers.remove(&id) {
            existing.disarm();
        }

        let armed = self.arm(id, trigger);
        self.triggers.insert(id, armed);
        Ok(())
    }

    fn cancel(&mut self, id: AlarmId) {
        if let Some(existing) = self.triggers.remove(&id) {
            log::info!("[DISARM] Trigger for alarm {id}");
            existing.disarm();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;

    use super::*;

    type FiredIds = Arc<Mutex<Vec<AlarmId>>>;

    struct RecordingSink {
        fired: FiredIds,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn alarm_fired(&self, id: AlarmId) {
            self.fired.lock().unwrap().push(id);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_fires_at_the_scheduled_instant() {
        let fired = fired_ids();
        let mut gateway = gateway(&fired);
        let trigger = Local::now().naive_local() + ChronoDuration::hours(2);

        gateway.register(7, trigger).unwrap();
        wait_for(ChronoDuration::hours(2)).await;

        assert_eq!(*fired.lock().unwrap(), vec![7]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_trigger_does_not_fire() {
        let fired = fired_ids();
        let mut gateway = gateway(&fired);
        let trigger = Local::now().naive_local() + ChronoDuration::hours(2);

        gateway.register(7, trigger).unwrap();
        gateway.cancel(7);
        wait_for(ChronoDuration::hours(2)).await;

        assert!(fired.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_an_unknown_id_is_a_noop() {
        let fired = fired_ids();
        let mut gateway = gateway(&fired);

        gateway.cancel(42);

        assert!(fired.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reregistering_replaces_the_previous_trigger() {
        let fired = fired_ids();
        let mut gateway = gateway(&fired);
        let now = Local::now().naive_local();

        gateway.register(7, now + ChronoDuration::hours(1)).unwrap();
        gateway.register(7, now + ChronoDuration::hours(3)).unwrap();

        wait_for(ChronoDuration::minutes(90)).await;
        assert!(
            fired.lock().unwrap().is_empty(),
            "The replaced trigger should not fire at its original instant."
        );

        wait_for(ChronoDuration::hours(2)).await;
        assert_eq!(*fired.lock().unwrap(), vec![7]);
    }

    async fn wait_for(delay: ChronoDuration) {
        tokio::time::sleep(delay.to_std().unwrap() + Duration::from_secs(15)).await
    }

    fn fired_ids() -> FiredIds {
        Arc::new(Mutex::new(vec![]))
    }

    fn gateway(fired: &FiredIds) -> TaskSchedulingGateway {
        TaskSchedulingGateway::new(Arc::new(RecordingSink {
            fired: Arc::clone(fired),
        }))
    }
}
