mod task_gateway;

pub use task_gateway::TaskSchedulingGateway;

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};

use crate::alarm::AlarmId;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The platform refused to arm an exact wake-capable trigger. Recoverable;
    /// the user has to grant the exact-alarm permission out-of-band.
    #[error("exact-alarm scheduling is not permitted")]
    ExactAlarmsNotPermitted,
}

/// Arms and disarms exact one-shot triggers keyed by alarm id.
///
/// `register` replaces any existing trigger for the same id. `cancel` is a
/// no-op for unknown ids. Both are synchronous and bounded-time so that a
/// registry mutation and its gateway call form one indivisible step.
pub trait SchedulingGateway: Send + 'static {
    fn register(&mut self, id: AlarmId, trigger: NaiveDateTime) -> Result<(), GatewayError>;
    fn cancel(&mut self, id: AlarmId);
}

/// Invoked when a trigger fires. Posting the user-visible alert and the
/// full-screen ringing experience live behind this seam.
#[async_trait]
pub trait AlertSink: Send + Sync + 'static {
    async fn alarm_fired(&self, id: AlarmId);
}

/// Sink for deployments with no presentation layer attached.
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn alarm_fired(&self, id: AlarmId) {
        log::info!("[FIRED] Alarm {id} is ringing");
    }
}

/// Moves a requested trigger at or before `now` forward by exactly one day,
/// so a time that already passed today rings at the same time tomorrow.
pub fn resolve_trigger(requested: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
    if requested <= now {
        requested + Duration::hours(24)
    } else {
        requested
    }
}
