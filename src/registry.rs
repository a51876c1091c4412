use chrono::{Local, NaiveDateTime, NaiveTime, Weekday};
use tokio::sync::watch;

use crate::alarm::{Alarm, AlarmId, AlarmTime};
use crate::scheduling::{SchedulingGateway, resolve_trigger};

/// Owns the ordered alarm collection and keeps every mutation paired with
/// its gateway registration or cancellation before returning, so observers
/// never see the two out of step.
///
/// Change notifications are published as whole-list snapshots through a
/// watch channel; interested parties subscribe or poll.
pub struct AlarmRegistry {
    alarms: Vec<Alarm>,
    gateway: Box<dyn SchedulingGateway>,
    changes: watch::Sender<Vec<Alarm>>,
    // Monotonic high-water mark: ids are never reused within a session,
    // even after the newest alarm is deleted.
    next_id: AlarmId,
    permission_missing: bool,
}

impl AlarmRegistry {
    pub fn new(gateway: Box<dyn SchedulingGateway>) -> Self {
        let (changes, _) = watch::channel(Vec::new());
        Self {
            alarms: Vec::new(),
            gateway,
            changes,
            next_id: 1,
            permission_missing: false,
        }
    }

    /// Appends a new enabled alarm anchored to today at `time` and arms its
    /// trigger. Returns the assigned id.
    pub fn create(&mut self, time: NaiveTime, recurring_days: Vec<Weekday>) -> AlarmId {
        self.create_labeled(time, recurring_days, None)
    }

    /// `create` variant used by the tool bridge, which may carry a label.
    pub fn create_labeled(
        &mut self,
        time: NaiveTime,
        recurring_days: Vec<Weekday>,
        label: Option<String>,
    ) -> AlarmId {
        let id = self.next_id;
        self.next_id += 1;

        let date_time = Local::now()
            .date_naive()
            .and_time(AlarmTime::new(time).time());
        let alarm = Alarm {
            id,
            date_time,
            enabled: true,
            recurring_days,
            label,
        };
        self.alarms.push(alarm);

        self.register(id, date_time);
        self.publish();

        log::info!("Created alarm {id} for {date_time}");
        id
    }

    /// Flips the enabled flag and arms or disarms the trigger accordingly.
    /// Unknown ids are a silent no-op.
    pub fn toggle(&mut self, id: AlarmId, enabled: bool) {
        let Some(alarm) = self.alarms.iter_mut().find(|a| a.id == id) else {
            return;
        };
        alarm.enabled = enabled;
        let date_time = alarm.date_time;

        if enabled {
            self.register(id, date_time);
        } else {
            self.gateway.cancel(id);
        }
        self.publish();
    }

    /// Moves an alarm to a new anchor; the trigger is re-armed only when the
    /// alarm is currently enabled. Unknown ids are a silent no-op.
    pub fn reschedule(&mut self, id: AlarmId, new_date_time: NaiveDateTime) {
        let Some(alarm) = self.alarms.iter_mut().find(|a| a.id == id) else {
            return;
        };
        alarm.date_time = new_date_time;
        let enabled = alarm.enabled;

        if enabled {
            self.register(id, new_date_time);
        }
        self.publish();
    }

    /// Disarms and removes one alarm. Returns whether the id existed.
    pub fn delete(&mut self, id: AlarmId) -> bool {
        if !self.alarms.iter().any(|a| a.id == id) {
            return false;
        }

        self.gateway.cancel(id);
        self.alarms.retain(|a| a.id != id);
        self.publish();

        log::info!("Deleted alarm {id}");
        true
    }

    /// Deletes each id in turn, counting the ones that existed.
    pub fn delete_many(&mut self, ids: &[AlarmId]) -> usize {
        ids.iter().filter(|id| self.delete(**id)).count()
    }

    /// Removes every alarm except the one with the highest id. No-op on a
    /// registry with at most one alarm.
    pub fn delete_all_except_newest(&mut self) -> usize {
        if self.alarms.len() <= 1 {
            return 0;
        }

        let newest = self
            .alarms
            .iter()
            .map(|a| a.id)
            .max()
            .expect("Collection is non-empty.");
        let doomed: Vec<AlarmId> = self
            .alarms
            .iter()
            .map(|a| a.id)
            .filter(|id| *id != newest)
            .collect();

        for id in &doomed {
            self.gateway.cancel(*id);
        }
        self.alarms.retain(|a| a.id == newest);
        self.publish();

        doomed.len()
    }

    /// Disarms and removes everything, returning the prior count.
    pub fn delete_all(&mut self) -> usize {
        let count = self.alarms.len();
        for id in self.alarms.iter().map(|a| a.id).collect::<Vec<_>>() {
            self.gateway.cancel(id);
        }
        self.alarms.clear();
        self.publish();
        count
    }

    pub fn snapshot(&self) -> Vec<Alarm> {
        self.alarms.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Alarm>> {
        self.changes.subscribe()
    }

    /// Set once the gateway refuses an exact trigger; the conversation layer
    /// turns this into a permission prompt.
    pub fn needs_exact_alarm_permission(&self) -> bool {
        self.permission_missing
    }

    fn register(&mut self, id: AlarmId, date_time: NaiveDateTime) {
        let now = Local::now().naive_local();
        let trigger = resolve_trigger(date_time, now);
        if let Err(error) = self.gateway.register(id, trigger) {
            log::warn!("Could not arm trigger for alarm {id}: {error}");
            self.permission_missing = true;
        }
    }

    fn publish(&self) {
        self.changes.send_replace(self.alarms.clone());
    }
}
