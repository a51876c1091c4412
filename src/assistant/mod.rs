pub mod actions;
pub mod remote;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, NaiveTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::alarm::{Alarm, AlarmId, AlarmTime, format_clock};
use crate::nlp::{self, ParsedCommand};
use crate::registry::AlarmRegistry;

use actions::ReplyAction;
use remote::RemoteCommandClient;

/// Window inside which an identical utterance/times pair counts as the same
/// request rather than a new one.
const DUPLICATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

/// Provenance fingerprint of an applied command: the normalized utterance
/// plus the minute-resolution times it resolved to. Used to keep the two
/// unordered resolution paths from committing the same creation twice.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    utterance: String,
    times: Vec<NaiveTime>,
}

impl Fingerprint {
    fn of(utterance: &str, times: &[NaiveTime]) -> Self {
        Self {
            utterance: utterance.trim().to_lowercase(),
            times: times.iter().map(|t| AlarmTime::new(*t).time()).collect(),
        }
    }
}

/// Outcome of dispatching one utterance. The local reply is available
/// immediately; the remote path settles on its own schedule.
pub struct Dispatched {
    pub local_reply: Option<String>,
    remote: Option<JoinHandle<()>>,
}

impl Dispatched {
    /// Waits for the remote path to settle. The REPL and tests use this;
    /// dropping `Dispatched` instead leaves the remote task running detached.
    pub async fn settled(self) {
        if let Some(handle) = self.remote {
            let _ = handle.await;
        }
    }
}

/// Conversation orchestrator. Each utterance is interpreted locally for
/// immediate effect while a remote reply is produced concurrently; whichever
/// side recognizes a command mutates the shared registry, with fingerprint
/// deduplication guarding the overlap.
#[derive(Clone)]
pub struct Assistant {
    registry: Arc<Mutex<AlarmRegistry>>,
    remote: Arc<dyn RemoteCommandClient>,
    remote_timeout: Duration,
    transcript: Arc<Mutex<Vec<ChatMessage>>>,
    recent: Arc<Mutex<VecDeque<(Fingerprint, Instant)>>>,
}

impl Assistant {
    pub fn new(
        registry: AlarmRegistry,
        remote: Arc<dyn RemoteCommandClient>,
        remote_timeout: Duration,
    ) -> Self {
        let greeting = if remote.is_configured() {
            "Hello! I can set, change, and delete alarms from plain text. \
             Try 'set alarm for 7 am' or 'delete alarm 3'."
        } else {
            "No assistant credential is configured; commands are handled locally only. \
             Try 'set alarm for 7 am'."
        };

        Self {
            registry: Arc::new(Mutex::new(registry)),
            remote,
            remote_timeout,
            transcript: Arc::new(Mutex::new(vec![ChatMessage {
                sender: Sender::Assistant,
                text: greeting.to_string(),
            }])),
            recent: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Dispatches one utterance: the local pass runs before returning, the
    /// remote pass is spawned and settles independently.
    pub fn send(&self, text: &str) -> Dispatched {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Dispatched {
                local_reply: None,
                remote: None,
            };
        }

        self.push(Sender::User, text.clone());

        let local_reply = self.local_pass(&text);
        if let Some(reply) = &local_reply {
            self.push(Sender::Assistant, reply.clone());
        }

        let this = self.clone();
        let remote = tokio::spawn(async move {
            this.run_remote(&text).await;
        });

        Dispatched {
            local_reply,
            remote: Some(remote),
        }
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.lock().unwrap().clone()
    }

    pub fn alarms(&self) -> Vec<Alarm> {
        self.registry.lock().unwrap().snapshot()
    }

    pub fn subscribe_alarms(&self) -> watch::Receiver<Vec<Alarm>> {
        self.registry.lock().unwrap().subscribe()
    }

    fn local_pass(&self, text: &str) -> Option<String> {
        let now = Local::now().time();
        if let Some(command) = nlp::interpret(text, now) {
            return Some(self.apply_command(&command, text));
        }

        // A deletion request without an id gets a nudge instead of silence.
        let lower = text.to_lowercase();
        if (lower.contains("delete") || lower.contains("remove")) && lower.contains("alarm") {
            return Some(
                "Please tell me which alarm to delete by its id, e.g. 'delete alarm 1'."
                    .to_string(),
            );
        }

        None
    }

    async fn run_remote(&self, text: &str) {
        let context = self.context_summary();
        let outcome =
            tokio::time::timeout(self.remote_timeout, self.remote.reply(text, &context)).await;

        let reply = match outcome {
            Ok(Ok(reply)) => self.handle_remote_reply(&reply, text),
            Ok(Err(error)) => {
                log::warn!("Remote command client failed: {error:#}");
                self.fallback_reply(text, &format!("{error:#}"))
            }
            Err(_) => {
                log::warn!(
                    "Remote command client exceeded {:?} timeout",
                    self.remote_timeout
                );
                self.fallback_reply(text, "timed out")
            }
        };

        self.push(Sender::Assistant, reply);
    }

    fn handle_remote_reply(&self, reply: &str, utterance: &str) -> String {
        if let Some(action) = actions::extract(reply) {
            let status = self.execute_action(&action, utterance);
            return actions::replace_marker(reply, &status);
        }

        // Unknown marker names carry no action but must not reach the user.
        let cleaned = actions::replace_marker(reply, "");

        // A markerless reply may still acknowledge a plain creation the
        // model left to us.
        let lower = utterance.to_lowercase();
        if lower.contains("set") && lower.contains("alarm") {
            if let Some(time) = nlp::parse_time(&lower, Local::now().time()) {
                let status = self.create_single(utterance, time);
                return format!("{cleaned}\n{status}");
            }
        }

        cleaned
    }

    /// Second, fully local pass used when the remote collaborator is
    /// unreachable; the fingerprint guard keeps it from re-applying what the
    /// immediate pass already did.
    fn fallback_reply(&self, utterance: &str, reason: &str) -> String {
        let body = match nlp::interpret(utterance, Local::now().time()) {
            Some(command) => self.apply_command(&command, utterance),
            None => help_text(),
        };
        format!(
            "The assistant is unreachable ({reason}); falling back to local command handling.\n{body}"
        )
    }

    fn execute_action(&self, action: &ReplyAction, utterance: &str) -> String {
        let now = Local::now().time();
        match action {
            ReplyAction::SetAlarm { time_text } => {
                let time = nlp::parse_time(&time_text.to_lowercase(), now)
                    .or_else(|| nlp::parse_time(&utterance.to_lowercase(), now));
                match time {
                    Some(time) => self.create_single(utterance, time),
                    None => String::new(),
                }
            }
            ReplyAction::DeleteAlarm { raw_id } => match raw_id.trim().parse::<AlarmId>() {
                Ok(id) => {
                    if self.registry.lock().unwrap().delete(id) {
                        format!("Deleted alarm #{id}.")
                    } else {
                        format!("Alarm #{id} was not found.")
                    }
                }
                Err(_) => String::new(),
            },
            ReplyAction::DeleteAll => {
                let count = self.registry.lock().unwrap().delete_all();
                format!("Deleted all {count} alarms.")
            }
        }
    }

    fn apply_command(&self, command: &ParsedCommand, utterance: &str) -> String {
        let fingerprint = Fingerprint::of(utterance, command.times());
        if !self.note_if_new(fingerprint) {
            return "I already handled that command a moment ago; skipping the duplicate."
                .to_string();
        }

        let mut registry = self.registry.lock().unwrap();
        match command {
            ParsedCommand::SingleAlarm { .. }
            | ParsedCommand::MultiAlarmSequence { .. }
            | ParsedCommand::BackupAlarms { .. } => {
                let times = command.times();
                let ids: Vec<AlarmId> = times
                    .iter()
                    .map(|time| registry.create(*time, Vec::new()))
                    .collect();
                let listing = ids
                    .iter()
                    .zip(times)
                    .map(|(id, time)| format!("#{id}: {}", format_clock(*time)))
                    .collect::<Vec<_>>()
                    .join(", ");

                let description = command.description().unwrap_or_default();
                let mut reply = format!("{description}. Created: {listing}");
                if registry.needs_exact_alarm_permission() {
                    reply.push_str(
                        "\nExact-alarm permission is missing; grant it for alarms to ring on time.",
                    );
                }
                reply
            }
            ParsedCommand::DeleteOne { id } => {
                if registry.delete(*id) {
                    format!("Deleted alarm #{id}.")
                } else {
                    format!("Couldn't find alarm #{id}. Check the alarm list and try again.")
                }
            }
            ParsedCommand::DeleteMany { ids } => {
                let deleted = registry.delete_many(ids);
                format!("Deleted {deleted} of {} alarms.", ids.len())
            }
            ParsedCommand::DeleteAllExceptNewest => {
                let deleted = registry.delete_all_except_newest();
                format!("Deleted {deleted} alarms, kept the newest.")
            }
            ParsedCommand::DeleteAll => {
                let deleted = registry.delete_all();
                format!("Deleted all {deleted} alarms.")
            }
        }
    }

    fn create_single(&self, utterance: &str, time: NaiveTime) -> String {
        let fingerprint = Fingerprint::of(utterance, std::slice::from_ref(&time));
        if !self.note_if_new(fingerprint) {
            return "That alarm was already created from this request; skipped the duplicate."
                .to_string();
        }

        let id = self.registry.lock().unwrap().create(time, Vec::new());
        format!("Alarm set for {} (id #{id}).", format_clock(time))
    }

    /// Records the fingerprint unless an equal one is still inside the
    /// duplicate window; returns whether it was new.
    fn note_if_new(&self, fingerprint: Fingerprint) -> bool {
        let now = Instant::now();
        let mut recent = self.recent.lock().unwrap();
        while let Some((_, noted_at)) = recent.front() {
            if now.duration_since(*noted_at) > DUPLICATE_WINDOW {
                recent.pop_front();
            } else {
                break;
            }
        }

        if recent.iter().any(|(noted, _)| *noted == fingerprint) {
            return false;
        }
        recent.push_back((fingerprint, now));
        true
    }

    fn context_summary(&self) -> String {
        let alarms = self.registry.lock().unwrap().snapshot();
        let listing = if alarms.is_empty() {
            "No alarms set".to_string()
        } else {
            alarms
                .iter()
                .map(|alarm| {
                    format!(
                        "#{}: {} ({})",
                        alarm.id,
                        format_clock(alarm.time()),
                        if alarm.enabled { "ON" } else { "OFF" }
                    )
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "Current time: {}. Alarms: {listing}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        )
    }

    fn push(&self, sender: Sender, text: String) {
        self.transcript.lock().unwrap().push(ChatMessage { sender, text });
    }
}

fn help_text() -> String {
    "I couldn't find an alarm command in that. Try one of:\n\
     - set alarm for 7:30 am\n\
     - set 5 alarms in 25 minutes\n\
     - create backup alarms every 10 minutes\n\
     - delete alarm 1"
        .to_string()
}
