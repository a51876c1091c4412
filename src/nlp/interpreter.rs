use std::sync::OnceLock;

use chrono::{Duration, NaiveTime};
use regex::Regex;

use crate::alarm::{AlarmId, format_clock};

use super::time_expr;

/// How many alarms a backup sequence always expands to.
const BACKUP_ALARM_COUNT: usize = 3;
/// Anchor offset used when a backup request names no usable start time.
const BACKUP_DEFAULT_LEAD_MINUTES: i64 = 5;

/// A recognized command, produced once and consumed once by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    SingleAlarm {
        time: NaiveTime,
        description: String,
    },
    MultiAlarmSequence {
        times: Vec<NaiveTime>,
        intervals_minutes: Vec<i64>,
        description: String,
    },
    BackupAlarms {
        times: Vec<NaiveTime>,
        intervals_minutes: Vec<i64>,
        description: String,
    },
    DeleteOne {
        id: AlarmId,
    },
    DeleteMany {
        ids: Vec<AlarmId>,
    },
    DeleteAllExceptNewest,
    DeleteAll,
}

impl ParsedCommand {
    /// Times a creation command resolves to; empty for deletions.
    pub fn times(&self) -> &[NaiveTime] {
        match self {
            ParsedCommand::SingleAlarm { time, .. } => std::slice::from_ref(time),
            ParsedCommand::MultiAlarmSequence { times, .. }
            | ParsedCommand::BackupAlarms { times, .. } => times,
            _ => &[],
        }
    }

    /// Human-readable summary; present only on creation commands.
    pub fn description(&self) -> Option<&str> {
        match self {
            ParsedCommand::SingleAlarm { description, .. }
            | ParsedCommand::MultiAlarmSequence { description, .. }
            | ParsedCommand::BackupAlarms { description, .. } => Some(description),
            _ => None,
        }
    }
}

fn multi_alarm_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:set|create)\s+(?P<count>\d+)\s+alarms?\s+(?:(?:in\s+(?P<span>\d+)\s+min(?:ute)?s?)|(?:starting\s+at\s+(?P<anchor_first>.+?)\s+with\s+(?P<gap_after>\d+)\s+min(?:ute)?s?\s*(?:gaps?|intervals?)?)|(?:(?P<gap_first>\d+)\s+min(?:ute)?s?\s+apart\s+at\s+(?P<anchor_after>.+)))",
        )
        .expect("Pattern is known to be valid.")
    })
}

fn backup_alarm_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:create|set)\s+backup\s+alarms?\s+every\s+(?P<gap>\d+)\s+min(?:ute)?s?(?:\s+(?:for|starting)\s+(?P<anchor>.+))?$",
        )
        .expect("Pattern is known to be valid.")
    })
}

/// Recognizes one command in free text, first match wins.
///
/// Sequence shapes go first because the single-alarm fallback would accept
/// fragments of them; deletion phrases sit between the two, which is safe
/// since they never contain a parseable time expression.
pub fn interpret(text: &str, now: NaiveTime) -> Option<ParsedCommand> {
    let text = text.to_lowercase();

    if let Some(command) = try_multi_alarm(&text, now) {
        log::debug!("Interpreted multi-alarm sequence from '{text}'");
        return Some(command);
    }
    if let Some(command) = try_backup_alarms(&text, now) {
        log::debug!("Interpreted backup-alarm sequence from '{text}'");
        return Some(command);
    }
    if let Some(command) = try_deletion(&text) {
        log::debug!("Interpreted deletion from '{text}'");
        return Some(command);
    }
    if let Some(time) = time_expr::parse_time(&text, now) {
        return Some(ParsedCommand::SingleAlarm {
            time,
            description: format!("Single alarm at {}", format_clock(time)),
        });
    }

    None
}

fn try_multi_alarm(text: &str, now: NaiveTime) -> Option<ParsedCommand> {
    let caps = multi_alarm_regex().captures(text)?;
    let count: usize = caps.name("count")?.as_str().parse().ok()?;
    if count == 0 {
        return None;
    }

    if let Some(span) = caps.name("span") {
        // "set 5 alarms in 20 minutes": the span divides into equal gaps.
        let span: i64 = span.as_str().parse().ok()?;
        let interval = if count > 1 {
            span / (count as i64 - 1)
        } else {
            span
        };
        let times = sequence_from(now, count, interval);
        return Some(ParsedCommand::MultiAlarmSequence {
            description: format!("{count} alarms over {span} minutes ({interval}min intervals)"),
            intervals_minutes: vec![interval; count - 1],
            times,
        });
    }

    // The two remaining shapes name an anchor explicitly; a malformed
    // anchor abandons the sequence outright.
    let (anchor_text, interval) = if let Some(anchor) = caps.name("anchor_first") {
        (anchor, caps.name("gap_after")?)
    } else {
        (caps.name("anchor_after")?, caps.name("gap_first")?)
    };
    let interval: i64 = interval.as_str().parse().ok()?;
    let anchor = time_expr::parse_absolute(anchor_text.as_str())?;

    let times = sequence_from(anchor, count, interval);
    Some(ParsedCommand::MultiAlarmSequence {
        description: format!(
            "{count} alarms starting at {} with {interval}min intervals",
            format_clock(anchor)
        ),
        intervals_minutes: vec![interval; count - 1],
        times,
    })
}

fn try_backup_alarms(text: &str, now: NaiveTime) -> Option<ParsedCommand> {
    let caps = backup_alarm_regex().captures(text)?;
    let interval: i64 = caps.name("gap")?.as_str().parse().ok()?;

    // Unlike the multi-alarm shapes, a backup request survives a bad anchor:
    // it falls back to a short lead from now.
    let anchor = caps
        .name("anchor")
        .and_then(|anchor| time_expr::parse_absolute(anchor.as_str()))
        .unwrap_or_else(|| now + Duration::minutes(BACKUP_DEFAULT_LEAD_MINUTES));

    let times = sequence_from(anchor, BACKUP_ALARM_COUNT, interval);
    Some(ParsedCommand::BackupAlarms {
        description: format!(
            "{BACKUP_ALARM_COUNT} backup alarms every {interval} minutes starting at {}",
            format_clock(anchor)
        ),
        intervals_minutes: vec![interval; BACKUP_ALARM_COUNT - 1],
        times,
    })
}

/// Deletions are token-scanned rather than structurally parsed; the phrases
/// are short and carry at most a handful of ids.
fn try_deletion(text: &str) -> Option<ParsedCommand> {
    if !text.contains("delete") && !text.contains("remove") {
        return None;
    }

    if text.contains("all") {
        if text.contains("except") && (text.contains("last") || text.contains("newest")) {
            return Some(ParsedCommand::DeleteAllExceptNewest);
        }
        return Some(ParsedCommand::DeleteAll);
    }

    if !text.contains("alarm") {
        return None;
    }

    let ids: Vec<AlarmId> = id_regex()
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    match ids.as_slice() {
        [] => None,
        [id] => Some(ParsedCommand::DeleteOne { id: *id }),
        _ => Some(ParsedCommand::DeleteMany { ids }),
    }
}

fn id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("Pattern is known to be valid."))
}

fn sequence_from(anchor: NaiveTime, count: usize, interval_minutes: i64) -> Vec<NaiveTime> {
    (0..count)
        .map(|i| anchor + Duration::minutes(i as i64 * interval_minutes))
        .collect()
}
