use chrono::{Duration, NaiveTime, Weekday};
use serde::Deserialize;

use crate::alarm::AlarmId;
use crate::registry::AlarmRegistry;

/// Argument objects mirroring the JSON a function-calling host sends when it
/// invokes the `create_alarm` / `delete_alarm` tools.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlarmArgs {
    /// 24-hour "HH:mm" string, e.g. "07:30".
    pub time: String,
    /// Optional weekday codes, e.g. ["MON", "TUE"].
    pub recurrence: Option<Vec<String>>,
    /// When present, schedule this many alarms starting from `time`.
    pub count: Option<u32>,
    /// Gap between the multiple alarms, minutes.
    pub gap_minutes: Option<u32>,
    /// Human-readable label carried on the created alarms.
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteAlarmArgs {
    /// Id previously returned by `create_alarm`.
    pub id: AlarmId,
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid time format '{0}', expected 24-hour HH:mm")]
    InvalidTime(String),
}

/// Validates the arguments and expands them into registry calls. The time
/// must parse before any alarm is created; unknown weekday codes are
/// skipped rather than rejected.
pub fn handle_create(
    args: &CreateAlarmArgs,
    registry: &mut AlarmRegistry,
) -> Result<Vec<AlarmId>, ToolError> {
    let base_time = NaiveTime::parse_from_str(&args.time, "%H:%M")
        .map_err(|_| ToolError::InvalidTime(args.time.clone()))?;

    let days: Vec<Weekday> = args
        .recurrence
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|code| code.parse().ok())
        .collect();

    let total = args.count.unwrap_or(1);
    let gap = i64::from(args.gap_minutes.unwrap_or(0));

    let mut ids = Vec::with_capacity(total as usize);
    for index in 0..total {
        let time = base_time + Duration::minutes(gap * i64::from(index));
        ids.push(registry.create_labeled(time, days.clone(), args.label.clone()));
    }
    Ok(ids)
}

/// Returns whether the alarm existed, mirroring the registry contract.
pub fn handle_delete(args: &DeleteAlarmArgs, registry: &mut AlarmRegistry) -> bool {
    registry.delete(args.id)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::registry::AlarmRegistry;
    use crate::scheduling::{GatewayError, SchedulingGateway};

    struct PermissiveGateway;

    impl SchedulingGateway for PermissiveGateway {
        fn register(
            &mut self,
            _id: AlarmId,
            _trigger: chrono::NaiveDateTime,
        ) -> Result<(), GatewayError> {
            Ok(())
        }

        fn cancel(&mut self, _id: AlarmId) {}
    }

    fn registry() -> AlarmRegistry {
        AlarmRegistry::new(Box::new(PermissiveGateway))
    }

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn count_and_gap_expand_into_spaced_alarms() {
        let mut registry = registry();
        registry.create(at(5, 45), vec![]);

        let args = CreateAlarmArgs {
            time: "07:30".to_string(),
            recurrence: None,
            count: Some(2),
            gap_minutes: Some(15),
            label: None,
        };
        let ids = handle_create(&args, &mut registry).unwrap();

        assert_eq!(ids, vec![2, 3]);
        let alarms = registry.snapshot();
        assert_eq!(alarms[1].time(), at(7, 30));
        assert_eq!(alarms[2].time(), at(7, 45));
        assert!(alarms.iter().all(|a| a.enabled));
    }

    #[test]
    fn recurrence_codes_map_to_weekdays() {
        let mut registry = registry();

        let args = CreateAlarmArgs {
            time: "06:00".to_string(),
            recurrence: Some(vec!["MON".to_string(), "tue".to_string()]),
            count: None,
            gap_minutes: None,
            label: Some("standup".to_string()),
        };
        let ids = handle_create(&args, &mut registry).unwrap();

        assert_eq!(ids.len(), 1);
        let alarm = &registry.snapshot()[0];
        assert_eq!(alarm.recurring_days, vec![Weekday::Mon, Weekday::Tue]);
        assert_eq!(alarm.label.as_deref(), Some("standup"));
    }

    #[test]
    fn unknown_recurrence_codes_are_skipped() {
        let mut registry = registry();

        let args = CreateAlarmArgs {
            time: "06:00".to_string(),
            recurrence: Some(vec!["MON".to_string(), "someday".to_string()]),
            count: None,
            gap_minutes: None,
            label: None,
        };
        handle_create(&args, &mut registry).unwrap();

        assert_eq!(registry.snapshot()[0].recurring_days, vec![Weekday::Mon]);
    }

    #[test]
    fn malformed_time_is_rejected_before_any_mutation() {
        let mut registry = registry();

        let args = CreateAlarmArgs {
            time: "7:30 pm".to_string(),
            recurrence: None,
            count: Some(3),
            gap_minutes: Some(5),
            label: None,
        };
        let result = handle_create(&args, &mut registry);

        assert!(matches!(result, Err(ToolError::InvalidTime(_))));
        assert!(registry.snapshot().is_empty(), "Registry must stay untouched.");
    }

    #[test]
    fn delete_reports_whether_the_id_existed() {
        let mut registry = registry();
        let id = registry.create(at(6, 0), vec![]);

        assert!(handle_delete(&DeleteAlarmArgs { id }, &mut registry));
        assert!(!handle_delete(&DeleteAlarmArgs { id }, &mut registry));
    }

    #[test]
    fn args_deserialize_from_tool_json() {
        let args: CreateAlarmArgs = serde_json::from_str(
            r#"{"time": "07:30", "recurrence": ["MON"], "count": 2, "gapMinutes": 15}"#,
        )
        .unwrap();

        assert_eq!(args.time, "07:30");
        assert_eq!(args.count, Some(2));
        assert_eq!(args.gap_minutes, Some(15));
    }
}
