use std::sync::OnceLock;

use regex::Regex;

/// The fixed grammar a model reply may embed. At most one action is
/// executed per reply; the marker itself never reaches the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyAction {
    SetAlarm { time_text: String },
    DeleteAlarm { raw_id: String },
    DeleteAll,
}

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"ACTION:\s*(?P<name>\w+)(?:[ \t]+(?P<param>[^\r\n]+))?")
            .expect("Pattern is known to be valid.")
    })
}

/// First recognized action marker in a reply, if any. Markers with unknown
/// names carry no action but are still stripped by [`replace_marker`].
pub fn extract(reply: &str) -> Option<ReplyAction> {
    let caps = marker_regex().captures(reply)?;
    let param = caps
        .name("param")
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    match caps.name("name")?.as_str() {
        "SET_ALARM" => Some(ReplyAction::SetAlarm { time_text: param }),
        "DELETE_ALARM" => Some(ReplyAction::DeleteAlarm { raw_id: param }),
        "DELETE_ALL" => Some(ReplyAction::DeleteAll),
        _ => None,
    }
}

/// Replaces every action marker with `status` (usually a one-line outcome,
/// or the empty string to drop the marker) and trims the result.
pub fn replace_marker(reply: &str, status: &str) -> String {
    marker_regex()
        .replace_all(reply, status)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_alarm_marker_carries_its_parameter() {
        let action = extract("Sure! ACTION: SET_ALARM 7:30 am");

        assert_eq!(
            action,
            Some(ReplyAction::SetAlarm {
                time_text: "7:30 am".to_string()
            })
        );
    }

    #[test]
    fn delete_markers_are_recognized() {
        assert_eq!(
            extract("ACTION: DELETE_ALARM 3"),
            Some(ReplyAction::DeleteAlarm {
                raw_id: "3".to_string()
            })
        );
        assert_eq!(extract("Done. ACTION: DELETE_ALL"), Some(ReplyAction::DeleteAll));
    }

    #[test]
    fn unknown_marker_names_carry_no_action() {
        assert_eq!(extract("ACTION: SNOOZE 5"), None);
    }

    #[test]
    fn replies_without_markers_have_no_action() {
        assert_eq!(extract("Good morning!"), None);
    }

    #[test]
    fn markers_are_replaced_with_the_outcome() {
        let cleaned = replace_marker(
            "Setting that now. ACTION: SET_ALARM 7:00 am",
            "Alarm set for 7:00 AM (id #1).",
        );

        assert_eq!(cleaned, "Setting that now. Alarm set for 7:00 AM (id #1).");
    }

    #[test]
    fn stray_markers_are_stripped_entirely() {
        assert_eq!(replace_marker("Okay. ACTION: SNOOZE 5", ""), "Okay.");
    }
}
