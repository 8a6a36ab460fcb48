use chrono::{Local, NaiveDateTime};
use serde_json::{json, Value};

/// Content of the support request posted to the channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportMessage {
    pub text: String,
    pub blocks: Value,
}

/// Build the support request: a `Build Result` heading plus a context line
/// saying where and when it was submitted.
pub fn support_message(submitted_at: NaiveDateTime) -> SupportMessage {
    let context = format!(
        "submitted from bazel-support at {}",
        submitted_at.format("%Y-%m-%d %H:%M")
    );
    let blocks = json!([
        {
            "type": "section",
            "text": { "type": "mrkdwn", "text": ":pray: *Build Result*:" }
        },
        {
            "type": "context",
            "elements": [
                { "type": "plain_text", "text": context }
            ]
        }
    ]);
    SupportMessage {
        text: format!("Build Result ({})", context),
        blocks,
    }
}

pub fn support_message_now() -> SupportMessage {
    support_message(Local::now().naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn heading_is_mrkdwn_section() {
        let msg = support_message(at("2025-01-15 14:30:00"));
        assert_eq!(msg.blocks[0]["type"], "section");
        assert_eq!(msg.blocks[0]["text"]["type"], "mrkdwn");
        assert_eq!(msg.blocks[0]["text"]["text"], ":pray: *Build Result*:");
    }

    #[test]
    fn context_names_source_and_time() {
        let msg = support_message(at("2025-01-15 14:30:00"));
        let element = &msg.blocks[1]["elements"][0];
        assert_eq!(msg.blocks[1]["type"], "context");
        assert_eq!(element["type"], "plain_text");
        assert_eq!(element["text"], "submitted from bazel-support at 2025-01-15 14:30");
    }

    #[test]
    fn fallback_text_is_plain() {
        let msg = support_message(at("2025-01-15 14:30:00"));
        assert_eq!(
            msg.text,
            "Build Result (submitted from bazel-support at 2025-01-15 14:30)"
        );
    }
}
