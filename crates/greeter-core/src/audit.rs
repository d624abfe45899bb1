use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::{
    domain::InboundMessage,
    errors::Error,
    gate::DropReason,
    Result,
};

const AUDIT_MAX_TEXT: usize = 500;

/// RFC3339 timestamp in UTC.
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,
    pub sender: String,
    pub contact: String,
    pub message_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_hours: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEvent {
    fn base(event: &str, msg: &InboundMessage, contact: &str) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            sender: msg.sender.0.clone(),
            contact: contact.to_string(),
            message_id: msg.id.0.clone(),
            content: None,
            reason: None,
            remaining_hours: None,
            error: None,
        }
    }

    pub fn dropped(msg: &InboundMessage, contact: &str, reason: DropReason) -> Self {
        let remaining_hours = match reason {
            DropReason::CooldownActive { remaining_hours } => Some(remaining_hours),
            _ => None,
        };
        Self {
            reason: Some(reason.to_string()),
            remaining_hours,
            ..Self::base("drop", msg, contact)
        }
    }

    pub fn reply_sent(msg: &InboundMessage, contact: &str) -> Self {
        Self {
            content: Some(msg.body.clone()),
            ..Self::base("reply_sent", msg, contact)
        }
    }

    pub fn reply_failed(msg: &InboundMessage, contact: &str, error: &str) -> Self {
        Self {
            content: Some(msg.body.clone()),
            error: Some(error.to_string()),
            ..Self::base("reply_failed", msg, contact)
        }
    }
}

/// Append-only decision journal.
#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(s) = &event.content {
            event.content = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::External(
                "audit event is not a JSON object".to_string(),
            ));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&json_value_to_display(v));
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatId, MessageId, MessageKey, MessageRef, SenderId};
    use std::time::Duration;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.log"))
    }

    fn msg(body: &str) -> InboundMessage {
        InboundMessage {
            id: MessageKey("42:7".to_string()),
            sender: SenderId("42".to_string()),
            from_self: false,
            is_group: false,
            body: body.to_string(),
            received_at: Utc::now(),
            reply_to: MessageRef {
                chat_id: ChatId(42),
                message_id: MessageId(7),
            },
        }
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        let s = "a".repeat(AUDIT_MAX_TEXT + 10);
        let t = truncate_text(&s, AUDIT_MAX_TEXT);
        assert!(t.ends_with("..."));
        assert_eq!(t.chars().count(), AUDIT_MAX_TEXT + 3);
    }

    #[test]
    fn truncate_text_respects_char_boundaries() {
        let s = "🍕".repeat(10);
        assert_eq!(truncate_text(&s, 3), "🍕🍕🍕...");
    }

    #[test]
    fn json_lines_carry_drop_reason() {
        let log = AuditLogger::new(tmp_file("greeter-audit-json"), true);
        let ev = AuditEvent::dropped(
            &msg("hi"),
            "Ana",
            DropReason::CooldownActive { remaining_hours: 3 },
        );
        log.write(ev).unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        let line: serde_json::Value = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(line["event"], "drop");
        assert_eq!(line["reason"], "cooldown_active");
        assert_eq!(line["remaining_hours"], 3);
        assert_eq!(line["contact"], "Ana");
        assert!(line.get("error").is_none());
        let _ = std::fs::remove_file(log.path());
    }

    #[test]
    fn plain_format_truncates_content() {
        let log = AuditLogger::new(tmp_file("greeter-audit-plain"), false);
        let body = "x".repeat(AUDIT_MAX_TEXT + 1);
        log.write(AuditEvent::reply_failed(&msg(&body), "customer", "boom"))
            .unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        assert!(written.contains("event: reply_failed"));
        assert!(written.contains("error: boom"));
        assert!(written.contains("..."));
        assert!(!written.contains(&body));
        let _ = std::fs::remove_file(log.path());
    }
}
