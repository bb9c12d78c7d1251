//! Classifies worker output lines as replies or noise.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A structured reply from the worker, forwarded to the caller untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reply(Map<String, Value>);

impl Reply {
    /// The empty reply handed to commands that expect no answer.
    pub fn ack() -> Self {
        Self::default()
    }

    pub fn is_ack(&self) -> bool {
        self.0.is_empty()
    }

    /// The worker's `status` field, when it is a string.
    pub fn status(&self) -> Option<&str> {
        self.0.get("status").and_then(Value::as_str)
    }

    /// The worker's `msg` field, when it is a string.
    pub fn msg(&self) -> Option<&str> {
        self.0.get("msg").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Reply {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// What a single output line turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Reply(Reply),
    /// Diagnostic or partial output; never attributed to a command.
    Noise,
}

/// Decides which worker lines are replies.
pub trait ReplyDecoder: Send + Sync {
    fn decode(&self, line: &str) -> Decoded;
}

/// A reply is a JSON object with a `status` key plus at least one more
/// field (`msg` or a payload). Bare `{"status":"ready"}` banners and
/// anything that is not a JSON object are noise.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReplyDecoder;

impl ReplyDecoder for JsonReplyDecoder {
    fn decode(&self, line: &str) -> Decoded {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            return Decoded::Noise;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(fields)) if fields.contains_key("status") && fields.len() > 1 => {
                Decoded::Reply(Reply(fields))
            }
            _ => Decoded::Noise,
        }
    }
}
