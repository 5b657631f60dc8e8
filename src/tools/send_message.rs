//! The `send_message` tool: validate a request and queue it for delivery.

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::Value;
use std::fmt;
use tracing::{info, warn};

use crate::bus::{Channel, OutboundMessage, OutboundSink, SubmitError};
use crate::tools::output::BoundedOutput;
use crate::tools::{DispatchCode, Status};

/// Request fields, checked in this order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing or empty '{0}' field")]
    MissingField(&'static str),

    #[error("invalid channel '{0}'. Must be one of: telegram, websocket, feishu")]
    InvalidChannel(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SendMessageError {
    #[error("invalid JSON input")]
    Decode(#[source] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("out of memory")]
    OutOfMemory(#[source] std::collections::TryReserveError),

    #[error("failed to push message to outbound queue")]
    Dispatch(DispatchCode),
}

impl SendMessageError {
    pub fn status(&self) -> Status {
        match self {
            SendMessageError::Decode(_) | SendMessageError::Validation(_) => {
                Status::InvalidArgument
            }
            SendMessageError::OutOfMemory(_) => Status::NoMemory,
            SendMessageError::Dispatch(code) => Status::Dispatch(*code),
        }
    }
}

/// A request that passed every check, borrowing from the decoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedRequest<'a> {
    pub channel: Channel,
    pub channel_name: &'a str,
    pub chat_id: &'a str,
    pub text: &'a str,
}

/// Top-level members of a request payload, in document order.
///
/// Keys are matched without regard to ASCII case and the first match wins,
/// so repeated keys cannot override an earlier value. Payloads that are not
/// objects decode to no members at all.
#[derive(Debug, Default)]
pub struct RequestFields(Vec<(String, Value)>);

impl RequestFields {
    /// Look up a string member. Absent keys and non-string values both yield `None`.
    pub fn string_field(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, v)| v.as_str())
    }
}

impl<'de> Deserialize<'de> for RequestFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RequestFieldsVisitor)
    }
}

struct RequestFieldsVisitor;

impl<'de> Visitor<'de> for RequestFieldsVisitor {
    type Value = RequestFields;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut fields = Vec::new();
        while let Some(entry) = map.next_entry::<String, Value>()? {
            fields.push(entry);
        }
        Ok(RequestFields(fields))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(RequestFields::default())
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(RequestFields::default())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
        Ok(RequestFields::default())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
        Ok(RequestFields::default())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Ok(RequestFields::default())
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
        Ok(RequestFields::default())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(RequestFields::default())
    }
}

fn non_empty<'a>(root: &'a RequestFields, key: &'static str) -> Result<&'a str, ValidationError> {
    match root.string_field(key) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField(key)),
    }
}

/// Check a decoded request. The channel is settled before chat_id and text are looked at.
pub fn validate(root: &RequestFields) -> Result<ValidatedRequest<'_>, ValidationError> {
    let channel_name = non_empty(root, "channel")?;
    let channel = channel_name
        .parse::<Channel>()
        .map_err(|e| ValidationError::InvalidChannel(e.0))?;
    let chat_id = non_empty(root, "chat_id")?;
    let text = non_empty(root, "text")?;

    Ok(ValidatedRequest {
        channel,
        channel_name,
        chat_id,
        text,
    })
}

/// Build the outbound message and hand it to `sink`.
///
/// The body is copied into a fresh allocation owned by the message. If the
/// sink rejects the message it comes back inside the error and is dropped here;
/// once accepted it belongs to the sink.
pub fn dispatch(
    req: &ValidatedRequest<'_>,
    sink: &dyn OutboundSink,
) -> Result<(), SendMessageError> {
    let mut content = String::new();
    content
        .try_reserve_exact(req.text.len())
        .map_err(SendMessageError::OutOfMemory)?;
    content.push_str(req.text);

    let msg = OutboundMessage::new(req.channel, req.chat_id, content);
    if let Err(e) = sink.submit(msg) {
        let code = match &e {
            SubmitError::Full(_) => DispatchCode::QueueFull,
            SubmitError::Closed(_) => DispatchCode::QueueClosed,
        };
        warn!(channel = req.channel_name, chat_id = req.chat_id, "{}", e);
        drop(e.into_message());
        return Err(SendMessageError::Dispatch(code));
    }

    info!(
        channel = req.channel_name,
        chat_id = req.chat_id,
        bytes = req.text.len(),
        "send_message queued"
    );
    Ok(())
}

/// What the reply line reports for an accepted message. Values are as requested, before truncation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Queued {
    pub channel: String,
    pub chat_id: String,
    pub bytes: usize,
}

fn run(input: &str, sink: &dyn OutboundSink) -> Result<Queued, SendMessageError> {
    let root: RequestFields = serde_json::from_str(input).map_err(SendMessageError::Decode)?;
    let req = validate(&root)?;
    dispatch(&req, sink)?;
    Ok(Queued {
        channel: req.channel_name.to_string(),
        chat_id: req.chat_id.to_string(),
        bytes: req.text.len(),
    })
}

/// Write the status line for an outcome into `output`.
pub fn format_outcome(output: &mut BoundedOutput, outcome: &Result<Queued, SendMessageError>) {
    match outcome {
        Ok(q) => output.set_line(format_args!(
            "OK: message sent to {} chat_id={} ({} bytes)",
            q.channel, q.chat_id, q.bytes
        )),
        Err(e) => output.set_line(format_args!("Error: {}", e)),
    }
}

/// Execute `send_message` on a JSON payload, writing one status line into `output`.
pub fn execute(input: &str, output: &mut BoundedOutput, sink: &dyn OutboundSink) -> Status {
    let outcome = run(input, sink);
    format_outcome(output, &outcome);
    match outcome {
        Ok(_) => Status::Ok,
        Err(e) => e.status(),
    }
}
