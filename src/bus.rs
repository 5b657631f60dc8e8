use std::fmt;
use std::str::FromStr;
use tokio::sync::mpsc;
use tracing::debug;

use crate::utils::truncate_to;

/// Longest channel name an outbound message can carry, in bytes.
pub const CHANNEL_MAX_LEN: usize = 15;

/// Longest chat id an outbound message keeps, in bytes. Longer ids are cut.
pub const CHAT_ID_MAX_LEN: usize = 63;

/// Delivery channels a message can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Telegram,
    Websocket,
    Feishu,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Telegram, Channel::Websocket, Channel::Feishu];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Telegram => "telegram",
            Channel::Websocket => "websocket",
            Channel::Feishu => "feishu",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known channel. Holds the rejected value verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownChannel(s.to_string()))
    }
}

/// A message queued for delivery on one channel.
///
/// The body is owned by the message. Handing the message to an
/// [`OutboundSink`] moves the body with it; a rejected submission gives it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub channel: Channel,
    pub chat_id: String,
    pub content: String,
}

impl OutboundMessage {
    /// Build a message, cutting `chat_id` down to [`CHAT_ID_MAX_LEN`] bytes.
    pub fn new(channel: Channel, chat_id: &str, content: String) -> Self {
        debug_assert!(channel.as_str().len() <= CHANNEL_MAX_LEN);
        Self {
            channel,
            chat_id: truncate_to(chat_id, CHAT_ID_MAX_LEN).to_string(),
            content,
        }
    }
}

/// Outbound queue rejected a message. The message is handed back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("outbound queue is full")]
    Full(OutboundMessage),

    #[error("outbound queue is closed")]
    Closed(OutboundMessage),
}

impl SubmitError {
    /// Take back ownership of the rejected message.
    pub fn into_message(self) -> OutboundMessage {
        match self {
            SubmitError::Full(msg) | SubmitError::Closed(msg) => msg,
        }
    }
}

/// Anything that accepts outbound messages for later delivery.
pub trait OutboundSink: Send + Sync {
    /// Enqueue `msg` without waiting. On success the sink owns the message.
    fn submit(&self, msg: OutboundMessage) -> Result<(), SubmitError>;
}

/// Receiving half of the outbound queue, consumed by the dispatcher.
pub type OutboundReceiver = mpsc::Receiver<OutboundMessage>;

/// Bounded multi-producer outbound queue.
#[derive(Clone)]
pub struct MessageBus {
    outbound: mpsc::Sender<OutboundMessage>,
}

impl MessageBus {
    /// Create a bus holding at most `capacity` undelivered messages.
    pub fn new(capacity: usize) -> (Self, OutboundReceiver) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        (Self { outbound }, rx)
    }
}

impl OutboundSink for MessageBus {
    fn submit(&self, msg: OutboundMessage) -> Result<(), SubmitError> {
        match self.outbound.try_send(msg) {
            Ok(()) => {
                debug!(remaining = self.outbound.capacity(), "Outbound message queued");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(msg)) => Err(SubmitError::Full(msg)),
            Err(mpsc::error::TrySendError::Closed(msg)) => Err(SubmitError::Closed(msg)),
        }
    }
}
