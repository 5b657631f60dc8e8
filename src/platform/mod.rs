pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::bus::{Channel, OutboundMessage, OutboundReceiver};

/// Transport for one delivery channel
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(&self, chat_id: &str, content: &str) -> Result<()>;
}

/// Drains the outbound queue and hands each message to its channel's sender.
///
/// Delivery is attempted once. Failures and messages for channels without a
/// registered sender are logged and dropped.
#[derive(Default)]
pub struct OutboundDispatcher {
    senders: HashMap<Channel, Arc<dyn ChannelSender>>,
}

impl OutboundDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel: Channel, sender: Arc<dyn ChannelSender>) {
        info!("Registered outbound sender for {}", channel);
        self.senders.insert(channel, sender);
    }

    pub fn has_sender(&self, channel: Channel) -> bool {
        self.senders.contains_key(&channel)
    }

    /// Deliver a single message
    pub async fn deliver(&self, msg: OutboundMessage) {
        let Some(sender) = self.senders.get(&msg.channel) else {
            warn!(
                channel = %msg.channel,
                chat_id = %msg.chat_id,
                "No sender registered for channel, dropping message"
            );
            return;
        };

        match sender.send(&msg.chat_id, &msg.content).await {
            Ok(()) => debug!(
                channel = %msg.channel,
                chat_id = %msg.chat_id,
                bytes = msg.content.len(),
                "Outbound message delivered"
            ),
            Err(e) => error!(
                channel = %msg.channel,
                chat_id = %msg.chat_id,
                "Failed to deliver outbound message: {:#}",
                e
            ),
        }
    }

    /// Run until every bus handle has been dropped and the queue is empty.
    pub async fn run(self, mut outbound: OutboundReceiver) {
        info!("Outbound dispatcher started");
        while let Some(msg) = outbound.recv().await {
            self.deliver(msg).await;
        }
        info!("Outbound queue closed, dispatcher stopped");
    }
}
