//! Polling feed delivering new channel messages to the app

use crate::App;
use async_trait::async_trait;
use hueshift_domain::{ActorId, ChannelId, RateLimitSignal, Submission};
use hueshift_remote::{GuildClient, RemoteError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Source of channel messages
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Messages in `channel` newer than `after` (the latest page when
    /// `after` is `None`), oldest first
    async fn messages_after(
        &self,
        channel: ChannelId,
        after: Option<u64>,
    ) -> Result<Vec<Submission>, RemoteError>;
}

/// [`MessageSource`] backed by the guild REST API
pub struct GuildMessages {
    client: GuildClient,
    bot: ActorId,
}

impl GuildMessages {
    /// Read messages as `bot`, whose mentions mark addressed posts
    pub fn new(client: GuildClient, bot: ActorId) -> Self {
        Self { client, bot }
    }
}

#[async_trait]
impl MessageSource for GuildMessages {
    async fn messages_after(
        &self,
        channel: ChannelId,
        after: Option<u64>,
    ) -> Result<Vec<Submission>, RemoteError> {
        self.client.channel_messages(channel, after, self.bot).await
    }
}

/// Polls watched channels and dispatches each new message once
///
/// A channel is primed before its messages are dispatched: the latest page
/// is read and only remembered, so posts made before startup are never
/// treated as new.
pub struct IntakeFeed {
    source: Arc<dyn MessageSource>,
    last_seen: BTreeMap<ChannelId, Option<u64>>,
    poll_interval: Duration,
}

impl IntakeFeed {
    /// Watch `channels`, polling every `poll_interval`
    pub fn new(
        source: Arc<dyn MessageSource>,
        channels: impl IntoIterator<Item = ChannelId>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            source,
            last_seen: channels.into_iter().map(|c| (c, None)).collect(),
            poll_interval,
        }
    }

    /// Newest message id seen in `channel`; `Some(0)` once primed on an
    /// empty channel
    pub fn last_seen(&self, channel: ChannelId) -> Option<u64> {
        self.last_seen.get(&channel).copied().flatten()
    }

    /// Read the latest page of every unprimed channel
    ///
    /// Returns the messages read, for startup seeding. Channels that fail
    /// stay unprimed and are retried by the next poll.
    pub async fn prime(&mut self) -> Vec<Submission> {
        let mut history = Vec::new();
        let pending: Vec<ChannelId> = self
            .last_seen
            .iter()
            .filter(|(_, seen)| seen.is_none())
            .map(|(channel, _)| *channel)
            .collect();

        for channel in pending {
            match self.source.messages_after(channel, None).await {
                Ok(messages) => {
                    let newest = messages.iter().map(|m| m.message_id).max().unwrap_or(0);
                    self.last_seen.insert(channel, Some(newest));
                    tracing::debug!("Primed channel {} at message {}", channel, newest);
                    history.extend(messages);
                }
                Err(e) => tracing::warn!("Could not read history of channel {}: {}", channel, e),
            }
        }
        history
    }

    /// Dispatch every message posted since the previous poll
    ///
    /// Returns how many messages were dispatched.
    pub async fn poll_once(&mut self, app: &App) -> usize {
        self.prime().await;

        let mut dispatched = 0;
        let channels: Vec<(ChannelId, u64)> = self
            .last_seen
            .iter()
            .filter_map(|(channel, seen)| seen.map(|id| (*channel, id)))
            .collect();

        for (channel, after) in channels {
            let messages = match self.source.messages_after(channel, Some(after)).await {
                Ok(messages) => messages,
                Err(RemoteError::Status { status: 429, message }) => {
                    tracing::warn!("Polling channel {} was rate limited: {}", channel, message);
                    let signal = RateLimitSignal {
                        status: 429,
                        retry_after: None,
                        source: format!("intake feed (channel {})", channel),
                    };
                    app.observe_rate_limit(&signal).await;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Polling channel {} failed: {}", channel, e);
                    continue;
                }
            };

            for message in messages.into_iter().filter(|m| m.message_id > after) {
                self.last_seen.insert(channel, Some(message.message_id));
                let outcome = app.handle_message(&message).await;
                tracing::debug!("Message {} in {}: {:?}", message.message_id, channel, outcome);
                dispatched += 1;
            }
        }
        dispatched
    }

    /// Poll until `cancel` fires
    pub async fn run(mut self, app: Arc<App>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            "Intake feed watching {} channels every {:?}",
            self.last_seen.len(),
            self.poll_interval
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.poll_once(&app).await;
                }
            }
        }
        tracing::info!("Intake feed stopped");
    }
}
