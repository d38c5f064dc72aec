// # Discord Notifier
//
// This crate posts flight notifications as embeds to one Discord channel
// through the REST API.
//
// ## Delivery Steps
//
// 1. Look the channel up (`GET /channels/:id`)
// 2. Post the embed (`POST /channels/:id/messages`)
// 3. Announcement channels only: publish it (`POST .../messages/:id/crosspost`)
//
// A channel the bot cannot see, and a channel it may not post in, are skips,
// not errors. Publishing is best-effort: a failed crosspost is logged and the
// delivery still counts as delivered.
//
// ## Constraints
//
// - One attempt per notification, no retries (the engine marks the flight
//   posted whatever the outcome)
// - No background tasks
//
// ## Security Requirements
//
// - The bot token NEVER appears in logs
// - The bot token MUST be provided via environment variables only
//
// ## API Reference
//
// - Discord API v10: https://discord.com/developers/docs/reference
// - Get Channel: GET `/channels/:channel_id`
// - Create Message: POST `/channels/:channel_id/messages`
// - Crosspost Message: POST `/channels/:channel_id/messages/:message_id/crosspost`

use async_trait::async_trait;
use flightboard_core::ComponentRegistry;
use flightboard_core::config::NotifierConfig;
use flightboard_core::notification::Notification;
use flightboard_core::traits::{DeliveryOutcome, NotificationSink, NotificationSinkFactory};
use flightboard_core::{Error, Result};
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Discord REST API base URL
const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Channel type of an announcement (news) channel
const ANNOUNCEMENT_CHANNEL_TYPE: u8 = 5;

/// One field of an embed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Discord embed object, restricted to what notifications use
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<EmbedField>,
}

impl Embed {
    /// Render a notification as an embed
    ///
    /// `From` and `To` are inline; the status timestamp, if any, takes its own
    /// row and is shown as an absolute and a relative Discord timestamp.
    pub fn from_notification(notification: &Notification) -> Self {
        let mut fields = vec![
            EmbedField {
                name: "From".to_string(),
                value: notification.from.clone(),
                inline: true,
            },
            EmbedField {
                name: "To".to_string(),
                value: notification.to.clone(),
                inline: true,
            },
        ];

        if let Some(timestamp) = &notification.timestamp {
            let unix = timestamp.unix();
            fields.push(EmbedField {
                name: timestamp.label.to_string(),
                value: format!("<t:{unix}:f> (<t:{unix}:R>)"),
                inline: false,
            });
        }

        Self {
            title: notification.title.clone(),
            description: notification.description.map(str::to_string),
            color: notification.colour,
            fields,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateMessage {
    embeds: Vec<Embed>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Debug, Deserialize)]
struct Message {
    id: String,
}

enum ChannelLookup {
    Found(Channel),
    Unavailable(&'static str),
}

enum PostResult {
    Posted(Message),
    Rejected(&'static str),
}

/// Notifier posting to a single Discord channel
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the notifier will:
/// - Perform the channel lookup
/// - Log the message payload it would post
/// - **NOT** post anything
///
/// # Security
///
/// The Debug implementation does NOT expose the bot token.
pub struct DiscordNotifier {
    /// Bot token
    /// ⚠️ NEVER log this value
    bot_token: String,

    /// Destination channel
    channel_id: u64,

    /// API base URL, overridable for tests and proxies
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: look the channel up but skip the post
    dry_run: bool,
}

// Custom Debug implementation that hides the bot token
impl std::fmt::Debug for DiscordNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordNotifier")
            .field("bot_token", &"<REDACTED>")
            .field("channel_id", &self.channel_id)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl DiscordNotifier {
    /// Create a new Discord notifier
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the token is empty or the channel id is 0
    /// - `Error::Http` if the HTTP client cannot be built
    pub fn new(bot_token: impl Into<String>, channel_id: u64, dry_run: bool) -> Result<Self> {
        let bot_token = bot_token.into();
        if bot_token.is_empty() {
            return Err(Error::config("Discord bot token cannot be empty"));
        }
        if channel_id == 0 {
            return Err(Error::config("Discord channel id cannot be 0"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            bot_token,
            channel_id,
            api_base: DISCORD_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Use a different API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn channel_id(&self) -> u64 {
        self.channel_id
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn channel_url(&self) -> String {
        format!("{}/channels/{}", self.api_base, self.channel_id)
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Look up the destination channel
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /channels/:channel_id
    /// Authorization: Bot <token>
    /// ```
    async fn lookup_channel(&self) -> Result<ChannelLookup> {
        let response = self
            .client
            .get(self.channel_url())
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| Error::notifier(format!("Channel lookup request failed: {}", e)))?;

        match response.status() {
            status if status.is_success() => {
                let channel = response.json::<Channel>().await.map_err(|e| {
                    Error::notifier(format!("Failed to parse channel response: {}", e))
                })?;
                Ok(ChannelLookup::Found(channel))
            }
            StatusCode::NOT_FOUND => Ok(ChannelLookup::Unavailable("channel not found")),
            StatusCode::FORBIDDEN => Ok(ChannelLookup::Unavailable("channel not visible to bot")),
            status => Err(status_error("Channel lookup", status, response).await),
        }
    }

    /// Post the embed
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /channels/:channel_id/messages
    /// Authorization: Bot <token>
    ///
    /// {"embeds": [...]}
    /// ```
    async fn post_message(&self, payload: &CreateMessage) -> Result<PostResult> {
        let url = format!("{}/messages", self.channel_url());
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::notifier(format!("Create message request failed: {}", e)))?;

        match response.status() {
            status if status.is_success() => {
                let message = response.json::<Message>().await.map_err(|e| {
                    Error::notifier(format!("Failed to parse message response: {}", e))
                })?;
                Ok(PostResult::Posted(message))
            }
            StatusCode::FORBIDDEN => Ok(PostResult::Rejected("missing permissions in channel")),
            StatusCode::NOT_FOUND => Ok(PostResult::Rejected("channel not found")),
            status => Err(status_error("Create message", status, response).await),
        }
    }

    /// Publish a message posted in an announcement channel
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /channels/:channel_id/messages/:message_id/crosspost
    /// Authorization: Bot <token>
    /// ```
    async fn crosspost(&self, message_id: &str) -> Result<()> {
        let url = format!("{}/messages/{}/crosspost", self.channel_url(), message_id);
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| Error::notifier(format!("Crosspost request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error("Crosspost", status, response).await);
        }
        Ok(())
    }
}

/// Map an unexpected status to an error, keeping the response text
async fn status_error(action: &str, status: StatusCode, response: reqwest::Response) -> Error {
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    match status.as_u16() {
        401 => Error::notifier(format!(
            "{} failed: invalid bot token. Status: {}",
            action, status
        )),
        429 => Error::notifier(format!("{} failed: rate limited. Status: {}", action, status)),
        _ => Error::notifier(format!("{} failed: {} - {}", action, status, error_text)),
    }
}

#[async_trait]
impl NotificationSink for DiscordNotifier {
    async fn deliver(&self, notification: &Notification) -> Result<DeliveryOutcome> {
        let channel = match self.lookup_channel().await? {
            ChannelLookup::Found(channel) => channel,
            ChannelLookup::Unavailable(reason) => {
                warn!("Not posting to channel {}: {}", self.channel_id, reason);
                return Ok(DeliveryOutcome::skipped(reason));
            }
        };

        let payload = CreateMessage {
            embeds: vec![Embed::from_notification(notification)],
        };

        if self.dry_run {
            let body = serde_json::to_string(&payload)?;
            info!(
                "[DRY-RUN] Would post to channel {}: {}",
                self.channel_id, body
            );
            return Ok(DeliveryOutcome::skipped("dry run"));
        }

        let message = match self.post_message(&payload).await? {
            PostResult::Posted(message) => message,
            PostResult::Rejected(reason) => {
                warn!("Not posting to channel {}: {}", self.channel_id, reason);
                return Ok(DeliveryOutcome::skipped(reason));
            }
        };
        debug!("Posted message {} to channel {}", message.id, self.channel_id);

        if channel.kind == ANNOUNCEMENT_CHANNEL_TYPE {
            match self.crosspost(&message.id).await {
                Ok(()) => debug!("Published message {}", message.id),
                Err(e) => warn!("Failed to publish message {}: {}", message.id, e),
            }
        }

        Ok(DeliveryOutcome::Delivered)
    }

    fn sink_name(&self) -> &'static str {
        "discord"
    }
}

/// Factory for creating Discord notifiers
pub struct DiscordNotifierFactory;

impl NotificationSinkFactory for DiscordNotifierFactory {
    fn create(&self, config: &NotifierConfig) -> Result<Box<dyn NotificationSink>> {
        match config {
            NotifierConfig::Discord {
                bot_token,
                channel_id,
                dry_run,
            } => {
                let notifier = DiscordNotifier::new(bot_token.clone(), *channel_id, *dry_run)?;
                if *dry_run {
                    info!("Discord notifier running in dry-run mode");
                }
                Ok(Box::new(notifier))
            }
            _ => Err(Error::config("Invalid config for Discord notifier")),
        }
    }
}

/// Register the Discord notifier with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_notifier("discord", Box::new(DiscordNotifierFactory));
}
