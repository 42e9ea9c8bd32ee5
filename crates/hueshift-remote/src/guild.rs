//! Guild REST API client
//!
//! Applies rotated values to a Discord-style guild and provides the
//! channel-side collaborators used by intake: authorization via member
//! roles, message removal, transient notices, and operator alerts.

use crate::RemoteError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hueshift_domain::traits::{Authorizer, ChannelModerator, OperatorNotifier, ResourceApplier};
use hueshift_domain::{ActorId, ApplyError, Attachment, CapabilityId, ChannelId, Color, Submission};
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Default API base URL
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Default timeout for API calls
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Body fragments the API uses for image size and dimension violations
const CONTENT_INVALID_MARKERS: &[&str] = &[
    "BINARY_TYPE_MAX_SIZE",
    "too large",
    "too small",
    "dimensions",
];

/// Where operator alerts are posted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorTarget {
    /// Channel receiving the alert
    pub channel: ChannelId,

    /// Operator mentioned in the alert
    pub operator: ActorId,
}

/// Client for one guild
///
/// # Examples
///
/// ```no_run
/// use hueshift_domain::traits::ResourceApplier;
/// use hueshift_domain::{ActorId, ChannelId, Color};
/// use hueshift_remote::{GuildClient, OperatorTarget, DEFAULT_API_BASE};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GuildClient::new(DEFAULT_API_BASE, "token", 1234, 5678)?
///     .with_operator(OperatorTarget {
///         channel: ChannelId(42),
///         operator: ActorId(7),
///     });
///
/// client.apply_color(Color::rgb(255, 0, 0)).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GuildClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
    guild_id: u64,
    role_id: u64,
    operator: Option<OperatorTarget>,
}

#[derive(Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    bot: bool,
}

#[derive(Deserialize)]
struct AttachmentPayload {
    filename: String,
    url: String,
}

#[derive(Deserialize)]
struct MessagePayload {
    id: String,
    channel_id: String,
    author: UserPayload,
    #[serde(default)]
    content: String,
    #[serde(default)]
    mentions: Vec<UserPayload>,
    #[serde(default)]
    attachments: Vec<AttachmentPayload>,
}

#[derive(Deserialize)]
struct MemberPayload {
    #[serde(default)]
    roles: Vec<String>,
}

impl GuildClient {
    /// Create a client for `guild_id`, rotating the color of `role_id`
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        guild_id: u64,
        role_id: u64,
    ) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_API_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            guild_id,
            role_id,
            operator: None,
        })
    }

    /// Post operator alerts to `target`
    pub fn with_operator(mut self, target: OperatorTarget) -> Self {
        self.operator = Some(target);
        self
    }

    /// Guild this client edits
    pub fn guild_id(&self) -> u64 {
        self.guild_id
    }

    /// Post a message; returns its id
    pub async fn post_message(&self, channel: ChannelId, content: &str) -> Result<u64, RemoteError> {
        let response = self
            .call(Method::POST, &format!("/channels/{}/messages", channel))
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;

        let body: Value = check(response).await?.json().await.map_err(decode_error)?;
        body.get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| RemoteError::Decode("message without an id".to_string()))
            .and_then(snowflake)
    }

    /// Delete a message
    pub async fn delete_message(&self, channel: ChannelId, message_id: u64) -> Result<(), RemoteError> {
        let response = self
            .call(Method::DELETE, &format!("/channels/{}/messages/{}", channel, message_id))
            .send()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;
        check(response).await.map(|_| ())
    }

    /// Role ids held by a guild member
    pub async fn member_roles(&self, member: ActorId) -> Result<Vec<u64>, RemoteError> {
        let response = self
            .call(Method::GET, &format!("/guilds/{}/members/{}", self.guild_id, member))
            .send()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;

        let member: MemberPayload = check(response).await?.json().await.map_err(decode_error)?;
        member.roles.iter().map(|r| snowflake(r)).collect()
    }

    /// Id of the account this client is authenticated as
    pub async fn current_user(&self) -> Result<ActorId, RemoteError> {
        let response = self
            .call(Method::GET, "/users/@me")
            .send()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;

        let user: UserPayload = check(response).await?.json().await.map_err(decode_error)?;
        snowflake(&user.id).map(ActorId)
    }

    /// Messages posted in `channel` after `after`, oldest first
    ///
    /// `bot` is used to tell whether each message mentions this client.
    pub async fn channel_messages(
        &self,
        channel: ChannelId,
        after: Option<u64>,
        bot: ActorId,
    ) -> Result<Vec<Submission>, RemoteError> {
        let mut request = self
            .call(Method::GET, &format!("/channels/{}/messages", channel))
            .query(&[("limit", "50")]);
        if let Some(after) = after {
            request = request.query(&[("after", after.to_string())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;
        let body = check(response).await?.text().await.map_err(decode_error)?;
        parse_messages(&body, bot)
    }

    async fn patch_guild(&self, body: Value) -> Result<(), ApplyError> {
        let request = self
            .call(Method::PATCH, &format!("/guilds/{}", self.guild_id))
            .json(&body);
        send_apply(request).await
    }

    fn call(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_base, path))
            .header(AUTHORIZATION, format!("Bot {}", self.token))
    }
}

#[async_trait]
impl ResourceApplier for GuildClient {
    async fn apply_color(&self, color: Color) -> Result<(), ApplyError> {
        let request = self
            .call(Method::PATCH, &format!("/guilds/{}/roles/{}", self.guild_id, self.role_id))
            .json(&json!({ "color": color.value() }));
        send_apply(request).await
    }

    async fn apply_banner(&self, image: &[u8]) -> Result<(), ApplyError> {
        self.patch_guild(json!({ "banner": data_uri(image)? })).await
    }

    async fn apply_icon(&self, image: &[u8]) -> Result<(), ApplyError> {
        self.patch_guild(json!({ "icon": data_uri(image)? })).await
    }
}

#[async_trait]
impl OperatorNotifier for GuildClient {
    async fn notify_operator(&self, message: &str) {
        let Some(target) = self.operator else {
            tracing::warn!("No operator channel configured; dropping alert: {}", message);
            return;
        };

        let content = format!("<@{}> {}", target.operator, message);
        if let Err(e) = self.post_message(target.channel, &content).await {
            tracing::error!("Failed to notify operator: {}", e);
        }
    }
}

#[async_trait]
impl ChannelModerator for GuildClient {
    async fn remove_submission(&self, channel: ChannelId, message_id: u64) {
        if let Err(e) = self.delete_message(channel, message_id).await {
            tracing::warn!("Failed to remove message {} in {}: {}", message_id, channel, e);
        }
    }

    async fn post_notice(&self, channel: ChannelId, text: &str, ttl: Option<Duration>) {
        let message_id = match self.post_message(channel, text).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Failed to post notice in {}: {}", channel, e);
                return;
            }
        };

        if let Some(ttl) = ttl {
            let client = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                client.remove_submission(channel, message_id).await;
            });
        }
    }
}

#[async_trait]
impl Authorizer for GuildClient {
    async fn authorize(&self, actor: ActorId, capability: CapabilityId) -> bool {
        match self.member_roles(actor).await {
            Ok(roles) => roles.contains(&capability.0),
            Err(e) => {
                tracing::warn!("Could not look up roles of {}: {}", actor, e);
                false
            }
        }
    }
}

/// Map a non-success apply response to an [`ApplyError`]
///
/// - 429 is a rate limit; `retry_after` comes from the JSON body or the
///   `Retry-After` header, and is dropped when it is not a valid duration
/// - 400 mentioning an image size or dimension limit is content-invalid
/// - anything else is a plain rejection
///
/// # Examples
///
/// ```
/// use hueshift_domain::ApplyError;
/// use hueshift_remote::classify_response;
/// use std::time::Duration;
///
/// let limited = classify_response(429, r#"{"retry_after": 1.5}"#, None);
/// assert_eq!(limited, ApplyError::RateLimited { retry_after: Some(Duration::from_millis(1500)) });
///
/// let small = classify_response(400, "banner image too small", None);
/// assert!(matches!(small, ApplyError::ContentInvalid(_)));
/// ```
pub fn classify_response(status: u16, body: &str, retry_after_header: Option<&str>) -> ApplyError {
    if status == 429 {
        let from_body = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("retry_after").and_then(Value::as_f64));
        let from_header = retry_after_header.and_then(|h| h.trim().parse::<f64>().ok());
        let retry_after = from_body
            .or(from_header)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
        return ApplyError::RateLimited { retry_after };
    }

    let lowered = body.to_lowercase();
    let content_invalid = CONTENT_INVALID_MARKERS
        .iter()
        .any(|marker| lowered.contains(&marker.to_lowercase()));
    if status == 400 && content_invalid {
        return ApplyError::ContentInvalid(body.to_string());
    }

    ApplyError::Rejected {
        status,
        message: body.to_string(),
    }
}

/// Encode image bytes as a data URI, sniffing the MIME type
///
/// Bytes that are not a recognizable image never will be, so they are a
/// rejection (415) rather than a content-validity failure.
fn data_uri(image: &[u8]) -> Result<String, ApplyError> {
    match infer::get(image) {
        Some(kind) if kind.mime_type().starts_with("image/") => Ok(format!(
            "data:{};base64,{}",
            kind.mime_type(),
            STANDARD.encode(image)
        )),
        _ => Err(ApplyError::Rejected {
            status: 415,
            message: "unrecognized image data".to_string(),
        }),
    }
}

async fn send_apply(request: RequestBuilder) -> Result<(), ApplyError> {
    let response = request
        .send()
        .await
        .map_err(|e| ApplyError::Transport(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();
    Err(classify_response(status.as_u16(), &body, retry_after.as_deref()))
}

async fn check(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(RemoteError::Status {
        status: status.as_u16(),
        message,
    })
}

fn decode_error(e: reqwest::Error) -> RemoteError {
    RemoteError::Decode(e.to_string())
}

fn snowflake(id: &str) -> Result<u64, RemoteError> {
    id.parse()
        .map_err(|_| RemoteError::Decode(format!("invalid id '{}'", id)))
}

/// Parse a message listing into submissions, oldest first
///
/// Messages written by bot accounts (including this one) are skipped.
fn parse_messages(body: &str, bot: ActorId) -> Result<Vec<Submission>, RemoteError> {
    let messages: Vec<MessagePayload> =
        serde_json::from_str(body).map_err(|e| RemoteError::Decode(e.to_string()))?;

    let mut submissions = messages
        .into_iter()
        .filter(|message| !message.author.bot)
        .map(|message| {
            let mentions_bot = message
                .mentions
                .iter()
                .any(|user| snowflake(&user.id).is_ok_and(|id| id == bot.0));
            Ok(Submission {
                message_id: snowflake(&message.id)?,
                author: ActorId(snowflake(&message.author.id)?),
                channel: ChannelId(snowflake(&message.channel_id)?),
                mentions_bot,
                content: message.content,
                attachments: message
                    .attachments
                    .into_iter()
                    .map(|a| Attachment::new(a.filename, a.url))
                    .collect(),
            })
        })
        .collect::<Result<Vec<_>, RemoteError>>()?;

    submissions.sort_by_key(|s| s.message_id);
    Ok(submissions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{SAMPLE_JPEG, SAMPLE_PNG};

    #[test]
    fn test_client_creation() {
        let client = GuildClient::new("https://example.test/api/", "t", 1, 2).unwrap();
        assert_eq!(client.api_base, "https://example.test/api");
        assert_eq!(client.guild_id(), 1);
        assert!(client.operator.is_none());
    }

    #[test]
    fn test_rate_limit_retry_after() {
        assert_eq!(
            classify_response(429, r#"{"message": "You are being rate limited.", "retry_after": 0.25}"#, None),
            ApplyError::RateLimited {
                retry_after: Some(Duration::from_millis(250))
            }
        );
        assert_eq!(
            classify_response(429, "", Some("3")),
            ApplyError::RateLimited {
                retry_after: Some(Duration::from_secs(3))
            }
        );
        assert_eq!(
            classify_response(429, "", None),
            ApplyError::RateLimited { retry_after: None }
        );
    }

    #[test]
    fn test_unrepresentable_retry_after_is_dropped() {
        for body in [r#"{"retry_after": 1e30}"#, r#"{"retry_after": -2}"#] {
            assert_eq!(
                classify_response(429, body, None),
                ApplyError::RateLimited { retry_after: None }
            );
        }
        assert_eq!(
            classify_response(429, "", Some("1e300")),
            ApplyError::RateLimited { retry_after: None }
        );
    }

    #[test]
    fn test_content_invalid_markers() {
        let body = r#"{"code": 50035, "errors": {"banner": {"_errors": [{"code": "BINARY_TYPE_MAX_SIZE"}]}}}"#;
        assert!(matches!(classify_response(400, body, None), ApplyError::ContentInvalid(_)));
        assert!(matches!(
            classify_response(400, "Image dimensions Too Small", None),
            ApplyError::ContentInvalid(_)
        ));
    }

    #[test]
    fn test_other_statuses_are_rejections() {
        assert_eq!(
            classify_response(403, "Missing Permissions", None),
            ApplyError::Rejected {
                status: 403,
                message: "Missing Permissions".to_string()
            }
        );
        // Size wording outside a 400 is not a validity rejection
        assert!(matches!(
            classify_response(500, "too large", None),
            ApplyError::Rejected { status: 500, .. }
        ));
    }

    #[test]
    fn test_data_uri() {
        let uri = data_uri(SAMPLE_PNG).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert!(data_uri(SAMPLE_JPEG).unwrap().starts_with("data:image/jpeg;base64,"));
        assert!(matches!(
            data_uri(b"<html>Not Found</html>"),
            Err(ApplyError::Rejected { status: 415, .. })
        ));
    }

    #[test]
    fn test_parse_messages() {
        let body = r#"[
            {"id": "30", "channel_id": "5", "author": {"id": "9"},
             "content": "hello", "mentions": [], "attachments": []},
            {"id": "25", "channel_id": "5", "author": {"id": "100", "bot": true},
             "content": "Banner image from <@8> has been added to the rotation!"},
            {"id": "20", "channel_id": "5", "author": {"id": "8"},
             "mentions": [{"id": "100"}],
             "attachments": [{"filename": "a.png", "url": "https://cdn.example/a.png"}]}
        ]"#;

        let submissions = parse_messages(body, ActorId(100)).unwrap();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].message_id, 20);
        assert!(submissions[0].mentions_bot);
        assert_eq!(submissions[0].author, ActorId(8));
        assert_eq!(submissions[0].attachments[0].filename, "a.png");
        assert_eq!(submissions[0].content, "");
        assert!(!submissions[1].mentions_bot);
        assert_eq!(submissions[1].channel, ChannelId(5));
        assert_eq!(submissions[1].content, "hello");
    }

    #[test]
    fn test_parse_messages_rejects_bad_ids() {
        let body = r#"[{"id": "x", "channel_id": "5", "author": {"id": "9"}}]"#;
        assert!(matches!(parse_messages(body, ActorId(1)), Err(RemoteError::Decode(_))));
    }
}
