//! Slack Web API client for posting the support request and its log.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{Result, SupportError};
use crate::message::SupportMessage;

/// Bearer token for the Slack Web API. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(SupportError::EmptyToken);
        }
        Ok(AccessToken(value))
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_id: String,
}

/// The two chat operations a support request needs.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn post_message(&self, channel: &str, message: &SupportMessage) -> Result<PostedMessage>;

    async fn upload_file(&self, channel: &str, thread_ts: &str, path: &Path)
        -> Result<UploadedFile>;
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    ok: bool,
    ts: Option<String>,
    channel: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetUploadUrlExternalResponse {
    ok: bool,
    upload_url: Option<String>,
    file_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompleteUploadExternalResponse {
    ok: bool,
    error: Option<String>,
}

pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    token: AccessToken,
}

impl SlackClient {
    pub fn new(api_base: &str, token: AccessToken, timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("bazel-support"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(SlackClient {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request.bearer_auth(self.token.secret()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error(
                method,
                format!("status {}: {}", status.as_u16(), truncate_for_error(&body, 320)),
            ));
        }
        Ok(serde_json::from_str::<T>(&body)?)
    }
}

#[async_trait]
impl ChatService for SlackClient {
    async fn post_message(&self, channel: &str, message: &SupportMessage) -> Result<PostedMessage> {
        let payload = json!({
            "channel": channel,
            "text": message.text,
            "blocks": message.blocks,
            "unfurl_links": false,
            "unfurl_media": false,
        });

        let response: ChatMessageResponse = self
            .request_json(
                "chat.postMessage",
                self.http.post(self.endpoint("chat.postMessage")).json(&payload),
            )
            .await?;
        ensure_ok("chat.postMessage", response.ok, response.error)?;

        let ts = response
            .ts
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| api_error("chat.postMessage", "response missing ts"))?;
        debug!(channel, ts = %ts, "chat.postMessage ok");

        Ok(PostedMessage {
            channel: response.channel.unwrap_or_else(|| channel.to_string()),
            ts,
        })
    }

    async fn upload_file(
        &self,
        channel: &str,
        thread_ts: &str,
        path: &Path,
    ) -> Result<UploadedFile> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| SupportError::Other(format!("{} has no file name", path.display())))?;
        let bytes = tokio::fs::read(path).await?;
        if bytes.is_empty() {
            return Err(SupportError::Other(format!("{} is empty", path.display())));
        }
        debug!(file = %path.display(), size = bytes.len(), "uploading file");

        let get_upload: GetUploadUrlExternalResponse = self
            .request_json(
                "files.getUploadURLExternal",
                self.http
                    .post(self.endpoint("files.getUploadURLExternal"))
                    .form(&[
                        ("filename", filename.clone()),
                        ("length", bytes.len().to_string()),
                        ("snippet_type", "text".to_string()),
                    ]),
            )
            .await?;
        ensure_ok("files.getUploadURLExternal", get_upload.ok, get_upload.error)?;
        let upload_url = get_upload
            .upload_url
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| api_error("files.getUploadURLExternal", "response missing upload_url"))?;
        let file_id = get_upload
            .file_id
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| api_error("files.getUploadURLExternal", "response missing file_id"))?;

        let upload_response = self
            .http
            .post(upload_url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;
        if !upload_response.status().is_success() {
            let status = upload_response.status();
            let body = upload_response.text().await.unwrap_or_default();
            return Err(api_error(
                "external upload",
                format!("status {}: {}", status.as_u16(), truncate_for_error(&body, 320)),
            ));
        }

        let complete_payload = json!({
            "files": [{ "id": file_id, "title": filename }],
            "channel_id": channel,
            "thread_ts": thread_ts,
        });
        let complete: CompleteUploadExternalResponse = self
            .request_json(
                "files.completeUploadExternal",
                self.http
                    .post(self.endpoint("files.completeUploadExternal"))
                    .json(&complete_payload),
            )
            .await?;
        ensure_ok("files.completeUploadExternal", complete.ok, complete.error)?;
        info!(channel, thread_ts, file_id = %file_id, "uploaded file");

        Ok(UploadedFile { file_id })
    }
}

fn api_error(method: &str, error: impl Into<String>) -> SupportError {
    SupportError::SlackApi {
        method: method.to_string(),
        error: error.into(),
    }
}

fn ensure_ok(method: &str, ok: bool, error: Option<String>) -> Result<()> {
    if ok {
        return Ok(());
    }
    Err(api_error(
        method,
        error.unwrap_or_else(|| "unknown error".to_string()),
    ))
}

fn truncate_for_error(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let cut: String = body.chars().take(max_chars).collect();
    format!("{}...", cut)
}
