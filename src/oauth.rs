//! Browser-based Slack OAuth handshake.
//!
//! A loopback listener receives the authorization redirect; the code is then
//! exchanged for a user token at the token-exchange endpoint, which holds the
//! app's client secret.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, SupportError};
use crate::slack::AccessToken;
use crate::ui;

const CALLBACK_PATH: &str = "/callback";
const STATE_LEN: usize = 32;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Obtains a Slack access token for this invocation.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> Result<AccessToken>;
}

#[must_use]
pub fn build_authorize_url(
    authorize_url: &str,
    client_id: &str,
    scopes: &[String],
    redirect_uri: &str,
    state: &str,
) -> String {
    let scopes = scopes.join(",");
    let redirect_uri = utf8_percent_encode(redirect_uri, NON_ALPHANUMERIC).to_string();
    format!(
        "{authorize_url}?client_id={client_id}&user_scope={scopes}&redirect_uri={redirect_uri}&state={state}"
    )
}

pub fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, PartialEq, Eq)]
enum Callback {
    Code(String),
    Failed(String),
}

fn parse_callback(query: &HashMap<String, String>, expected_state: &str) -> Callback {
    if let Some(error) = query.get("error") {
        return Callback::Failed(format!("authorization denied: {}", error));
    }
    if query.get("state").map(String::as_str) != Some(expected_state) {
        return Callback::Failed("state mismatch in authorization callback".to_string());
    }
    match query.get("code").filter(|c| !c.is_empty()) {
        Some(code) => Callback::Code(code.clone()),
        None => Callback::Failed("authorization callback missing code".to_string()),
    }
}

struct CallbackState {
    expected_state: String,
    sender: Mutex<Option<oneshot::Sender<Result<String>>>>,
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let (status, message, outcome) = match parse_callback(&query, &state.expected_state) {
        Callback::Code(code) => (
            StatusCode::OK,
            "Authenticated with Slack. You can close this tab and return to your terminal.",
            Ok(code),
        ),
        Callback::Failed(reason) => (
            StatusCode::BAD_REQUEST,
            "Slack authentication failed.",
            Err(SupportError::OAuth(reason)),
        ),
    };

    // First callback wins; later ones only get the page.
    let sender = state.sender.lock().ok().and_then(|mut slot| slot.take());
    if let Some(sender) = sender {
        let _ = sender.send(outcome);
    }

    (
        status,
        Html(format!(
            "<!doctype html><html><body><p>{}</p></body></html>",
            message
        )),
    )
}

/// Loopback HTTP listener that receives the authorization redirect.
pub struct CallbackServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl CallbackServer {
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let addr = listener.local_addr()?;
        debug!(%addr, "callback listener bound");
        Ok(CallbackServer { listener, addr })
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://{}{}", self.addr, CALLBACK_PATH)
    }

    /// Serve until the browser hits the callback and return the authorization code.
    pub async fn wait_for_code(self, state: &str, timeout: Duration) -> Result<String> {
        let (code_tx, code_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let app = Router::new()
            .route(CALLBACK_PATH, get(handle_callback))
            .with_state(Arc::new(CallbackState {
                expected_state: state.to_string(),
                sender: Mutex::new(Some(code_tx)),
            }));

        let mut server = tokio::spawn(async move {
            axum::serve(self.listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop_rx.await;
                })
                .await
        });

        let received = tokio::time::timeout(timeout, code_rx).await;

        // Let the response page reach the browser before tearing down.
        let _ = stop_tx.send(());
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
            server.abort();
        }

        match received {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(SupportError::OAuth(
                "callback listener stopped before the browser returned".to_string(),
            )),
            Err(_) => Err(SupportError::OAuth(format!(
                "timed out after {}s waiting for the browser callback",
                timeout.as_secs()
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    ok: Option<bool>,
    access_token: Option<String>,
    authed_user: Option<AuthedUser>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthedUser {
    access_token: Option<String>,
}

/// Exchange the authorization code for a user token.
pub async fn exchange_code(
    http: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<AccessToken> {
    let payload = [
        ("code", code),
        ("client_id", client_id),
        ("redirect_uri", redirect_uri),
    ];
    let resp = http.post(token_url).form(&payload).send().await?;

    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(SupportError::OAuth(format!(
            "token exchange failed with status {}: {}",
            status.as_u16(),
            text.trim()
        )));
    }

    let body: TokenExchangeResponse = serde_json::from_str(&text)?;
    if body.ok == Some(false) {
        let err = body.error.unwrap_or_else(|| "unknown".to_string());
        return Err(SupportError::OAuth(format!("token exchange error: {}", err)));
    }

    let token = body
        .access_token
        .or_else(|| body.authed_user.and_then(|user| user.access_token))
        .ok_or_else(|| {
            SupportError::OAuth("token exchange response missing access_token".to_string())
        })?;
    AccessToken::new(token)
}

/// Slack's OAuth v2 user flow driven through the default browser.
pub struct SlackOAuth {
    http: reqwest::Client,
    client_id: String,
    authorize_url: String,
    token_exchange_url: String,
    scopes: Vec<String>,
    callback_timeout: Duration,
    open_browser: bool,
}

impl SlackOAuth {
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(SlackOAuth {
            http,
            client_id: config.slack_client_id.clone(),
            authorize_url: config.authorize_url.clone(),
            token_exchange_url: config.token_exchange_url.clone(),
            scopes: config.user_scopes.clone(),
            callback_timeout: config.callback_timeout(),
            open_browser: config.open_browser,
        })
    }
}

#[async_trait]
impl Authenticator for SlackOAuth {
    async fn authenticate(&self) -> Result<AccessToken> {
        let server = CallbackServer::bind().await?;
        let redirect_uri = server.redirect_uri();
        let state = generate_state();
        let url = build_authorize_url(
            &self.authorize_url,
            &self.client_id,
            &self.scopes,
            &redirect_uri,
            &state,
        );

        let opened = self.open_browser
            && match open::that(&url) {
                Ok(()) => true,
                Err(e) => {
                    warn!("failed to open browser: {}", e);
                    false
                }
            };
        if opened {
            println!("{}", ui::info_line("Opened", "Slack authorization in your browser"));
        }
        println!("{}", ui::info_line("If nothing opened, visit:", &url));

        let code = server.wait_for_code(&state, self.callback_timeout).await?;
        debug!("received authorization code");
        let token = exchange_code(
            &self.http,
            &self.token_exchange_url,
            &self.client_id,
            &code,
            &redirect_uri,
        )
        .await?;
        info!("obtained Slack access token");
        Ok(token)
    }
}
