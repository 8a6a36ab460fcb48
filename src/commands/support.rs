use std::future::Future;
use tracing::info;
use crate::bazel::{Bazel, BuildTool};
use crate::config::Config;
use crate::error::{Result, SupportError};
use crate::message;
use crate::oauth::{Authenticator, SlackOAuth};
use crate::slack::{AccessToken, ChatService, SlackClient};
use crate::ui::{self, Confirm, TerminalPrompt};
use crate::workspace;

pub const INTRO: &str = "To provide support, this tool posts a message to Slack.
So we'll need to authenticate to Slack first.
We'll open your browser and navigate to Slack's authorization page.
You'll be asked to permit our Bazel Support app to post messages on your behalf.";

pub const DECLINED: &str = "Okay then, sorry we weren't able to handle your support request.";

const CONFIRM_LABEL: &str = "Ready to authenticate with Slack";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Declined,
    Submitted { ts: String, file_id: String },
}

/// One support request: confirm, authenticate, find the log, post, upload.
pub struct Support<P, A, B, F> {
    prompt: P,
    auth: A,
    build: B,
    connect: F,
    channel: String,
}

impl<P, A, B, F, C> Support<P, A, B, F>
where
    P: Confirm,
    A: Authenticator,
    B: BuildTool,
    F: FnOnce(AccessToken) -> Result<C>,
    C: ChatService,
{
    pub fn new(prompt: P, auth: A, build: B, connect: F, channel: impl Into<String>) -> Self {
        Support {
            prompt,
            auth,
            build,
            connect,
            channel: channel.into(),
        }
    }

    pub async fn run(mut self) -> Result<Outcome> {
        println!("{}", INTRO);
        if !self.prompt.confirm(CONFIRM_LABEL)? {
            println!("{}", DECLINED);
            return Ok(Outcome::Declined);
        }

        // TODO: keep the token in the OS keychain and reuse it while Slack still accepts it.
        let token = self
            .auth
            .authenticate()
            .await
            .map_err(SupportError::authentication)?;

        let output_base = self
            .build
            .output_base()
            .await
            .map_err(SupportError::output_base)?;
        let log_path = workspace::command_log_path(&output_base);
        info!(output_base = %output_base.display(), "resolved output base");

        let chat = (self.connect)(token).map_err(SupportError::post_message)?;
        let posted = chat
            .post_message(&self.channel, &message::support_message_now())
            .await
            .map_err(SupportError::post_message)?;
        info!(channel = %posted.channel, ts = %posted.ts, "support request posted");

        // A failed upload leaves the posted message in place.
        let uploaded = chat
            .upload_file(&self.channel, &posted.ts, &log_path)
            .await
            .map_err(SupportError::upload_log)?;

        Ok(Outcome::Submitted {
            ts: posted.ts,
            file_id: uploaded.file_id,
        })
    }

    /// Runs the request until it finishes or `cancel` resolves, whichever is first.
    pub async fn run_until<X>(self, cancel: X) -> Result<Outcome>
    where
        X: Future,
    {
        // Biased so the prompt runs on the first poll, before a Ctrl-C handler
        // passed as `cancel` replaces the default SIGINT behavior.
        tokio::select! {
            biased;
            outcome = self.run() => outcome,
            _ = cancel => Err(SupportError::Interrupted),
        }
    }
}

pub async fn run<X>(config: &Config, cancel: X) -> Result<()>
where
    X: Future,
{
    let cwd = std::env::current_dir()?;
    let api_base = config.slack_api_base.clone();
    let timeout = config.request_timeout();

    let support = Support::new(
        TerminalPrompt::stdio(),
        SlackOAuth::from_config(config)?,
        Bazel::new(config.bazel_binary.clone(), cwd),
        move |token| SlackClient::new(&api_base, token, timeout),
        config.channel_id.clone(),
    );

    let outcome = support.run_until(cancel).await?;

    if let Outcome::Submitted { ts, .. } = outcome {
        println!(
            "{}",
            ui::success_line("Submitted", &format!("support request (message {})", ts))
        );
    }
    Ok(())
}
