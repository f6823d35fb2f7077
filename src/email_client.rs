use std::{future::Future, sync::Arc, time::Duration};

use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};
use tokio::task::JoinHandle;
use validator::ValidateEmail;

use crate::{
    domain::{OtpCode, SubscriberEmail},
    telemetry::spawn_with_tracing,
};

/// 发送验证码邮件的能力
pub trait OtpSender: Send + Sync {
    fn send_otp(
        &self,
        receiver: &SubscriberEmail,
        code: OtpCode,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

pub struct EmailClient {
    client: reqwest::Client,
    email_url: reqwest::Url,
    sender: String,
    authorization_token: SecretString,
}

impl EmailClient {
    fn new(
        base_url: &str,
        sender: &str,
        timeout: Duration,
        authorization_token: SecretString,
    ) -> anyhow::Result<Self> {
        if !sender.validate_email() {
            anyhow::bail!("`{sender}` is not a valid sender email.");
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build email client.")?;
        let email_url = reqwest::Url::parse(base_url)
            .and_then(|url| url.join("/email"))
            .with_context(|| format!("failed to parse base url `{base_url}`."))?;

        Ok(Self {
            client,
            email_url,
            sender: sender.to_owned(),
            authorization_token,
        })
    }

    pub fn from_config(config: &crate::config::Config) -> anyhow::Result<Self> {
        let email_client_config = &config.email_client;
        let timeout = Duration::from_millis(email_client_config.timeout_milliseconds);

        Self::new(
            &email_client_config.base_url,
            &email_client_config.sender,
            timeout,
            email_client_config.authorization_token.clone(),
        )
    }

    #[tracing::instrument(name = "sending email", skip_all)]
    pub async fn send(
        &self,
        receiver: &SubscriberEmail,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> reqwest::Result<()> {
        let body = EmailRequestBody {
            from: &self.sender,
            to: receiver.as_ref(),
            subject,
            text_body,
            html_body,
        };

        self.client
            .post(self.email_url.clone())
            .header(
                "X-Postmark-Server-Token",
                self.authorization_token.expose_secret(),
            )
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

impl OtpSender for EmailClient {
    async fn send_otp(&self, receiver: &SubscriberEmail, code: OtpCode) -> anyhow::Result<()> {
        let subject = "Email Verification";
        let text_body = format!("Here is your OTP: {code}");
        let html_body = format!("Here is your OTP: <b>{code}</b>");

        self.send(receiver, subject, &text_body, &html_body)
            .await
            .with_context(|| format!("failed to send OTP email to {receiver}."))
    }
}

/// 后台发送验证码邮件，不等待结果
///
/// 发送失败只记录日志，不影响调用方
pub fn dispatch_otp<S>(sender: Arc<S>, receiver: SubscriberEmail, code: OtpCode) -> JoinHandle<()>
where
    S: OtpSender + 'static,
{
    spawn_with_tracing(async move {
        match sender.send_otp(&receiver, code).await {
            Ok(()) => tracing::info!("OTP email sent."),
            Err(e) => tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "failed to send OTP email."
            ),
        }
    })
}

#[derive(serde::Serialize)]
#[serde(rename_all = "PascalCase")]
struct EmailRequestBody<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text_body: &'a str,
    html_body: &'a str,
}
