use std::fmt::Debug;

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use chrono::Utc;
use sqlx::PgPool;
use tracing::field::{display, Empty};

use super::ApiResponse;
use crate::{
    domain::{Subscriber, SubscriberEmail},
    email_client::{dispatch_otp, OtpSender},
    otp_store::OtpStore,
    util::error_chain_fmt,
};

#[derive(serde::Deserialize)]
pub struct SubscribeBody {
    email: Option<String>,
}

#[tracing::instrument(
    name = "新用户订阅",
    skip_all,
    fields(subscriber_email = Empty)
)]
pub async fn subscribe<S>(
    body: web::Json<SubscribeBody>,
    pool: web::Data<PgPool>,
    otp_sender: web::Data<S>,
    otp_store: web::Data<OtpStore>,
) -> Result<HttpResponse, SubscribeError>
where
    S: OtpSender + 'static,
{
    let email = body
        .0
        .email
        .as_deref()
        .and_then(|email| SubscriberEmail::parse(email).ok())
        .ok_or(SubscribeError::MissingEmail)?;
    tracing::Span::current().record("subscriber_email", display(&email));

    if subscriber_exists(&pool, &email)
        .await
        .context("failed to query subscriber.")?
    {
        return Err(SubscribeError::AlreadySubscribed);
    }

    let subscriber = Subscriber::new(email, Utc::now());
    insert_subscriber(&pool, &subscriber)
        .await
        .map_err(|e| match e {
            // 并发订阅时由唯一约束兜底
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                SubscribeError::AlreadySubscribed
            }
            e => SubscribeError::UnexpectedError(
                anyhow::Error::new(e).context("failed to insert subscriber."),
            ),
        })?;
    tracing::info!("订阅记录插入成功.");

    let code = otp_store.issue(&subscriber.email);
    tracing::info!("验证码已生成.");

    // 邮件发送结果不影响订阅结果
    dispatch_otp(otp_sender.into_inner(), subscriber.email, code);

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Subscribed successfully. OTP sent to your email.",
    )))
}

#[tracing::instrument(skip_all)]
async fn subscriber_exists(pool: &PgPool, email: &SubscriberEmail) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(SELECT 1 FROM subscribers WHERE email = $1)
        "#,
    )
    .bind(email.as_ref())
    .fetch_one(pool)
    .await
}

#[tracing::instrument(skip_all)]
async fn insert_subscriber(pool: &PgPool, subscriber: &Subscriber) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO subscribers (id, email, created_at, updated_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(subscriber.id)
    .bind(subscriber.email.as_ref())
    .bind(subscriber.created_at)
    .bind(subscriber.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("Email is required")]
    MissingEmail,
    #[error("Email is already subscribed")]
    AlreadySubscribed,
    #[error("Internal server error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscribeError::MissingEmail | SubscribeError::AlreadySubscribed => {
                StatusCode::BAD_REQUEST
            }
            SubscribeError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.to_string();
        HttpResponse::build(self.status_code()).json(ApiResponse::failure(&message))
    }
}
