use std::fmt::Debug;

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use tracing::field::{display, Empty};

use super::ApiResponse;
use crate::{
    domain::SubscriberEmail,
    otp_store::{OtpError, OtpStore},
    util::error_chain_fmt,
};

/// 验证码可以是JSON数字，也可以是字符串
#[derive(serde::Deserialize)]
#[serde(untagged)]
pub enum OtpField {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl OtpField {
    /// 空字符串和数字0都视为未提供
    fn is_blank(&self) -> bool {
        match self {
            OtpField::Integer(n) => *n == 0,
            OtpField::Float(f) => *f == 0.0 || f.is_nan(),
            OtpField::Text(s) => s.trim().is_empty(),
        }
    }

    /// 按十进制整数解析，无法得到整数时返回`None`
    ///
    /// 小数向零取整；字符串只读取开头的符号和连续数字，如`"12345abc"`得到12345
    fn candidate(&self) -> Option<i64> {
        match self {
            OtpField::Integer(n) => Some(*n),
            OtpField::Float(f) => {
                let truncated = f.trunc();
                (truncated.is_finite() && truncated.abs() < i64::MAX as f64)
                    .then_some(truncated as i64)
            }
            OtpField::Text(s) => leading_integer(s),
        }
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let value: i64 = rest[..end].parse().ok()?;

    Some(if negative { -value } else { value })
}

#[derive(serde::Deserialize)]
pub struct VerifyBody {
    email: Option<String>,
    otp: Option<OtpField>,
}

#[tracing::instrument(
    name = "校验验证码",
    skip_all,
    fields(subscriber_email = Empty)
)]
pub async fn verify(
    body: web::Json<VerifyBody>,
    otp_store: web::Data<OtpStore>,
) -> Result<HttpResponse, VerifyError> {
    let VerifyBody { email, otp } = body.into_inner();
    let email = email
        .as_deref()
        .and_then(|email| SubscriberEmail::parse(email).ok())
        .ok_or(VerifyError::MissingFields)?;
    let otp = otp
        .filter(|otp| !otp.is_blank())
        .ok_or(VerifyError::MissingFields)?;
    tracing::Span::current().record("subscriber_email", display(&email));

    if let Err(e) = otp_store.verify(&email, otp.candidate()) {
        tracing::warn!("验证码校验失败. {e}");
        return Err(e.into());
    }
    tracing::info!("验证码校验成功.");

    Ok(HttpResponse::Ok().json(ApiResponse::success("OTP verified successfully")))
}

#[derive(thiserror::Error)]
pub enum VerifyError {
    #[error("Email and OTP are required")]
    MissingFields,
    #[error("OTP not found or expired")]
    NotFound,
    #[error("OTP has expired")]
    Expired,
    #[error("Invalid OTP")]
    InvalidCode,
}

impl From<OtpError> for VerifyError {
    fn from(e: OtpError) -> Self {
        match e {
            OtpError::NotFound => VerifyError::NotFound,
            OtpError::Expired => VerifyError::Expired,
            OtpError::Invalid => VerifyError::InvalidCode,
        }
    }
}

impl Debug for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for VerifyError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.to_string();
        HttpResponse::build(self.status_code()).json(ApiResponse::failure(&message))
    }
}
