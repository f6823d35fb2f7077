use std::{net::TcpListener, time::Duration};

use actix_web::web;
use anyhow::Context;
use newsletter_otp::{email_client::EmailClient, otp_store::OtpStore, telemetry};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 遥测初始化
    telemetry::init_subscriber("newsletter_otp")?;

    let config = newsletter_otp::config::config().context("failed to load config.yaml.")?;
    let listener = TcpListener::bind(config.web.server_address())
        .with_context(|| format!("failed to bind {}.", config.web.server_address()))?;
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy_with(config.database.with_db());

    // 构造web Arc
    let pool = web::Data::new(pool);
    let email_client = web::Data::new(EmailClient::from_config(&config)?);
    let otp_store = web::Data::new(OtpStore::with_system_clock(config.otp.ttl()));

    tracing::info!("listening on {}.", config.web.server_address());
    newsletter_otp::run(listener, pool, email_client, otp_store)?.await?;

    Ok(())
}
