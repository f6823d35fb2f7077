use std::net::TcpListener;

use actix_web::{dev::Server, web, App, HttpServer};
use sqlx::PgPool;
use tracing_actix_web::TracingLogger;

use crate::{email_client::OtpSender, otp_store::OtpStore, routes};

/// `otp_sender`负责把验证码发给订阅者，生产环境为[`EmailClient`](crate::email_client::EmailClient)
pub fn run<S>(
    listener: TcpListener,
    pool: web::Data<PgPool>,
    otp_sender: web::Data<S>,
    otp_store: web::Data<OtpStore>,
) -> Result<Server, std::io::Error>
where
    S: OtpSender + 'static,
{
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().error_handler(routes::json_error_handler))
            .app_data(pool.clone())
            .app_data(otp_sender.clone())
            .app_data(otp_store.clone())
            .route("/health_check", web::get().to(routes::health_check))
            .route("/subscribe", web::post().to(routes::subscribe::<S>))
            .route("/verify", web::post().to(routes::verify))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
