mod subscription;
mod verify;

pub use subscription::*;
pub use verify::*;

use actix_web::{
    error::{InternalError, JsonPayloadError},
    HttpRequest, HttpResponse, Responder,
};

/// 所有JSON接口统一的响应体
#[derive(serde::Serialize)]
pub struct ApiResponse<'a> {
    pub message: &'a str,
    pub success: bool,
}

impl<'a> ApiResponse<'a> {
    pub fn success(message: &'a str) -> Self {
        Self {
            message,
            success: true,
        }
    }

    pub fn failure(message: &'a str) -> Self {
        Self {
            message,
            success: false,
        }
    }
}

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok()
}

/// 请求体无法解析为JSON时，返回400及统一的响应体
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::warn!("failed to parse request body. {err}");
    let response = HttpResponse::BadRequest().json(ApiResponse::failure("Invalid request body"));
    InternalError::from_response(err, response).into()
}
