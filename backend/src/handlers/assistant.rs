use actix_web::{web, HttpResponse, Result};
use chrono::Utc;
use shared::{ApiError, ApiSuccess, AssistantRequest};

use crate::models::AppState;
use crate::services::analytics::parse_timezone;
use crate::services::assistant::{self as assistant_service, AssistantError};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/assistant").route("", web::post().to(propose_changes)));
}

async fn propose_changes(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<AssistantRequest>,
) -> Result<HttpResponse> {
    let user_id = match crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing token".to_string(),
            }));
        }
    };

    let today = match parse_timezone(&state.config.default_timezone) {
        Ok(tz) => Utc::now().with_timezone(&tz).date_naive(),
        Err(_) => Utc::now().date_naive(),
    };

    match assistant_service::propose_changes(&state.db, state.llm.as_ref(), &user_id, &body, today)
        .await
    {
        Ok(reply) => Ok(HttpResponse::Ok().json(ApiSuccess::new(reply))),
        Err(e @ AssistantError::EmptyMessage) | Err(e @ AssistantError::InvalidRange) => {
            Ok(HttpResponse::BadRequest().json(ApiError {
                error: "validation_error".to_string(),
                message: e.to_string(),
            }))
        }
        Err(AssistantError::Llm(_)) => Ok(HttpResponse::BadGateway().json(ApiError {
            error: "llm_unavailable".to_string(),
            message: "The assistant is currently unavailable".to_string(),
        })),
        Err(AssistantError::InvalidResponse(_)) => Ok(HttpResponse::BadGateway().json(ApiError {
            error: "llm_invalid_response".to_string(),
            message: "The assistant returned a response that could not be understood".to_string(),
        })),
        Err(e) => {
            log::error!("Error running assistant: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to run assistant".to_string(),
            }))
        }
    }
}
