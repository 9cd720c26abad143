use actix_web::{web, HttpResponse, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{ApiError, ApiSuccess, FocusSessionsResponse, RecordSessionRequest};
use uuid::Uuid;

use crate::models::AppState;
use crate::services::focus_sessions::{self as session_service, FocusSessionError};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/sessions")
            .route("", web::get().to(list_sessions))
            .route("", web::post().to(record_session))
            .route("/{session_id}", web::delete().to(delete_session)),
    );
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

async fn list_sessions(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    query: web::Query<SessionQuery>,
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

    match session_service::list_sessions(&state.db, &user_id, query.from, query.to).await {
        Ok(sessions) => {
            Ok(HttpResponse::Ok().json(ApiSuccess::new(FocusSessionsResponse { sessions })))
        }
        Err(e) => {
            log::error!("Error listing focus sessions: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list focus sessions".to_string(),
            }))
        }
    }
}

async fn record_session(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<RecordSessionRequest>,
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

    match session_service::record_session(&state.db, &user_id, &body).await {
        Ok(session) => Ok(HttpResponse::Created().json(ApiSuccess::new(session))),
        Err(e @ FocusSessionError::TaskNotFound)
        | Err(e @ FocusSessionError::InvalidDuration)
        | Err(e @ FocusSessionError::InvalidTimeRange) => {
            Ok(HttpResponse::BadRequest().json(ApiError {
                error: "validation_error".to_string(),
                message: e.to_string(),
            }))
        }
        Err(e) => {
            log::error!("Error recording focus session: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to record focus session".to_string(),
            }))
        }
    }
}

async fn delete_session(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
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

    let session_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid session ID format".to_string(),
            }));
        }
    };

    match session_service::delete_session(&state.db, &user_id, &session_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(FocusSessionError::NotFound) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Focus session not found".to_string(),
        })),
        Err(e) => {
            log::error!("Error deleting focus session: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to delete focus session".to_string(),
            }))
        }
    }
}
