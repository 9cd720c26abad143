use actix_web::{web, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, CreateTaskListRequest, TaskListsResponse};
use uuid::Uuid;

use crate::models::AppState;
use crate::services::task_lists as list_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/lists")
            .route("", web::get().to(list_lists))
            .route("", web::post().to(create_list))
            .route("/{list_id}", web::delete().to(delete_list)),
    );
}

async fn list_lists(state: web::Data<AppState>, req: actix_web::HttpRequest) -> Result<HttpResponse> {
    let user_id = match crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing token".to_string(),
            }));
        }
    };

    match list_service::list_lists(&state.db, &user_id).await {
        Ok(lists) => Ok(HttpResponse::Ok().json(ApiSuccess::new(TaskListsResponse { lists }))),
        Err(e) => {
            log::error!("Error listing task lists: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list task lists".to_string(),
            }))
        }
    }
}

async fn create_list(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<CreateTaskListRequest>,
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

    match list_service::create_list(&state.db, &user_id, &body).await {
        Ok(list) => Ok(HttpResponse::Created().json(ApiSuccess::new(list))),
        Err(list_service::TaskListError::EmptyName) => Ok(HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: "Task list name cannot be empty".to_string(),
        })),
        Err(e) => {
            log::error!("Error creating task list: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to create task list".to_string(),
            }))
        }
    }
}

async fn delete_list(
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

    let list_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid task list ID format".to_string(),
            }));
        }
    };

    match list_service::delete_list(&state.db, &user_id, &list_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(list_service::TaskListError::NotFound) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Task list not found".to_string(),
        })),
        Err(e) => {
            log::error!("Error deleting task list: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to delete task list".to_string(),
            }))
        }
    }
}
