use actix_web::{web, HttpResponse, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{
    ApiError, ApiSuccess, CreateSubtaskRequest, CreateTaskRequest, TasksResponse,
    UpdateTaskRequest, UpdateTaskStatusRequest,
};
use uuid::Uuid;

use crate::models::AppState;
use crate::services::tasks::{self as task_service, TaskError, TaskFilter};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tasks")
            .route("", web::get().to(list_tasks))
            .route("", web::post().to(create_task))
            .route("/{task_id}", web::get().to(get_task))
            .route("/{task_id}", web::put().to(update_task))
            .route("/{task_id}", web::delete().to(delete_task))
            .route("/{task_id}/status", web::post().to(update_status))
            .route("/{task_id}/subtasks", web::post().to(add_subtask))
            .route("/{task_id}/subtasks/{subtask_id}", web::put().to(toggle_subtask))
            .route("/{task_id}/subtasks/{subtask_id}", web::delete().to(delete_subtask)),
    );
}

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub list_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteTaskQuery {
    #[serde(default)]
    pub series: bool,
}

fn task_error_response(e: TaskError, action: &str) -> HttpResponse {
    let (status, error, message) = match &e {
        TaskError::NotFound => (actix_web::http::StatusCode::NOT_FOUND, "not_found", e.to_string()),
        TaskError::SubtaskNotFound => {
            (actix_web::http::StatusCode::NOT_FOUND, "not_found", e.to_string())
        }
        TaskError::ListNotFound
        | TaskError::CategoryNotFound
        | TaskError::EmptyTitle
        | TaskError::InvalidTimeRange
        | TaskError::InvalidEstimate
        | TaskError::InvalidRecurrence(_) => {
            (actix_web::http::StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        }
        TaskError::DatabaseError(_) => {
            log::error!("Error trying to {} task: {:?}", action, e);
            (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                format!("Failed to {} task", action),
            )
        }
    };

    HttpResponse::build(status).json(ApiError {
        error: error.to_string(),
        message,
    })
}

fn parse_id(value: &str, what: &str) -> std::result::Result<Uuid, HttpResponse> {
    Uuid::parse_str(value).map_err(|_| {
        HttpResponse::BadRequest().json(ApiError {
            error: "invalid_id".to_string(),
            message: format!("Invalid {} ID format", what),
        })
    })
}

async fn list_tasks(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    query: web::Query<TaskQuery>,
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

    let filter = TaskFilter {
        from: query.from,
        to: query.to,
        list_id: query.list_id,
    };

    match task_service::list_tasks(&state.db, &user_id, &filter).await {
        Ok(tasks) => Ok(HttpResponse::Ok().json(ApiSuccess::new(TasksResponse { tasks }))),
        Err(e) => Ok(task_error_response(e, "list")),
    }
}

async fn create_task(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<CreateTaskRequest>,
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

    match task_service::create_task(&state.db, &user_id, &body).await {
        Ok(task) => Ok(HttpResponse::Created().json(ApiSuccess::new(task))),
        Err(e) => Ok(task_error_response(e, "create")),
    }
}

async fn get_task(
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

    let task_id = match parse_id(&path.into_inner(), "task") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match task_service::get_task(&state.db, &user_id, &task_id).await {
        Ok(Some(task)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(task))),
        Ok(None) => Ok(task_error_response(TaskError::NotFound, "get")),
        Err(e) => Ok(task_error_response(e, "get")),
    }
}

async fn update_task(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateTaskRequest>,
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

    let task_id = match parse_id(&path.into_inner(), "task") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match task_service::update_task(&state.db, &user_id, &task_id, &body).await {
        Ok(task) => Ok(HttpResponse::Ok().json(ApiSuccess::new(task))),
        Err(e) => Ok(task_error_response(e, "update")),
    }
}

async fn update_status(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateTaskStatusRequest>,
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

    let task_id = match parse_id(&path.into_inner(), "task") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match task_service::update_status(&state.db, &user_id, &task_id, body.status).await {
        Ok(task) => Ok(HttpResponse::Ok().json(ApiSuccess::new(task))),
        Err(e) => Ok(task_error_response(e, "update")),
    }
}

async fn delete_task(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    query: web::Query<DeleteTaskQuery>,
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

    let task_id = match parse_id(&path.into_inner(), "task") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match task_service::delete_task(&state.db, &user_id, &task_id, query.series).await {
        Ok(_) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(task_error_response(e, "delete")),
    }
}

async fn add_subtask(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    body: web::Json<CreateSubtaskRequest>,
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

    let task_id = match parse_id(&path.into_inner(), "task") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match task_service::add_subtask(&state.db, &user_id, &task_id, &body).await {
        Ok(subtask) => Ok(HttpResponse::Created().json(ApiSuccess::new(subtask))),
        Err(e) => Ok(task_error_response(e, "add subtask to")),
    }
}

async fn toggle_subtask(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<(String, String)>,
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

    let (task_id_str, subtask_id_str) = path.into_inner();
    let task_id = match parse_id(&task_id_str, "task") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let subtask_id = match parse_id(&subtask_id_str, "subtask") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match task_service::toggle_subtask(&state.db, &user_id, &task_id, &subtask_id).await {
        Ok(subtask) => Ok(HttpResponse::Ok().json(ApiSuccess::new(subtask))),
        Err(e) => Ok(task_error_response(e, "toggle subtask of")),
    }
}

async fn delete_subtask(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<(String, String)>,
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

    let (task_id_str, subtask_id_str) = path.into_inner();
    let task_id = match parse_id(&task_id_str, "task") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let subtask_id = match parse_id(&subtask_id_str, "subtask") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match task_service::delete_subtask(&state.db, &user_id, &task_id, &subtask_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(task_error_response(e, "delete subtask of")),
    }
}
