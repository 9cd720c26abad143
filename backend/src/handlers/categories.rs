use actix_web::{web, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, CategoriesResponse, CreateCategoryRequest, UpdateCategoryRequest};
use uuid::Uuid;

use crate::models::AppState;
use crate::services::categories as category_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/categories")
            .route("", web::get().to(list_categories))
            .route("", web::post().to(create_category))
            .route("/{category_id}", web::get().to(get_category))
            .route("/{category_id}", web::put().to(update_category))
            .route("/{category_id}", web::delete().to(delete_category)),
    );
}

fn category_error_response(e: category_service::CategoryError, action: &str) -> HttpResponse {
    match e {
        category_service::CategoryError::NotFound => HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Category not found".to_string(),
        }),
        category_service::CategoryError::DuplicateName => HttpResponse::Conflict().json(ApiError {
            error: "duplicate_name".to_string(),
            message: "A category with this name already exists".to_string(),
        }),
        category_service::CategoryError::EmptyName => HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: "Category name cannot be empty".to_string(),
        }),
        category_service::CategoryError::DatabaseError(e) => {
            log::error!("Error trying to {} category: {:?}", action, e);
            HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: format!("Failed to {} category", action),
            })
        }
    }
}

async fn list_categories(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
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

    match category_service::list_categories(&state.db, &user_id).await {
        Ok(categories) => {
            Ok(HttpResponse::Ok().json(ApiSuccess::new(CategoriesResponse { categories })))
        }
        Err(e) => Ok(category_error_response(e, "list")),
    }
}

async fn create_category(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<CreateCategoryRequest>,
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

    match category_service::create_category(&state.db, &user_id, &body).await {
        Ok(category) => Ok(HttpResponse::Created().json(ApiSuccess::new(category))),
        Err(e) => Ok(category_error_response(e, "create")),
    }
}

async fn get_category(
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

    let category_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid category ID format".to_string(),
            }));
        }
    };

    match category_service::get_category(&state.db, &user_id, &category_id).await {
        Ok(Some(category)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(category))),
        Ok(None) => Ok(category_error_response(
            category_service::CategoryError::NotFound,
            "get",
        )),
        Err(e) => Ok(category_error_response(e, "get")),
    }
}

async fn update_category(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateCategoryRequest>,
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

    let category_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid category ID format".to_string(),
            }));
        }
    };

    match category_service::update_category(&state.db, &user_id, &category_id, &body).await {
        Ok(category) => Ok(HttpResponse::Ok().json(ApiSuccess::new(category))),
        Err(e) => Ok(category_error_response(e, "update")),
    }
}

async fn delete_category(
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

    let category_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid category ID format".to_string(),
            }));
        }
    };

    match category_service::delete_category(&state.db, &user_id, &category_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(category_error_response(e, "delete")),
    }
}
