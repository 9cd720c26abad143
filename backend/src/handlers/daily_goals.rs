use actix_web::{web, HttpResponse, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::{ApiError, ApiSuccess, SetDailyGoalRequest};

use crate::models::AppState;
use crate::services::daily_goals::{self as goal_service, DailyGoalError};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/goals")
            .route("", web::get().to(get_goal))
            .route("", web::put().to(set_goal)),
    );
}

#[derive(Debug, Deserialize)]
pub struct GoalQuery {
    pub date: NaiveDate,
}

async fn get_goal(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    query: web::Query<GoalQuery>,
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

    match goal_service::get_goal(&state.db, &user_id, query.date).await {
        Ok(Some(goal)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(goal))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "No goal set for this date".to_string(),
        })),
        Err(e) => {
            log::error!("Error loading daily goal: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to load daily goal".to_string(),
            }))
        }
    }
}

async fn set_goal(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<SetDailyGoalRequest>,
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

    match goal_service::set_goal(&state.db, &user_id, &body).await {
        Ok(goal) => Ok(HttpResponse::Ok().json(ApiSuccess::new(goal))),
        Err(DailyGoalError::InvalidGoal) => Ok(HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: "Goal minutes cannot be negative".to_string(),
        })),
        Err(e) => {
            log::error!("Error setting daily goal: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to set daily goal".to_string(),
            }))
        }
    }
}
