use actix_web::{web, HttpResponse, Result};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use shared::{ApiError, ApiSuccess, Granularity};

use crate::models::AppState;
use crate::services::analytics::{self as analytics_service, AnalyticsError};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/analytics")
            .route("/daily", web::get().to(daily_report))
            .route("/period", web::get().to(period_report)),
    );
}

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    pub date: Option<NaiveDate>,
    pub tz: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub granularity: Option<String>,
    pub tz: Option<String>,
}

fn analytics_error_response(e: AnalyticsError) -> HttpResponse {
    match e {
        AnalyticsError::InvalidRange | AnalyticsError::InvalidTimezone(_) => {
            HttpResponse::BadRequest().json(ApiError {
                error: "validation_error".to_string(),
                message: e.to_string(),
            })
        }
        e => {
            log::error!("Error building analytics report: {:?}", e);
            HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to build report".to_string(),
            })
        }
    }
}

async fn daily_report(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    query: web::Query<DailyQuery>,
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

    let tz_name = query.tz.as_deref().unwrap_or(&state.config.default_timezone);
    let tz = match analytics_service::parse_timezone(tz_name) {
        Ok(tz) => tz,
        Err(e) => return Ok(analytics_error_response(e)),
    };
    let date = query
        .date
        .unwrap_or_else(|| Utc::now().with_timezone(&tz).date_naive());

    match analytics_service::daily_report(
        &state.db,
        &user_id,
        date,
        tz,
        state.config.focus_duration_minutes,
    )
    .await
    {
        Ok(report) => Ok(HttpResponse::Ok().json(ApiSuccess::new(report))),
        Err(e) => Ok(analytics_error_response(e)),
    }
}

async fn period_report(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    query: web::Query<PeriodQuery>,
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

    let granularity = match query.granularity.as_deref() {
        None => Granularity::Day,
        Some(value) => match value.parse::<Granularity>() {
            Ok(granularity) => granularity,
            Err(_) => {
                return Ok(HttpResponse::BadRequest().json(ApiError {
                    error: "validation_error".to_string(),
                    message: format!("Unknown granularity: {}", value),
                }));
            }
        },
    };

    let tz_name = query.tz.as_deref().unwrap_or(&state.config.default_timezone);
    let tz = match analytics_service::parse_timezone(tz_name) {
        Ok(tz) => tz,
        Err(e) => return Ok(analytics_error_response(e)),
    };

    match analytics_service::period_report(
        &state.db,
        &user_id,
        query.from,
        query.to,
        granularity,
        tz,
        state.config.focus_duration_minutes,
    )
    .await
    {
        Ok(report) => Ok(HttpResponse::Ok().json(ApiSuccess::new(report))),
        Err(e) => Ok(analytics_error_response(e)),
    }
}
