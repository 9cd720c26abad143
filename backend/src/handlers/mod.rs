use actix_web::web;

pub mod analytics;
pub mod assistant;
pub mod categories;
pub mod daily_goals;
pub mod focus_sessions;
pub mod task_lists;
pub mod tasks;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(task_lists::configure)
            .configure(categories::configure)
            .configure(tasks::configure)
            .configure(focus_sessions::configure)
            .configure(daily_goals::configure)
            .configure(analytics::configure)
            .configure(assistant::configure),
    );
}
