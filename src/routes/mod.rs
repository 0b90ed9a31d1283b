pub mod admin;
pub mod agent;
pub mod auth;
pub mod health;
pub mod system;
pub mod tickets;

#[cfg(test)]
pub(crate) mod test_support;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use auth::{admin_gate, handle_login, handle_register, staff_gate};

/// Room for the text fields and multipart framing around an attachment.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Every route the portal serves. Rate limiting and CORS are added by the binary.
pub fn app_router(state: AppState) -> Router {
    build_router(state, |auth| auth)
}

/// Like [`app_router`], with `wrap_auth` applied to the `/auth` routes only
/// (the binary uses it for the stricter login limiter).
pub fn build_router<F>(state: AppState, wrap_auth: F) -> Router
where
    F: FnOnce(Router<AppState>) -> Router<AppState>,
{
    let auth_routes = wrap_auth(
        Router::new()
            .route("/register", post(handle_register))
            .route("/login", post(handle_login)),
    );

    let ticket_routes = Router::new()
        .route(
            "/create",
            post(tickets::create_ticket).layer(DefaultBodyLimit::max(
                state.max_attachment_bytes + FORM_OVERHEAD_BYTES,
            )),
        )
        .route("/search", post(tickets::search_ticket))
        .route("/my-tickets", get(tickets::my_tickets))
        .route("/{id}/responses", get(tickets::list_responses))
        .route("/{id}/customer-respond", post(tickets::customer_respond));

    let agent_routes = Router::new()
        .route("/tickets", get(agent::list_tickets))
        .route("/users", get(agent::list_agents))
        .route("/tickets/{id}/respond", post(agent::respond))
        .route("/tickets/{id}/status", put(agent::update_status))
        .route("/profile", get(agent::profile))
        .route_layer(from_fn_with_state(state.clone(), staff_gate));

    let admin_routes = Router::new()
        .route("/stats", get(admin::stats))
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/activity-logs", get(admin::activity_logs))
        .route("/tickets", get(admin::list_tickets))
        .route("/tickets/{id}/assign", put(admin::assign_ticket))
        .route("/notify-failover", post(admin::notify_failover))
        .route_layer(from_fn_with_state(state.clone(), admin_gate));

    let system_routes =
        Router::new().route("/status", get(system::get_status).put(system::update_status));

    Router::new()
        .route("/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/tickets", ticket_routes)
        .nest("/agent", agent_routes)
        .nest("/admin", admin_routes)
        .nest("/system", system_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
