use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/rounds", round_routes())
        .nest("/sessions", session_routes())
        .nest("/round3", round3_routes())
        .nest("/review/round3", review_routes())
        .nest("/leaderboard", leaderboard_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
        .routes(routes!(handlers::auth::bulk_provision))
}

fn round_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::access::get_access))
        .routes(routes!(handlers::access::set_access))
}

fn session_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::session::start_session))
        .routes(routes!(handlers::session::current_session))
        .routes(routes!(handlers::session::submit_answer))
        .routes(routes!(handlers::session::advance_question))
        .routes(routes!(handlers::session::finalize_session))
}

fn round3_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::round3::set_track))
        .routes(routes!(handlers::round3::list_challenges))
        .routes(routes!(
            handlers::round3::submit_challenge,
            handlers::round3::list_own_submissions
        ))
}

fn review_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::review::list_submissions))
        .routes(routes!(handlers::review::apply_score))
}

fn leaderboard_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::leaderboard::get_leaderboard))
}
