use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for Versus Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::matches::create_match,
        crate::routes::matches::get_match,
        crate::routes::matches::perform_action,
        crate::routes::sse::match_events,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::match_dto::CreateMatchRequest,
            crate::dto::match_dto::ActionRequest,
            crate::dto::match_dto::ActionResponse,
            crate::dto::match_dto::MatchView,
            crate::dto::match_dto::ModeStateView,
            crate::dto::match_dto::WinnerView,
            crate::dto::sse::ActionRejected,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "matches", description = "Invite, inspect and play versus matches"),
        (name = "fanout", description = "Realtime match updates over WebSocket and SSE"),
    )
)]
pub struct ApiDoc;
