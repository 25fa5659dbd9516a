/// OpenAPI documentation generation.
pub mod documentation;
/// Fan-out event construction and publication.
pub mod fanout_events;
/// Client for the external content generator and scorer.
pub mod generator;
/// Health check service.
pub mod health_service;
/// Match coordinator: invite, load and act on matches.
pub mod match_service;
/// Server-Sent Events streaming of match updates.
pub mod sse_service;
/// Background storage connection supervisor.
pub mod storage_supervisor;
/// WebSocket connection and message handling service.
pub mod websocket_service;
