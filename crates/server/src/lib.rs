//! phishguard server
//!
//! WebSocket endpoint for real-time call transcription analysis plus a small
//! REST surface for non-streaming text analysis and service health.

pub mod http;
pub mod state;
pub mod websocket;

pub use http::create_router;
pub use state::AppState;
