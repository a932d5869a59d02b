//! HTTP server layer for keepr-assets.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │          GET /{index}/{path}[?width=N]   GET /images            │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │          routes             │  │
//! │  │ (requests, 404 mapping)  │  │  (router, CORS, tracing)    │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    asset_handler, health_handler, images_handler, AppState, ErrorResponse, HealthResponse,
    ImageEntry, ImagesResponse, RootFailureEntry, RESIZED_HEADER,
};
pub use routes::{create_router, RouterConfig};
