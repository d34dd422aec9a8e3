//! HTTP server layer for Markdown Server.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            HTTP Layer                            │
//! │                          GET /{*path}                            │
//! │                                                                  │
//! │  ┌─────────────┐  ┌─────────────┐  ┌────────────┐  ┌──────────┐  │
//! │  │  handlers   │  │    page     │  │  listing   │  │  routes  │  │
//! │  │ (dispatch)  │  │ (composer)  │  │ (dir index)│  │ (router) │  │
//! │  └─────────────┘  └─────────────┘  └────────────┘  └──────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod listing;
pub mod page;
pub mod routes;

pub use handlers::{plan, serve_path, AppState, Step, INDEX_FILES};
pub use listing::{listing_page, read_listing, ListingEntry};
pub use page::{error_page, html_escape, PageShell, RenderedPage};
pub use routes::{create_router, RouterConfig, SERVER_HEADER};
