//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from routing.

pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use cache::CachePolicy;
pub use response::{
    build_304_response, build_404_response, build_405_response, build_500_response,
    build_cached_response, build_html_response, build_options_response, build_script_response,
};
