//! Request handler module
//!
//! Routes every request to the runtime config script, build assets, skin
//! assets, or the HTML shell.

pub mod router;
pub mod shell;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
