// Public API - what other modules can use
pub use handlers::router;
pub use service::LeagueService;

// Internal modules
pub mod aggregate;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod schema;
pub mod service;
pub mod types;
