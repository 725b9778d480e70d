//! Data layer for a recipe-sharing service: users, recipes, the rules that
//! guard them and the stores that keep them.

pub mod config;
pub mod error;
pub mod recipes;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod users;
pub mod validation;

pub use error::ServiceError;
pub use state::AppState;
pub use validation::ValidationErrors;
