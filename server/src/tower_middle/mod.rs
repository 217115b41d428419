/// Tower middleware wrapped around the API router.
pub mod tower_timeout_handler;

pub use tower_timeout_handler::{TimeoutLayer, TimeoutService};
