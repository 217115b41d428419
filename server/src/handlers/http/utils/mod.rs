pub mod body;
pub mod json_response;
pub mod validation;

pub use body::*;
pub use json_response::*;
pub use validation::*;
