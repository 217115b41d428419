pub mod json_error;
pub mod jwt;
pub mod login;
pub mod register;
pub mod server_config;
pub mod user;

pub use self::json_error::ErrorResponse;
pub use self::jwt::JwtClaims;
pub use self::login::{AuthResponse, LoginData, LogoutData};
pub use self::register::RegistrationData;
pub use self::user::User;
