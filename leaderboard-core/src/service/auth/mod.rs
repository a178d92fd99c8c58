pub mod jwt;
pub mod validator;

pub use jwt::{Claims, JwtService};
pub use validator::JwtValidator;
