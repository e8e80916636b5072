pub mod auth;
pub mod rate_limit;
pub mod response;

pub use auth::{basic_auth_middleware, AuthUser, Credentials};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
pub use response::{ApiResponse, ApiResult};
