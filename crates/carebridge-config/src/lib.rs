//! Configuration, paths, errors and logging shared by the Carebridge client crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    ClientConfig, Config, RefreshPolicy, DEFAULT_BASE_URL, DEFAULT_CSRF_COOKIE,
    DEFAULT_CSRF_HEADER, DEFAULT_IDENTITY_PATH, DEFAULT_LOGIN_PATH, DEFAULT_LOGOUT_PATH,
    DEFAULT_LOG_LEVEL, DEFAULT_REFRESH_PATH, DEFAULT_REFRESH_TIMEOUT_MS,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
