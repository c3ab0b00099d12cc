mod auth;

pub use auth::{LoginState, RequireLogin};
