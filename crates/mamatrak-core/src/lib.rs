//! Core MamaTrak library (sign-in flow, session storage, config).

pub mod auth;
pub mod config;
pub mod logging;
pub mod navigate;
pub mod session;
