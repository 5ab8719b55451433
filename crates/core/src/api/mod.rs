pub mod auth;
pub mod client;
pub mod market;
pub mod portfolio;
pub mod session;
