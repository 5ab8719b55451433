pub mod analytics;
pub mod auth;
pub mod dividend;
pub mod market;
pub mod notice;
pub mod position;
pub mod projection;
pub mod settings;
