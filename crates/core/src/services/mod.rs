pub mod analytics_service;
pub mod color_service;
pub mod dividend_service;
pub mod position_service;
pub mod projection_service;
pub mod returns_service;
pub mod valuation_service;
