// Presentation layer - JSON facade over the datasource
pub mod app_state;
pub mod handlers;
