// Presentation layer - HTTP surface for drawing, rule editing and time controls
pub mod app_state;
pub mod handlers;
