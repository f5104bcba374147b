// Domain layer - geometry, time windows, rules and aggregation
pub mod error;
pub mod geometry;
pub mod rule;
pub mod series;
pub mod time_window;
