// Application layer - classification use cases and the polygon registry
pub mod classification_service;
pub mod polygon_registry;
pub mod series_provider;
