// Application state for HTTP handlers
use crate::application::polygon_registry::PolygonRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: PolygonRegistry,
}
