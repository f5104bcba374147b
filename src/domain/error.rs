// Domain errors surfaced to callers
use super::geometry::{MAX_POLYGON_POINTS, MIN_POLYGON_POINTS};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    #[error("polygon must have between {min} and {max} points, got {count}", min = MIN_POLYGON_POINTS, max = MAX_POLYGON_POINTS)]
    PointCount { count: usize },
}
