//! Trait for time-series stores.

use crate::error::Result;
use crate::store::point::Point;
use async_trait::async_trait;

/// A destination for points.
///
/// Network and authentication faults are reported as
/// [`CollectorError::StoreWrite`](crate::CollectorError::StoreWrite).
#[async_trait]
pub trait Store: Send + Sync {
    /// Write one point.
    async fn write(&self, point: &Point) -> Result<()>;
}
