use async_trait::async_trait;
use handoff_core_types::{ElementHandle, ElementSnapshot, SurfaceError};

/// The only I/O target of the engine.
///
/// Implementations wrap whatever drives the real surface (a browser
/// session, an accessibility tree, a recorded fixture). The engine assumes
/// nothing about timing beyond eventual consistency.
#[async_trait]
pub trait SurfacePort: Send + Sync {
    /// Snapshot of every element currently matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, SurfaceError>;

    /// Activate the element.
    async fn click(&self, element: &ElementHandle) -> Result<(), SurfaceError>;

    /// Replace the element's textual content and notify the surface of the change.
    async fn set_value(&self, element: &ElementHandle, value: &str) -> Result<(), SurfaceError>;
}
