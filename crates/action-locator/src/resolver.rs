use handoff_core_types::{ElementSnapshot, SurfaceError};
use std::sync::Arc;
use tracing::trace;

use crate::ports::SurfacePort;
use crate::types::Criterion;

/// Pick the first element, in document order, that satisfies `criterion`.
pub fn first_match<'a>(
    criterion: &Criterion,
    elements: &'a [ElementSnapshot],
) -> Option<&'a ElementSnapshot> {
    elements
        .iter()
        .find(|element| criterion.matches_text(&element.text))
}

/// Resolves criteria against the surface with exactly one scan per call.
///
/// Zero matches is a normal `Ok(None)`; only surface failures are errors.
#[derive(Clone)]
pub struct Locator {
    surface: Arc<dyn SurfacePort>,
}

impl Locator {
    pub fn new(surface: Arc<dyn SurfacePort>) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> &Arc<dyn SurfacePort> {
        &self.surface
    }

    /// One scan, best match or none.
    pub async fn locate(&self, criterion: &Criterion) -> Result<Option<ElementSnapshot>, SurfaceError> {
        let elements = self.surface.query_all(criterion.selector()).await?;
        let found = first_match(criterion, &elements).cloned();
        trace!(
            target_text = criterion.describe(),
            candidates = elements.len(),
            hit = found.is_some(),
            "scanned surface"
        );
        Ok(found)
    }

    /// One scan returning every element under `selector`.
    pub async fn locate_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, SurfaceError> {
        self.surface.query_all(selector).await
    }
}
