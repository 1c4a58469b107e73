use tokio::time::{sleep, Duration};
use tracing::trace;

/// Fixed wait that yields to the runtime; zero is a no-op.
pub(crate) async fn pause(ms: u64) {
    if ms == 0 {
        return;
    }
    trace!(ms, "pausing");
    sleep(Duration::from_millis(ms)).await;
}
