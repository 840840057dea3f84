//! Progress reporting seam between the sync coordinator and a UI.
//!
//! The library never renders anything itself; the binary plugs in an
//! indicatif-backed observer. Reporting never influences control flow.

/// Creates one progress handle per file transfer.
pub trait ProgressObserver: Send + Sync {
    /// Starts tracking a transfer labelled `label` with an optional byte total.
    fn start(&self, label: &str, total: Option<u64>) -> Box<dyn TransferProgress>;
}

/// Progress of a single transfer.
///
/// Methods take `&self` so one handle can be shared by every retry attempt.
pub trait TransferProgress: Send + Sync {
    /// Adds `bytes` to the transferred count.
    fn advance(&self, bytes: u64);

    /// Updates the expected total once it is known from the response.
    fn set_total(&self, _total: u64) {}

    /// Resets the transferred count before a new attempt.
    fn restart(&self) {}

    /// Marks the transfer finished, successfully or not.
    fn finish(&self, _success: bool) {}
}

/// Observer that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn start(&self, _label: &str, _total: Option<u64>) -> Box<dyn TransferProgress> {
        Box::new(NoopProgress)
    }
}

impl TransferProgress for NoopProgress {
    fn advance(&self, _bytes: u64) {}
}
