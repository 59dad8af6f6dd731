use tokio::sync::oneshot;

/// Receiver for one pick. `Ok(Some(uri))` is a chosen file; `Ok(None)` or a
/// dropped sender is a cancellation. Resolves exactly once.
pub type PickResult = oneshot::Receiver<Option<String>>;

/// The host's file-selection dialog.
pub trait FilePicker: Send + Sync {
    /// Ask the user for a file matching `mime_filter` (e.g. `video/*`).
    fn pick(&self, mime_filter: &str) -> PickResult;
}

/// Picker for hosts without a file dialog. Every request is cancelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPicker;

impl FilePicker for NoPicker {
    fn pick(&self, mime_filter: &str) -> PickResult {
        tracing::debug!(mime_filter, "no file picker available; cancelling");
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(None);
        rx
    }
}
