use std::sync::Arc;

use aparajito_bridge::picker::FilePicker;

/// The file picker for this build: a native dialog with the
/// `native-dialog` feature, otherwise one that cancels every request.
pub fn host_picker() -> Arc<dyn FilePicker> {
    #[cfg(feature = "native-dialog")]
    {
        tracing::info!("Local file picking via native dialog");
        Arc::new(dialog::DialogPicker)
    }
    #[cfg(not(feature = "native-dialog"))]
    {
        tracing::info!("Built without native-dialog; local file picks are cancelled");
        Arc::new(aparajito_bridge::NoPicker)
    }
}

#[cfg(feature = "native-dialog")]
mod dialog {
    use aparajito_bridge::picker::{FilePicker, PickResult};
    use tokio::sync::oneshot;

    const VIDEO_EXTENSIONS: &[&str] = &[
        "mp4", "mkv", "webm", "mov", "avi", "m4v", "ts", "m2ts", "flv", "wmv", "3gp", "ogv",
    ];

    /// Dialog extensions for a MIME filter. Empty means no filter.
    pub fn extensions_for(mime_filter: &str) -> &'static [&'static str] {
        if mime_filter.starts_with("video/") {
            VIDEO_EXTENSIONS
        } else {
            &[]
        }
    }

    pub struct DialogPicker;

    impl FilePicker for DialogPicker {
        fn pick(&self, mime_filter: &str) -> PickResult {
            let (tx, rx) = oneshot::channel();
            let extensions = extensions_for(mime_filter);
            tokio::spawn(async move {
                let mut dialog = rfd::AsyncFileDialog::new().set_title("Open video");
                if !extensions.is_empty() {
                    dialog = dialog.add_filter("Video", extensions);
                }
                let uri = dialog
                    .pick_file()
                    .await
                    .map(|file| file.path().display().to_string());
                // The runtime may have moved on to a newer pick.
                let _ = tx.send(uri);
            });
            rx
        }
    }

}
