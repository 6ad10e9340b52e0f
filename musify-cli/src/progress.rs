use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use musify_parser::{ProgressCallback, ProgressEvent};
use parking_lot::Mutex;

/// Draws one progress bar per track from the downloader's progress events.
pub struct ProgressRenderer {
    bar: Arc<Mutex<Option<ProgressBar>>>,
    hidden: bool,
}

impl ProgressRenderer {
    pub fn new(hidden: bool) -> Self {
        Self {
            bar: Arc::new(Mutex::new(None)),
            hidden,
        }
    }

    pub fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        let hidden = self.hidden;

        Arc::new(move |event: ProgressEvent| match event {
            ProgressEvent::Started { file_name, total } => {
                let pb = create_bar(total, hidden);
                pb.set_message(file_name);
                if let Some(previous) = bar.lock().replace(pb) {
                    previous.abandon();
                }
            }
            ProgressEvent::Advanced { bytes } => {
                if let Some(pb) = bar.lock().as_ref() {
                    pb.inc(bytes);
                }
            }
            ProgressEvent::Finished { .. } => {
                if let Some(pb) = bar.lock().take() {
                    pb.finish();
                }
            }
        })
    }

    /// Leave the current bar where it stopped, after a failed or interrupted download.
    pub fn abandon(&self) {
        if let Some(pb) = self.bar.lock().take() {
            pb.abandon();
        }
    }
}

fn create_bar(total: Option<u64>, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    match total {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::with_template(
                    "[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
                )
                .unwrap()
                .progress_chars("█▓░"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {bytes} {msg}")
                    .unwrap(),
            );
            pb
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_drive_current_bar() {
        let renderer = ProgressRenderer::new(true);
        let callback = renderer.callback();

        callback(ProgressEvent::Started {
            file_name: "a.mp3".to_string(),
            total: Some(10),
        });
        callback(ProgressEvent::Advanced { bytes: 4 });
        callback(ProgressEvent::Advanced { bytes: 3 });
        assert_eq!(
            renderer.bar.lock().as_ref().map(|pb| pb.position()),
            Some(7)
        );

        callback(ProgressEvent::Finished { written: 7 });
        assert!(renderer.bar.lock().is_none());
    }

    #[test]
    fn test_abandon_clears_bar() {
        let renderer = ProgressRenderer::new(true);
        let callback = renderer.callback();
        callback(ProgressEvent::Started {
            file_name: "a.mp3".to_string(),
            total: None,
        });

        renderer.abandon();
        assert!(renderer.bar.lock().is_none());
        callback(ProgressEvent::Advanced { bytes: 1 });
    }
}
