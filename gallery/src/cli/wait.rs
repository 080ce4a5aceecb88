// gallery/src/cli/wait.rs
use std::time::Duration;

use colored::Colorize;
use gallery_common::error::{GalleryError, Result};
use gallery_common::operation::OpState;
use gallery_core::GalleryEndpoints;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Polls the status of `id` until it is terminal. Ctrl-C requests
/// cancellation and keeps waiting for the worker to acknowledge it.
pub async fn wait_for_operation(endpoints: &GalleryEndpoints, id: &str, label: &str) -> Result<()> {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.blue} {prefix:.bold} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_prefix(label.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));

    let mut cancel_requested = false;
    let status = loop {
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = tokio::signal::ctrl_c(), if !cancel_requested => {
                cancel_requested = true;
                bar.set_message("cancelling...");
                if let Err(e) = endpoints.cancel(id) {
                    warn!("Could not cancel {}: {}", id, e);
                }
            }
        }
        // Not visible until the worker picks the operation up
        let Ok(status) = endpoints.op_status(id) else {
            continue;
        };
        if status.state.is_terminal() {
            break status;
        }
        bar.set_position(status.progress as u64);
        if !cancel_requested {
            bar.set_message(status.message.clone());
        }
    };
    bar.finish_and_clear();
    debug!("Operation {} finished: {:?}", id, status);

    match status.state {
        OpState::Completed => {
            println!("{} {}", "==>".bold().green(), format!("{label}: done").bold());
            Ok(())
        }
        OpState::Cancelled => {
            println!("{} {}", "==>".bold().yellow(), format!("{label}: cancelled").bold());
            Err(GalleryError::Cancelled)
        }
        OpState::Error | OpState::Processing => Err(GalleryError::Generic(
            status.error.unwrap_or(status.message),
        )),
    }
}
