// gallery/src/cli/delete.rs
use clap::Args;
use colored::Colorize;
use gallery_common::error::Result;
use gallery_common::operation::OpTarget;
use gallery_core::GalleryEndpoints;

use super::wait::wait_for_operation;

#[derive(Args, Debug)]
pub struct Delete {
    /// Installed name of the model or backend
    pub name: String,
    #[arg(long)]
    pub backend: bool,
}

impl Delete {
    pub async fn run(&self, endpoints: &GalleryEndpoints) -> Result<()> {
        let target = if self.backend {
            OpTarget::Backend
        } else {
            OpTarget::Model
        };
        let response = endpoints.delete(target, &self.name)?;
        println!(
            "{} Queued delete of {} ({})",
            "==>".bold().blue(),
            self.name.cyan(),
            response.id.dimmed()
        );
        wait_for_operation(endpoints, &response.id, &self.name).await
    }
}
