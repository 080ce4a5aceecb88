// gallery/src/cli/search.rs
use clap::Args;
use gallery_common::error::Result;
use gallery_core::catalog::search_elements;
use gallery_core::GalleryEndpoints;
use tracing::debug;

use super::list::print_elements;

#[derive(Args, Debug)]
pub struct Search {
    pub term: String,
    /// Search the backend galleries instead of the model galleries
    #[arg(long)]
    pub backends: bool,
}

impl Search {
    pub async fn run(&self, endpoints: &GalleryEndpoints) -> Result<()> {
        debug!("Searching galleries for: {}", self.term);
        println!("Searching for \"{}\"", self.term);
        if self.backends {
            let backends = endpoints.list_gallery_backends().await?;
            let matches: Vec<_> = search_elements(&backends, &self.term)
                .into_iter()
                .cloned()
                .collect();
            print_elements(&matches, false, "backends");
        } else {
            let models = endpoints.list_models().await?;
            let matches: Vec<_> = search_elements(&models, &self.term)
                .into_iter()
                .cloned()
                .collect();
            print_elements(&matches, false, "models");
        }
        Ok(())
    }
}
