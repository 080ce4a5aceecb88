// gallery/src/cli/backends.rs
use clap::{Args, Subcommand};
use colored::Colorize;
use gallery_common::error::Result;
use gallery_common::model::BackendEntry;
use gallery_core::GalleryEndpoints;
use prettytable::{format, Cell, Row, Table};

#[derive(Args, Debug)]
pub struct Backends {
    #[command(subcommand)]
    pub action: BackendsAction,
}

#[derive(Subcommand, Debug)]
pub enum BackendsAction {
    /// Show statically configured backends
    List,
    /// Register a backend
    Add {
        name: String,
        #[arg(long = "type", default_value = "")]
        backend_type: String,
        #[arg(long, default_value = "")]
        uri: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        license: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Unregister a backend by name
    Remove { name: String },
}

impl Backends {
    pub fn run(&self, endpoints: &GalleryEndpoints) -> Result<()> {
        match &self.action {
            BackendsAction::List => {
                let entries = endpoints.list_backends();
                if entries.is_empty() {
                    println!("{}", "0 backends registered".yellow());
                    return Ok(());
                }
                let mut table = Table::new();
                table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
                table.add_row(Row::new(vec![
                    Cell::new("Name").style_spec("b"),
                    Cell::new("Type").style_spec("b"),
                    Cell::new("URI").style_spec("b"),
                    Cell::new("Description").style_spec("b"),
                ]));
                for entry in &entries {
                    table.add_row(Row::new(vec![
                        Cell::new(&entry.name).style_spec("Fb"),
                        Cell::new(&entry.backend_type),
                        Cell::new(&entry.uri),
                        Cell::new(&entry.description),
                    ]));
                }
                table.printstd();
                Ok(())
            }
            BackendsAction::Add {
                name,
                backend_type,
                uri,
                description,
                license,
                tags,
            } => {
                endpoints.add_backend(BackendEntry {
                    name: name.clone(),
                    backend_type: backend_type.clone(),
                    description: description.clone(),
                    uri: uri.clone(),
                    license: license.clone(),
                    tags: tags.clone(),
                    ..Default::default()
                })?;
                println!("{} Registered backend {}", "==>".bold().green(), name.cyan());
                Ok(())
            }
            BackendsAction::Remove { name } => {
                endpoints.remove_backend(name)?;
                println!("{} Removed backend {}", "==>".bold().green(), name.cyan());
                Ok(())
            }
        }
    }
}
