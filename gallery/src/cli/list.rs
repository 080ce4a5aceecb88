// gallery/src/cli/list.rs
use clap::Args;
use colored::Colorize;
use gallery_common::error::Result;
use gallery_common::model::GalleryElement;
use gallery_core::GalleryEndpoints;
use prettytable::{format, Cell, Row, Table};

const DESCRIPTION_WIDTH: usize = 60;

#[derive(Args, Debug)]
pub struct List {
    /// List backends instead of models
    #[arg(long)]
    pub backends: bool,
    /// Only show installed elements
    #[arg(long)]
    pub installed: bool,
}

impl List {
    pub async fn run(&self, endpoints: &GalleryEndpoints) -> Result<()> {
        if self.backends {
            let backends = endpoints.list_gallery_backends().await?;
            print_elements(&backends, self.installed, "backends");
        } else {
            let models = endpoints.list_models().await?;
            print_elements(&models, self.installed, "models");
        }
        Ok(())
    }
}

pub(crate) fn print_elements<T: GalleryElement>(elements: &[T], installed_only: bool, kind: &str) {
    let shown: Vec<&T> = elements
        .iter()
        .filter(|e| !installed_only || e.is_installed())
        .collect();
    if shown.is_empty() {
        println!("{}", format!("0 {kind} found").yellow());
        return;
    }
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.add_row(Row::new(vec![
        Cell::new("Gallery").style_spec("b"),
        Cell::new("Name").style_spec("b"),
        Cell::new("Installed").style_spec("b"),
        Cell::new("Description").style_spec("b"),
    ]));
    for element in &shown {
        table.add_row(Row::new(vec![
            Cell::new(&element.gallery().name).style_spec("Fg"),
            Cell::new(element.name()).style_spec("Fb"),
            Cell::new(if element.is_installed() { "✔" } else { "" }),
            Cell::new(&truncate(element.description(), DESCRIPTION_WIDTH)),
        ]));
    }
    table.printstd();
    let installed = shown.iter().filter(|e| e.is_installed()).count();
    println!(
        "{}",
        format!("{} {kind}, {installed} installed", shown.len()).bold()
    );
}

pub(crate) fn truncate(text: &str, width: usize) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() <= width {
        return line.to_string();
    }
    let cut: String = line.chars().take(width.saturating_sub(1)).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_first_line_within_width() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("first line\nsecond", 20), "first line");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
