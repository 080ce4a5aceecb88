// gallery/src/cli/install.rs
use clap::Args;
use colored::Colorize;
use gallery_common::error::{GalleryError, Result};
use gallery_common::model::File;
use gallery_common::operation::{InstallRequest, OpTarget};
use gallery_core::install::deep_merge;
use gallery_core::{ApplyRequest, GalleryEndpoints};
use serde_yaml_ng::{Mapping, Value};
use tracing::instrument;

use super::wait::wait_for_operation;

#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Element name, optionally qualified as <gallery>@<name>
    #[arg(required_unless_present = "config_url")]
    name: Option<String>,

    /// Install under a different local name
    #[arg(long = "as", value_name = "NAME")]
    install_as: Option<String>,

    /// Config override, dotted keys address nested values (parameters.top_p=0.9)
    #[arg(long = "override", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Extra file to download next to the model
    #[arg(long = "file", value_name = "NAME=URI[#SHA256]")]
    files: Vec<String>,

    #[arg(long, help = "Install from the backend galleries")]
    backend: bool,

    /// Install from a config document instead of a gallery
    #[arg(long, value_name = "URL", conflicts_with = "backend")]
    config_url: Option<String>,

    /// Return after queueing instead of waiting for completion
    #[arg(long)]
    no_wait: bool,
}

impl InstallArgs {
    #[instrument(skip(self, endpoints), fields(target = ?self.name))]
    pub async fn run(&self, endpoints: &GalleryEndpoints) -> Result<()> {
        let mut overrides = Mapping::new();
        for raw in &self.overrides {
            deep_merge(&mut overrides, &parse_override(raw)?);
        }
        let additional_files = self
            .files
            .iter()
            .map(|raw| parse_file(raw))
            .collect::<Result<Vec<_>>>()?;

        let target = if self.backend {
            OpTarget::Backend
        } else {
            OpTarget::Model
        };
        let name = self.name.clone().unwrap_or_default();
        let response = endpoints
            .apply(ApplyRequest {
                id: name.clone(),
                target,
                request: InstallRequest {
                    name: self.install_as.clone(),
                    overrides,
                    additional_files,
                    config_url: self.config_url.clone(),
                    ..Default::default()
                },
            })
            .await?;

        let label = self
            .install_as
            .clone()
            .or(self.name.clone())
            .or(self.config_url.clone())
            .unwrap_or_default();
        println!(
            "{} Queued install of {} ({})",
            "==>".bold().blue(),
            label.cyan(),
            response.id.dimmed()
        );
        if self.no_wait {
            println!("Status: {}", response.status_url);
            return Ok(());
        }
        wait_for_operation(endpoints, &response.id, &label).await
    }
}

/// `a.b=1` becomes `{a: {b: 1}}`; the value is read as YAML so numbers and
/// booleans keep their type.
pub(crate) fn parse_override(raw: &str) -> Result<Mapping> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        GalleryError::ValidationError(format!("override '{raw}' must be KEY=VALUE"))
    })?;
    if key.is_empty() || key.split('.').any(str::is_empty) {
        return Err(GalleryError::ValidationError(format!(
            "override '{raw}' has an empty key"
        )));
    }
    let mut value: Value = if value.is_empty() {
        Value::String(String::new())
    } else {
        serde_yaml_ng::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
    };
    for part in key.rsplit('.') {
        let mut mapping = Mapping::new();
        mapping.insert(Value::String(part.to_string()), value);
        value = Value::Mapping(mapping);
    }
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        _ => Err(GalleryError::ValidationError(format!(
            "override '{raw}' has an empty key"
        ))),
    }
}

/// `name=uri` or `name=uri#sha256`.
pub(crate) fn parse_file(raw: &str) -> Result<File> {
    let (filename, rest) = raw
        .split_once('=')
        .filter(|(name, uri)| !name.is_empty() && !uri.is_empty())
        .ok_or_else(|| {
            GalleryError::ValidationError(format!("file '{raw}' must be NAME=URI[#SHA256]"))
        })?;
    let (uri, sha256) = match rest.rsplit_once('#') {
        Some((uri, sha)) if sha.len() == 64 && sha.chars().all(|c| c.is_ascii_hexdigit()) => {
            (uri, sha)
        }
        _ => (rest, ""),
    };
    Ok(File {
        filename: filename.to_string(),
        sha256: sha256.to_string(),
        uri: uri.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn overrides_nest_dotted_keys_and_keep_types() {
        let parsed = parse_override("parameters.temperature=0.7").unwrap();
        let expected: Mapping = serde_yaml_ng::from_str("parameters:\n  temperature: 0.7\n").unwrap();
        assert_eq!(parsed, expected);

        let parsed = parse_override("f16=true").unwrap();
        assert_eq!(parsed.get("f16"), Some(&Value::Bool(true)));
        let parsed = parse_override("template=chat: {{.Input}}").unwrap();
        assert!(parsed.get("template").is_some());
    }

    #[test]
    fn malformed_overrides_are_rejected() {
        assert!(parse_override("no-equals").is_err());
        assert!(parse_override("=1").is_err());
        assert!(parse_override("a..b=1").is_err());
    }

    #[test]
    fn files_with_and_without_checksum() {
        let sha = "a".repeat(64);
        let file = parse_file(&format!("w.gguf=https://x/w.gguf#{sha}")).unwrap();
        assert_eq!(file.uri, "https://x/w.gguf");
        assert_eq!(file.sha256, sha);

        let file = parse_file("w.gguf=https://x/w.gguf#section").unwrap();
        assert_eq!(file.uri, "https://x/w.gguf#section");
        assert!(file.sha256.is_empty());

        assert!(parse_file("w.gguf").is_err());
        assert!(parse_file("=https://x").is_err());
    }
}
