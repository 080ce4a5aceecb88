// gallery-core/src/endpoints.rs
//! Transport-agnostic control plane: what an HTTP or CLI front end calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use gallery_common::error::{GalleryError, Result};
use gallery_common::model::{BackendEntry, GalleryElement, GallerySource};
use gallery_common::operation::{InstallRequest, OpKind, OpStatus, OpTarget};
use gallery_common::{Config, GalleryBackend, GalleryModel};
use gallery_net::build_http_client;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::catalog::{available_backends, available_models, find_gallery_element, LookupPolicy};
use crate::registry::BackendRegistry;
use crate::service::GalleryService;

/// Body of an install call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyRequest {
    /// Catalog name, optionally qualified as `<gallery>@<name>`.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub target: OpTarget,
    #[serde(flatten)]
    pub request: InstallRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpResponse {
    #[serde(rename = "uuid")]
    pub id: String,
    pub status_url: String,
}

pub struct GalleryEndpoints {
    config: Arc<Config>,
    client: Client,
    service: GalleryService,
    registry: Mutex<BackendRegistry>,
}

impl GalleryEndpoints {
    pub fn new(config: Arc<Config>, client: Client, service: GalleryService) -> Result<Self> {
        let registry = BackendRegistry::load_from_path(&config.backend_registry_path())?;
        Ok(Self {
            config,
            client,
            service,
            registry: Mutex::new(registry),
        })
    }

    /// Builds the HTTP client and starts the operation worker.
    pub fn start(config: Config) -> Result<(Self, JoinHandle<()>)> {
        let config = Arc::new(config);
        let client = build_http_client()?;
        let (service, worker) = GalleryService::start(Arc::clone(&config), client.clone());
        Ok((Self::new(config, client, service)?, worker))
    }

    fn policy(&self) -> LookupPolicy {
        LookupPolicy::from_strict(self.config.strict_lookup)
    }

    fn galleries_for<'a>(&'a self, target: OpTarget, request: &'a InstallRequest) -> &'a [GallerySource] {
        match (&request.galleries, target) {
            (Some(galleries), _) => galleries,
            (None, OpTarget::Model) => &self.config.galleries,
            (None, OpTarget::Backend) => &self.config.backend_galleries,
        }
    }

    fn status_url(&self, target: OpTarget, id: &str) -> String {
        let base = self.config.api_base_url.trim_end_matches('/');
        let section = match target {
            OpTarget::Model => "models",
            OpTarget::Backend => "backends",
        };
        format!("{base}/{section}/jobs/{id}")
    }

    /// Locates the element first so lookup errors reach the caller directly,
    /// then queues the install under its qualified name.
    #[instrument(skip(self, req), fields(id = %req.id, target = ?req.target))]
    pub async fn apply(&self, req: ApplyRequest) -> Result<OpResponse> {
        let has_config_url = req
            .request
            .config_url
            .as_deref()
            .is_some_and(|url| !url.is_empty());
        if has_config_url && req.target == OpTarget::Backend {
            return Err(GalleryError::ValidationError(
                "config_url installs are only supported for models".to_string(),
            ));
        }

        let target_id = if has_config_url {
            req.id.clone()
        } else {
            if req.id.trim().is_empty() {
                return Err(GalleryError::ValidationError(
                    "an element name is required".to_string(),
                ));
            }
            let galleries = self.galleries_for(req.target, &req.request);
            match req.target {
                OpTarget::Model => {
                    let models: Vec<GalleryModel> =
                        available_models(&self.client, galleries, &self.config.models_path).await?;
                    find_gallery_element(&models, &req.id, self.policy())?.qualified_name()
                }
                OpTarget::Backend => {
                    let backends: Vec<GalleryBackend> =
                        available_backends(&self.client, galleries, &self.config.backends_path)
                            .await?;
                    find_gallery_element(&backends, &req.id, self.policy())?.qualified_name()
                }
            }
        };

        let id = self
            .service
            .submit(OpKind::Install, req.target, target_id, req.request)?;
        Ok(OpResponse {
            status_url: self.status_url(req.target, &id),
            id,
        })
    }

    pub fn delete(&self, target: OpTarget, name: &str) -> Result<OpResponse> {
        let id = self
            .service
            .submit(OpKind::Delete, target, name, InstallRequest::default())?;
        Ok(OpResponse {
            status_url: self.status_url(target, &id),
            id,
        })
    }

    pub fn op_status(&self, id: &str) -> Result<OpStatus> {
        self.service
            .status(id)
            .ok_or_else(|| GalleryError::NotFound("could not find any status for ID".to_string()))
    }

    pub fn all_status(&self) -> HashMap<String, OpStatus> {
        self.service.all_status()
    }

    pub fn cancel(&self, id: &str) -> Result<()> {
        if self.service.cancel(id) {
            Ok(())
        } else {
            Err(GalleryError::NotFound(format!(
                "no pending operation with ID {id}"
            )))
        }
    }

    pub async fn list_models(&self) -> Result<Vec<GalleryModel>> {
        available_models(&self.client, &self.config.galleries, &self.config.models_path).await
    }

    pub async fn list_gallery_backends(&self) -> Result<Vec<GalleryBackend>> {
        available_backends(
            &self.client,
            &self.config.backend_galleries,
            &self.config.backends_path,
        )
        .await
    }

    fn registry(&self) -> MutexGuard<'_, BackendRegistry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn list_backends(&self) -> Vec<BackendEntry> {
        self.registry().list().to_vec()
    }

    pub fn add_backend(&self, entry: BackendEntry) -> Result<()> {
        debug!("Adding static backend '{}'", entry.name);
        self.registry().add(entry)
    }

    pub fn remove_backend(&self, name: &str) -> Result<()> {
        self.registry().remove(name).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn apply_request_reads_flattened_install_fields() {
        let req: ApplyRequest = serde_json::from_str(
            r#"{
                "id": "localai@phi-2",
                "name": "phi",
                "overrides": {"context_size": 4096},
                "files": [{"filename": "phi.gguf", "uri": "https://x/phi.gguf"}]
            }"#,
        )
        .unwrap();
        assert_eq!(req.id, "localai@phi-2");
        assert_eq!(req.target, OpTarget::Model);
        assert_eq!(req.request.name.as_deref(), Some("phi"));
        assert_eq!(req.request.overrides.len(), 1);
        assert_eq!(req.request.additional_files[0].filename, "phi.gguf");
        assert!(req.request.config_url.is_none());
    }

    #[test]
    fn response_uses_uuid_key() {
        let response = OpResponse {
            id: "abc".into(),
            status_url: "http://localhost:8080/models/jobs/abc".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["uuid"], "abc");
    }
}
