// gallery-core/src/service/applier.rs
use std::sync::Arc;

use futures::FutureExt;
use gallery_common::error::Result;
use gallery_common::operation::{GalleryOp, OpKind, OpTarget};
use gallery_common::Config;
use reqwest::Client;
use tracing::{debug, instrument};

use super::{OpContext, OpHandler};
use crate::catalog::LookupPolicy;
use crate::install::{
    install_backend_from_gallery, install_model_from_config_url, install_model_from_gallery,
    InstallContext,
};
use crate::uninstall::{delete_backend_from_system, delete_model_from_system};

/// Handler that installs and deletes models and backends under the paths and
/// galleries of `config`.
pub fn default_handler(config: Arc<Config>, client: Client) -> OpHandler {
    Arc::new(move |op: GalleryOp, ctx: OpContext| {
        let config = Arc::clone(&config);
        let client = client.clone();
        async move { apply_op(&config, &client, op, ctx).await }.boxed()
    })
}

#[instrument(skip_all, fields(op = %op.id, kind = ?op.kind, target = %op.target_id))]
async fn apply_op(config: &Config, client: &Client, op: GalleryOp, ctx: OpContext) -> Result<()> {
    let reporter = ctx.clone();
    let progress = move |_url: &str, file_name: &str, status: &str, percent: f64| {
        reporter.report_progress(file_name, status, percent);
    };
    let install = InstallContext {
        client,
        progress: Some(&progress),
        cancel: Some(ctx.cancel_flag()),
        enforce_scan: config.enforce_scan,
    };
    let policy = LookupPolicy::from_strict(config.strict_lookup);
    let request = &op.request;

    match (op.kind, op.target) {
        (OpKind::Install, OpTarget::Model) => match request.config_url.as_deref() {
            Some(url) if !url.is_empty() => {
                debug!("Installing model from config URL {}", url);
                install_model_from_config_url(install, &config.models_path, url, request).await?;
            }
            _ => {
                let galleries = request.galleries.as_deref().unwrap_or(&config.galleries);
                install_model_from_gallery(
                    install,
                    galleries,
                    &config.models_path,
                    &op.target_id,
                    request,
                    policy,
                )
                .await?;
            }
        },
        (OpKind::Install, OpTarget::Backend) => {
            let galleries = request
                .galleries
                .as_deref()
                .unwrap_or(&config.backend_galleries);
            install_backend_from_gallery(
                install,
                galleries,
                &config.backends_path,
                &op.target_id,
                request,
                policy,
            )
            .await?;
        }
        (OpKind::Delete, OpTarget::Model) => {
            delete_model_from_system(&config.models_path, &op.target_id)?
        }
        (OpKind::Delete, OpTarget::Backend) => {
            delete_backend_from_system(&config.backends_path, &op.target_id)?
        }
    }
    Ok(())
}
