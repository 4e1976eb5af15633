use serde_json::json;
use std::sync::Arc;

use crate::cli::utils::{connect, load_config, output_success};
use crate::cli::OutputFormat;
use crate::services::UserService;

/// Applies the schema and creates the seed admin if missing
pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config()?;
    let store = connect(&config).await?;
    tracing::info!("Schema applied to {}", config.database.display_url());

    let users = UserService::new(Arc::new(store.clone()), &config);
    let (admin, created) = users.ensure_admin(&config.seed).await?;
    store.close().await;

    let message = if created {
        format!("Admin login: {} / {}", admin.email, config.seed.admin_password)
    } else {
        format!("Admin user already exists: {}", admin.email)
    };
    output_success(
        &output_format,
        &message,
        Some(json!({ "admin": admin.view(), "created": created })),
    )
}
