use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::{PgStore, Store};

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(body)) = (data, response.as_object_mut()) {
                body.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Environment-derived configuration, after loading `.env`
pub fn load_config() -> anyhow::Result<AppConfig> {
    let _ = dotenvy::dotenv();
    let config = AppConfig::from_env();
    config.validate()?;
    Ok(config)
}

/// CLI commands persist, so they need Postgres rather than the memory store
pub async fn connect(config: &AppConfig) -> anyhow::Result<PgStore> {
    let store = PgStore::connect(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("{} (set DATABASE_URL to a Postgres database)", e))?;
    store.migrate().await?;
    Ok(store)
}
