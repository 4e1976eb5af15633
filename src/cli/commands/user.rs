use clap::Subcommand;
use serde_json::json;
use std::sync::Arc;

use crate::cli::utils::{connect, load_config, output_success};
use crate::cli::OutputFormat;
use crate::services::{NewUser, UserService};
use crate::types::Role;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user account")]
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, help = "Admin, Teacher, Student or Parent")]
        role: Role,
        #[arg(long)]
        password: String,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Create { name, email, role, password } => {
            let config = load_config()?;
            let store = connect(&config).await?;
            let users = UserService::new(Arc::new(store.clone()), &config);
            let user = users.create(NewUser { name, email, password, role }).await?;
            store.close().await;

            output_success(
                &output_format,
                &format!("Created {} {} ({})", user.role, user.email, user.id),
                Some(json!({ "user": user.view() })),
            )
        }
    }
}
