use clap::Subcommand;

use crate::cli::OutputFormat;
use crate::policy::matrix::matrix;
use crate::types::Role;

#[derive(Subcommand)]
pub enum PolicyCommands {
    #[command(about = "Print the decision for every role, entity and action")]
    Matrix {
        #[arg(long, help = "Only this role")]
        role: Option<Role>,
    },
}

pub async fn handle(cmd: PolicyCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        PolicyCommands::Matrix { role } => {
            let roles = match role {
                Some(role) => vec![role],
                None => Role::ALL.to_vec(),
            };
            let rows = matrix(&roles);

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
                OutputFormat::Text => {
                    println!("{:<8} {:<10} {:<9} {:<40} {}", "ROLE", "ENTITY", "ACTION", "OWN", "OTHER");
                    for row in rows {
                        println!(
                            "{:<8} {:<10} {:<9} {:<40} {}",
                            row.role.as_str(),
                            row.entity.as_str(),
                            row.action.as_str(),
                            row.own,
                            row.other
                        );
                    }
                }
            }
            Ok(())
        }
    }
}
