pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "Catalog administration: schema migration and account management")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create tables, constraints and indexes if missing")]
    Migrate,

    #[command(about = "Create an account with staff and superuser flags")]
    CreateSuperuser {
        #[arg(long, help = "Login email")]
        email: String,
        #[arg(long, help = "Password (minimum length per SECURITY_MIN_PASSWORD_LENGTH)")]
        password: String,
        #[arg(long, help = "Display name")]
        name: Option<String>,
    },

    #[command(about = "Delete an account and every category and product it owns")]
    DeleteUser {
        #[arg(long, help = "Login email")]
        email: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::CreateSuperuser { email, password, name } => {
            commands::user::create_superuser(email, password, name, output_format).await
        }
        Commands::DeleteUser { email } => commands::user::delete_user(email, output_format).await,
    }
}
