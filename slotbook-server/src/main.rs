use std::{env, sync::Arc};

use colored::Colorize;
use log::{error, info};
use slotbook_core::{PgDatabase, Slotbook};
use slotbook_server::{logging, run_server, ServerContext};
use thiserror::Error;

#[derive(Debug, Error)]
enum StartupError {
    #[error("{0} is not set")]
    MissingEnv(&'static str),
    #[error("Could not connect to database: {0}")]
    Database(String),
}

impl StartupError {
    fn hint(&self) -> String {
        match self {
            StartupError::MissingEnv(name) => {
                format!("Set the {} environment variable and try again.", name)
            }
            StartupError::Database(_) => {
                "Make sure the PostgreSQL instance is running and SLOTBOOK_DATABASE_URL points at it."
                    .to_string()
            }
        }
    }
}

fn required_env(name: &'static str) -> Result<String, StartupError> {
    env::var(name).map_err(|_| StartupError::MissingEnv(name))
}

async fn init() -> Result<ServerContext, StartupError> {
    let database_url = required_env("SLOTBOOK_DATABASE_URL")?;
    let jwt_secret = required_env("SLOTBOOK_JWT_SECRET")?;

    info!("Connecting to database...");

    let database = PgDatabase::new(&database_url)
        .await
        .map_err(|e| StartupError::Database(e.to_string()))?;

    let slotbook = Slotbook::new(database, &jwt_secret);

    Ok(ServerContext {
        slotbook: Arc::new(slotbook),
    })
}

#[tokio::main]
async fn main() {
    logging::init_logger();

    match init().await {
        Ok(context) => {
            info!("Initialized successfully.");
            run_server(context).await;
        }
        Err(error) => {
            error!(
                "{} Read the error below to troubleshoot the issue.",
                "Slotbook failed to start!".bold().red()
            );
            error!("{}", error);
            error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());
        }
    }
}
