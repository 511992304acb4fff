use mongodb::{options::ClientOptions, Client, Database};

use crate::config::DatabaseConfig;
use crate::store::StoreError;

pub async fn connect(config: &DatabaseConfig) -> Result<Database, StoreError> {
    let mut options = ClientOptions::parse(&config.uri).await?;
    options.app_name = Some("vrudhacare".to_string());

    let client = Client::with_options(options)?;
    log::info!("Connected to MongoDB database {}", config.name);

    Ok(client.database(&config.name))
}
