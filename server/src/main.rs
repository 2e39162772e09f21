use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::content::WorldContent;
use server::network::Server;
use server::persistence::{CharacterStore, JsonFileCharacterStore, MemoryCharacterStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::parse();

    let content = match &config.content {
        Some(path) => {
            info!("Loading world content from {}", path.display());
            WorldContent::from_file(path)?
        }
        None => {
            info!("Using the built-in demo world");
            WorldContent::demo()
        }
    };

    let store: Box<dyn CharacterStore> = match &config.save_file {
        Some(path) => Box::new(JsonFileCharacterStore::open(path)?),
        None => Box::new(MemoryCharacterStore::new()),
    };

    info!(
        "Starting server on {} at {} ticks/s (view distance {}, guests {})",
        config.address(),
        config.tick_rate,
        config.view_distance,
        if config.allow_guests { "allowed" } else { "refused" }
    );

    let mut server = Server::new(config, content, store).await?;
    server.run().await?;

    Ok(())
}
