use clap::Parser;
use client::game::OptimisticSettings;
use client::network::{Client, ClientOptions};
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, env = "TILE_WORLD_SERVER", default_value = "127.0.0.1:8080")]
    server: String,

    /// Authentication token, `guest:<name>` when the server allows guests
    #[arg(short = 't', long, env = "TILE_WORLD_TOKEN", default_value = "guest:viewer")]
    token: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Only watch, never send moves or attacks
    #[arg(long)]
    idle: bool,

    /// Milliseconds between bot decisions
    #[arg(long, default_value = "1000")]
    bot_interval: u64,

    /// Seed for the bot's random choices
    #[arg(long)]
    seed: Option<u64>,

    /// Leave after this many seconds instead of running until Ctrl+C
    #[arg(long)]
    run_for: Option<u64>,

    /// Apply positions exactly as received, without local interpolation
    #[arg(long)]
    no_interpolator: bool,

    /// Overwrite every field blindly, for servers running without the patch optimizer
    #[arg(long)]
    no_patch_optimizer: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }
    if args.idle {
        info!("Idle mode, only mirroring the world");
    }

    let mut client = Client::new(ClientOptions {
        server_addr: args.server,
        token: args.token,
        fake_ping_ms: args.fake_ping,
        settings: OptimisticSettings {
            use_interpolator: !args.no_interpolator,
            use_patch_optimizer: !args.no_patch_optimizer,
        },
        bot: !args.idle,
        bot_interval: Duration::from_millis(args.bot_interval),
        seed: args.seed,
        run_for: args.run_for.map(Duration::from_secs),
    })
    .await?;

    client.run().await?;

    Ok(())
}
