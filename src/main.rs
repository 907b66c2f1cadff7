//! `locator` command-line interface
//!
//! ```text
//! locator serve --port 8080 --interval-secs 300
//! locator watch --addr localhost:8080 --long 37.62 --lat 55.75 --rad 100
//! ```

use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

use locator_rs::client::{Watcher, WatcherConfig};
use locator_rs::feed::opensky::ALL_STATES_URL;
use locator_rs::feed::{OpenSkyConfig, OpenSkyFeed};
use locator_rs::{LocatorServer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "locator", version, about = "Live object counts inside a circle, over WebSocket")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the server
    Serve(ServeArgs),
    /// Subscribe to a server and print each count
    Watch(WatchArgs),
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Interface to listen on
    #[arg(long, default_value = "0.0.0.0", env = "LOCATOR_BIND")]
    bind: IpAddr,

    /// Port to listen on
    #[arg(long, default_value_t = locator_rs::server::DEFAULT_PORT, env = "PORT")]
    port: u16,

    /// Seconds between feed refreshes
    #[arg(long, default_value_t = 300, env = "LOCATOR_INTERVAL_SECS")]
    interval_secs: u64,

    /// Snapshot feed endpoint
    #[arg(long, default_value = ALL_STATES_URL, env = "LOCATOR_FEED_URL")]
    feed_url: String,

    /// Seconds allowed for one feed request
    #[arg(long, default_value_t = 30)]
    feed_timeout_secs: u64,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_connections: usize,
}

#[derive(clap::Args, Debug)]
struct WatchArgs {
    /// Server address
    #[arg(long, default_value = "localhost:8080")]
    addr: String,

    /// Longitude of the circle center, degrees
    #[arg(long = "long", default_value_t = 0.0, allow_negative_numbers = true)]
    longitude: f64,

    /// Latitude of the circle center, degrees
    #[arg(long = "lat", default_value_t = 0.0, allow_negative_numbers = true)]
    latitude: f64,

    /// Radius in kilometres
    #[arg(long = "rad", default_value_t = 0.0)]
    radius: f64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("locator_rs=info,locator=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Watch(args) => watch(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Exiting");
            ExitCode::FAILURE
        }
    }
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let feed_timeout = Duration::from_secs(args.feed_timeout_secs);
    let feed = OpenSkyFeed::with_config(
        OpenSkyConfig::default()
            .url(args.feed_url)
            .request_timeout(feed_timeout),
    )?;

    let config = ServerConfig::with_addr(SocketAddr::new(args.bind, args.port))
        .max_connections(args.max_connections)
        .refresh_interval(Duration::from_secs(args.interval_secs))
        .fetch_timeout(feed_timeout);

    tracing::info!(
        addr = %config.bind_addr,
        feed = %feed.url(),
        interval_secs = args.interval_secs,
        "Starting locator server"
    );

    let server = LocatorServer::new(config, feed);
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}

async fn watch(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("ws://{}/", args.addr);
    tracing::info!(
        url = %url,
        longitude = args.longitude,
        latitude = args.latitude,
        radius_km = args.radius,
        "Connecting"
    );

    let config = WatcherConfig::new(url, args.longitude, args.latitude, args.radius);
    let mut watcher = Watcher::connect(&config).await?;

    loop {
        let next = tokio::select! {
            next = watcher.next_count() => Some(next),
            _ = tokio::signal::ctrl_c() => None,
        };

        match next {
            Some(Some(Ok(count))) => println!("{}", count),
            Some(Some(Err(e))) => return Err(e.into()),
            Some(None) => {
                tracing::info!("Server closed the connection");
                return Ok(());
            }
            None => {
                watcher.unsubscribe().await?;
                return Ok(());
            }
        }
    }
}
