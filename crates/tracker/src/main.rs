use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use demurrage::{
    client::{Client, NewVehicle},
    memory::MemoryDatabase,
    RequestError,
};
use model::company::DEFAULT_DEMURRAGE_THRESHOLD_MINUTES;
use tokio::{
    fs::File,
    io::{self, AsyncBufRead, BufReader},
    time::Duration,
};
use tracker::{
    backend::{HttpBackend, LocalBackend, TrackingBackend},
    clock::Clock,
    config::TrackerConfig,
    coordinator::{self, CoordinatorRef},
    error::Result,
    replay::replay,
};
use utility::id::Id;

#[derive(Parser, Debug)]
#[command(name = "tracker")]
#[command(about = "Detects stops from recorded sensor samples and reports them as stop events")]
struct Args {
    /// Base url of the web server. Without it, stop events go to an in-memory
    /// database seeded with one company.
    #[arg(long, env = "TRACKER_SERVER", requires = "token")]
    server: Option<String>,

    /// Bearer token of the driver's session.
    #[arg(long, env = "TRACKER_TOKEN")]
    token: Option<String>,

    /// Demurrage threshold of the in-memory company.
    #[arg(long, default_value_t = DEFAULT_DEMURRAGE_THRESHOLD_MINUTES)]
    threshold: i32,

    #[arg(long)]
    vehicle_id: Option<i32>,

    #[arg(long, default_value_t = 0.5)]
    acceleration_threshold: f64,

    #[arg(long, default_value_t = 1.5)]
    speed_threshold: f64,

    #[arg(long, default_value_t = 10)]
    buffer_size: usize,

    #[arg(long, default_value_t = 10)]
    stop_delay_secs: u64,

    #[arg(long, default_value_t = 5)]
    move_delay_secs: u64,

    #[arg(long, default_value_t = 60)]
    refresh_secs: u64,

    /// JSON lines file to replay. Reads stdin if omitted.
    input: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> TrackerConfig {
        TrackerConfig {
            acceleration_threshold: self.acceleration_threshold,
            speed_threshold: self.speed_threshold,
            buffer_size: self.buffer_size,
            stop_delay: Duration::from_secs(self.stop_delay_secs),
            move_delay: Duration::from_secs(self.move_delay_secs),
            refresh_period: Duration::from_secs(self.refresh_secs),
            vehicle_id: self.vehicle_id.map(Id::new),
        }
    }

    async fn input(&self) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
        Ok(match &self.input {
            Some(path) => Box::new(BufReader::new(File::open(path).await?)),
            None => Box::new(BufReader::new(io::stdin())),
        })
    }
}

async fn track<B: TrackingBackend>(backend: B, args: &Args, clock: Clock) -> Result<()> {
    let coordinator = coordinator::spawn(args.config(), Arc::new(backend), clock);
    if let Some(event) = coordinator.resume().await? {
        log::info!("continuing stop event {}", event.id);
    }

    let stats = replay(&coordinator, args.input().await?).await?;
    log::info!(
        "replayed {} samples and {} commands, skipped {} lines",
        stats.samples,
        stats.commands,
        stats.skipped
    );

    let snapshot = coordinator.snapshot().await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    coordinator.shutdown().await
}

async fn run(args: Args) -> Result<()> {
    let clock = Clock::new();
    if let Some(server) = &args.server {
        let token = args.token.clone().unwrap_or_default();
        return track(HttpBackend::new(server.as_str(), token), &args, clock).await;
    }

    let database = MemoryDatabase::new();
    let seeded = database
        .seed_company("Local Fleet", args.threshold, clock.now())
        .await
        .map_err(RequestError::from)?;
    let client = Client::new(database);
    let admin = client.authenticate(&seeded.admin_token, clock.now()).await?;
    let driver = client.authenticate(&seeded.driver_token, clock.now()).await?;

    let mut args = args;
    if args.vehicle_id.is_none() {
        let vehicle = client
            .add_vehicle(
                &admin,
                NewVehicle {
                    name: "Local vehicle".to_owned(),
                    license_plate: None,
                },
            )
            .await?;
        args.vehicle_id = Some(vehicle.id.raw());
    }
    log::info!(
        "tracking against an in-memory company with a threshold of {} minutes",
        args.threshold
    );
    track(LocalBackend::new(client, driver, clock), &args, clock).await
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(why) = run(Args::parse()).await {
        log::error!("{}", why);
        std::process::exit(1);
    }
}
