use clap::Parser;
use pinpoint::config::Config;
use pinpoint::geo::{IpSensor, SensorPort, StaticSensor};
use pinpoint::service::{ResolutionService, ResolveOptions, DEFAULT_CLAIMED_ACCURACY_M};
use std::path::PathBuf;
use std::time::Duration;

/// Pinpoint — location refinement and address consensus engine
///
/// Resolves a coordinate into a regionally-validated postal address by
/// querying several independent geocoding providers and reconciling
/// their answers.
///
/// Examples:
///   pinpoint --lat 30.6425 --lon 76.8173
///   pinpoint --lat 30.6425 --lon 76.8173 --accuracy 12 --high-accuracy
///   pinpoint --ip
///   pinpoint --serve --port 8787
#[derive(Parser)]
#[command(name = "pinpoint", version, about, long_about = None)]
struct Cli {
    /// Latitude (-90 to 90).
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude (-180 to 180).
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Claimed accuracy of the supplied coordinate, in meters.
    #[arg(long, default_value_t = DEFAULT_CLAIMED_ACCURACY_M)]
    accuracy: f64,

    /// Use IP geolocation as a coarse fix source instead of --lat/--lon.
    #[arg(long)]
    ip: bool,

    /// Sampling attempts.
    #[arg(long, default_value_t = 2)]
    attempts: u32,

    /// Accuracy threshold (meters) that stops sampling early.
    #[arg(long, default_value_t = 5.0)]
    excellent: f64,

    /// Sample more attempts for a tighter estimate.
    #[arg(long)]
    high_accuracy: bool,

    /// Skip the address lookup; refine the location only.
    #[arg(long)]
    no_address: bool,

    /// Overall budget in seconds; sampling stops when it runs out.
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Config file path (default: ~/.pinpoint/config.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the HTTP API server instead of a one-shot resolution.
    #[arg(long)]
    serve: bool,

    /// Server bind host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server bind port.
    #[arg(long, default_value_t = 8787)]
    port: u16,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    // An explicit --config must load exactly as given; only the default
    // path is allowed to fall back quietly.
    let config = match &cli.config {
        Some(path) => match Config::try_load(path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                eprintln!("Error: Config file not found: {}", path.display());
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::load(),
    };

    // ── Server mode ─────────────────────────────────────────────

    if cli.serve {
        let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("Error: Cannot start runtime: {}", e);
            std::process::exit(1);
        });
        runtime.block_on(pinpoint::server::start(&cli.host, cli.port, config));
        return;
    }

    // ── One-shot resolution ─────────────────────────────────────

    let sensor = build_sensor(&cli);
    let service = ResolutionService::from_config(sensor, config);

    let opts = ResolveOptions {
        max_attempts: cli.attempts,
        excellent_accuracy_m: cli.excellent,
        include_address: !cli.no_address,
        high_accuracy: cli.high_accuracy,
        deadline: cli.deadline_secs.map(Duration::from_secs),
    };

    let resolution = service.resolve(&opts).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    // Banner to stderr, JSON to stdout.
    let loc = &resolution.location;
    eprintln!(
        "  \u{1F4CD} {:.5}, {:.5} (±{:.0}m, {} fix{})",
        loc.latitude,
        loc.longitude,
        loc.accuracy_m,
        loc.sample_count,
        if loc.sample_count == 1 { "" } else { "es" },
    );
    if let Some(ref e) = loc.error {
        eprintln!("  \u{26A0}\u{FE0F}  Location: {}", e);
    }
    let addr = &resolution.address;
    match &addr.error {
        Some(e) => eprintln!("  \u{26A0}\u{FE0F}  Address: {}", e),
        None => {
            if let Some(ref f) = addr.formatted_address {
                eprintln!("  \u{1F3E0} {}", f);
            }
            eprintln!(
                "  Confidence: {} ({} provider{})",
                addr.confidence,
                addr.contributing_providers.len(),
                if addr.contributing_providers.len() == 1 { "" } else { "s" },
            );
        }
    }

    println!("{}", serde_json::to_string_pretty(&resolution).unwrap());
}

fn build_sensor(cli: &Cli) -> Box<dyn SensorPort + Send + Sync> {
    // Priority: --ip > --lat/--lon > error

    if cli.ip {
        return Box::new(IpSensor);
    }

    if let (Some(lat), Some(lon)) = (cli.lat, cli.lon) {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            eprintln!("Error: Invalid coordinates. Lat: -90..90, Lon: -180..180");
            std::process::exit(1);
        }
        return Box::new(StaticSensor {
            latitude: lat,
            longitude: lon,
            accuracy_m: cli.accuracy,
        });
    }

    eprintln!("Error: No fix source specified.");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  pinpoint --lat 30.6425 --lon 76.8173");
    eprintln!("  pinpoint --ip");
    eprintln!("  pinpoint --serve");
    std::process::exit(1);
}
