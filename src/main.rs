//! Air of Pi - BME688 Environmental Telemetry Binary
//!
//! Polls the sensor on a fixed interval and writes each reading to InfluxDB.

use air_of_pi::{
    dashboard::DASHBOARD_JSON,
    sensor::config::parse_address,
    Collector, CollectorConfig, DefaultSensor, InfluxStore, Reading, Sensor, SensorConfig,
    StoreConfig, DEFAULT_I2C_BUS, DEFAULT_INTERVAL_SECS, DEFAULT_MEASUREMENT,
    DEFAULT_READ_TIMEOUT_SECS, DEFAULT_WRITE_TIMEOUT_SECS,
};
use anyhow::{anyhow, Context};
use clap::{builder::BoolishValueParser, Args, Parser, Subcommand};
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "air_of_pi")]
#[command(about = "🌬️ Air of Pi - BME688 Environmental Telemetry")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Austin Couch")]
#[command(long_about = "Reads a BME688 over I2C and writes temperature, humidity, pressure and gas resistance to InfluxDB")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    sensor: SensorArgs,

    /// Seconds between readings
    #[arg(short, long, env = "MEASUREMENT_INTERVAL", default_value_t = DEFAULT_INTERVAL_SECS)]
    interval: u64,

    /// Measurement name written to the store
    #[arg(long, env = "MEASUREMENT_NAME", default_value = DEFAULT_MEASUREMENT)]
    measurement: String,

    /// Value of the `device` tag (defaults to the hostname)
    #[arg(long, env = "DEVICE_ID")]
    device_id: Option<String>,

    /// Seconds to wait for one sensor read
    #[arg(long, env = "READ_TIMEOUT", default_value_t = DEFAULT_READ_TIMEOUT_SECS)]
    read_timeout: u64,

    /// Seconds to wait for one store write
    #[arg(long, env = "WRITE_TIMEOUT", default_value_t = DEFAULT_WRITE_TIMEOUT_SECS)]
    write_timeout: u64,

    /// Also write a derived `voc` field (1.0 to 5.0)
    #[arg(long, env = "INCLUDE_VOC", value_parser = BoolishValueParser::new())]
    include_voc: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Args)]
struct StoreArgs {
    /// InfluxDB base URL
    #[arg(long, env = "INFLUXDB_URL")]
    influxdb_url: Option<String>,

    /// InfluxDB API token
    #[arg(long, env = "INFLUXDB_TOKEN", hide_env_values = true)]
    influxdb_token: Option<String>,

    /// InfluxDB organization
    #[arg(long, env = "INFLUXDB_ORG")]
    influxdb_org: Option<String>,

    /// InfluxDB bucket
    #[arg(long, env = "INFLUXDB_BUCKET")]
    influxdb_bucket: Option<String>,
}

#[derive(Args)]
struct SensorArgs {
    /// I2C bus number (/dev/i2c-N)
    #[arg(long, env = "I2C_BUS", default_value_t = DEFAULT_I2C_BUS)]
    i2c_bus: u8,

    /// BME688 I2C address (0x76 or 0x77)
    #[arg(long, env = "BME688_ADDRESS", default_value = "0x77", value_parser = parse_address)]
    address: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect readings until stopped (default)
    Run,

    /// Take a single reading, print it and exit
    Read(ReadArgs),

    /// Check the store connection
    Check(CheckArgs),

    /// Print the Grafana dashboard JSON
    Dashboard,
}

#[derive(Args)]
struct ReadArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[derive(Args)]
struct CheckArgs {
    /// Also write a `connection_test` point to the bucket
    #[arg(long)]
    write_test_point: bool,
}

impl StoreArgs {
    fn to_config(&self, timeout: Duration) -> anyhow::Result<StoreConfig> {
        fn required<'a>(value: &'a Option<String>, var: &str) -> anyhow::Result<&'a str> {
            value
                .as_deref()
                .ok_or_else(|| anyhow!("{} is not set (environment or --{} flag)", var, flag_name(var)))
        }

        Ok(StoreConfig::new(
            required(&self.influxdb_url, "INFLUXDB_URL")?,
            required(&self.influxdb_token, "INFLUXDB_TOKEN")?,
            required(&self.influxdb_org, "INFLUXDB_ORG")?,
            required(&self.influxdb_bucket, "INFLUXDB_BUCKET")?,
        )
        .with_timeout(timeout))
    }
}

fn flag_name(var: &str) -> String {
    var.to_lowercase().replace('_', "-")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Run) | None => {
            print_banner();
            run_command(&cli).await?;
        }
        Some(Commands::Read(args)) => {
            read_command(&cli, args).await?;
        }
        Some(Commands::Check(args)) => {
            check_command(&cli, args).await?;
        }
        Some(Commands::Dashboard) => {
            println!("{}", DASHBOARD_JSON.trim_end());
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        LevelFilter::DEBUG
    } else if cli.verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn print_banner() {
    println!("🌬️  Air of Pi - BME688 Environmental Telemetry");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    #[cfg(feature = "hardware")]
    println!("   Sensor: BME688 (I2C)");
    #[cfg(not(feature = "hardware"))]
    println!("   Sensor: simulated (built without the `hardware` feature)");
    println!();
}

fn sensor_config(cli: &Cli) -> SensorConfig {
    SensorConfig::new(cli.sensor.i2c_bus, cli.sensor.address)
}

fn collector_config(cli: &Cli) -> CollectorConfig {
    let mut config = CollectorConfig::new(Duration::from_secs(cli.interval))
        .with_read_timeout(Duration::from_secs(cli.read_timeout))
        .with_write_timeout(Duration::from_secs(cli.write_timeout))
        .with_measurement(cli.measurement.as_str())
        .with_voc(cli.include_voc);

    if let Some(device_id) = &cli.device_id {
        config = config.with_device_id(device_id.as_str());
    }
    config
}

async fn run_command(cli: &Cli) -> anyhow::Result<()> {
    info!("Starting Air of Pi collector...");

    let config = collector_config(cli);
    if !config.timeouts_fit_interval() {
        warn!(
            "Read timeout {:?} plus write timeout {:?} exceeds the {:?} interval; slow ticks will delay the schedule",
            config.read_timeout, config.write_timeout, config.interval
        );
    }

    let store_config = cli
        .store
        .to_config(config.write_timeout)
        .context("Store is not configured")?;
    let store = InfluxStore::new(store_config)?;

    info!("Store configuration:");
    info!("  - URL: {}", store.config().base_url());
    info!("  - Organization: {}", store.config().org);
    info!("  - Bucket: {}", store.config().bucket);
    info!("  - Token: {}", store.config().masked_token());

    match store.health().await {
        Ok(health) if health.is_pass() => info!(
            "Store healthy (version {})",
            health.version.as_deref().unwrap_or("unknown")
        ),
        Ok(health) => warn!(
            "Store reports status '{}': {}",
            health.status,
            health.message.as_deref().unwrap_or("no detail")
        ),
        Err(e) => warn!("Store health check failed, collecting anyway: {}", e),
    }

    let sensor = DefaultSensor::open(&sensor_config(cli))?;
    info!("Sensor {} ready", sensor.name());

    let mut collector = Collector::new(sensor, store, config)?;
    let stats = collector.run(shutdown_signal()).await;

    info!(
        "Collector stopped after {} ticks: {} written, {} sensor failures, {} store failures",
        stats.ticks, stats.writes, stats.sensor_failures, stats.store_failures
    );

    Ok(())
}

async fn read_command(cli: &Cli, args: &ReadArgs) -> anyhow::Result<()> {
    let mut sensor = DefaultSensor::open(&sensor_config(cli))?;
    let timeout = Duration::from_secs(cli.read_timeout);
    let reading = tokio::time::timeout(timeout, sensor.read())
        .await
        .map_err(|_| anyhow!("Sensor read timed out after {:?}", timeout))??;

    match args.format.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&reading)?;
            println!("{}", json);
        }
        "pretty" => {
            print_pretty_reading(sensor.name(), &reading);
        }
        _ => {
            error!("Unsupported format: {}. Use 'json' or 'pretty'", args.format);
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn check_command(cli: &Cli, args: &CheckArgs) -> anyhow::Result<()> {
    let store_config = cli
        .store
        .to_config(Duration::from_secs(cli.write_timeout))
        .context("Store is not configured")?;
    let store = InfluxStore::new(store_config)?;

    println!("🔌 Store Check");
    println!("==============");
    println!("  URL: {}", store.config().base_url());
    println!("  Organization: {}", store.config().org);
    println!("  Bucket: {}", store.config().bucket);
    println!("  Token: {}", store.config().masked_token());
    println!();

    let health = store.health().await?;
    println!(
        "  Health: {} ({})",
        health.status,
        health.message.as_deref().unwrap_or("no detail")
    );
    if let Some(version) = &health.version {
        println!("  Version: {}", version);
    }

    if args.write_test_point {
        store
            .write_test_point()
            .await
            .context("Write failed; the token may lack write permission on this bucket")?;
        println!("  Test point: written ✓");
    }

    if !health.is_pass() {
        return Err(anyhow!("Store is not healthy"));
    }

    Ok(())
}

fn print_pretty_reading(sensor: &str, reading: &Reading) {
    println!(
        "🌡️  Reading from {} ({})",
        sensor,
        reading.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("==========================================");
    println!("  Temperature: {:.2} °C", reading.temperature);
    println!("  Humidity: {:.2} %RH", reading.humidity);
    println!("  Pressure: {:.2} hPa", reading.pressure);
    println!("  Gas resistance: {:.0} Ω", reading.gas_resistance);
    println!("  VOC estimate: {:.2} (1 = poor, 5 = clean)", reading.voc_estimate());
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
