//! ADAM-4017 to MQTT bridge
//!
//! Reads the module's identity once at startup, then polls the configured analog
//! channels and publishes calibrated measurements at a fixed interval.

mod logging;
mod mqtt;

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use adam4000_core::prelude::*;
use adam4000_core::module::ModuleConfiguration;
use adam4000_core::protocol::channel::list_ports;
use adam4000_core::protocol::Rs485Channel;
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use crate::mqtt::MqttSink;

const DEFAULT_CONFIG: &str = "/etc/adam4000/adam4000.toml";

#[derive(Parser, Debug)]
#[command(name = "adam4000-mqtt")]
#[command(version, about = "Poll an ADAM-4017 analog input module and publish to MQTT")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Run a single polling cycle and exit
    #[arg(long)]
    once: bool,

    /// Query configuration, firmware version and module name, then exit
    #[arg(long)]
    diagnostics_only: bool,

    /// Log measurements instead of publishing them
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let _log_guard = logging::init(&config.log)?;

    info!(
        version = adam4000_core::VERSION,
        config = %cli.config.display(),
        "adam4000-mqtt starting"
    );

    let mut module = Adam4017::open(&config.adam4000.serial_port, config.device_address());
    if !module.is_ready() {
        let ports = list_ports();
        if ports.is_empty() {
            warn!("no serial ports found");
        } else {
            info!(ports = ?ports, "available serial ports");
        }
        bail!(
            "ADAM-4017 at address {} is unavailable on {}",
            config.device_address(),
            config.adam4000.serial_port
        );
    }

    run_diagnostics(&mut module)?;
    if cli.diagnostics_only {
        return Ok(());
    }

    let poller = Poller::from_config(&config);
    for point in poller.points() {
        info!(channel = %point.channel, topic = %point.topic, "measurement configured");
    }

    if cli.dry_run {
        let mut sink = LogSink::new(config.mqtt.invalid_payload.clone());
        run(&poller, &mut module, &mut sink, &config, cli.once)
    } else {
        let mut sink = MqttSink::connect(&config)?;
        let result = run(&poller, &mut module, &mut sink, &config, cli.once);
        sink.disconnect();
        result
    }
}

/// Log the module's identity; a silent module is reported but not fatal
fn run_diagnostics<C: Rs485Channel>(module: &mut Adam4017<C>) -> Result<()> {
    let raw = module.read_configuration()?;
    info!(response = %raw.escape_debug(), "module configuration");
    match ModuleConfiguration::from_response(&raw) {
        Ok(decoded) => info!(
            input_range = ?decoded.input_range,
            baud_rate = ?decoded.baud_rate(),
            data_format = ?decoded.data_format,
            checksum_enabled = decoded.checksum_enabled,
            "decoded configuration"
        ),
        Err(e) => warn!("could not decode module configuration: {}", e),
    }

    let firmware = module.read_firmware_version()?;
    info!(response = %firmware.escape_debug(), "firmware version");

    let name = module.read_module_name()?;
    info!(response = %name.escape_debug(), "module name");

    Ok(())
}

/// Poll until an unrecoverable error, or once
fn run<S: MeasurementSink>(
    poller: &Poller,
    module: &mut Adam4017,
    sink: &mut S,
    config: &Config,
    once: bool,
) -> Result<()> {
    let interval = Duration::from_secs(config.poll.interval_secs);

    loop {
        let started = Instant::now();
        let report = poller.poll_once(module, sink)?;
        info!(
            valid = report.valid,
            invalid = report.invalid,
            out_of_range = report.out_of_range,
            sink_errors = report.sink_errors,
            "poll cycle complete"
        );

        if once {
            return Ok(());
        }
        thread::sleep(interval.saturating_sub(started.elapsed()));
    }
}
