//! ATM-900 Modem Console
//!
//! A standalone tool to bring up and inspect an acoustic modem over serial.
//! Connects (fixed baud rate or probe), prints identification and status,
//! dumps every configuration parameter and optionally runs a link test.
//!
//! Usage:
//!   cargo run --example modem_console -- [OPTIONS] [PORT]
//!
//! Options:
//!   --port PORT       Serial port (default: first port found)
//!   --baud RATE       Baud rate (default: probe 1200-115200)
//!   --config FILE     Load a JSON ModemConfig
//!   --link-test ADDR  Run a link test against remote ADDR
//!   --rate-test ADDR  Run a multi-rate test against remote ADDR
//!   --list            List serial ports and exit
//!   --sim             Talk to the built-in simulated modem
//!
//! Set RUST_LOG=atm_modem_core=debug to see every byte on the wire.

use anyhow::Context;
use atm_modem_core::codec::params;
use atm_modem_core::prelude::*;
use atm_modem_core::transport::list_ports;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut port_name: Option<String> = None;
    let mut baud_rate: Option<u32> = None;
    let mut config_file: Option<String> = None;
    let mut link_test: Option<u8> = None;
    let mut rate_test: Option<u8> = None;
    let mut simulate = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                i += 1;
                if i < args.len() {
                    port_name = Some(args[i].clone());
                }
            }
            "--baud" | "-b" => {
                i += 1;
                if i < args.len() {
                    baud_rate = args[i].parse().ok();
                }
            }
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_file = Some(args[i].clone());
                }
            }
            "--link-test" => {
                i += 1;
                if i < args.len() {
                    link_test = args[i].parse().ok();
                }
            }
            "--rate-test" => {
                i += 1;
                if i < args.len() {
                    rate_test = args[i].parse().ok();
                }
            }
            "--sim" => {
                simulate = true;
            }
            "--list" | "-l" => {
                for port in list_ports() {
                    println!(
                        "{:<20} {}",
                        port.name,
                        port.product.as_deref().unwrap_or("-")
                    );
                }
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            arg if !arg.starts_with('-') => {
                port_name = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
            }
        }
        i += 1;
    }

    let mut config = match &config_file {
        Some(path) => ModemConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path))?,
        None => ModemConfig::default(),
    };
    if let Some(name) = port_name {
        config.port_name = name;
    }
    if baud_rate.is_some() {
        config.baud_rate = baud_rate;
    }

    let transport: Box<dyn Transport> = if simulate {
        config.port_name = "simulator".to_string();
        config.timing = Timing::immediate();
        Box::new(SimulatedModem::new(9600).with_remote(2))
    } else {
        if config.port_name.is_empty() {
            config.port_name = list_ports()
                .first()
                .map(|p| p.name.clone())
                .context("no serial ports found; pass --port")?;
        }
        Box::new(
            SerialTransport::new(&config.port_name)
                .with_read_timeout(config.timing.read_timeout()),
        )
    };

    println!("ATM-900 Modem Console v{}", atm_modem_core::VERSION);
    println!();
    println!("Configuration:");
    println!("  Port:        {}", config.port_name);
    match config.baud_rate {
        Some(rate) => println!("  Baud rate:   {}", rate),
        None => println!("  Baud rate:   probe {:?}", config.probe_rates),
    }
    println!("  Host port:   {:?}", config.host_port);
    println!();

    let mut modem = Session::connect(transport, config).context("connecting to modem")?;
    println!("✓ Connected at {} baud", modem.baud_rate());
    println!();

    println!("Identification:");
    for line in modem.firmware_version()? {
        println!("  {}", line);
    }
    match (modem.voltage(), modem.temperature()) {
        (Ok(volts), Ok(temp)) => println!("  Supply {:.2} V, {:.1} C", volts, temp),
        (Err(e), _) | (_, Err(e)) => println!("  ⚠ Status unavailable: {}", e),
    }
    println!();

    println!("Parameters:");
    for spec in params::ALL {
        match modem.get_value(spec) {
            Ok(value) => println!("  {:<14} {}", spec.name, value),
            Err(e) => println!("  {:<14} ⚠ {}", spec.name, e),
        }
    }

    if let Some(address) = link_test {
        println!();
        println!("Link test to {}...", address);
        print_report(&modem.link_test(address)?);
    }

    if let Some(address) = rate_test {
        println!();
        println!("Multi-rate test to {}...", address);
        print_report(&modem.rate_test(address)?);
    }

    modem.close();
    Ok(())
}

fn print_report(report: &TestReport) {
    for line in &report.lines {
        println!("  | {}", line);
    }
    println!("  Outcome: {:?}", report.outcome);
    for metric in &report.metrics {
        println!(
            "  {:<10} {} {}",
            metric.name,
            metric.value,
            metric.unit.as_deref().unwrap_or("")
        );
    }
}

fn print_help() {
    println!("ATM-900 Modem Console");
    println!();
    println!("Usage: modem_console [OPTIONS] [PORT]");
    println!();
    println!("Options:");
    println!("  -p, --port PORT       Serial port (default: first port found)");
    println!("  -b, --baud RATE       Baud rate (default: probe every supported rate)");
    println!("  -c, --config FILE     Load a JSON ModemConfig");
    println!("      --link-test ADDR  Run a link test against remote ADDR");
    println!("      --rate-test ADDR  Run a multi-rate test against remote ADDR");
    println!("  -l, --list            List serial ports and exit");
    println!("      --sim             Talk to the built-in simulated modem");
    println!("  -h, --help            Show this help");
}
