use adcmon_core::{interrupt_channel, launch, SerialConfig, SerialConnection};
use anyhow::{Context, Result};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let interrupt = interrupt_channel().context("setting up Ctrl+C handling")?;
    let config = SerialConfig::default();

    launch(&config, SerialConnection::open, &interrupt, std::io::stdout())
        .with_context(|| format!("monitoring {}", config.port_name))?;
    Ok(())
}
