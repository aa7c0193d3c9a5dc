//! `mic-monitor` command line entry point.
//!
//! Run with: cargo run --release -- -b 64
//!
//! Exit codes: 0 on normal exit (including `--help` and `--version`), 1 on
//! bad arguments or when the audio path can't be set up.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{Arg, ArgAction, CommandFactory, FromArgMatches, Parser};
use tracing_subscriber::EnvFilter;

use mic_monitor::{AudioDevice, BufferPeriod, Controller, MonitorConfig, Session};

/// Low-latency microphone-to-speaker monitor
#[derive(Parser, Debug)]
#[command(name = "mic-monitor", version, about, long_about = None, disable_version_flag = true)]
struct Args {
    /// Hardware buffer period in frames (32, 64, 128 or 256); device default if omitted
    #[arg(short = 'b', long = "buffer-size", value_name = "FRAMES")]
    buffer_size: Option<u32>,

    /// Input device to capture from (case-insensitive name substring)
    #[arg(short, long, value_name = "NAME")]
    input: Option<String>,

    /// Output device to play to (case-insensitive name substring)
    #[arg(short, long, value_name = "NAME")]
    output: Option<String>,

    /// Initial gain, 0.0 to 3.0
    #[arg(short, long, default_value_t = 1.0, allow_negative_numbers = true)]
    gain: f32,

    /// List audio devices and exit
    #[arg(short, long)]
    list_devices: bool,
}

impl Args {
    /// Parse with `-v`/`--version` in place of clap's default `-V`.
    fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let command = Self::command().arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .action(ArgAction::Version)
                .help("Print version"),
        );
        let matches = command.try_get_matches_from(args)?;
        Self::from_arg_matches(&matches)
    }

    fn to_config(&self) -> mic_monitor::Result<MonitorConfig> {
        let mut config = MonitorConfig::default().with_gain(self.gain);
        if let Some(frames) = self.buffer_size {
            config = config.with_buffer_period(BufferPeriod::try_from(frames)?);
        }
        if let Some(name) = &self.input {
            config = config.with_input_device(name.as_str());
        }
        if let Some(name) = &self.output {
            config = config.with_output_device(name.as_str());
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    init_tracing();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> anyhow::Result<()> {
    if args.list_devices {
        list_devices();
        return Ok(());
    }

    let config = args.to_config()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))
            .context("failed to install signal handler")?;
    }

    // Dropped on every path out of this function, releasing both streams.
    let session = Session::open(&config).context("failed to open audio session")?;
    let info = session.info();
    println!("Input:  {} ({} ch, {})", info.input_name, info.input_channels, info.input_format);
    println!("Output: {} ({} ch, {})", info.output_name, info.output_channels, info.output_format);
    println!(
        "Rate:   {} Hz, period {} / {}",
        info.sample_rate,
        describe_period(info.input_period),
        describe_period(info.output_period)
    );

    session.start().context("failed to start monitoring")?;

    let controller = Controller::new(session.ring().clone(), &config, shutdown);
    controller.run().context("controller failed")?;
    Ok(())
}

fn describe_period(period: Option<u32>) -> String {
    match period {
        Some(frames) => format!("{} frames", frames),
        None => "device default".to_string(),
    }
}

fn list_devices() {
    println!("Input devices:");
    for device in AudioDevice::list_inputs() {
        println!("  {} ({} Hz, {} ch)", device.name(), device.sample_rate(), device.channels());
    }
    println!("Output devices:");
    for device in AudioDevice::list_outputs() {
        println!("  {} ({} Hz, {} ch)", device.name(), device.sample_rate(), device.channels());
    }
}
