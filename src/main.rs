use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use facecount::report::{JsonLinesSink, ReportSink};
use facecount::sensor::{self, DynSensor};
use facecount::{boot, config, counter::Counter, storage};
use facecount_sensor::{BaudRate, Parity, StopBits};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "facecount")]
#[command(
    version,
    about = "People counter for the DFRobot gesture/face detection module"
)]
struct Cli {
    /// Config file (defaults to the system-wide one)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the module's product and vendor IDs
    PidVid,
    /// Set face/gesture score thresholds and detection range (0-100)
    Configure {
        #[arg(long)]
        face: Option<u16>,
        #[arg(long)]
        gesture: Option<u16>,
        #[arg(long)]
        range: Option<u16>,
    },
    /// Change the module's serial settings and address
    ConfigUart {
        #[arg(long, default_value_t = 115200)]
        baud: u32,
        #[arg(long, value_enum, default_value_t = ParityArg::None)]
        parity: ParityArg,
        #[arg(long, value_enum, default_value_t = StopBitsArg::One)]
        stop_bits: StopBitsArg,
        /// New device address, e.g. 0x72
        #[arg(long, value_parser = parse_address)]
        address: Option<u8>,
    },
    /// Print thresholds, then faces and gestures as they are detected
    Detect,
    /// Run the people counter
    Count,
    /// Open config file in editor
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum ParityArg {
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl From<ParityArg> for Parity {
    fn from(arg: ParityArg) -> Self {
        match arg {
            ParityArg::None => Parity::None,
            ParityArg::Odd => Parity::Odd,
            ParityArg::Even => Parity::Even,
            ParityArg::Mark => Parity::Mark,
            ParityArg::Space => Parity::Space,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StopBitsArg {
    #[value(name = "0.5")]
    Half,
    #[value(name = "1")]
    One,
    #[value(name = "1.5")]
    OneAndHalf,
    #[value(name = "2")]
    Two,
}

impl From<StopBitsArg> for StopBits {
    fn from(arg: StopBitsArg) -> Self {
        match arg {
            StopBitsArg::Half => StopBits::Half,
            StopBitsArg::One => StopBits::One,
            StopBitsArg::OneAndHalf => StopBits::OneAndHalf,
            StopBitsArg::Two => StopBits::Two,
        }
    }
}

fn parse_address(s: &str) -> std::result::Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid address {:?}: {}", s, e))
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::PidVid => pid_vid(&cfg),
        Commands::Configure {
            face,
            gesture,
            range,
        } => configure(
            &cfg,
            face.unwrap_or(cfg.face_threshold),
            gesture.unwrap_or(cfg.gesture_threshold),
            range.unwrap_or(cfg.detect_range),
        ),
        Commands::ConfigUart {
            baud,
            parity,
            stop_bits,
            address,
        } => config_uart(
            &cfg,
            BaudRate::from_bits_per_second(baud)?,
            parity.into(),
            stop_bits.into(),
            address.unwrap_or(cfg.transport.address()),
        ),
        Commands::Detect => detect(&cfg),
        Commands::Count => count(&cfg),
        Commands::Config => open_config(cli.config),
    }
}

/// Open the configured bus and block until the module answers.
fn connect(cfg: &config::Config) -> Result<DynSensor> {
    let mut gfd = sensor::open(cfg).context("Failed to open sensor")?;
    boot::wait_for_device(&mut gfd, &cfg.boot_policy(), std::thread::sleep)?;
    Ok(gfd)
}

fn pid_vid(cfg: &config::Config) -> Result<()> {
    let mut gfd = connect(cfg)?;
    let pid = gfd.read_pid().context("Failed to read PID")?;
    println!("PID: {}", pid);
    let vid = gfd.read_vid().context("Failed to read VID")?;
    println!("VID: {}", vid);
    Ok(())
}

/// Write the three thresholds, reporting each outcome without stopping.
fn apply_thresholds(gfd: &mut DynSensor, face: u16, gesture: u16, range: u16) {
    match gfd.set_face_detect_thres(face) {
        Ok(true) => info!("Face detection threshold set to {}.", face),
        Ok(false) => warn!("Set the face detection threshold fail."),
        Err(e) => warn!("Set the face detection threshold fail: {}", e),
    }
    match gfd.set_gesture_detect_thres(gesture) {
        Ok(true) => info!("Gesture detection threshold set to {}.", gesture),
        Ok(false) => warn!("Set the gesture detection threshold fail."),
        Err(e) => warn!("Set the gesture detection threshold fail: {}", e),
    }
    match gfd.set_detect_thres(range) {
        Ok(true) if range == 100 => info!("Detection range set to maximum."),
        Ok(true) => info!("Detection range set to {}.", range),
        Ok(false) => warn!("Set the gesture detection range fail."),
        Err(e) => warn!("Set the gesture detection range fail: {}", e),
    }
}

fn configure(cfg: &config::Config, face: u16, gesture: u16, range: u16) -> Result<()> {
    let mut gfd = connect(cfg)?;
    apply_thresholds(&mut gfd, face, gesture, range);
    Ok(())
}

fn config_uart(
    cfg: &config::Config,
    baud: BaudRate,
    parity: Parity,
    stop_bits: StopBits,
    address: u8,
) -> Result<()> {
    let mut gfd = connect(cfg)?;

    if let config::Transport::I2c { .. } = cfg.transport {
        // I2C does not need any serial settings
        info!("I2C setup complete.");
        return Ok(());
    }

    match gfd.config_uart(baud, parity, stop_bits) {
        Ok(()) => {
            info!("UART configured success.");
            info!(
                "The module switches to {} baud after it restarts",
                baud.bits_per_second()
            );
        }
        Err(e) => warn!("UART configuration failed: {}", e),
    }
    match gfd.set_addr(address) {
        Ok(_) => info!("Device address set to: 0x{:x}", address),
        Err(e) => warn!("Failed to set device address: {}", e),
    }
    Ok(())
}

fn detect(cfg: &config::Config) -> Result<()> {
    let mut gfd = connect(cfg)?;

    println!(
        "face detection threshold: {}",
        gfd.get_face_detect_thres()?
    );
    println!(
        "gesture detection threshold: {}",
        gfd.get_gesture_detect_thres()?
    );
    println!("gesture detection range: {}", gfd.get_detect_thres()?);

    loop {
        match gfd.read_detection() {
            Ok(detection) if detection.has_face() => {
                println!(
                    "Detect face at (x = {}, y = {}, score = {})",
                    detection.face_x, detection.face_y, detection.face_score
                );
                match detection.gesture {
                    Some(gesture) => println!(
                        "Detect gesture {} ({}), score = {}",
                        gesture.code(),
                        gesture,
                        detection.gesture_score
                    ),
                    None => println!("Detect gesture 0, score = {}", detection.gesture_score),
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Detection failed: {}", e),
        }

        std::thread::sleep(cfg.poll_interval());
    }
}

fn count(cfg: &config::Config) -> Result<()> {
    let mut gfd = connect(cfg)?;
    apply_thresholds(
        &mut gfd,
        cfg.face_threshold,
        cfg.gesture_threshold,
        cfg.detect_range,
    );

    let state_path = cfg.state_path();
    let state = storage::load_state(&state_path, chrono::Utc::now())?;
    let sink: Box<dyn ReportSink> = match &cfg.report_path {
        Some(path) => Box::new(JsonLinesSink::append(path)?),
        None => Box::new(JsonLinesSink::new(std::io::stdout())),
    };

    let mut counter = Counter::new(
        gfd,
        sink,
        state,
        state_path,
        std::time::Duration::from_secs(cfg.report_interval_secs),
    );
    counter.run(cfg.poll_interval())
}

fn open_config(path: Option<PathBuf>) -> Result<()> {
    let config_path = path.unwrap_or_else(|| config::CONFIG_PATH.to_path_buf());
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(&config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
