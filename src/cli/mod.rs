//! CLI argument definitions.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};

use crate::adapter::PhotoSize;
use crate::shoot_mode::{DriveMode, SelfTimer};

/// Wi-Fi remote control for RICOH GR II / GR III / GR IIIx cameras.
///
/// Robot mode: use --json (or --robot) for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "grctl", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit JSON instead of text
    #[arg(long, visible_alias = "robot", global = true, env = "GR_JSON")]
    pub json: bool,

    /// Camera address (overrides the config file)
    #[arg(long, global = true, env = "GR_HOST")]
    pub host: Option<String>,

    /// Config file (default: ~/.config/grctl/config.toml)
    #[arg(long, short = 'c', global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Camera state ===
    /// Show the detected model and its device properties
    Info,

    /// Query the camera's status endpoint
    Status,

    /// Stream camera events until interrupted
    Watch(WatchArgs),

    // === Capture ===
    /// Take a photo, optionally focusing on a point first
    Shoot(ShootArgs),

    /// Lock focus on a point (percent of the frame)
    Focus(FocusArgs),

    /// Write capture settings (e.g. `grctl set av=4.0 iso=200`)
    Set(SetArgs),

    /// List dial modes, or switch to one
    Dial(DialArgs),

    /// Set drive mode and self-timer (GR III)
    ShootMode(ShootModeArgs),

    /// Send a raw command string to the command endpoint
    Cmd(CmdArgs),

    // === Media ===
    /// List photo directories on the card (GR III)
    Photos,

    /// Print the download URL for a photo
    PhotoUrl(PhotoUrlArgs),

    /// Print the live view stream URL
    LiveviewUrl,

    // === Device ===
    /// Turn the camera off
    PowerOff,

    /// Show version and build information
    Version,
}

// === Argument Structs ===

#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Poll every N milliseconds for a short burst before returning to the
    /// configured interval
    #[arg(long, value_name = "MS")]
    pub fast: Option<u64>,

    /// Number of fast polls
    #[arg(long, default_value = "10", requires = "fast")]
    pub cycles: u32,

    /// Exit after this many events
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct ShootArgs {
    /// Focus point as X,Y percentages (camera autofocus if omitted)
    #[arg(long, value_name = "X,Y")]
    pub at: Option<Point>,
}

#[derive(Parser, Debug)]
pub struct FocusArgs {
    /// Horizontal position, 0-100
    pub x: f64,
    /// Vertical position, 0-100
    pub y: f64,
}

#[derive(Parser, Debug)]
pub struct SetArgs {
    /// KEY=VALUE pairs
    #[arg(required = true, value_name = "KEY=VALUE")]
    pub settings: Vec<Setting>,
}

#[derive(Parser, Debug)]
pub struct DialArgs {
    /// Mode to switch to (lists modes when omitted)
    pub mode: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ShootModeArgs {
    /// single, continuous, auto-bracket, multi-exposure, interval,
    /// interval-composite
    pub drive: DriveMode,

    /// off, 2s, 10s
    #[arg(default_value = "off")]
    pub timer: SelfTimer,
}

#[derive(Parser, Debug)]
pub struct CmdArgs {
    /// Command text, sent verbatim
    pub command: String,
}

#[derive(Parser, Debug)]
pub struct PhotoUrlArgs {
    /// Directory name, e.g. 100RICOH
    pub dir: String,

    /// File name, e.g. R0000001.JPG
    pub file: String,

    /// Rendition
    #[arg(long, short = 's', default_value = "large")]
    pub size: SizeArg,
}

/// Photo rendition on the command line.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum SizeArg {
    #[value(alias = "thumb")]
    Thumbnail,
    Small,
    #[default]
    Large,
}

impl From<SizeArg> for PhotoSize {
    fn from(size: SizeArg) -> Self {
        match size {
            SizeArg::Thumbnail => Self::Thumbnail,
            SizeArg::Small => Self::Small,
            SizeArg::Large => Self::Large,
        }
    }
}

/// `X,Y` pair of frame percentages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl FromStr for Point {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("expected X,Y, got '{s}'"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid coordinate '{part}': {e}"))
        };
        Ok(Self {
            x: parse(x)?,
            y: parse(y)?,
        })
    }
}

/// One `KEY=VALUE` capture setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

impl FromStr for Setting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(Self {
                key: key.trim().to_string(),
                value: value.to_string(),
            }),
            _ => Err(format!("expected KEY=VALUE, got '{s}'")),
        }
    }
}
