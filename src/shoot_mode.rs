//! Drive mode and self-timer encoding for GR III `shootMode`.
//!
//! The camera folds two orthogonal settings into one flat string. The forward
//! table is the source of truth; the reverse table is derived from it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::CameraError;

/// Drive mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriveMode {
    Single,
    Continuous,
    AutoBracket,
    MultiExposure,
    Interval,
    IntervalComposite,
}

impl DriveMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Continuous => "continuous",
            Self::AutoBracket => "auto-bracket",
            Self::MultiExposure => "multi-exposure",
            Self::Interval => "interval",
            Self::IntervalComposite => "interval-composite",
        }
    }
}

/// Self-timer option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SelfTimer {
    #[serde(rename = "off")]
    Off,
    #[serde(rename = "2s")]
    TwoSeconds,
    #[serde(rename = "10s")]
    TenSeconds,
}

impl SelfTimer {
    pub const ALL: [Self; 3] = [Self::Off, Self::TwoSeconds, Self::TenSeconds];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::TwoSeconds => "2s",
            Self::TenSeconds => "10s",
        }
    }
}

impl fmt::Display for DriveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SelfTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriveMode {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FORWARD
            .keys()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| CameraError::invalid(format!("unknown drive mode: {s}")))
    }
}

impl FromStr for SelfTimer {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CameraError::invalid(format!("unknown self-timer option: {s}")))
    }
}

/// A decoded flat shoot mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShootModeEntry {
    pub drive: DriveMode,
    pub timer: SelfTimer,
}

pub type ForwardTable = BTreeMap<DriveMode, BTreeMap<SelfTimer, &'static str>>;
pub type ReverseTable = BTreeMap<&'static str, ShootModeEntry>;

const ENTRIES: &[(DriveMode, SelfTimer, &str)] = &[
    (DriveMode::Single, SelfTimer::Off, "single"),
    (DriveMode::Single, SelfTimer::TwoSeconds, "self2s"),
    (DriveMode::Single, SelfTimer::TenSeconds, "self10s"),
    (DriveMode::Continuous, SelfTimer::Off, "continuous"),
    (DriveMode::Continuous, SelfTimer::TwoSeconds, "continuous_self2s"),
    (DriveMode::Continuous, SelfTimer::TenSeconds, "continuous_self10s"),
    (DriveMode::AutoBracket, SelfTimer::Off, "auto_bracket"),
    (DriveMode::AutoBracket, SelfTimer::TwoSeconds, "auto_bracket_self2s"),
    (DriveMode::AutoBracket, SelfTimer::TenSeconds, "auto_bracket_self10s"),
    (DriveMode::MultiExposure, SelfTimer::Off, "multi_exp"),
    (DriveMode::MultiExposure, SelfTimer::TwoSeconds, "multi_exp_self2s"),
    (DriveMode::MultiExposure, SelfTimer::TenSeconds, "multi_exp_self10s"),
    (DriveMode::Interval, SelfTimer::Off, "interval"),
    (DriveMode::IntervalComposite, SelfTimer::Off, "interval_comp"),
];

/// drive mode -> self-timer -> flat shoot mode.
pub static FORWARD: LazyLock<ForwardTable> = LazyLock::new(|| {
    let mut table = ForwardTable::new();
    for &(drive, timer, mode) in ENTRIES {
        table.entry(drive).or_default().insert(timer, mode);
    }
    table
});

/// flat shoot mode -> (drive mode, self-timer).
pub static REVERSE: LazyLock<ReverseTable> = LazyLock::new(|| build_reverse(&FORWARD));

/// Invert a forward table. Later entries win on duplicate flat strings.
pub fn build_reverse(forward: &ForwardTable) -> ReverseTable {
    forward
        .iter()
        .flat_map(|(&drive, timers)| {
            timers
                .iter()
                .map(move |(&timer, &mode)| (mode, ShootModeEntry { drive, timer }))
        })
        .collect()
}

/// All drive modes, in table order.
pub fn drive_modes() -> Vec<DriveMode> {
    FORWARD.keys().copied().collect()
}

/// Encode a drive mode and self-timer, falling back to the drive mode's
/// `off` variant when the combination does not exist.
pub fn encode(drive: DriveMode, timer: SelfTimer) -> &'static str {
    FORWARD
        .get(&drive)
        .and_then(|timers| timers.get(&timer).or_else(|| timers.get(&SelfTimer::Off)))
        .copied()
        .unwrap_or(ENTRIES[0].2)
}

pub fn decode(mode: &str) -> Option<ShootModeEntry> {
    REVERSE.get(mode).copied()
}
