//! Small utilities shared by the bar modules and key actions.
use std::{
    fs,
    path::{Path, PathBuf},
};

use time::{OffsetDateTime, UtcOffset};

use crate::{error::ReadError, spawn::Spawner, status::Shared};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sept", "Oct", "Nov", "Dec",
];

/// Month abbreviation for a 1-based month number.
pub fn month_abbrev(month: u8) -> &'static str {
    MONTHS.get(month.wrapping_sub(1) as usize).copied().unwrap_or("")
}

fn read_trimmed(path: &Path) -> Result<String, ReadError> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Read a sysfs style file holding a single integer.
pub fn read_file_int(path: impl AsRef<Path>) -> Result<i64, ReadError> {
    let path = path.as_ref();
    let value = read_trimmed(path)?;
    value.parse().map_err(|_| ReadError::Parse {
        path: path.to_path_buf(),
        value,
    })
}

pub fn read_file_float(path: impl AsRef<Path>) -> Result<f64, ReadError> {
    let path = path.as_ref();
    let value = read_trimmed(path)?;
    value.parse().map_err(|_| ReadError::Parse {
        path: path.to_path_buf(),
        value,
    })
}

/// Parse a helper's reply holding a single integer.
pub fn parse_reply_int(reply: &str) -> Result<i64, ReadError> {
    reply.trim().parse().map_err(|_| ReadError::NoOutput)
}

/// Render `pct` as a fixed width bar of `len` cells, e.g. `[#####-----]`.
pub fn percentage_to_progressbar(pct: i64, len: usize) -> String {
    let pct = pct.clamp(0, 100) as usize;
    let filled = (pct * len + 50) / 100;
    let mut s = String::with_capacity(len + 2);
    s.push('[');
    s.extend(std::iter::repeat('#').take(filled));
    s.extend(std::iter::repeat('-').take(len - filled));
    s.push(']');
    s
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Critical,
}

impl Urgency {
    fn as_str(self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::Critical => "critical",
        }
    }
}

/// Desktop notification through `notify-send`. A zero timeout uses the daemon default.
pub fn notify(spawner: &dyn Spawner, title: &str, body: &str, urgency: Urgency, timeout_ms: u32) {
    let timeout = timeout_ms.to_string();
    let mut argv = vec!["notify-send", "-u", urgency.as_str()];
    if timeout_ms > 0 {
        argv.extend(["-t", timeout.as_str()]);
    }
    argv.extend([title, body]);
    spawner.spawn(&argv);
}

/// Number of entries in `dir`, treating a missing directory as empty.
fn count_entries(dir: &Path) -> usize {
    fs::read_dir(dir).map(|it| it.count()).unwrap_or(0)
}

/// File name for the next screenshot: a running number followed by the time it was taken.
pub fn screenshot_path(dir: &Path, existing: usize, now: OffsetDateTime) -> PathBuf {
    dir.join(format!(
        "{:04}__{:02}-{}-{:04}__{:02}:{:02}.png",
        existing + 2,
        now.day(),
        month_abbrev(now.month() as u8),
        now.year(),
        now.hour(),
        now.minute(),
    ))
}

/// Take a screenshot with `scrot`, of the whole screen or an interactive
/// selection, and tell the user where it went.
pub fn take_screenshot(spawner: &dyn Spawner, dir: &Path, select: bool, offset: UtcOffset) {
    let now = OffsetDateTime::now_utc().to_offset(offset);
    let path = screenshot_path(dir, count_entries(dir), now);
    let target = path.to_string_lossy().into_owned();
    if select {
        spawner.spawn(&["scrot", "-s", &target]);
    } else {
        spawner.spawn(&["scrot", &target]);
    }
    let body = format!("Took screenshot with name\n{}", target);
    notify(spawner, "Screenshot", &body, Urgency::Normal, 0);
}

/// Apply a keyboard layout with `setxkbmap`.
pub fn set_keyboard_layout(spawner: &dyn Spawner, layout: &str) {
    spawner.spawn(&["setxkbmap", layout]);
}

/// Move to the next configured keyboard layout, wrapping around.
pub fn cycle_keyboard_layout(spawner: &dyn Spawner, layouts: &[&str], current: &Shared<usize>) {
    if layouts.is_empty() {
        return;
    }
    let next = current.update(|i| {
        *i = (*i + 1) % layouts.len();
        *i
    });
    info!("switching keyboard layout to {}", layouts[next]);
    set_keyboard_layout(spawner, layouts[next]);
}

/// Offset of the local timezone, UTC when it cannot be determined.
///
/// The lookup is refused once other threads exist, so this runs during start-up.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}
