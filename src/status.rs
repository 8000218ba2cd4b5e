//! Shared status fed by background workers and read by the bar modules.
//!
//! Workers never see the client/monitor model. Each status domain sits behind
//! its own lock and readers copy the value out before drawing.
use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use lazy_static::lazy_static;
use parking_lot::Mutex;
use regex::Regex;

use crate::{helpers::parse_reply_int, spawn::Spawner};

/// A value shared between threads with copy-out reads.
#[derive(Debug, Default)]
pub struct Shared<T>(Arc<Mutex<T>>);

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared(Arc::clone(&self.0))
    }
}

impl<T: Clone> Shared<T> {
    pub fn new(value: T) -> Shared<T> {
        Shared(Arc::new(Mutex::new(value)))
    }

    /// Copy of the current value; the lock is released before returning.
    pub fn snapshot(&self) -> T {
        self.0.lock().clone()
    }

    pub fn set(&self, value: T) {
        *self.0.lock() = value;
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.lock())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connectivity {
    pub ethernet: bool,
    pub wifi: bool,
    pub ssid: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaStatus {
    pub state: PlayState,
    pub song: String,
    /// `elapsed/total` as printed by mpc
    pub progress: String,
    pub percent: Option<u32>,
}

/// Output volume as last reported by the mixer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioStatus {
    pub muted: bool,
    /// None until the mixer gave a usable answer
    pub volume: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateStatus {
    pub enabled: bool,
    pub checking: bool,
    /// Result of the last completed check
    pub pending: Option<usize>,
}

impl Default for UpdateStatus {
    fn default() -> Self {
        UpdateStatus {
            enabled: true,
            checking: false,
            pending: None,
        }
    }
}

/// Runs package update checks in the background, one at a time.
///
/// Results of a check that is already running are always committed, even if
/// checking was switched off in the meantime. The enabled flag only gates
/// starting new checks.
#[derive(Clone)]
pub struct UpdateChecker {
    state: Shared<UpdateStatus>,
    spawner: Arc<dyn Spawner>,
    command: &'static [&'static str],
}

impl UpdateChecker {
    pub fn new(spawner: Arc<dyn Spawner>, command: &'static [&'static str]) -> UpdateChecker {
        UpdateChecker {
            state: Shared::default(),
            spawner,
            command,
        }
    }

    pub fn status(&self) -> UpdateStatus {
        self.state.snapshot()
    }

    /// Start a check unless one is in flight. Returns the worker when one was started.
    pub fn trigger(&self) -> Option<JoinHandle<()>> {
        let start = self.state.update(|s| {
            if s.checking {
                false
            } else {
                s.checking = true;
                true
            }
        });
        if !start {
            debug!("update check already in flight");
            return None;
        }

        let this = self.clone();
        let spawned = thread::Builder::new()
            .name("update-check".into())
            .spawn(move || this.check());
        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("unable to start update check: {}", e);
                self.state.update(|s| s.checking = false);
                None
            }
        }
    }

    fn check(&self) {
        let pending = self.spawner.count_lines(self.command);
        debug!("{} pending updates", pending);
        self.state.update(|s| {
            s.pending = Some(pending);
            s.checking = false;
        });
    }

    /// Flip the enabled flag. Turning checks on starts one right away.
    pub fn toggle(&self) -> Option<JoinHandle<()>> {
        let enabled = self.state.update(|s| {
            s.enabled = !s.enabled;
            s.enabled
        });
        info!("update checks {}", if enabled { "enabled" } else { "disabled" });
        if enabled {
            self.trigger()
        } else {
            None
        }
    }

    /// Scheduled check: only runs while enabled
    pub fn periodic(&self) -> Option<JoinHandle<()>> {
        if self.status().enabled {
            self.trigger()
        } else {
            None
        }
    }
}

/// Everything the bar modules read that is produced off the main thread.
#[derive(Clone)]
pub struct StatusState {
    pub connectivity: Shared<Connectivity>,
    pub media: Shared<MediaStatus>,
    pub audio: Shared<AudioStatus>,
    /// Whether the VPN unit is active
    pub vpn: Shared<bool>,
    pub updates: UpdateChecker,
    /// Index into the configured keyboard layouts
    pub keyboard: Shared<usize>,
}

impl StatusState {
    pub fn new(spawner: Arc<dyn Spawner>, update_cmd: &'static [&'static str]) -> StatusState {
        StatusState {
            connectivity: Shared::default(),
            media: Shared::default(),
            audio: Shared::default(),
            vpn: Shared::default(),
            updates: UpdateChecker::new(spawner, update_cmd),
            keyboard: Shared::new(0),
        }
    }
}

lazy_static! {
    static ref MPC_STATE: Regex =
        Regex::new(r"^\[(playing|paused)\]\s+#\d+/\d+\s+((?:\d+:)*\d+/(?:\d+:)*\d+)\s+\((\d+)%\)")
            .expect("valid mpc status pattern");
    static ref ETHERNET_LINE: Regex = Regex::new("ethernet").expect("valid ethernet pattern");
    static ref WIFI_LINE: Regex = Regex::new("^yes").expect("valid wifi pattern");
}

/// Parse `mpc status` output into a state, `elapsed/total` and percentage.
pub fn parse_mpc_status(output: &str) -> (PlayState, String, Option<u32>) {
    for line in output.lines() {
        if let Some(caps) = MPC_STATE.captures(line) {
            let state = if &caps[1] == "playing" {
                PlayState::Playing
            } else {
                PlayState::Paused
            };
            return (state, caps[2].to_string(), caps[3].parse().ok());
        }
    }
    (PlayState::Stopped, String::new(), None)
}

/// `nmcli -t -f STATE,TYPE device` lines mentioning ethernet: connected when the first starts with `connected:`
pub fn parse_ethernet(lines: &[String]) -> bool {
    lines.first().map_or(false, |l| l.starts_with("connected:"))
}

/// `nmcli -t -f ACTIVE,SSID device wifi` lines starting with `yes`: the active SSID
pub fn parse_ssid(lines: &[String]) -> Option<String> {
    lines
        .first()
        .and_then(|l| l.strip_prefix("yes:"))
        .map(str::to_string)
}

fn poll_media(spawner: &dyn Spawner) -> MediaStatus {
    let (state, progress, percent) = parse_mpc_status(&spawner.capture(&["mpc", "status"]));
    if state == PlayState::Stopped {
        return MediaStatus::default();
    }
    let song = spawner
        .capture(&["mpc", "current"])
        .lines()
        .next()
        .unwrap_or("")
        .to_string();
    MediaStatus {
        state,
        song,
        progress,
        percent,
    }
}

/// Ask the mixer for the mute state and the volume.
pub fn poll_audio(spawner: &dyn Spawner, mute_cmd: &[&str], volume_cmd: &[&str]) -> AudioStatus {
    let muted = spawner.capture(mute_cmd).trim() == "true";
    let volume = match parse_reply_int(&spawner.capture(volume_cmd)) {
        Ok(v) => Some(v),
        Err(e) => {
            trace!("volume: {}", e);
            None
        }
    };
    AudioStatus { muted, volume }
}

fn poll_vpn(spawner: &dyn Spawner, status_cmd: &[&str]) -> bool {
    spawner.spawn_wait(status_cmd) == Some(0)
}

fn poll_connectivity(spawner: &dyn Spawner, dev_cmd: &[&str], wifi_cmd: &[&str]) -> Connectivity {
    let ethernet = parse_ethernet(&spawner.capture_filtered(dev_cmd, &ETHERNET_LINE));
    let ssid = parse_ssid(&spawner.capture_filtered(wifi_cmd, &WIFI_LINE));
    Connectivity {
        ethernet,
        wifi: ssid.is_some(),
        ssid: ssid.unwrap_or_default(),
    }
}

/// Run `f` forever on a named thread: wait `delay`, then call it every `period`.
pub fn every<F>(name: &str, delay: Duration, period: Duration, mut f: F) -> io::Result<JoinHandle<()>>
where
    F: FnMut() + Send + 'static,
{
    thread::Builder::new().name(name.into()).spawn(move || {
        thread::sleep(delay);
        loop {
            f();
            thread::sleep(period);
        }
    })
}

/// Commands the workers shell out to.
#[derive(Debug, Clone, Copy)]
pub struct WorkerCommands {
    pub nmcli_devices: &'static [&'static str],
    pub nmcli_wifi: &'static [&'static str],
    pub volume_get: &'static [&'static str],
    pub mute_get: &'static [&'static str],
    /// Exits 0 while the VPN is up
    pub vpn_status: &'static [&'static str],
}

/// Start the long lived pollers. `redraw` is called by the bar refresh timer.
pub fn start_workers<R>(
    status: &StatusState,
    spawner: Arc<dyn Spawner>,
    cmds: WorkerCommands,
    bar_refresh: Duration,
    redraw: R,
) -> io::Result<()>
where
    R: Fn() + Send + 'static,
{
    info!("starting status workers");
    let refresh = bar_refresh + Duration::from_secs(1);
    every("bar-refresh", refresh, refresh, redraw)?;

    let media = status.media.clone();
    let sp = Arc::clone(&spawner);
    every("mpc", Duration::ZERO, Duration::from_secs(2), move || {
        media.set(poll_media(sp.as_ref()))
    })?;

    let audio = status.audio.clone();
    let sp = Arc::clone(&spawner);
    every("audio", Duration::ZERO, Duration::from_secs(2), move || {
        audio.set(poll_audio(sp.as_ref(), cmds.mute_get, cmds.volume_get))
    })?;

    let vpn = status.vpn.clone();
    let sp = Arc::clone(&spawner);
    every("vpn", Duration::ZERO, Duration::from_secs(10), move || {
        vpn.set(poll_vpn(sp.as_ref(), cmds.vpn_status))
    })?;

    let updates = status.updates.clone();
    every("updates", Duration::from_secs(5), Duration::from_secs(900), move || {
        updates.periodic();
    })?;

    let connectivity = status.connectivity.clone();
    every("connectivity", Duration::ZERO, Duration::from_secs(6), move || {
        connectivity.set(poll_connectivity(spawner.as_ref(), cmds.nmcli_devices, cmds.nmcli_wifi))
    })?;

    Ok(())
}
