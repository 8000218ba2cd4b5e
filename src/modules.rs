//! The bar modules.
//!
//! Modules only read shared status or the filesystem. Helpers run from the
//! status workers or from a click. They never touch the window manager state.
use std::{path::PathBuf, sync::Arc};

use parking_lot::Mutex;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, UtcOffset};

use crate::{
    bar::{BarModule, ModuleOutput},
    helpers::{self, month_abbrev, percentage_to_progressbar, Urgency},
    spawn::Spawner,
    status::{
        poll_audio, AudioStatus, Connectivity, MediaStatus as Media, PlayState, Shared, StatusState, UpdateChecker,
    },
};

const WEEKDAY: &[FormatItem<'static>] = format_description!("[weekday repr:short]");

const BUTTON_LEFT: u8 = 1;
const BUTTON_RIGHT: u8 = 3;
const SCROLL_UP: u8 = 4;
const SCROLL_DOWN: u8 = 5;

/// Accent strip colours by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accents {
    pub good: u32,
    pub warn: u32,
    pub bad: u32,
}

/// Every module the bar knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Date,
    KeyboardLayout,
    Battery,
    Brightness,
    Volume,
    Updates,
    OpenVpn,
    Wired,
    Wireless,
    MediaStatus,
    MediaPrev,
    MediaPlayPause,
    MediaStop,
    MediaNext,
}

/// External commands used by modules
#[derive(Debug, Clone, Copy)]
pub struct ModuleCommands {
    pub volume_get: &'static [&'static str],
    pub mute_get: &'static [&'static str],
    pub volume_up: &'static [&'static str],
    pub volume_down: &'static [&'static str],
    pub volume_mute: &'static [&'static str],
    pub mixer: &'static [&'static str],
    pub brightness_up: &'static [&'static str],
    pub brightness_down: &'static [&'static str],
}

/// What modules are built from
#[derive(Clone)]
pub struct ModuleContext {
    pub spawner: Arc<dyn Spawner>,
    pub status: StatusState,
    pub commands: ModuleCommands,
    pub accents: Accents,
    pub keyboard_layouts: &'static [&'static str],
    pub battery_dir: PathBuf,
    pub backlight_dir: PathBuf,
    pub offset: UtcOffset,
}

pub fn build(kind: ModuleKind, ctx: &ModuleContext) -> Box<dyn BarModule> {
    let spawner = Arc::clone(&ctx.spawner);
    match kind {
        ModuleKind::Date => Box::new(Date { offset: ctx.offset }),
        ModuleKind::KeyboardLayout => Box::new(KeyboardLayout {
            layouts: ctx.keyboard_layouts,
            current: ctx.status.keyboard.clone(),
            spawner,
        }),
        ModuleKind::Battery => Box::new(Battery {
            dir: ctx.battery_dir.clone(),
            accents: ctx.accents,
            alarm: Mutex::new(Alarm::None),
            spawner,
        }),
        ModuleKind::Brightness => Box::new(Brightness {
            dir: ctx.backlight_dir.clone(),
            up: ctx.commands.brightness_up,
            down: ctx.commands.brightness_down,
            spawner,
        }),
        ModuleKind::Volume => Box::new(Volume {
            audio: ctx.status.audio.clone(),
            cmds: ctx.commands,
            spawner,
        }),
        ModuleKind::Updates => Box::new(Updates {
            checker: ctx.status.updates.clone(),
            accents: ctx.accents,
        }),
        ModuleKind::OpenVpn => Box::new(OpenVpn {
            up: ctx.status.vpn.clone(),
            accent: ctx.accents.good,
        }),
        ModuleKind::Wired => Box::new(Wired(ctx.status.connectivity.clone())),
        ModuleKind::Wireless => Box::new(Wireless(ctx.status.connectivity.clone())),
        ModuleKind::MediaStatus => Box::new(MediaSong(ctx.status.media.clone())),
        ModuleKind::MediaPrev => Box::new(MediaControl::new(ctx, spawner, MediaButton::Prev)),
        ModuleKind::MediaPlayPause => Box::new(MediaControl::new(ctx, spawner, MediaButton::PlayPause)),
        ModuleKind::MediaStop => Box::new(MediaControl::new(ctx, spawner, MediaButton::Stop)),
        ModuleKind::MediaNext => Box::new(MediaControl::new(ctx, spawner, MediaButton::Next)),
    }
}

/// e.g. ` Mon 04/Sept/2023    07:05`
pub fn format_date(now: OffsetDateTime) -> String {
    let weekday = now.format(WEEKDAY).unwrap_or_default();
    format!(
        " {} {:02}/{}/{}    {:02}:{:02}",
        weekday,
        now.day(),
        month_abbrev(now.month() as u8),
        now.year(),
        now.hour(),
        now.minute()
    )
}

struct Date {
    offset: UtcOffset,
}

impl BarModule for Date {
    fn compute(&self) -> ModuleOutput {
        ModuleOutput::text(format_date(OffsetDateTime::now_utc().to_offset(self.offset)))
    }
}

struct KeyboardLayout {
    layouts: &'static [&'static str],
    current: Shared<usize>,
    spawner: Arc<dyn Spawner>,
}

impl BarModule for KeyboardLayout {
    fn compute(&self) -> ModuleOutput {
        let i = self.current.snapshot();
        self.layouts
            .get(i)
            .map(|l| ModuleOutput::text(l.to_uppercase()))
            .unwrap_or_default()
    }

    fn on_click(&self, _: u16, button: u8) -> bool {
        if button != BUTTON_LEFT {
            return false;
        }
        helpers::cycle_keyboard_layout(self.spawner.as_ref(), self.layouts, &self.current);
        true
    }
}

/// Battery notifications already sent since the last charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Alarm {
    None,
    Low,
    Critical,
}

pub const BATTERY_LOW: i64 = 15;
pub const BATTERY_CRITICAL: i64 = 5;

/// Next alarm state, and the alarm to raise now if any.
pub fn battery_alarm(prev: Alarm, capacity: i64, charging: bool) -> (Alarm, Option<Alarm>) {
    if charging {
        return (Alarm::None, None);
    }
    let level = if capacity <= BATTERY_CRITICAL {
        Alarm::Critical
    } else if capacity <= BATTERY_LOW {
        Alarm::Low
    } else {
        Alarm::None
    };
    if level > prev {
        (level, Some(level))
    } else {
        (prev, None)
    }
}

struct Battery {
    dir: PathBuf,
    accents: Accents,
    alarm: Mutex<Alarm>,
    spawner: Arc<dyn Spawner>,
}

impl BarModule for Battery {
    fn compute(&self) -> ModuleOutput {
        let capacity = match helpers::read_file_int(self.dir.join("capacity")) {
            Ok(c) => c,
            Err(e) => {
                trace!("battery: {}", e);
                return ModuleOutput::empty();
            }
        };
        let charging = std::fs::read_to_string(self.dir.join("status"))
            .map(|s| s.trim() == "Charging")
            .unwrap_or(false);

        let raise = {
            let mut alarm = self.alarm.lock();
            let (next, raise) = battery_alarm(*alarm, capacity, charging);
            *alarm = next;
            raise
        };
        match raise {
            Some(Alarm::Critical) => helpers::notify(
                self.spawner.as_ref(),
                "Battery critical",
                &format!("{}% left, plug in now", capacity),
                Urgency::Critical,
                0,
            ),
            Some(Alarm::Low) => helpers::notify(
                self.spawner.as_ref(),
                "Battery low",
                &format!("{}% left", capacity),
                Urgency::Normal,
                10_000,
            ),
            _ => {}
        }

        let accent = if capacity <= BATTERY_LOW {
            self.accents.bad
        } else if capacity <= 40 {
            self.accents.warn
        } else {
            self.accents.good
        };
        let marker = if charging { "+" } else { "" };
        ModuleOutput::accented(format!("BAT {}{}%", marker, capacity), accent)
    }
}

struct Brightness {
    dir: PathBuf,
    up: &'static [&'static str],
    down: &'static [&'static str],
    spawner: Arc<dyn Spawner>,
}

impl BarModule for Brightness {
    fn compute(&self) -> ModuleOutput {
        let current = helpers::read_file_float(self.dir.join("brightness"));
        let max = helpers::read_file_float(self.dir.join("max_brightness"));
        match (current, max) {
            (Ok(c), Ok(m)) if m > 0.0 => {
                let pct = (c / m * 100.0).round() as i64;
                ModuleOutput::text(format!("BRI {}", percentage_to_progressbar(pct, 10)))
            }
            _ => ModuleOutput::empty(),
        }
    }

    fn on_click(&self, _: u16, button: u8) -> bool {
        let cmd = match button {
            SCROLL_UP => self.up,
            SCROLL_DOWN => self.down,
            _ => return false,
        };
        self.spawner.spawn_wait(cmd);
        true
    }
}

struct Volume {
    audio: Shared<AudioStatus>,
    cmds: ModuleCommands,
    spawner: Arc<dyn Spawner>,
}

impl BarModule for Volume {
    fn compute(&self) -> ModuleOutput {
        let audio = self.audio.snapshot();
        if audio.muted {
            return ModuleOutput::text("VOL mute");
        }
        match audio.volume {
            Some(v) => ModuleOutput::text(format!("VOL {}", percentage_to_progressbar(v, 10))),
            None => ModuleOutput::empty(),
        }
    }

    fn on_click(&self, _: u16, button: u8) -> bool {
        let cmd = match button {
            BUTTON_LEFT => self.cmds.volume_mute,
            BUTTON_RIGHT => {
                self.spawner.spawn(self.cmds.mixer);
                return false;
            }
            SCROLL_UP => self.cmds.volume_up,
            SCROLL_DOWN => self.cmds.volume_down,
            _ => return false,
        };
        self.spawner.spawn_wait(cmd);
        // show the change before the poller comes round
        self.audio
            .set(poll_audio(self.spawner.as_ref(), self.cmds.mute_get, self.cmds.volume_get));
        true
    }
}

struct Updates {
    checker: UpdateChecker,
    accents: Accents,
}

impl BarModule for Updates {
    fn compute(&self) -> ModuleOutput {
        let s = self.checker.status();
        if !s.enabled && !s.checking {
            return ModuleOutput::text("UPD off");
        }
        if s.checking {
            return ModuleOutput::text("UPD ...");
        }
        match s.pending {
            Some(0) => ModuleOutput::accented("UPD 0", self.accents.good),
            Some(n) => ModuleOutput::accented(format!("UPD {}", n), self.accents.warn),
            None => ModuleOutput::text("UPD ?"),
        }
    }

    fn on_click(&self, _: u16, button: u8) -> bool {
        match button {
            BUTTON_LEFT => {
                self.checker.trigger();
                true
            }
            BUTTON_RIGHT => {
                self.checker.toggle();
                true
            }
            _ => false,
        }
    }
}

struct OpenVpn {
    up: Shared<bool>,
    accent: u32,
}

impl BarModule for OpenVpn {
    fn compute(&self) -> ModuleOutput {
        if self.up.snapshot() {
            ModuleOutput::accented("VPN", self.accent)
        } else {
            ModuleOutput::empty()
        }
    }
}

struct Wired(Shared<Connectivity>);

impl BarModule for Wired {
    fn compute(&self) -> ModuleOutput {
        if self.0.snapshot().ethernet {
            ModuleOutput::text("ETH")
        } else {
            ModuleOutput::empty()
        }
    }
}

struct Wireless(Shared<Connectivity>);

impl BarModule for Wireless {
    fn compute(&self) -> ModuleOutput {
        let c = self.0.snapshot();
        if c.wifi {
            ModuleOutput::text(format!("WIFI {}", c.ssid))
        } else {
            ModuleOutput::empty()
        }
    }
}

struct MediaSong(Shared<Media>);

impl BarModule for MediaSong {
    fn compute(&self) -> ModuleOutput {
        let m = self.0.snapshot();
        match m.state {
            PlayState::Stopped => ModuleOutput::empty(),
            _ => ModuleOutput::text(format!("{} [{}]", m.song, m.progress)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaButton {
    Prev,
    PlayPause,
    Stop,
    Next,
}

struct MediaControl {
    media: Shared<Media>,
    button: MediaButton,
    spawner: Arc<dyn Spawner>,
}

impl MediaControl {
    fn new(ctx: &ModuleContext, spawner: Arc<dyn Spawner>, button: MediaButton) -> MediaControl {
        MediaControl {
            media: ctx.status.media.clone(),
            button,
            spawner,
        }
    }
}

impl BarModule for MediaControl {
    fn compute(&self) -> ModuleOutput {
        let state = self.media.snapshot().state;
        let text = match (self.button, state) {
            (MediaButton::PlayPause, PlayState::Playing) => "||",
            (MediaButton::PlayPause, _) => ">",
            (_, PlayState::Stopped) => "",
            (MediaButton::Prev, _) => "<<",
            (MediaButton::Stop, _) => "[]",
            (MediaButton::Next, _) => ">>",
        };
        ModuleOutput::text(text)
    }

    fn on_click(&self, _: u16, button: u8) -> bool {
        if button != BUTTON_LEFT {
            return false;
        }
        let verb = match self.button {
            MediaButton::Prev => "prev",
            MediaButton::PlayPause => "toggle",
            MediaButton::Stop => "stop",
            MediaButton::Next => "next",
        };
        self.spawner.spawn_wait(&["mpc", verb]);
        // reflect the new state before the poller catches up
        let (state, progress, percent) = crate::status::parse_mpc_status(&self.spawner.capture(&["mpc", "status"]));
        self.media.update(|m| {
            m.state = state;
            m.progress = progress;
            m.percent = percent;
        });
        true
    }
}
