//! The compiled configuration. There is no runtime config file: edit and rebuild.
use std::path::PathBuf;

use x11::keysym::{
    XF86XK_AudioLowerVolume, XF86XK_AudioMute, XF86XK_AudioRaiseVolume, XF86XK_Calculator,
    XF86XK_KbdBrightnessDown, XF86XK_KbdBrightnessUp, XF86XK_MonBrightnessDown, XF86XK_MonBrightnessUp,
    XF86XK_PowerOff, XF86XK_ScreenSaver, XK_0, XK_Left, XK_Menu, XK_Print, XK_Return, XK_Right, XK_Tab,
    XK_apostrophe, XK_b, XK_comma, XK_d, XK_e, XK_f, XK_g, XK_j, XK_k, XK_m, XK_minus, XK_n, XK_period, XK_plus,
    XK_q, XK_s, XK_space, XK_t, XK_u, XK_x,
};

use crate::{
    bar::{BarStyle, Scheme},
    bindings::{mask, Action, Button, Click, Key},
    layout::{Gaps, Layout, LayoutKind},
    menu::PowerCommands,
    modules::{Accents, ModuleCommands, ModuleKind},
    monitor::MonitorDefaults,
    rules::Rule,
    status::WorkerCommands,
    tag::TagSet,
};

const MODKEY: u16 = mask::MOD4;

type Argv = &'static [&'static str];

/// External command lines
pub mod cmd {
    use super::Argv;

    pub const TERMINAL: Argv = &["st"];
    pub const LAUNCHER: Argv = &["rofi", "-show", "drun"];
    pub const LAUNCHER_BAR: Argv = &["rofi", "-show", "drun", "-location", "1", "-theme-str", "window {width: 100%;}"];
    pub const BROWSER: Argv = &["firefox"];
    pub const BROWSER_PRIVATE: Argv = &["firefox", "--private-window"];
    pub const CLAVIS: Argv = &["clavis"];
    pub const CALCULATOR: Argv = &["gnome-calculator"];

    pub const LOCK: Argv = &["slock"];
    pub const POWEROFF: Argv = &["systemctl", "poweroff"];
    pub const REBOOT: Argv = &["systemctl", "reboot"];
    pub const CHECK_UPDATES: Argv = &["checkupdates"];
    pub const VPN_STATUS: Argv = &["systemctl", "is-active", "--quiet", "openvpn-client@client"];
    pub const VPN_START: Argv = &["systemctl", "start", "openvpn-client@client"];
    pub const HOTSPOT: Argv = &["nmcli", "device", "wifi", "hotspot"];

    pub const VOLUME_GET: Argv = &["pamixer", "--get-volume"];
    pub const MUTE_GET: Argv = &["pamixer", "--get-mute"];
    pub const VOLUME_UP: Argv = &["pamixer", "-i", "5"];
    pub const VOLUME_DOWN: Argv = &["pamixer", "-d", "5"];
    pub const VOLUME_MUTE: Argv = &["pamixer", "-t"];
    pub const MIXER: Argv = &["pavucontrol"];

    pub const BRIGHTNESS_UP: Argv = &["brightnessctl", "set", "+5%"];
    pub const BRIGHTNESS_DOWN: Argv = &["brightnessctl", "set", "5%-"];
    pub const MONITOR_OFF: Argv = &["xset", "dpms", "force", "off"];
    pub const KBD_BRIGHTNESS_UP: Argv = &["brightnessctl", "--device=*kbd_backlight", "set", "+1"];
    pub const KBD_BRIGHTNESS_DOWN: Argv = &["brightnessctl", "--device=*kbd_backlight", "set", "1-"];

    pub const NMCLI_DEVICES: Argv = &["nmcli", "-t", "-f", "type,state", "device"];
    pub const NMCLI_WIFI: Argv = &["nmcli", "-t", "-f", "active,ssid", "device", "wifi"];
}

/// The main user facing configuration details
#[derive(Debug, Clone)]
pub struct Config {
    pub wm_name: &'static str,
    /// Tag labels, one per tag. At most 31.
    pub tags: Vec<&'static str>,
    pub rules: Vec<Rule>,
    /// The first two are each monitor's initial layout pair
    pub layouts: Vec<Layout>,
    pub keys: Vec<Key>,
    pub buttons: Vec<Button>,
    pub border_px: u32,
    /// Snap distance in pixels for mouse moves
    pub snap: u32,
    pub gaps: Gaps,
    pub show_bar: bool,
    pub top_bar: bool,
    pub bar_lobar: u32,
    pub bar_hibar: u32,
    pub bar_separator: u32,
    pub bar_side_padding: u32,
    pub bar_refresh_secs: u64,
    pub mfact: f32,
    pub nmaster: usize,
    /// Apply size hints to tiled clients too
    pub resize_hints: bool,
    /// Refuse to move focus away from a fullscreen client
    pub lock_fullscreen: bool,
    /// Core X font name
    pub font: &'static str,
    pub norm: Scheme,
    pub sel: Scheme,
    pub accents: Accents,
    pub keyboard_layouts: &'static [&'static str],
    pub startup: Vec<Argv>,
    /// Bar modules with their redraw period in seconds, rightmost first
    pub modules: Vec<(ModuleKind, u64)>,
    pub screenshot_dir: PathBuf,
    pub battery_dir: PathBuf,
    pub backlight_dir: PathBuf,
    /// rofi `-location` for menus
    pub menu_location: u8,
}

fn tag_keys(keys: &mut Vec<Key>) {
    for i in 0..10u32 {
        // 1..9 then 0
        let keysym = XK_0 + (i + 1) % 10;
        let tag = 1 << i;
        keys.extend([
            Key::new(MODKEY, keysym, Action::View(tag)),
            Key::new(MODKEY | mask::CONTROL, keysym, Action::ToggleView(tag)),
            Key::new(MODKEY | mask::SHIFT, keysym, Action::Tag(tag)),
            Key::new(MODKEY | mask::MOD1, keysym, Action::ToggleTag(tag)),
        ]);
    }
}

fn keys() -> Vec<Key> {
    let mut keys = vec![
        Key::new(MODKEY, XK_d, Action::Spawn(cmd::LAUNCHER)),
        Key::new(MODKEY | mask::SHIFT, XK_d, Action::Spawn(cmd::LAUNCHER_BAR)),
        Key::new(MODKEY, XK_Return, Action::Spawn(cmd::TERMINAL)),
        Key::new(MODKEY, XK_b, Action::Spawn(cmd::BROWSER)),
        Key::new(MODKEY | mask::SHIFT, XK_b, Action::Spawn(cmd::BROWSER_PRIVATE)),
        Key::new(MODKEY, XK_x, Action::Spawn(cmd::CLAVIS)),
        // media keys
        Key::new(0, XF86XK_AudioRaiseVolume, Action::SpawnWait(cmd::VOLUME_UP)),
        Key::new(0, XF86XK_AudioLowerVolume, Action::SpawnWait(cmd::VOLUME_DOWN)),
        Key::new(0, XF86XK_AudioMute, Action::SpawnWait(cmd::VOLUME_MUTE)),
        Key::new(0, XF86XK_MonBrightnessDown, Action::SpawnWait(cmd::BRIGHTNESS_DOWN)),
        Key::new(0, XF86XK_MonBrightnessUp, Action::SpawnWait(cmd::BRIGHTNESS_UP)),
        Key::new(0, XF86XK_ScreenSaver, Action::SpawnWait(cmd::MONITOR_OFF)),
        Key::new(0, XF86XK_KbdBrightnessDown, Action::Spawn(cmd::KBD_BRIGHTNESS_DOWN)),
        Key::new(0, XF86XK_KbdBrightnessUp, Action::Spawn(cmd::KBD_BRIGHTNESS_UP)),
        Key::new(0, XF86XK_PowerOff, Action::PowerMenu),
        Key::new(0, XF86XK_Calculator, Action::Spawn(cmd::CALCULATOR)),
        Key::new(MODKEY, XK_u, Action::ToggleUpdateChecks),
        // window manager
        Key::new(MODKEY, XK_n, Action::ToggleBar),
        Key::new(MODKEY | mask::SHIFT, XK_e, Action::Quit),
        Key::new(MODKEY, XK_j, Action::FocusStack(1)),
        Key::new(MODKEY, XK_Right, Action::FocusStack(1)),
        Key::new(MODKEY, XK_Left, Action::FocusStack(-1)),
        Key::new(MODKEY, XK_k, Action::FocusStack(-1)),
        Key::new(MODKEY, XK_minus, Action::IncNMaster(1)),
        Key::new(MODKEY, XK_plus, Action::IncNMaster(-1)),
        Key::new(MODKEY | mask::SHIFT, XK_Right, Action::SetMFact(0.05)),
        Key::new(MODKEY | mask::SHIFT, XK_Left, Action::SetMFact(-0.05)),
        Key::new(MODKEY | mask::SHIFT, XK_Return, Action::Zoom),
        Key::new(MODKEY, XK_Tab, Action::View(0)),
        Key::new(MODKEY, XK_q, Action::KillClient),
        Key::new(MODKEY, XK_t, Action::SetLayout(Some(0))),
        Key::new(MODKEY, XK_m, Action::SetLayout(Some(2))),
        Key::new(MODKEY, XK_space, Action::SetLayout(None)),
        Key::new(MODKEY | mask::SHIFT, XK_plus, Action::ModGaps(5)),
        Key::new(MODKEY | mask::SHIFT, XK_minus, Action::ModGaps(-5)),
        Key::new(MODKEY, XK_f, Action::ToggleGaps(false)),
        Key::new(MODKEY | mask::SHIFT, XK_f, Action::ToggleGaps(true)),
        Key::new(MODKEY | mask::CONTROL, XK_f, Action::ToggleFullscreen),
        Key::new(MODKEY, XK_g, Action::ToggleFloating),
        Key::new(MODKEY, XK_apostrophe, Action::View(!0)),
        Key::new(MODKEY, XK_s, Action::Tag(!0)),
        Key::new(MODKEY, XK_comma, Action::FocusMon(-1)),
        Key::new(MODKEY, XK_period, Action::FocusMon(1)),
        Key::new(MODKEY | mask::SHIFT, XK_comma, Action::TagMon(-1)),
        Key::new(MODKEY | mask::SHIFT, XK_period, Action::TagMon(1)),
        Key::new(mask::CONTROL, XK_Menu, Action::SwitchKeyboardLayout),
        Key::new(0, XK_Print, Action::Screenshot { select: false }),
        Key::new(mask::SHIFT, XK_Print, Action::Screenshot { select: true }),
    ];
    tag_keys(&mut keys);
    keys
}

fn buttons() -> Vec<Button> {
    vec![
        Button::new(Click::LtSymbol, 0, 1, Action::SetLayout(None)),
        Button::new(Click::LtSymbol, 0, 3, Action::SetLayout(Some(2))),
        Button::new(Click::WinTitle, 0, 2, Action::Zoom),
        Button::new(Click::StatusText, 0, 2, Action::Spawn(cmd::TERMINAL)),
        Button::new(Click::ClientWin, MODKEY, 1, Action::MoveMouse),
        Button::new(Click::ClientWin, MODKEY, 2, Action::ToggleFloating),
        Button::new(Click::ClientWin, MODKEY, 3, Action::ResizeMouse),
        Button::new(Click::TagBar, 0, 1, Action::View(0)),
        Button::new(Click::TagBar, 0, 3, Action::ToggleView(0)),
        Button::new(Click::TagBar, MODKEY, 1, Action::Tag(0)),
        Button::new(Click::TagBar, MODKEY, 3, Action::ToggleTag(0)),
    ]
}

impl Default for Config {
    fn default() -> Config {
        let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/tmp"));
        let global_fg = 0xdbdbdb;
        let global_bg = 0x1a1a1a;

        Config {
            wm_name: "horizonwm",
            tags: vec!["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"],
            rules: vec![
                Rule::new().class("Gimp").floating(true),
                Rule::new().class("Firefox").tags(1 << 8),
                Rule::new().class("Clavis").floating(true),
                Rule::new().class("gnome-calculator").floating(true),
                Rule::new().class("St").terminal(),
                Rule::new().class("Alacritty").terminal(),
                Rule::new().title("Event Tester").no_swallow(),
            ],
            layouts: vec![
                Layout::new("[]=", LayoutKind::Tile),
                Layout::new("><>", LayoutKind::Floating),
                Layout::new("[M]", LayoutKind::Monocle),
            ],
            keys: keys(),
            buttons: buttons(),
            border_px: 0,
            snap: 10,
            gaps: Gaps { inner: 10, outer: 20 },
            show_bar: true,
            top_bar: true,
            bar_lobar: 3,
            bar_hibar: 0,
            bar_separator: 0,
            bar_side_padding: 7,
            bar_refresh_secs: 5,
            mfact: 0.5,
            nmaster: 1,
            resize_hints: true,
            lock_fullscreen: true,
            font: "fixed",
            norm: Scheme {
                fg: global_fg,
                bg: global_bg,
                border: global_bg,
            },
            sel: Scheme {
                fg: global_bg,
                bg: global_fg,
                border: global_fg,
            },
            accents: Accents {
                good: 0x2e7d32,
                warn: 0xf9a825,
                bad: 0xc62828,
            },
            keyboard_layouts: &["es", "ru"],
            startup: vec![],
            modules: vec![
                (ModuleKind::Date, 0),
                (ModuleKind::KeyboardLayout, 0),
                (ModuleKind::Battery, 30),
                (ModuleKind::Brightness, 0),
                (ModuleKind::Volume, 0),
                (ModuleKind::Updates, 0),
                (ModuleKind::OpenVpn, 10),
                (ModuleKind::Wired, 0),
                (ModuleKind::Wireless, 0),
                (ModuleKind::MediaNext, 0),
                (ModuleKind::MediaStop, 0),
                (ModuleKind::MediaPlayPause, 0),
                (ModuleKind::MediaPrev, 0),
                (ModuleKind::MediaStatus, 0),
            ],
            screenshot_dir: home.join("Pictures").join("screenshots"),
            battery_dir: PathBuf::from("/sys/class/power_supply/BAT0"),
            backlight_dir: PathBuf::from("/sys/class/backlight/intel_backlight"),
            menu_location: 3,
        }
    }
}

impl Config {
    pub fn monitor_defaults(&self) -> MonitorDefaults {
        let fallback = Layout::new("><>", LayoutKind::Floating);
        let first = self.layouts.first().copied().unwrap_or(fallback);
        let second = self.layouts.get(1).copied().unwrap_or(first);
        MonitorDefaults {
            mfact: self.mfact,
            nmaster: self.nmaster,
            show_bar: self.show_bar,
            top_bar: self.top_bar,
            layouts: [first, second],
        }
    }

    /// Every valid tag bit
    pub fn tag_mask(&self) -> TagSet {
        TagSet::mask(self.tags.len())
    }

    pub fn bar_style(&self) -> BarStyle {
        BarStyle {
            norm: self.norm,
            sel: self.sel,
            lobar: self.bar_lobar,
            hibar: self.bar_hibar,
            separator: self.bar_separator,
            side_padding: self.bar_side_padding,
        }
    }

    pub fn module_commands(&self) -> ModuleCommands {
        ModuleCommands {
            volume_get: cmd::VOLUME_GET,
            mute_get: cmd::MUTE_GET,
            volume_up: cmd::VOLUME_UP,
            volume_down: cmd::VOLUME_DOWN,
            volume_mute: cmd::VOLUME_MUTE,
            mixer: cmd::MIXER,
            brightness_up: cmd::BRIGHTNESS_UP,
            brightness_down: cmd::BRIGHTNESS_DOWN,
        }
    }

    pub fn worker_commands(&self) -> WorkerCommands {
        WorkerCommands {
            nmcli_devices: cmd::NMCLI_DEVICES,
            nmcli_wifi: cmd::NMCLI_WIFI,
            volume_get: cmd::VOLUME_GET,
            mute_get: cmd::MUTE_GET,
            vpn_status: cmd::VPN_STATUS,
        }
    }

    pub fn power_commands(&self) -> PowerCommands {
        PowerCommands {
            programs: cmd::LAUNCHER,
            lock: cmd::LOCK,
            poweroff: cmd::POWEROFF,
            reboot: cmd::REBOOT,
            vpn: cmd::VPN_START,
            hotspot: cmd::HOTSPOT,
        }
    }

    /// `(modifiers, keysym)` pairs to grab on the root window
    pub fn key_grabs(&self) -> Vec<(u16, u32)> {
        self.keys.iter().map(|k| (k.mods, k.keysym)).collect()
    }
}
