//! Menus shown through an external selector.
use std::sync::Arc;

use crate::spawn::Spawner;

/// Present `options` and block until one is picked. `None` means cancelled.
pub trait Menu {
    fn show(&self, prompt: &str, options: &[&str]) -> Option<usize>;
}

/// [Menu] backed by `rofi -dmenu`, replying with the selected index.
pub struct RofiMenu {
    spawner: Arc<dyn Spawner>,
    /// rofi `-location` (0 centre, 3 top right, ...)
    location: u8,
}

impl RofiMenu {
    pub fn new(spawner: Arc<dyn Spawner>, location: u8) -> RofiMenu {
        RofiMenu { spawner, location }
    }
}

impl Menu for RofiMenu {
    fn show(&self, prompt: &str, options: &[&str]) -> Option<usize> {
        if options.is_empty() {
            return None;
        }
        let location = self.location.to_string();
        let argv = [
            "rofi", "-dmenu", "-i", "-format", "i", "-p", prompt, "-location", &location,
        ];
        let reply = self.spawner.read_int_with_stdin(&argv, &options.join("\n"))?;
        usize::try_from(reply).ok().filter(|&i| i < options.len())
    }
}

/// Commands the power menu can launch
#[derive(Debug, Clone, Copy)]
pub struct PowerCommands {
    pub programs: &'static [&'static str],
    pub lock: &'static [&'static str],
    pub poweroff: &'static [&'static str],
    pub reboot: &'static [&'static str],
    pub vpn: &'static [&'static str],
    pub hotspot: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerOutcome {
    Nothing,
    /// Leave the window manager
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Main,
    Session,
    Network,
    ConfirmExit,
    ConfirmPowerOff,
    ConfirmReboot,
}

enum Step {
    Go(Screen),
    Run(&'static [&'static str]),
    Done(PowerOutcome),
}

const PROMPT: &str = "PowerMenu";

impl Screen {
    fn options(self) -> &'static [&'static str] {
        match self {
            Screen::Main => &["Session", "Network", "Programs", "Close"],
            Screen::Session => &["Lock Screen", "Exit WM", "Power Off", "Reboot", "Back"],
            Screen::Network => &["Connect to VPN", "Enable Hotspot", "Back"],
            Screen::ConfirmExit => &["Exit WM", "Stay"],
            Screen::ConfirmPowerOff => &["Power Off", "Cancel"],
            Screen::ConfirmReboot => &["Reboot", "Cancel"],
        }
    }

    fn parent(self) -> Option<Screen> {
        match self {
            Screen::Main => None,
            Screen::Session | Screen::Network => Some(Screen::Main),
            Screen::ConfirmExit | Screen::ConfirmPowerOff | Screen::ConfirmReboot => Some(Screen::Session),
        }
    }

    fn select(self, choice: usize, cmds: &PowerCommands) -> Step {
        let back = match self.parent() {
            Some(p) => Step::Go(p),
            None => Step::Done(PowerOutcome::Nothing),
        };
        match (self, choice) {
            (Screen::Main, 0) => Step::Go(Screen::Session),
            (Screen::Main, 1) => Step::Go(Screen::Network),
            (Screen::Main, 2) => Step::Run(cmds.programs),
            (Screen::Session, 0) => Step::Run(cmds.lock),
            (Screen::Session, 1) => Step::Go(Screen::ConfirmExit),
            (Screen::Session, 2) => Step::Go(Screen::ConfirmPowerOff),
            (Screen::Session, 3) => Step::Go(Screen::ConfirmReboot),
            (Screen::Network, 0) => Step::Run(cmds.vpn),
            (Screen::Network, 1) => Step::Run(cmds.hotspot),
            (Screen::ConfirmExit, 0) => Step::Done(PowerOutcome::Quit),
            (Screen::ConfirmPowerOff, 0) => Step::Run(cmds.poweroff),
            (Screen::ConfirmReboot, 0) => Step::Run(cmds.reboot),
            _ => back,
        }
    }
}

/// Walk the nested power menu until something is chosen or it is closed.
///
/// Cancelling a screen goes back to its parent; cancelling the main screen closes the menu.
pub fn power_menu(menu: &dyn Menu, spawner: &dyn Spawner, cmds: &PowerCommands) -> PowerOutcome {
    let mut screen = Screen::Main;
    loop {
        let step = match menu.show(PROMPT, screen.options()) {
            Some(choice) => screen.select(choice, cmds),
            None => match screen.parent() {
                Some(p) => Step::Go(p),
                None => Step::Done(PowerOutcome::Nothing),
            },
        };
        match step {
            Step::Go(next) => screen = next,
            Step::Run(cmd) => {
                spawner.spawn(cmd);
                return PowerOutcome::Nothing;
            }
            Step::Done(outcome) => return outcome,
        }
    }
}
