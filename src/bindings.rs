//! Key and mouse bindings.
//!
//! Bindings are a static table searched in order. The first entry whose
//! modifiers, key/button and click region match wins; nothing after it runs.

/// X modifier masks, narrowed to the width of an event's state field
pub mod mask {
    pub const SHIFT: u16 = xcb::MOD_MASK_SHIFT as u16;
    pub const LOCK: u16 = xcb::MOD_MASK_LOCK as u16;
    pub const CONTROL: u16 = xcb::MOD_MASK_CONTROL as u16;
    pub const MOD1: u16 = xcb::MOD_MASK_1 as u16;
    pub const MOD2: u16 = xcb::MOD_MASK_2 as u16;
    pub const MOD3: u16 = xcb::MOD_MASK_3 as u16;
    pub const MOD4: u16 = xcb::MOD_MASK_4 as u16;
    pub const MOD5: u16 = xcb::MOD_MASK_5 as u16;
}

/// Some action to be run by a user key or button binding.
///
/// Tag arguments are bitmasks. In button bindings on the tag bar a mask of 0
/// stands for the tag that was clicked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Fire and forget
    Spawn(&'static [&'static str]),
    /// Run to completion, then redraw the bar
    SpawnWait(&'static [&'static str]),
    View(u32),
    ToggleView(u32),
    Tag(u32),
    ToggleTag(u32),
    FocusStack(i32),
    IncNMaster(i32),
    SetMFact(f32),
    /// Index into the configured layouts, `None` flips to the previous one
    SetLayout(Option<usize>),
    ToggleFloating,
    ToggleFullscreen,
    Zoom,
    KillClient,
    FocusMon(i32),
    TagMon(i32),
    ToggleBar,
    ModGaps(i32),
    /// `false` removes the gaps, `true` restores the configured ones
    ToggleGaps(bool),
    MoveMouse,
    ResizeMouse,
    ToggleUpdateChecks,
    SwitchKeyboardLayout,
    Screenshot { select: bool },
    PowerMenu,
    RedrawBar,
    Quit,
}

impl Action {
    /// Substitute the clicked tag for a zero tag mask.
    pub fn with_clicked_tag(self, clicked: u32) -> Action {
        match self {
            Action::View(0) => Action::View(clicked),
            Action::ToggleView(0) => Action::ToggleView(clicked),
            Action::Tag(0) => Action::Tag(clicked),
            Action::ToggleTag(0) => Action::ToggleTag(clicked),
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Key {
    pub mods: u16,
    pub keysym: u32,
    pub action: Action,
}

impl Key {
    pub const fn new(mods: u16, keysym: u32, action: Action) -> Key {
        Key { mods, keysym, action }
    }
}

/// Where a button press landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Click {
    TagBar,
    LtSymbol,
    StatusText,
    WinTitle,
    ClientWin,
    RootWin,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Button {
    pub click: Click,
    pub mods: u16,
    pub button: u8,
    pub action: Action,
}

impl Button {
    pub const fn new(click: Click, mods: u16, button: u8, action: Action) -> Button {
        Button {
            click,
            mods,
            button,
            action,
        }
    }
}

/// Strip lock and numlock from a modifier state.
pub fn clean_mask(state: u16, numlock: u16) -> u16 {
    let all = mask::SHIFT | mask::CONTROL | mask::MOD1 | mask::MOD2 | mask::MOD3 | mask::MOD4 | mask::MOD5;
    state & !(numlock | mask::LOCK) & all
}

pub fn find_key(keys: &[Key], keysym: u32, state: u16, numlock: u16) -> Option<&Key> {
    let state = clean_mask(state, numlock);
    keys.iter()
        .find(|k| k.keysym == keysym && clean_mask(k.mods, numlock) == state)
}

pub fn find_button(buttons: &[Button], click: Click, button: u8, state: u16, numlock: u16) -> Option<&Button> {
    let state = clean_mask(state, numlock);
    buttons
        .iter()
        .find(|b| b.click == click && b.button == button && clean_mask(b.mods, numlock) == state)
}

/// `(button, modifiers)` pairs to grab on client windows
pub fn client_button_grabs(buttons: &[Button]) -> Vec<(u8, u16)> {
    buttons
        .iter()
        .filter(|b| b.click == Click::ClientWin)
        .map(|b| (b.button, b.mods))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMLOCK: u16 = mask::MOD2;
    const RET: u32 = 0xff0d;

    #[test]
    fn lock_bits_are_ignored() {
        assert_eq!(clean_mask(mask::MOD4 | mask::LOCK | NUMLOCK, NUMLOCK), mask::MOD4);
        // pointer button state bits are dropped too
        assert_eq!(clean_mask(mask::SHIFT | 0x100, NUMLOCK), mask::SHIFT);
    }

    #[test]
    fn first_matching_key_wins() {
        let keys = [
            Key::new(mask::MOD4, RET, Action::Spawn(&["st"])),
            Key::new(mask::MOD4, RET, Action::Quit),
        ];
        let k = find_key(&keys, RET, mask::MOD4 | mask::LOCK, NUMLOCK);
        assert_eq!(k.map(|k| k.action), Some(Action::Spawn(&["st"])));
    }

    #[test]
    fn modifiers_must_match_exactly() {
        let keys = [Key::new(mask::MOD4, RET, Action::Quit)];
        assert!(find_key(&keys, RET, mask::MOD4 | mask::SHIFT, NUMLOCK).is_none());
        assert!(find_key(&keys, RET, 0, NUMLOCK).is_none());
    }

    #[test]
    fn buttons_match_on_click_region() {
        let buttons = [
            Button::new(Click::TagBar, 0, 1, Action::View(0)),
            Button::new(Click::ClientWin, mask::MOD4, 1, Action::MoveMouse),
        ];
        let b = find_button(&buttons, Click::TagBar, 1, 0, NUMLOCK);
        assert_eq!(b.map(|b| b.action.with_clicked_tag(1 << 3)), Some(Action::View(1 << 3)));
        assert!(find_button(&buttons, Click::WinTitle, 1, 0, NUMLOCK).is_none());
        assert_eq!(client_button_grabs(&buttons), vec![(1, mask::MOD4)]);
    }

    #[test]
    fn explicit_tag_masks_are_kept() {
        assert_eq!(Action::Tag(!0).with_clicked_tag(4), Action::Tag(!0));
        assert_eq!(Action::Zoom.with_clicked_tag(4), Action::Zoom);
    }
}
