use crate::{geometry::Rectangle, xconnection::Xid};

/// Which client property changed in a PropertyNotify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    /// WM_NAME or _NET_WM_NAME
    Title,
    TransientFor,
    NormalHints,
    WmHints,
    WindowType,
    Other,
}

/// Value mask bits of a ConfigureRequest, as sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureRequest {
    pub id: Xid,
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
    pub border: u32,
    pub sibling: Xid,
    pub stack_mode: u8,
    pub mask: u16,
}

impl ConfigureRequest {
    pub const X: u16 = 1 << 0;
    pub const Y: u16 = 1 << 1;
    pub const WIDTH: u16 = 1 << 2;
    pub const HEIGHT: u16 = 1 << 3;
    pub const BORDER_WIDTH: u16 = 1 << 4;
    pub const SIBLING: u16 = 1 << 5;
    pub const STACK_MODE: u16 = 1 << 6;

    pub fn has(&self, bit: u16) -> bool {
        self.mask & bit != 0
    }
}

/// _NET_WM_STATE client message actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Remove,
    Add,
    Toggle,
}

impl StateAction {
    pub fn from_raw(v: u32) -> Option<StateAction> {
        match v {
            0 => Some(StateAction::Remove),
            1 => Some(StateAction::Add),
            2 => Some(StateAction::Toggle),
            _ => None,
        }
    }
}

/// Client messages we act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    /// _NET_WM_STATE naming _NET_WM_STATE_FULLSCREEN
    Fullscreen(StateAction),
    /// _NET_ACTIVE_WINDOW
    Activate,
}

/**
 * Wrapper around the low level XCB event types that require casting to work with.
 * Only the fields the window manager acts on are extracted.
 *
 * https://tronche.com/gui/x/xlib/events/types.html
 *
 * *MapRequest* - a top level window asks to be shown
 *   - _override_redirect_: we should ignore this window if true
 *
 * *UnmapNotify* - a window was unmapped
 *   - _send_event_: set for synthetic unmaps from a client withdrawing itself
 *
 * *EnterNotify* - the pointer is now in a different window
 *   - _normal_: false for crossings caused by grabs or moving into an inferior
 *
 * *ButtonPress* / *KeyPress*
 *   - _state_: the modifier masks being held at the time
 */
#[derive(Debug, Clone, PartialEq)]
pub enum XEvent {
    ButtonPress {
        id: Xid,
        button: u8,
        state: u16,
        /// Coordinates relative to the event window
        x: i32,
        y: i32,
        root_x: i32,
        root_y: i32,
    },
    ButtonRelease,
    ClientMessage {
        id: Xid,
        message: ClientMessage,
    },
    ConfigureNotify {
        id: Xid,
        r: Rectangle,
        is_root: bool,
    },
    ConfigureRequest(ConfigureRequest),
    DestroyNotify {
        id: Xid,
    },
    EnterNotify {
        id: Xid,
        normal: bool,
    },
    Expose {
        id: Xid,
        count: u16,
    },
    FocusIn {
        id: Xid,
    },
    KeyPress {
        code: u8,
        state: u16,
    },
    MappingNotify {
        keyboard: bool,
    },
    MapRequest {
        id: Xid,
        override_redirect: bool,
    },
    MotionNotify {
        id: Xid,
        root_x: i32,
        root_y: i32,
        time: u32,
    },
    PropertyNotify {
        id: Xid,
        property: Property,
        deleted: bool,
        is_root: bool,
    },
    UnmapNotify {
        id: Xid,
        send_event: bool,
    },
    /// An asynchronous protocol error reply
    Error {
        request_code: u8,
        error_code: u8,
    },
}
