use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
};

use anyhow::{anyhow, Context, Result};
use xcb::{randr, xinerama};
use xcb_util::{ewmh, icccm, keysyms::KeySymbols};

use crate::{
    client::{SizeHints, WmHints},
    events::{ClientMessage, ConfigureRequest, Property, StateAction, XEvent},
    geometry::{Point, Rectangle},
};

/// X resource id of a window
pub type Xid = xcb::Window;

// Mask out the most significant bit, which indicates if it's a send_event
const XCB_RESPONSE_TYPE_MASK: u8 = 0x7F;
const SEND_EVENT_BIT: u8 = 0x80;

const GRAB_MODE_ASYNC: u8 = xcb::GRAB_MODE_ASYNC as u8;
const GRAB_MODE_SYNC: u8 = xcb::GRAB_MODE_SYNC as u8;
const INPUT_FOCUS_POINTER_ROOT: u8 = xcb::INPUT_FOCUS_POINTER_ROOT as u8;
const PROP_MODE_REPLACE: u8 = xcb::PROP_MODE_REPLACE as u8;

const CONFIG_WINDOW_BORDER_WIDTH: u16 = xcb::CONFIG_WINDOW_BORDER_WIDTH as u16;
const CONFIG_WINDOW_HEIGHT: u16 = xcb::CONFIG_WINDOW_HEIGHT as u16;
const CONFIG_WINDOW_WIDTH: u16 = xcb::CONFIG_WINDOW_WIDTH as u16;
const CONFIG_WINDOW_X: u16 = xcb::CONFIG_WINDOW_X as u16;
const CONFIG_WINDOW_Y: u16 = xcb::CONFIG_WINDOW_Y as u16;
const CONFIG_WINDOW_SIBLING: u16 = xcb::CONFIG_WINDOW_SIBLING as u16;
const CONFIG_WINDOW_STACK_MODE: u16 = xcb::CONFIG_WINDOW_STACK_MODE as u16;

const BUTTON_MASK: u16 = (xcb::EVENT_MASK_BUTTON_PRESS | xcb::EVENT_MASK_BUTTON_RELEASE) as u16;
const MOUSE_MASK: u16 = BUTTON_MASK | xcb::EVENT_MASK_POINTER_MOTION as u16;

const ROOT_EVENT_MASK: u32 = xcb::EVENT_MASK_SUBSTRUCTURE_REDIRECT
    | xcb::EVENT_MASK_SUBSTRUCTURE_NOTIFY
    | xcb::EVENT_MASK_BUTTON_PRESS
    | xcb::EVENT_MASK_POINTER_MOTION
    | xcb::EVENT_MASK_ENTER_WINDOW
    | xcb::EVENT_MASK_LEAVE_WINDOW
    | xcb::EVENT_MASK_STRUCTURE_NOTIFY
    | xcb::EVENT_MASK_PROPERTY_CHANGE;
const CLIENT_EVENT_MASK: u32 = xcb::EVENT_MASK_ENTER_WINDOW
    | xcb::EVENT_MASK_FOCUS_CHANGE
    | xcb::EVENT_MASK_PROPERTY_CHANGE
    | xcb::EVENT_MASK_STRUCTURE_NOTIFY;

const XK_NUM_LOCK: u32 = 0xff7f;

// Core protocol error codes
const BAD_WINDOW: u8 = 3;
const BAD_MATCH: u8 = 8;
const BAD_DRAWABLE: u8 = 9;
const BAD_ACCESS: u8 = 10;

// Core protocol request opcodes
const X_CONFIGURE_WINDOW: u8 = 12;
const X_GRAB_BUTTON: u8 = 28;
const X_GRAB_KEY: u8 = 33;
const X_SET_INPUT_FOCUS: u8 = 42;
const X_COPY_AREA: u8 = 62;
const X_POLY_SEGMENT: u8 = 66;
const X_POLY_FILL_RECTANGLE: u8 = 70;
const X_POLY_TEXT8: u8 = 74;
const X_IMAGE_TEXT8: u8 = 76;

/// Errors that only mean a window went away between us seeing it and acting on it.
///
/// Anything else is a bug on our side and ends the event loop.
pub fn is_benign_error(request_code: u8, error_code: u8) -> bool {
    matches!(
        (request_code, error_code),
        (_, BAD_WINDOW)
            | (X_SET_INPUT_FOCUS, BAD_MATCH)
            | (X_POLY_TEXT8, BAD_DRAWABLE)
            | (X_IMAGE_TEXT8, BAD_DRAWABLE)
            | (X_POLY_FILL_RECTANGLE, BAD_DRAWABLE)
            | (X_POLY_SEGMENT, BAD_DRAWABLE)
            | (X_CONFIGURE_WINDOW, BAD_MATCH)
            | (X_GRAB_BUTTON, BAD_ACCESS)
            | (X_GRAB_KEY, BAD_ACCESS)
            | (X_COPY_AREA, BAD_DRAWABLE)
    )
}

macro_rules! atoms {
    ( $( $name:ident ),+ ) => {
        #[allow(non_snake_case)]
        pub struct InternedAtoms {
            $(
                pub $name: xcb::Atom
            ),*
        }

        impl InternedAtoms {
            pub fn new(conn: &xcb::Connection) -> Result<InternedAtoms> {
                Ok(InternedAtoms {
                    $(
                        $name: xcb::intern_atom(conn, false, stringify!($name)).get_reply()?.atom()
                    ),*
                })
            }
        }
    };
    // Allow trailing comma:
    ( $( $name:ident ),+ , ) => (atoms!($( $name ),+);)
}

atoms!(
    WM_DELETE_WINDOW,
    WM_STATE,
    WM_TAKE_FOCUS,
    UTF8_STRING,
    _NET_ACTIVE_WINDOW,
    _NET_SUPPORTED,
    _NET_WM_NAME,
    _NET_WM_STATE,
    _NET_SUPPORTING_WM_CHECK,
    _NET_WM_STATE_FULLSCREEN,
    _NET_WM_WINDOW_TYPE,
    _NET_WM_WINDOW_TYPE_DIALOG,
    _NET_CLIENT_LIST,
    _NET_WM_PID,
);

/// ICCCM WM_STATE values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmState {
    Withdrawn = 0,
    Normal = 1,
    Iconic = 3,
}

/// WM_PROTOCOLS a client may opt into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Delete,
    TakeFocus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    pub override_redirect: bool,
    pub viewable: bool,
    pub rect: Rectangle,
    pub border: u32,
}

/// WM_CLASS: (instance, class) as set by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHint {
    pub class: String,
    pub instance: String,
}

/// Everything the window manager needs from the X server.
///
/// Kept as a trait so the window manager logic can be driven by a fake
/// connection in tests.
pub trait XConn {
    fn root(&self) -> Xid;
    fn screen_size(&self) -> (u32, u32);
    /// Distinct physical display regions, falling back to the whole screen
    fn monitor_regions(&self) -> Vec<Rectangle>;

    /// Block for the next event we know how to handle. `None` means the connection is gone.
    fn next_event(&self) -> Option<XEvent>;
    fn flush(&self);
    /// Drop queued EnterNotify events so restacking doesn't steal focus.
    fn discard_enter_events(&self);

    fn window_attributes(&self, id: Xid) -> Option<WindowAttributes>;
    fn top_level_windows(&self) -> Vec<Xid>;
    fn title(&self, id: Xid) -> Option<String>;
    fn class_hint(&self, id: Xid) -> Option<ClassHint>;
    fn transient_for(&self, id: Xid) -> Option<Xid>;
    fn window_pid(&self, id: Xid) -> Option<u32>;
    fn size_hints(&self, id: Xid) -> Option<SizeHints>;
    fn wm_hints(&self, id: Xid) -> Option<WmHints>;
    fn set_wm_hints(&self, id: Xid, hints: &WmHints);
    /// _NET_WM_STATE lists _NET_WM_STATE_FULLSCREEN
    fn requests_fullscreen(&self, id: Xid) -> bool;
    /// _NET_WM_WINDOW_TYPE lists _NET_WM_WINDOW_TYPE_DIALOG
    fn is_dialog(&self, id: Xid) -> bool;
    fn wm_state(&self, id: Xid) -> Option<WmState>;
    fn set_wm_state(&self, id: Xid, state: WmState);
    fn set_fullscreen_state(&self, id: Xid, fullscreen: bool);

    fn configure_window(&self, id: Xid, r: Rectangle, border: u32);
    fn move_window(&self, id: Xid, x: i32, y: i32);
    fn set_border_width(&self, id: Xid, border: u32);
    fn set_border_color(&self, id: Xid, color: u32);
    /// Tell a client its geometry without changing it
    fn send_configure_notify(&self, id: Xid, r: Rectangle, border: u32);
    /// Grant a configure request from a window we don't manage unchanged
    fn forward_configure_request(&self, req: &ConfigureRequest);
    fn map_window(&self, id: Xid);
    fn unmap_window(&self, id: Xid);
    fn raise_window(&self, id: Xid);
    fn stack_below(&self, id: Xid, sibling: Xid);
    fn destroy_window(&self, id: Xid);
    fn select_client_events(&self, id: Xid);
    fn clear_client_events(&self, id: Xid);

    /// Grab `(button, modifiers)` pairs on a client. Unfocused clients also
    /// get a catch-all grab so a click can focus them.
    fn grab_buttons(&self, id: Xid, focused: bool, buttons: &[(u8, u16)], numlock: u16);
    fn ungrab_buttons(&self, id: Xid);
    /// Grab `(modifiers, keysym)` pairs on the root window
    fn grab_keys(&self, keys: &[(u16, u32)], numlock: u16);
    fn ungrab_keys(&self);
    fn keycode_to_keysym(&self, code: u8) -> u32;
    fn numlock_mask(&self) -> u16;

    fn focus_window(&self, id: Xid);
    fn focus_root(&self);
    fn supports_protocol(&self, id: Xid, proto: Protocol) -> bool;
    /// Send a WM_PROTOCOLS message if the client supports it, returning whether it did.
    fn send_protocol(&self, id: Xid, proto: Protocol) -> bool;
    fn kill_client(&self, id: Xid);
    fn grab_server(&self);
    fn ungrab_server(&self);
    fn set_client_list(&self, ids: &[Xid]);

    fn pointer_position(&self) -> Option<Point>;
    fn grab_pointer(&self) -> bool;
    fn ungrab_pointer(&self);
    fn warp_pointer(&self, id: Xid, x: i32, y: i32);
    /// Let a frozen button press through to the client under the pointer
    fn replay_pointer(&self);

    fn create_bar_window(&self, r: Rectangle) -> Xid;
    /// Create the _NET_SUPPORTING_WM_CHECK window and advertise what we support.
    fn init_ewmh(&self, wm_name: &str);
    /// Release grabs and EWMH state before exiting
    fn cleanup(&self);
}

/// Handles communication with an X server via xcb
pub struct XcbConnection {
    conn: ewmh::Connection,
    preferred_screen: i32,
    root: Xid,
    atoms: InternedAtoms,
    check_win: Cell<Option<Xid>>,
    pending: RefCell<VecDeque<XEvent>>,
}

impl XcbConnection {
    pub fn new() -> Result<XcbConnection> {
        let (conn, preferred_screen) = xcb::Connection::connect(None)
            .context("Unable to connect to the X server")?;
        let conn = ewmh::Connection::connect(conn).map_err(|(e, _)| e)?;

        let root = conn
            .get_setup()
            .roots()
            .nth(preferred_screen as usize)
            .context("Unable to get the root window of the preferred screen")?
            .root();

        let atoms = InternedAtoms::new(&conn).context("Failed to intern atoms")?;

        Ok(XcbConnection {
            conn,
            preferred_screen,
            root,
            atoms,
            check_win: Cell::new(None),
            pending: RefCell::new(VecDeque::new()),
        })
    }

    /// Claim SubstructureRedirect on the root window.
    ///
    /// Only one client may hold it, so any error here means another window
    /// manager is running.
    pub fn register_wm(&self) -> Result<()> {
        xcb::change_window_attributes_checked(
            &self.conn,
            self.root,
            &[(xcb::CW_EVENT_MASK, xcb::EVENT_MASK_SUBSTRUCTURE_REDIRECT)],
        )
        .request_check()
        .map_err(|e| anyhow!("another window manager is already running (error {})", e.error_code()))?;

        xcb::change_window_attributes_checked(&self.conn, self.root, &[(xcb::CW_EVENT_MASK, ROOT_EVENT_MASK)])
            .request_check()
            .context("Could not select root window events")?;
        self.conn.flush();
        Ok(())
    }

    fn property_u32(&self, id: Xid, atom: xcb::Atom, type_: xcb::Atom, len: u32) -> Option<Vec<u32>> {
        let reply = xcb::get_property(&self.conn, false, id, atom, type_, 0, len)
            .get_reply()
            .ok()?;
        if reply.value_len() == 0 || reply.format() != 32 {
            return None;
        }
        Some(reply.value::<u32>().to_vec())
    }

    fn property_string(&self, id: Xid, atom: xcb::Atom) -> Option<String> {
        let reply = xcb::get_property(&self.conn, false, id, atom, xcb::ATOM_ANY, 0, 1024)
            .get_reply()
            .ok()?;
        if reply.value_len() == 0 || reply.format() != 8 {
            return None;
        }
        Some(String::from_utf8_lossy(reply.value::<u8>()).into_owned())
    }

    fn has_atom(&self, id: Xid, prop: xcb::Atom, wanted: xcb::Atom) -> bool {
        self.property_u32(id, prop, xcb::ATOM_ATOM, 32)
            .map_or(false, |atoms| atoms.contains(&wanted))
    }

    /// Queries the WM_PROTOCOLS property of a window, returning a list of the
    /// protocols that it supports.
    fn get_wm_protocols(&self, id: Xid) -> Result<Vec<xcb::Atom>> {
        let reply = icccm::get_wm_protocols(&self.conn, id, self.conn.WM_PROTOCOLS()).get_reply()?;
        Ok(reply.atoms().to_vec())
    }

    fn protocol_atom(&self, proto: Protocol) -> xcb::Atom {
        match proto {
            Protocol::Delete => self.atoms.WM_DELETE_WINDOW,
            Protocol::TakeFocus => self.atoms.WM_TAKE_FOCUS,
        }
    }

    fn randr_monitors(&self) -> Vec<Rectangle> {
        let resources = match randr::get_screen_resources(&self.conn, self.root).get_reply() {
            Ok(r) => r,
            Err(e) => {
                debug!("randr screen resources unavailable: {:?}", e.error_code());
                return vec![];
            }
        };
        resources
            .crtcs()
            .iter()
            .flat_map(|c| randr::get_crtc_info(&self.conn, *c, 0).get_reply())
            .map(|c| Rectangle::new(c.x() as i32, c.y() as i32, c.width() as u32, c.height() as u32))
            .filter(|r| r.w > 0)
            .collect()
    }

    fn xinerama_screens(&self) -> Vec<Rectangle> {
        let active = xinerama::is_active(&self.conn)
            .get_reply()
            .map(|r| r.state() != 0)
            .unwrap_or(false);
        if !active {
            return vec![];
        }
        match xinerama::query_screens(&self.conn).get_reply() {
            Ok(screens) => screens
                .screen_info()
                .map(|s| Rectangle::new(s.x_org() as i32, s.y_org() as i32, s.width() as u32, s.height() as u32))
                .collect(),
            Err(_) => vec![],
        }
    }

    fn property_kind(&self, atom: xcb::Atom) -> Property {
        match atom {
            xcb::ATOM_WM_NAME => Property::Title,
            xcb::ATOM_WM_TRANSIENT_FOR => Property::TransientFor,
            xcb::ATOM_WM_NORMAL_HINTS => Property::NormalHints,
            xcb::ATOM_WM_HINTS => Property::WmHints,
            a if a == self.atoms._NET_WM_NAME => Property::Title,
            a if a == self.atoms._NET_WM_WINDOW_TYPE => Property::WindowType,
            _ => Property::Other,
        }
    }

    fn decode(&self, event: xcb::GenericEvent) -> Option<XEvent> {
        let etype = event.response_type() & XCB_RESPONSE_TYPE_MASK;
        let send_event = event.response_type() & SEND_EVENT_BIT != 0;

        match etype {
            0 => {
                let e: &xcb::GenericError = unsafe { xcb::cast_event(&event) };
                let request_code = unsafe { (*e.ptr).major_code };
                Some(XEvent::Error {
                    request_code,
                    error_code: e.error_code(),
                })
            }

            xcb::BUTTON_PRESS => {
                let e: &xcb::ButtonPressEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::ButtonPress {
                    id: e.event(),
                    button: e.detail(),
                    state: e.state(),
                    x: e.event_x() as i32,
                    y: e.event_y() as i32,
                    root_x: e.root_x() as i32,
                    root_y: e.root_y() as i32,
                })
            }

            xcb::BUTTON_RELEASE => Some(XEvent::ButtonRelease),

            xcb::CLIENT_MESSAGE => {
                let e: &xcb::ClientMessageEvent = unsafe { xcb::cast_event(&event) };
                let data = e.data().data32();
                let message = if e.type_() == self.atoms._NET_WM_STATE {
                    let fs = self.atoms._NET_WM_STATE_FULLSCREEN;
                    if data[1] == fs || data[2] == fs {
                        StateAction::from_raw(data[0]).map(ClientMessage::Fullscreen)
                    } else {
                        None
                    }
                } else if e.type_() == self.atoms._NET_ACTIVE_WINDOW {
                    Some(ClientMessage::Activate)
                } else {
                    None
                };
                message.map(|message| XEvent::ClientMessage { id: e.window(), message })
            }

            xcb::CONFIGURE_NOTIFY => {
                let e: &xcb::ConfigureNotifyEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::ConfigureNotify {
                    id: e.window(),
                    r: Rectangle::new(e.x() as i32, e.y() as i32, e.width() as u32, e.height() as u32),
                    is_root: e.window() == self.root,
                })
            }

            xcb::CONFIGURE_REQUEST => {
                let e: &xcb::ConfigureRequestEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::ConfigureRequest(ConfigureRequest {
                    id: e.window(),
                    x: e.x() as i32,
                    y: e.y() as i32,
                    w: e.width() as u32,
                    h: e.height() as u32,
                    border: e.border_width() as u32,
                    sibling: e.sibling(),
                    stack_mode: e.stack_mode(),
                    mask: e.value_mask(),
                }))
            }

            xcb::DESTROY_NOTIFY => {
                let e: &xcb::DestroyNotifyEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::DestroyNotify { id: e.window() })
            }

            xcb::ENTER_NOTIFY => {
                let e: &xcb::EnterNotifyEvent = unsafe { xcb::cast_event(&event) };
                let normal = e.mode() == xcb::NOTIFY_MODE_NORMAL as u8
                    && e.detail() != xcb::NOTIFY_DETAIL_INFERIOR as u8;
                Some(XEvent::EnterNotify {
                    id: e.event(),
                    normal: normal || e.event() == self.root,
                })
            }

            xcb::EXPOSE => {
                let e: &xcb::ExposeEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::Expose {
                    id: e.window(),
                    count: e.count(),
                })
            }

            xcb::FOCUS_IN => {
                let e: &xcb::FocusInEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::FocusIn { id: e.event() })
            }

            xcb::KEY_PRESS => {
                let e: &xcb::KeyPressEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::KeyPress {
                    code: e.detail(),
                    state: e.state(),
                })
            }

            xcb::MAPPING_NOTIFY => {
                let e: &xcb::MappingNotifyEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::MappingNotify {
                    keyboard: e.request() == xcb::MAPPING_KEYBOARD as u8,
                })
            }

            xcb::MAP_REQUEST => {
                let e: &xcb::MapRequestEvent = unsafe { xcb::cast_event(&event) };
                let id = e.window();
                xcb::get_window_attributes(&self.conn, id)
                    .get_reply()
                    .ok()
                    .map(|r| XEvent::MapRequest {
                        id,
                        override_redirect: r.override_redirect(),
                    })
            }

            xcb::MOTION_NOTIFY => {
                let e: &xcb::MotionNotifyEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::MotionNotify {
                    id: e.event(),
                    root_x: e.root_x() as i32,
                    root_y: e.root_y() as i32,
                    time: e.time(),
                })
            }

            xcb::PROPERTY_NOTIFY => {
                let e: &xcb::PropertyNotifyEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::PropertyNotify {
                    id: e.window(),
                    property: self.property_kind(e.atom()),
                    deleted: e.state() == xcb::PROPERTY_DELETE as u8,
                    is_root: e.window() == self.root,
                })
            }

            xcb::UNMAP_NOTIFY => {
                let e: &xcb::UnmapNotifyEvent = unsafe { xcb::cast_event(&event) };
                Some(XEvent::UnmapNotify {
                    id: e.window(),
                    send_event,
                })
            }

            // NOTE: ignoring other event types
            _ => None,
        }
    }
}

impl XConn for XcbConnection {
    fn root(&self) -> Xid {
        self.root
    }

    fn screen_size(&self) -> (u32, u32) {
        self.conn
            .get_setup()
            .roots()
            .nth(self.preferred_screen as usize)
            .map(|s| (s.width_in_pixels() as u32, s.height_in_pixels() as u32))
            .unwrap_or((0, 0))
    }

    fn monitor_regions(&self) -> Vec<Rectangle> {
        let screens = self.xinerama_screens();
        if !screens.is_empty() {
            return screens;
        }
        let crtcs = self.randr_monitors();
        if !crtcs.is_empty() {
            return crtcs;
        }
        let (w, h) = self.screen_size();
        vec![Rectangle::new(0, 0, w, h)]
    }

    fn next_event(&self) -> Option<XEvent> {
        if let Some(e) = self.pending.borrow_mut().pop_front() {
            return Some(e);
        }
        loop {
            let event = self.conn.wait_for_event()?;
            if let Some(e) = self.decode(event) {
                return Some(e);
            }
        }
    }

    fn flush(&self) {
        self.conn.flush();
    }

    fn discard_enter_events(&self) {
        self.conn.flush();
        while let Some(event) = self.conn.poll_for_event() {
            match self.decode(event) {
                Some(XEvent::EnterNotify { .. }) | None => {}
                Some(e) => self.pending.borrow_mut().push_back(e),
            }
        }
    }

    fn window_attributes(&self, id: Xid) -> Option<WindowAttributes> {
        let attrs = xcb::get_window_attributes(&self.conn, id).get_reply().ok()?;
        let geom = xcb::get_geometry(&self.conn, id).get_reply().ok()?;
        Some(WindowAttributes {
            override_redirect: attrs.override_redirect(),
            viewable: attrs.map_state() == xcb::MAP_STATE_VIEWABLE as u8,
            rect: Rectangle::new(geom.x() as i32, geom.y() as i32, geom.width() as u32, geom.height() as u32),
            border: geom.border_width() as u32,
        })
    }

    fn top_level_windows(&self) -> Vec<Xid> {
        xcb::query_tree(&self.conn, self.root)
            .get_reply()
            .map(|r| r.children().to_vec())
            .unwrap_or_default()
    }

    fn title(&self, id: Xid) -> Option<String> {
        // _NET_WM_NAME takes precedence over the ICCCM WM_NAME
        let name = ewmh::get_wm_name(&self.conn, id)
            .get_reply()
            .ok()
            .map(|r| r.string().to_string())
            .filter(|s| !s.is_empty());
        name.or_else(|| self.property_string(id, xcb::ATOM_WM_NAME))
    }

    fn class_hint(&self, id: Xid) -> Option<ClassHint> {
        icccm::get_wm_class(&self.conn, id)
            .get_reply()
            .ok()
            .map(|r| ClassHint {
                class: r.class().to_string(),
                instance: r.instance().to_string(),
            })
    }

    fn transient_for(&self, id: Xid) -> Option<Xid> {
        self.property_u32(id, xcb::ATOM_WM_TRANSIENT_FOR, xcb::ATOM_WINDOW, 1)
            .and_then(|v| v.first().copied())
            .filter(|&w| w != xcb::NONE)
    }

    fn window_pid(&self, id: Xid) -> Option<u32> {
        self.property_u32(id, self.atoms._NET_WM_PID, xcb::ATOM_CARDINAL, 1)
            .and_then(|v| v.first().copied())
            .filter(|&pid| pid != 0)
    }

    fn size_hints(&self, id: Xid) -> Option<SizeHints> {
        self.property_u32(id, xcb::ATOM_WM_NORMAL_HINTS, xcb::ATOM_WM_SIZE_HINTS, 18)
            .map(|raw| SizeHints::from_raw(&raw))
    }

    fn wm_hints(&self, id: Xid) -> Option<WmHints> {
        self.property_u32(id, xcb::ATOM_WM_HINTS, xcb::ATOM_WM_HINTS, 9)
            .map(|raw| WmHints::from_raw(&raw))
    }

    fn set_wm_hints(&self, id: Xid, hints: &WmHints) {
        xcb::change_property(
            &self.conn,
            PROP_MODE_REPLACE,
            id,
            xcb::ATOM_WM_HINTS,
            xcb::ATOM_WM_HINTS,
            32,
            hints.raw(),
        );
    }

    fn requests_fullscreen(&self, id: Xid) -> bool {
        self.has_atom(id, self.atoms._NET_WM_STATE, self.atoms._NET_WM_STATE_FULLSCREEN)
    }

    fn is_dialog(&self, id: Xid) -> bool {
        self.has_atom(id, self.atoms._NET_WM_WINDOW_TYPE, self.atoms._NET_WM_WINDOW_TYPE_DIALOG)
    }

    fn wm_state(&self, id: Xid) -> Option<WmState> {
        let state = self.property_u32(id, self.atoms.WM_STATE, self.atoms.WM_STATE, 2)?;
        match state.first() {
            Some(0) => Some(WmState::Withdrawn),
            Some(1) => Some(WmState::Normal),
            Some(3) => Some(WmState::Iconic),
            _ => None,
        }
    }

    fn set_wm_state(&self, id: Xid, state: WmState) {
        xcb::change_property(
            &self.conn,
            PROP_MODE_REPLACE,
            id,
            self.atoms.WM_STATE,
            self.atoms.WM_STATE,
            32,
            &[state as u32, xcb::NONE],
        );
    }

    fn set_fullscreen_state(&self, id: Xid, fullscreen: bool) {
        let data: &[u32] = if fullscreen {
            &[self.atoms._NET_WM_STATE_FULLSCREEN]
        } else {
            &[]
        };
        xcb::change_property(
            &self.conn,
            PROP_MODE_REPLACE,
            id,
            self.atoms._NET_WM_STATE,
            xcb::ATOM_ATOM,
            32,
            data,
        );
    }

    fn configure_window(&self, id: Xid, r: Rectangle, border: u32) {
        xcb::configure_window(
            &self.conn,
            id,
            &[
                (CONFIG_WINDOW_X, r.x as u32),
                (CONFIG_WINDOW_Y, r.y as u32),
                (CONFIG_WINDOW_WIDTH, r.w),
                (CONFIG_WINDOW_HEIGHT, r.h),
                (CONFIG_WINDOW_BORDER_WIDTH, border),
            ],
        );
    }

    fn move_window(&self, id: Xid, x: i32, y: i32) {
        xcb::configure_window(&self.conn, id, &[(CONFIG_WINDOW_X, x as u32), (CONFIG_WINDOW_Y, y as u32)]);
    }

    fn set_border_width(&self, id: Xid, border: u32) {
        xcb::configure_window(&self.conn, id, &[(CONFIG_WINDOW_BORDER_WIDTH, border)]);
    }

    fn set_border_color(&self, id: Xid, color: u32) {
        xcb::change_window_attributes(&self.conn, id, &[(xcb::CW_BORDER_PIXEL, color)]);
    }

    fn send_configure_notify(&self, id: Xid, r: Rectangle, border: u32) {
        let event = xcb::ConfigureNotifyEvent::new(
            id,
            id,
            xcb::NONE,
            r.x as i16,
            r.y as i16,
            r.w as u16,
            r.h as u16,
            border as u16,
            false,
        );
        xcb::send_event(&self.conn, false, id, xcb::EVENT_MASK_STRUCTURE_NOTIFY, &event);
    }

    fn forward_configure_request(&self, req: &ConfigureRequest) {
        // Build a request with all attributes set, then filter out to only include
        // those from the original request.
        let values = [
            (CONFIG_WINDOW_X, req.x as u32),
            (CONFIG_WINDOW_Y, req.y as u32),
            (CONFIG_WINDOW_WIDTH, req.w),
            (CONFIG_WINDOW_HEIGHT, req.h),
            (CONFIG_WINDOW_BORDER_WIDTH, req.border),
            (CONFIG_WINDOW_SIBLING, req.sibling),
            (CONFIG_WINDOW_STACK_MODE, req.stack_mode as u32),
        ];
        let filtered: Vec<_> = values
            .iter()
            .copied()
            .filter(|&(mask, _)| mask & req.mask != 0)
            .collect();
        xcb::configure_window(&self.conn, req.id, &filtered);
    }

    fn map_window(&self, id: Xid) {
        xcb::map_window(&self.conn, id);
    }

    fn unmap_window(&self, id: Xid) {
        xcb::unmap_window(&self.conn, id);
    }

    fn raise_window(&self, id: Xid) {
        xcb::configure_window(&self.conn, id, &[(CONFIG_WINDOW_STACK_MODE, xcb::STACK_MODE_ABOVE)]);
    }

    fn stack_below(&self, id: Xid, sibling: Xid) {
        xcb::configure_window(
            &self.conn,
            id,
            &[
                (CONFIG_WINDOW_SIBLING, sibling),
                (CONFIG_WINDOW_STACK_MODE, xcb::STACK_MODE_BELOW),
            ],
        );
    }

    fn destroy_window(&self, id: Xid) {
        xcb::destroy_window(&self.conn, id);
    }

    fn select_client_events(&self, id: Xid) {
        xcb::change_window_attributes(&self.conn, id, &[(xcb::CW_EVENT_MASK, CLIENT_EVENT_MASK)]);
    }

    fn clear_client_events(&self, id: Xid) {
        xcb::change_window_attributes(&self.conn, id, &[(xcb::CW_EVENT_MASK, xcb::EVENT_MASK_NO_EVENT)]);
    }

    fn grab_buttons(&self, id: Xid, focused: bool, buttons: &[(u8, u16)], numlock: u16) {
        self.ungrab_buttons(id);
        if !focused {
            xcb::grab_button(
                &self.conn,
                false,
                id,
                BUTTON_MASK,
                GRAB_MODE_SYNC,
                GRAB_MODE_SYNC,
                xcb::NONE,
                xcb::NONE,
                xcb::BUTTON_INDEX_ANY as u8,
                xcb::MOD_MASK_ANY as u16,
            );
        }
        let lock = xcb::MOD_MASK_LOCK as u16;
        for &(button, mods) in buttons {
            for extra in &[0, lock, numlock, numlock | lock] {
                xcb::grab_button(
                    &self.conn,
                    false,
                    id,
                    BUTTON_MASK,
                    GRAB_MODE_ASYNC,
                    GRAB_MODE_SYNC,
                    xcb::NONE,
                    xcb::NONE,
                    button,
                    mods | extra,
                );
            }
        }
    }

    fn ungrab_buttons(&self, id: Xid) {
        xcb::ungrab_button(&self.conn, xcb::BUTTON_INDEX_ANY as u8, id, xcb::MOD_MASK_ANY as u16);
    }

    fn grab_keys(&self, keys: &[(u16, u32)], numlock: u16) {
        self.ungrab_keys();
        let syms = KeySymbols::new(&self.conn);
        let lock = xcb::MOD_MASK_LOCK as u16;
        for &(mods, keysym) in keys {
            for code in syms.get_keycode(keysym) {
                for extra in &[0, lock, numlock, numlock | lock] {
                    // xcb docs: https://www.mankier.com/3/xcb_grab_key
                    xcb::grab_key(
                        &self.conn,      // xcb connection to X11
                        true,            // pass grabbed events through to the window
                        self.root,       // the window to grab: in this case the root window
                        mods | extra,    // modifiers to grab
                        code,            // keycode to grab
                        GRAB_MODE_ASYNC, // don't lock pointer input while grabbing
                        GRAB_MODE_ASYNC, // don't lock keyboard input while grabbing
                    );
                }
            }
        }
    }

    fn ungrab_keys(&self) {
        xcb::ungrab_key(&self.conn, xcb::GRAB_ANY as u8, self.root, xcb::MOD_MASK_ANY as u16);
    }

    fn keycode_to_keysym(&self, code: u8) -> u32 {
        KeySymbols::new(&self.conn).get_keysym(code, 0)
    }

    fn numlock_mask(&self) -> u16 {
        let syms = KeySymbols::new(&self.conn);
        let numlock_codes: Vec<xcb::Keycode> = syms.get_keycode(XK_NUM_LOCK).collect();
        let reply = match xcb::get_modifier_mapping(&self.conn).get_reply() {
            Ok(r) => r,
            Err(_) => return 0,
        };
        let per_mod = reply.keycodes_per_modifier() as usize;
        let codes = reply.keycodes();
        for modifier in 0..8 {
            let held = &codes[(modifier * per_mod).min(codes.len())..((modifier + 1) * per_mod).min(codes.len())];
            if held.iter().any(|c| *c != 0 && numlock_codes.contains(c)) {
                return 1 << modifier;
            }
        }
        0
    }

    fn focus_window(&self, id: Xid) {
        xcb::set_input_focus(&self.conn, INPUT_FOCUS_POINTER_ROOT, id, xcb::CURRENT_TIME);
        ewmh::set_active_window(&self.conn, self.preferred_screen, id);
    }

    fn focus_root(&self) {
        xcb::set_input_focus(&self.conn, INPUT_FOCUS_POINTER_ROOT, self.root, xcb::CURRENT_TIME);
        xcb::delete_property(&self.conn, self.root, self.atoms._NET_ACTIVE_WINDOW);
    }

    fn supports_protocol(&self, id: Xid, proto: Protocol) -> bool {
        let atom = self.protocol_atom(proto);
        self.get_wm_protocols(id)
            .map(|protocols| protocols.contains(&atom))
            .unwrap_or(false)
    }

    fn send_protocol(&self, id: Xid, proto: Protocol) -> bool {
        if !self.supports_protocol(id, proto) {
            return false;
        }
        let atom = self.protocol_atom(proto);
        let data = xcb::ClientMessageData::from_data32([atom, xcb::CURRENT_TIME, 0, 0, 0]);
        let event = xcb::ClientMessageEvent::new(32, id, self.conn.WM_PROTOCOLS(), data);
        xcb::send_event(&self.conn, false, id, xcb::EVENT_MASK_NO_EVENT, &event);
        true
    }

    fn kill_client(&self, id: Xid) {
        xcb::grab_server(&self.conn);
        xcb::set_close_down_mode(&self.conn, xcb::CLOSE_DOWN_DESTROY_ALL as u8);
        xcb::kill_client(&self.conn, id);
        xcb::ungrab_server(&self.conn);
    }

    fn grab_server(&self) {
        xcb::grab_server(&self.conn);
    }

    fn ungrab_server(&self) {
        xcb::ungrab_server(&self.conn);
    }

    fn set_client_list(&self, ids: &[Xid]) {
        xcb::change_property(
            &self.conn,
            PROP_MODE_REPLACE,
            self.root,
            self.atoms._NET_CLIENT_LIST,
            xcb::ATOM_WINDOW,
            32,
            ids,
        );
    }

    fn pointer_position(&self) -> Option<Point> {
        xcb::query_pointer(&self.conn, self.root)
            .get_reply()
            .ok()
            .map(|r| Point::new(r.root_x() as i32, r.root_y() as i32))
    }

    fn grab_pointer(&self) -> bool {
        xcb::grab_pointer(
            &self.conn,
            false,
            self.root,
            MOUSE_MASK,
            GRAB_MODE_ASYNC,
            GRAB_MODE_ASYNC,
            xcb::NONE,
            xcb::NONE,
            xcb::CURRENT_TIME,
        )
        .get_reply()
        .map(|r| r.status() == xcb::GRAB_STATUS_SUCCESS as u8)
        .unwrap_or(false)
    }

    fn ungrab_pointer(&self) {
        xcb::ungrab_pointer(&self.conn, xcb::CURRENT_TIME);
    }

    fn warp_pointer(&self, id: Xid, x: i32, y: i32) {
        xcb::warp_pointer(&self.conn, xcb::NONE, id, 0, 0, 0, 0, x as i16, y as i16);
    }

    fn replay_pointer(&self) {
        xcb::allow_events(&self.conn, xcb::ALLOW_REPLAY_POINTER as u8, xcb::CURRENT_TIME);
    }

    fn create_bar_window(&self, r: Rectangle) -> Xid {
        let id = self.conn.generate_id();
        xcb::create_window(
            &self.conn,
            xcb::COPY_FROM_PARENT as u8,
            id,
            self.root,
            r.x as i16,
            r.y as i16,
            r.w as u16,
            r.h as u16,
            0,
            xcb::WINDOW_CLASS_INPUT_OUTPUT as u16,
            xcb::COPY_FROM_PARENT,
            &[
                (xcb::CW_BACK_PIXEL, 0),
                (xcb::CW_OVERRIDE_REDIRECT, 1),
                (xcb::CW_EVENT_MASK, xcb::EVENT_MASK_BUTTON_PRESS | xcb::EVENT_MASK_EXPOSURE),
            ],
        );
        xcb::change_property(
            &self.conn,
            PROP_MODE_REPLACE,
            id,
            xcb::ATOM_WM_CLASS,
            xcb::ATOM_STRING,
            8,
            b"horizonwm\0horizonwm\0",
        );
        xcb::map_window(&self.conn, id);
        self.raise_window(id);
        id
    }

    fn init_ewmh(&self, wm_name: &str) {
        let check = self.conn.generate_id();
        xcb::create_window(
            &self.conn,
            0,
            check,
            self.root,
            0,
            0,
            1,
            1,
            0,
            xcb::WINDOW_CLASS_INPUT_ONLY as u16,
            xcb::COPY_FROM_PARENT,
            &[],
        );
        for win in &[check, self.root] {
            xcb::change_property(
                &self.conn,
                PROP_MODE_REPLACE,
                *win,
                self.atoms._NET_SUPPORTING_WM_CHECK,
                xcb::ATOM_WINDOW,
                32,
                &[check],
            );
        }
        xcb::change_property(
            &self.conn,
            PROP_MODE_REPLACE,
            check,
            self.atoms._NET_WM_NAME,
            self.atoms.UTF8_STRING,
            8,
            wm_name.as_bytes(),
        );
        let supported = [
            self.atoms._NET_ACTIVE_WINDOW,
            self.atoms._NET_SUPPORTED,
            self.atoms._NET_WM_NAME,
            self.atoms._NET_WM_STATE,
            self.atoms._NET_SUPPORTING_WM_CHECK,
            self.atoms._NET_WM_STATE_FULLSCREEN,
            self.atoms._NET_WM_WINDOW_TYPE,
            self.atoms._NET_WM_WINDOW_TYPE_DIALOG,
            self.atoms._NET_CLIENT_LIST,
        ];
        xcb::change_property(
            &self.conn,
            PROP_MODE_REPLACE,
            self.root,
            self.atoms._NET_SUPPORTED,
            xcb::ATOM_ATOM,
            32,
            &supported,
        );
        xcb::delete_property(&self.conn, self.root, self.atoms._NET_CLIENT_LIST);
        self.check_win.set(Some(check));
    }

    // - Release all of the keybindings we are holding on to
    // - destroy the check window
    // - mark ourselves as no longer being the active root window
    fn cleanup(&self) {
        self.ungrab_keys();
        if let Some(check) = self.check_win.take() {
            xcb::destroy_window(&self.conn, check);
        }
        self.focus_root();
        self.conn.flush();
    }
}
