//! A recording stand-in for the X server, used by the window manager tests.
use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
};

use crate::{
    client::{SizeHints, WmHints},
    events::{ConfigureRequest, XEvent},
    geometry::{Point, Rectangle},
    xconnection::{ClassHint, Protocol, WindowAttributes, WmState, XConn, Xid},
};

pub const ROOT: Xid = 1;
pub const SCREEN: (u32, u32) = (1000, 821);

/// Properties of a fake client window
#[derive(Debug, Clone, Default)]
pub struct MockWindow {
    pub rect: Rectangle,
    pub title: Option<String>,
    pub class: Option<(&'static str, &'static str)>,
    pub pid: Option<u32>,
    pub transient_for: Option<Xid>,
    pub hints: Option<SizeHints>,
    pub wm_hints: Option<WmHints>,
    pub fullscreen: bool,
    pub dialog: bool,
    pub protocols: Vec<Protocol>,
    pub viewable: bool,
}

impl MockWindow {
    pub fn new(class: &'static str, pid: u32) -> MockWindow {
        MockWindow {
            rect: Rectangle::new(0, 0, 200, 100),
            title: Some(format!("{} window", class)),
            class: Some((class, class)),
            pid: Some(pid),
            ..MockWindow::default()
        }
    }
}

/// Every request is recorded as a short string, e.g. `map 5`.
#[derive(Default)]
pub struct MockConn {
    pub windows: RefCell<HashMap<Xid, MockWindow>>,
    pub events: RefCell<VecDeque<XEvent>>,
    pub calls: RefCell<Vec<String>>,
    pub regions: RefCell<Vec<Rectangle>>,
    pub keysyms: RefCell<HashMap<u8, u32>>,
    pub states: RefCell<HashMap<Xid, WmState>>,
    pub pointer: Cell<Point>,
    next_bar: Cell<Xid>,
}

impl MockConn {
    pub fn new() -> MockConn {
        let conn = MockConn::default();
        conn.regions.replace(vec![Rectangle::new(0, 0, SCREEN.0, SCREEN.1)]);
        conn.next_bar.set(1000);
        conn
    }

    pub fn add_window(&self, id: Xid, w: MockWindow) {
        self.windows.borrow_mut().insert(id, w);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Recorded calls starting with `prefix`
    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls.borrow().iter().filter(|c| c.starts_with(prefix)).cloned().collect()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn window<T>(&self, id: Xid, f: impl FnOnce(&MockWindow) -> Option<T>) -> Option<T> {
        self.windows.borrow().get(&id).and_then(f)
    }
}

impl XConn for MockConn {
    fn root(&self) -> Xid {
        ROOT
    }

    fn screen_size(&self) -> (u32, u32) {
        SCREEN
    }

    fn monitor_regions(&self) -> Vec<Rectangle> {
        self.regions.borrow().clone()
    }

    fn next_event(&self) -> Option<XEvent> {
        self.events.borrow_mut().pop_front()
    }

    fn flush(&self) {}

    fn discard_enter_events(&self) {
        self.events
            .borrow_mut()
            .retain(|e| !matches!(e, XEvent::EnterNotify { .. }));
    }

    fn window_attributes(&self, id: Xid) -> Option<WindowAttributes> {
        self.window(id, |w| {
            Some(WindowAttributes {
                override_redirect: false,
                viewable: w.viewable,
                rect: w.rect,
                border: 0,
            })
        })
    }

    fn top_level_windows(&self) -> Vec<Xid> {
        let mut ids: Vec<Xid> = self.windows.borrow().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn title(&self, id: Xid) -> Option<String> {
        self.window(id, |w| w.title.clone())
    }

    fn class_hint(&self, id: Xid) -> Option<ClassHint> {
        self.window(id, |w| {
            w.class.map(|(class, instance)| ClassHint {
                class: class.to_string(),
                instance: instance.to_string(),
            })
        })
    }

    fn transient_for(&self, id: Xid) -> Option<Xid> {
        self.window(id, |w| w.transient_for)
    }

    fn window_pid(&self, id: Xid) -> Option<u32> {
        self.window(id, |w| w.pid)
    }

    fn size_hints(&self, id: Xid) -> Option<SizeHints> {
        self.window(id, |w| w.hints)
    }

    fn wm_hints(&self, id: Xid) -> Option<WmHints> {
        self.window(id, |w| w.wm_hints)
    }

    fn set_wm_hints(&self, id: Xid, hints: &WmHints) {
        if let Some(w) = self.windows.borrow_mut().get_mut(&id) {
            w.wm_hints = Some(*hints);
        }
        self.record(format!("wm_hints {} urgent={}", id, hints.is_urgent()));
    }

    fn requests_fullscreen(&self, id: Xid) -> bool {
        self.window(id, |w| Some(w.fullscreen)).unwrap_or(false)
    }

    fn is_dialog(&self, id: Xid) -> bool {
        self.window(id, |w| Some(w.dialog)).unwrap_or(false)
    }

    fn wm_state(&self, id: Xid) -> Option<WmState> {
        self.states.borrow().get(&id).copied()
    }

    fn set_wm_state(&self, id: Xid, state: WmState) {
        self.states.borrow_mut().insert(id, state);
        self.record(format!("state {} {:?}", id, state));
    }

    fn set_fullscreen_state(&self, id: Xid, fullscreen: bool) {
        self.record(format!("fullscreen {} {}", id, fullscreen));
    }

    fn configure_window(&self, id: Xid, r: Rectangle, border: u32) {
        self.record(format!("configure {} {} {} {} {} {}", id, r.x, r.y, r.w, r.h, border));
    }

    fn move_window(&self, id: Xid, x: i32, y: i32) {
        self.record(format!("move {} {} {}", id, x, y));
    }

    fn set_border_width(&self, id: Xid, border: u32) {
        self.record(format!("border_width {} {}", id, border));
    }

    fn set_border_color(&self, id: Xid, color: u32) {
        self.record(format!("border_color {} {:06x}", id, color));
    }

    fn send_configure_notify(&self, id: Xid, r: Rectangle, _: u32) {
        self.record(format!("notify {} {} {} {} {}", id, r.x, r.y, r.w, r.h));
    }

    fn forward_configure_request(&self, req: &ConfigureRequest) {
        self.record(format!("forward {}", req.id));
    }

    fn map_window(&self, id: Xid) {
        self.record(format!("map {}", id));
    }

    fn unmap_window(&self, id: Xid) {
        self.record(format!("unmap {}", id));
    }

    fn raise_window(&self, id: Xid) {
        self.record(format!("raise {}", id));
    }

    fn stack_below(&self, id: Xid, sibling: Xid) {
        self.record(format!("stack {} below {}", id, sibling));
    }

    fn destroy_window(&self, id: Xid) {
        self.record(format!("destroy {}", id));
    }

    fn select_client_events(&self, id: Xid) {
        self.record(format!("select {}", id));
    }

    fn clear_client_events(&self, id: Xid) {
        self.record(format!("unselect {}", id));
    }

    fn grab_buttons(&self, id: Xid, focused: bool, _: &[(u8, u16)], _: u16) {
        self.record(format!("grab_buttons {} {}", id, focused));
    }

    fn ungrab_buttons(&self, id: Xid) {
        self.record(format!("ungrab_buttons {}", id));
    }

    fn grab_keys(&self, keys: &[(u16, u32)], _: u16) {
        self.record(format!("grab_keys {}", keys.len()));
    }

    fn ungrab_keys(&self) {
        self.record("ungrab_keys".into());
    }

    fn keycode_to_keysym(&self, code: u8) -> u32 {
        self.keysyms.borrow().get(&code).copied().unwrap_or(0)
    }

    fn numlock_mask(&self) -> u16 {
        crate::bindings::mask::MOD2
    }

    fn focus_window(&self, id: Xid) {
        self.record(format!("focus {}", id));
    }

    fn focus_root(&self) {
        self.record("focus root".into());
    }

    fn supports_protocol(&self, id: Xid, proto: Protocol) -> bool {
        self.window(id, |w| Some(w.protocols.contains(&proto))).unwrap_or(false)
    }

    fn send_protocol(&self, id: Xid, proto: Protocol) -> bool {
        if !self.supports_protocol(id, proto) {
            return false;
        }
        self.record(format!("protocol {} {:?}", id, proto));
        true
    }

    fn kill_client(&self, id: Xid) {
        self.record(format!("kill {}", id));
    }

    fn grab_server(&self) {}

    fn ungrab_server(&self) {}

    fn set_client_list(&self, ids: &[Xid]) {
        self.record(format!("client_list {:?}", ids));
    }

    fn pointer_position(&self) -> Option<Point> {
        Some(self.pointer.get())
    }

    fn grab_pointer(&self) -> bool {
        self.record("grab_pointer".into());
        true
    }

    fn ungrab_pointer(&self) {
        self.record("ungrab_pointer".into());
    }

    fn warp_pointer(&self, id: Xid, x: i32, y: i32) {
        self.record(format!("warp {} {} {}", id, x, y));
    }

    fn replay_pointer(&self) {}

    fn create_bar_window(&self, r: Rectangle) -> Xid {
        let id = self.next_bar.get();
        self.next_bar.set(id + 1);
        self.record(format!("bar {} {} {} {}", id, r.x, r.y, r.w));
        id
    }

    fn init_ewmh(&self, wm_name: &str) {
        self.record(format!("ewmh {}", wm_name));
    }

    fn cleanup(&self) {
        self.record("cleanup".into());
    }
}
