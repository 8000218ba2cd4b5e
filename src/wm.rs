//! The event loop and the handlers that keep the client model and the X
//! server in step.
use std::sync::Arc;

use anyhow::bail;
use time::UtcOffset;

use crate::{
    bar::{Bar, BarRegion, BarSnapshot, TagCell},
    bindings::{clean_mask, client_button_grabs, find_button, find_key, Click},
    client::{Client, ClientId, HintBounds},
    config::Config,
    events::{ClientMessage, ConfigureRequest, Property, StateAction, XEvent},
    geometry::{Point, Rectangle},
    layout::{self, Gaps, Layout, LayoutKind},
    menu::Menu,
    registry::Registry,
    rules::{apply_rules, resolve_tags},
    spawn::Spawner,
    status::StatusState,
    swallow::{self, ProcessTable},
    tag::TagSet,
    xconnection::{is_benign_error, Protocol, WindowAttributes, WmState, XConn, Xid},
    Result,
};

/// Collaborators the window manager calls out to.
pub struct Services {
    pub spawner: Arc<dyn Spawner>,
    pub procs: Box<dyn ProcessTable>,
    pub menu: Box<dyn Menu>,
    pub bar: Arc<Bar>,
    pub status: StatusState,
    /// Local time offset, captured before any thread was started
    pub offset: UtcOffset,
}

pub struct WindowManager<X: XConn> {
    pub(crate) conn: X,
    pub(crate) config: Config,
    pub(crate) reg: Registry,
    pub(crate) services: Services,
    pub(crate) screen: Rectangle,
    pub(crate) bar_height: u32,
    pub(crate) gaps: Gaps,
    pub(crate) numlock: u16,
    pub(crate) valid_tags: TagSet,
    /// Monitor the pointer was last seen on
    motion_mon: Option<usize>,
    pub(crate) running: bool,
}

impl<X: XConn> WindowManager<X> {
    /// Set up monitors, bars and EWMH state on an already registered connection.
    pub fn new(conn: X, config: Config, services: Services) -> Result<Self> {
        let (w, h) = conn.screen_size();
        let screen = Rectangle::new(0, 0, w, h);
        let bar_height = services.bar.height();
        let mut reg = Registry::new(vec![]);
        let mut regions = conn.monitor_regions();
        if regions.is_empty() {
            regions.push(screen);
        }
        reg.reconcile_monitors(&regions, &config.monitor_defaults(), bar_height);
        info!("managing {} monitor(s) on a {}x{} screen", reg.monitors.len(), w, h);

        let mut wm = WindowManager {
            numlock: conn.numlock_mask(),
            valid_tags: config.tag_mask(),
            gaps: config.gaps,
            conn,
            config,
            reg,
            services,
            screen,
            bar_height,
            motion_mon: None,
            running: false,
        };

        wm.update_bars();
        wm.conn.init_ewmh(wm.config.wm_name);
        wm.grab_keys();
        wm.focus(None);
        wm.conn.flush();

        Ok(wm)
    }

    /// Manage pre-existing windows, launch the startup programs, then process
    /// events until asked to quit.
    pub fn run(&mut self) -> Result<()> {
        self.scan();
        for argv in self.config.startup.clone() {
            self.services.spawner.spawn(argv);
        }
        self.draw_bars();
        self.conn.flush();

        self.running = true;
        while self.running {
            let event = match self.conn.next_event() {
                Some(e) => e,
                None => bail!("lost the connection to the X server"),
            };
            self.handle_event(event)?;
            self.conn.flush();
        }

        self.cleanup();
        Ok(())
    }

    pub(crate) fn handle_event(&mut self, event: XEvent) -> Result<()> {
        trace!("got XEvent: {:?}", event);
        match event {
            XEvent::ButtonPress {
                id, button, state, x, ..
            } => self.handle_button_press(id, button, state, x)?,
            XEvent::ButtonRelease => (),
            XEvent::ClientMessage { id, message } => self.handle_client_message(id, message),
            XEvent::ConfigureNotify { r, is_root, .. } => {
                if is_root {
                    self.handle_screen_change(r)
                }
            }
            XEvent::ConfigureRequest(req) => self.handle_configure_request(&req),
            XEvent::DestroyNotify { id } => self.handle_destroy_notify(id),
            XEvent::EnterNotify { id, normal } => self.handle_enter_notify(id, normal),
            XEvent::Expose { id, count } => {
                if count == 0 && self.bar_monitor(id).is_some() {
                    self.services.bar.draw_all();
                }
            }
            XEvent::FocusIn { id } => self.handle_focus_in(id),
            XEvent::KeyPress { code, state } => self.handle_key_press(code, state)?,
            XEvent::MappingNotify { keyboard } => {
                if keyboard {
                    self.grab_keys();
                }
            }
            XEvent::MapRequest { id, override_redirect } => {
                if !override_redirect && self.reg.win_to_client(id).is_none() {
                    if let Some(attrs) = self.conn.window_attributes(id) {
                        self.manage(id, attrs);
                    }
                }
            }
            XEvent::MotionNotify { id, root_x, root_y, .. } => self.handle_motion_notify(id, root_x, root_y),
            XEvent::PropertyNotify {
                id,
                property,
                deleted,
                is_root,
            } => self.handle_property_notify(id, property, deleted, is_root),
            XEvent::UnmapNotify { id, send_event } => self.handle_unmap_notify(id, send_event),
            XEvent::Error {
                request_code,
                error_code,
            } => {
                if is_benign_error(request_code, error_code) {
                    trace!("ignoring X error {} from request {}", error_code, request_code);
                } else {
                    error!("fatal X error {} from request {}", error_code, request_code);
                    bail!("X error {} from request {}", error_code, request_code);
                }
            }
        }
        Ok(())
    }

    /// Shut down the WindowManager: hand every window back in a usable state.
    fn cleanup(&mut self) {
        info!("shutting down");
        let valid = self.valid_tags;
        let floating = Layout::new("><>", LayoutKind::Floating);
        let mon = self.reg.selmon_mut();
        mon.view(valid, valid);
        mon.set_layout(Some(floating));

        for m in 0..self.reg.monitors.len() {
            while let Some(&id) = self.reg.monitors[m].stack.first() {
                self.unmanage(id, false);
            }
        }
        for m in &self.reg.monitors {
            if let Some(win) = m.bar_win {
                self.conn.unmap_window(win);
                self.conn.destroy_window(win);
            }
        }
        self.conn.cleanup();
    }

    /// Manage windows that were already there when we started.
    fn scan(&mut self) {
        let wins = self.conn.top_level_windows();
        let mut transients = vec![];
        for win in wins {
            if self.reg.win_to_client(win).is_some() {
                continue;
            }
            let attrs = match self.conn.window_attributes(win) {
                Some(a) if !a.override_redirect => a,
                _ => continue,
            };
            if !(attrs.viewable || self.conn.wm_state(win) == Some(WmState::Iconic)) {
                continue;
            }
            if self.conn.transient_for(win).is_some() {
                transients.push((win, attrs));
            } else {
                self.manage(win, attrs);
            }
        }
        for (win, attrs) in transients {
            self.manage(win, attrs);
        }
    }

    /*
     * Model to X helpers
     */

    pub(crate) fn hint_bounds(&self, mon: usize) -> HintBounds {
        let m = &self.reg.monitors[mon];
        HintBounds {
            screen: self.screen,
            work: m.work,
            bar_height: self.bar_height,
            respect_hints: self.config.resize_hints,
            floating_layout: !m.layout().arranges(),
        }
    }

    /// Resize a client, honouring its size hints. No-op if nothing changes.
    pub(crate) fn resize(&mut self, id: ClientId, r: Rectangle, interact: bool) {
        let (adjusted, changed) = match self.reg.get(id) {
            Some(c) => c.apply_size_hints(r, interact, &self.hint_bounds(c.mon)),
            None => return,
        };
        if changed {
            self.resize_client(id, adjusted);
        }
    }

    pub(crate) fn resize_client(&mut self, id: ClientId, r: Rectangle) {
        if let Some(c) = self.reg.get_mut(id) {
            c.old_rect = c.rect;
            c.rect = r;
            self.conn.configure_window(c.win, r, c.bw);
            self.conn.send_configure_notify(c.win, r, c.bw);
        }
    }

    fn configure(&self, id: ClientId) {
        if let Some(c) = self.reg.get(id) {
            self.conn.send_configure_notify(c.win, c.rect, c.bw);
        }
    }

    fn update_client_list(&self) {
        self.conn.set_client_list(&self.reg.windows());
    }

    fn grab_keys(&mut self) {
        self.numlock = self.conn.numlock_mask();
        self.conn.grab_keys(&self.config.key_grabs(), self.numlock);
    }

    fn grab_buttons(&self, id: ClientId, focused: bool) {
        if let Some(c) = self.reg.get(id) {
            let grabs = client_button_grabs(&self.config.buttons);
            self.conn.grab_buttons(c.win, focused, &grabs, self.numlock);
        }
    }

    /*
     * Arrangement
     */

    /// Re-tile one monitor, or all of them.
    pub(crate) fn arrange(&mut self, mon: Option<usize>) {
        match mon {
            Some(m) => {
                self.show_hide(m);
                self.arrange_monitor(m);
                self.restack(m);
            }
            None => {
                for m in 0..self.reg.monitors.len() {
                    self.show_hide(m);
                }
                for m in 0..self.reg.monitors.len() {
                    self.arrange_monitor(m);
                }
            }
        }
    }

    /// Move visible clients into place and hidden ones off screen.
    fn show_hide(&mut self, mon: usize) {
        let arranges = self.reg.monitors[mon].layout().arranges();
        let stack = self.reg.monitors[mon].stack.clone();
        for &id in &stack {
            if !self.reg.is_visible(id) {
                continue;
            }
            let (win, rect, floating, fullscreen) = match self.reg.get(id) {
                Some(c) => (c.win, c.rect, c.floating, c.fullscreen),
                None => continue,
            };
            self.conn.move_window(win, rect.x, rect.y);
            if (!arranges || floating) && !fullscreen {
                self.resize(id, rect, false);
            }
        }
        for &id in stack.iter().rev() {
            if self.reg.is_visible(id) {
                continue;
            }
            if let Some(c) = self.reg.get(id) {
                self.conn.move_window(c.win, -2 * c.outer_width(), c.rect.y);
            }
        }
    }

    fn arrange_monitor(&mut self, mon: usize) {
        let m = &self.reg.monitors[mon];
        let (work, nmaster, mfact, lt) = (m.work, m.nmaster, m.mfact, m.layout());
        self.reg.monitors[mon].symbol = lt.symbol.to_string();

        let tiled = self.reg.tiled(mon);
        let rects = match lt.kind {
            LayoutKind::Floating => return,
            LayoutKind::Tile => layout::tile(work, tiled.len(), nmaster, mfact, self.gaps),
            LayoutKind::Monocle => {
                if let Some(symbol) = layout::monocle_symbol(self.reg.visible(mon).len()) {
                    self.reg.monitors[mon].symbol = symbol;
                }
                layout::monocle(work, tiled.len())
            }
        };
        for (id, r) in tiled.into_iter().zip(rects) {
            let bw = self.reg.get(id).map_or(0, |c| c.bw);
            self.resize(id, r.without_border(bw), false);
        }
    }

    /// Raise the selection if it floats and stack tiled clients below the bar.
    pub(crate) fn restack(&mut self, mon: usize) {
        self.draw_bars();
        let m = &self.reg.monitors[mon];
        let sel = match m.sel.and_then(|id| self.reg.get(id)) {
            Some(c) => c,
            None => return,
        };
        if sel.floating || !m.layout().arranges() {
            self.conn.raise_window(sel.win);
        }
        if m.layout().arranges() {
            let mut sibling = m.bar_win;
            for &id in &m.stack {
                if !self.reg.is_visible(id) {
                    continue;
                }
                if let Some(c) = self.reg.get(id).filter(|c| !c.floating) {
                    if let Some(s) = sibling {
                        self.conn.stack_below(c.win, s);
                    }
                    sibling = Some(c.win);
                }
            }
        }
        self.conn.discard_enter_events();
    }

    /*
     * Focus
     */

    /// Focus `id`, or the most recently focused visible client when it is
    /// `None` or hidden.
    pub(crate) fn focus(&mut self, id: Option<ClientId>) {
        let id = id.filter(|&c| self.reg.is_visible(c)).or_else(|| {
            self.reg
                .selmon()
                .stack
                .iter()
                .copied()
                .find(|&c| self.reg.is_visible(c))
        });

        if let Some(old) = self.reg.sel() {
            if Some(old) != id {
                self.unfocus(old, false);
            }
        }

        match id {
            Some(c) => {
                let mon = self.reg.get(c).map_or(self.reg.selmon, |c| c.mon);
                self.reg.selmon = mon;
                if self.reg.get(c).map_or(false, |c| c.urgent) {
                    self.set_urgent(c, false);
                }
                self.reg.detach_stack(c);
                self.reg.attach_stack(c);
                self.grab_buttons(c, true);
                if let Some(client) = self.reg.get(c) {
                    self.conn.set_border_color(client.win, self.config.sel.border);
                }
                self.set_focus(c);
            }
            None => self.conn.focus_root(),
        }
        self.reg.selmon_mut().sel = id;
        self.draw_bars();
    }

    pub(crate) fn unfocus(&mut self, id: ClientId, revoke_focus: bool) {
        self.grab_buttons(id, false);
        if let Some(c) = self.reg.get(id) {
            self.conn.set_border_color(c.win, self.config.norm.border);
        }
        if revoke_focus {
            self.conn.focus_root();
        }
    }

    fn set_focus(&self, id: ClientId) {
        if let Some(c) = self.reg.get(id) {
            if !c.never_focus {
                self.conn.focus_window(c.win);
            }
            self.conn.send_protocol(c.win, Protocol::TakeFocus);
        }
    }

    fn set_urgent(&mut self, id: ClientId, urgent: bool) {
        let win = match self.reg.get_mut(id) {
            Some(c) => {
                c.urgent = urgent;
                c.win
            }
            None => return,
        };
        if let Some(mut hints) = self.conn.wm_hints(win) {
            hints.set_urgent(urgent);
            self.conn.set_wm_hints(win, &hints);
        }
    }

    /// Make the selection follow the pointer onto monitor `mon`.
    pub(crate) fn select_monitor(&mut self, mon: usize) {
        if mon == self.reg.selmon {
            return;
        }
        if let Some(sel) = self.reg.sel() {
            self.unfocus(sel, true);
        }
        self.reg.selmon = mon;
        self.focus(None);
    }

    /// Monitor a window lives on: the root maps to the one under the pointer.
    fn win_to_mon(&self, win: Xid) -> usize {
        if win == self.conn.root() {
            if let Some(p) = self.conn.pointer_position() {
                return self.reg.rect_to_mon(Rectangle::new(p.x, p.y, 1, 1));
            }
        }
        if let Some(m) = self.bar_monitor(win) {
            return m;
        }
        self.reg
            .win_to_client(win)
            .and_then(|id| self.reg.get(id))
            .map_or(self.reg.selmon, |c| c.mon)
    }

    fn bar_monitor(&self, win: Xid) -> Option<usize> {
        self.reg.monitors.iter().position(|m| m.bar_win == Some(win))
    }

    /*
     * Client lifecycle
     */

    fn manage(&mut self, win: Xid, attrs: WindowAttributes) {
        let mut c = Client::new(win, attrs.rect, attrs.border);
        c.set_title(self.conn.title(win));
        c.pid = self.conn.window_pid(win).unwrap_or(0);

        let parent = self
            .conn
            .transient_for(win)
            .and_then(|t| self.reg.win_to_client(t))
            .and_then(|t| self.reg.get(t));
        let is_transient = parent.is_some();
        match parent {
            Some(p) => {
                c.mon = p.mon;
                c.tags = p.tags;
            }
            None => {
                if let Some(hint) = self.conn.class_hint(win) {
                    c.class = hint.class;
                    c.instance = hint.instance;
                }
                let out = apply_rules(&self.config.rules, &c.class, &c.instance, &c.title);
                c.floating = out.floating;
                c.terminal = out.terminal;
                c.no_swallow = out.no_swallow;
                c.mon = out
                    .monitor
                    .filter(|&m| m < self.reg.monitors.len())
                    .unwrap_or(self.reg.selmon);
                c.tags = resolve_tags(out.tags, self.reg.monitors[c.mon].tagset(), self.valid_tags);
            }
        }

        // keep the window inside its monitor's work area
        let work = self.reg.monitors[c.mon].work;
        if c.rect.x + c.outer_width() > work.right() {
            c.rect.x = work.right() - c.outer_width();
        }
        if c.rect.y + c.outer_height() > work.bottom() {
            c.rect.y = work.bottom() - c.outer_height();
        }
        c.rect.x = c.rect.x.max(work.x);
        c.rect.y = c.rect.y.max(work.y);
        c.old_rect = c.rect;
        c.bw = self.config.border_px;

        self.conn.set_border_width(win, c.bw);
        self.conn.set_border_color(win, self.config.norm.border);
        self.conn.send_configure_notify(win, c.rect, c.bw);

        if self.conn.is_dialog(win) {
            c.floating = true;
        }
        c.hints = self.conn.size_hints(win).unwrap_or_default();
        c.fixed = c.hints.is_fixed();
        if let Some(h) = self.conn.wm_hints(win) {
            c.urgent = h.is_urgent();
            c.never_focus = h.accepts_input().map_or(false, |input| !input);
        }
        if !c.floating {
            c.floating = is_transient || c.fixed;
        }
        c.old_floating = c.floating;

        self.conn.select_client_events(win);

        if let Some(term) = swallow::terminal_for(&self.reg, self.services.procs.as_ref(), &c) {
            self.swallow_terminal(term, c);
            return;
        }

        let mon = c.mon;
        let floating = c.floating;
        let (x, y) = (c.rect.x, c.rect.y);
        let id = self.reg.insert(c);
        debug!("managing window {} as {:?}", win, id);
        self.grab_buttons(id, false);
        if floating {
            self.conn.raise_window(win);
        }
        self.reg.attach(id);
        self.reg.attach_stack(id);
        self.update_client_list();

        // off screen until arranged, to avoid a flash at the old position
        self.conn.move_window(win, x + 2 * self.screen.w as i32, y);
        self.conn.set_wm_state(win, WmState::Normal);
        if mon == self.reg.selmon {
            if let Some(sel) = self.reg.sel() {
                self.unfocus(sel, false);
            }
        }
        self.reg.monitors[mon].sel = Some(id);
        self.arrange(Some(mon));
        self.conn.map_window(win);
        self.focus(None);

        if self.conn.requests_fullscreen(win) {
            self.set_fullscreen(id, true);
        }
    }

    fn swallow_terminal(&mut self, term: ClientId, child: Client) {
        let child_win = child.win;
        let term_win = match swallow::swallow(&mut self.reg, term, child) {
            Some(w) => w,
            None => return,
        };
        self.conn.set_wm_state(term_win, WmState::Withdrawn);
        self.conn.unmap_window(term_win);

        self.grab_buttons(term, false);
        if let Some(c) = self.reg.get(term) {
            self.conn.configure_window(child_win, c.rect, c.bw);
        }
        self.conn.set_wm_state(child_win, WmState::Normal);
        self.conn.map_window(child_win);
        self.configure(term);
        self.update_client_list();

        let mon = self.reg.get(term).map_or(self.reg.selmon, |c| c.mon);
        self.arrange(Some(mon));
        self.focus(Some(term));
    }

    /// Stop managing a client. `destroyed` is set when the window is already gone.
    pub(crate) fn unmanage(&mut self, id: ClientId, destroyed: bool) {
        let mon = match self.reg.get(id) {
            Some(c) => c.mon,
            None => return,
        };

        if self.reg.get(id).map_or(false, |c| c.swallowed.is_some()) {
            if self.reg.get(id).map_or(false, |c| c.fullscreen) {
                self.set_fullscreen(id, false);
            }
            if let Some(term_win) = swallow::unswallow(&mut self.reg, id) {
                if let Some(c) = self.reg.get(id) {
                    self.conn.configure_window(term_win, c.rect, c.bw);
                }
                self.conn.map_window(term_win);
                self.conn.set_wm_state(term_win, WmState::Normal);
            }
            self.update_client_list();
            self.focus(None);
            self.arrange(Some(mon));
            return;
        }

        let c = match self.reg.remove(id) {
            Some(c) => c,
            None => return,
        };
        debug!("unmanaging window {} ({})", c.win, c.class);
        if !destroyed {
            self.conn.grab_server();
            self.conn.clear_client_events(c.win);
            self.conn.set_border_width(c.win, c.old_bw);
            self.conn.ungrab_buttons(c.win);
            self.conn.set_wm_state(c.win, WmState::Withdrawn);
            self.conn.ungrab_server();
        }
        self.update_client_list();
        self.focus(None);
        self.arrange(Some(mon));
    }

    pub(crate) fn set_fullscreen(&mut self, id: ClientId, fullscreen: bool) {
        let (win, is_fullscreen, mon) = match self.reg.get(id) {
            Some(c) => (c.win, c.fullscreen, c.mon),
            None => return,
        };
        if fullscreen && !is_fullscreen {
            self.conn.set_fullscreen_state(win, true);
            if let Some(c) = self.reg.get_mut(id) {
                c.fullscreen = true;
                c.old_floating = c.floating;
                c.old_bw = c.bw;
                c.bw = 0;
                c.floating = true;
            }
            let screen = self.reg.monitors[mon].screen;
            self.resize_client(id, screen);
            self.conn.raise_window(win);
        } else if !fullscreen && is_fullscreen {
            self.conn.set_fullscreen_state(win, false);
            let restore = match self.reg.get_mut(id) {
                Some(c) => {
                    c.fullscreen = false;
                    c.floating = c.old_floating;
                    c.bw = c.old_bw;
                    c.old_rect
                }
                None => return,
            };
            self.resize_client(id, restore);
            self.arrange(Some(mon));
        }
    }

    /*
     * X Event handler functions
     */

    fn handle_unmap_notify(&mut self, win: Xid, send_event: bool) {
        if let Some(id) = self.reg.win_to_client(win) {
            if send_event {
                self.conn.set_wm_state(win, WmState::Withdrawn);
            } else {
                self.unmanage(id, false);
            }
        }
    }

    fn handle_destroy_notify(&mut self, win: Xid) {
        if let Some(id) = self.reg.win_to_client(win) {
            self.unmanage(id, true);
        } else if let Some(id) = self.reg.swallowing_client(win) {
            // the terminal went away underneath its child
            swallow::forget_swallowed(&mut self.reg, id);
            let mon = self.reg.get(id).map_or(self.reg.selmon, |c| c.mon);
            self.arrange(Some(mon));
            self.focus(None);
        }
    }

    fn handle_configure_request(&mut self, req: &ConfigureRequest) {
        let id = match self.reg.win_to_client(req.id) {
            Some(id) => id,
            None => {
                self.conn.forward_configure_request(req);
                return;
            }
        };
        let visible = self.reg.is_visible(id);
        let (screen, arranges) = match self.reg.get(id) {
            Some(c) => {
                let m = &self.reg.monitors[c.mon];
                (m.screen, m.layout().arranges())
            }
            None => return,
        };
        let c = match self.reg.get_mut(id) {
            Some(c) => c,
            None => return,
        };

        if req.has(ConfigureRequest::BORDER_WIDTH) {
            c.bw = req.border;
        } else if c.floating || !arranges {
            if req.has(ConfigureRequest::X) {
                c.old_rect.x = c.rect.x;
                c.rect.x = screen.x + req.x;
            }
            if req.has(ConfigureRequest::Y) {
                c.old_rect.y = c.rect.y;
                c.rect.y = screen.y + req.y;
            }
            if req.has(ConfigureRequest::WIDTH) {
                c.old_rect.w = c.rect.w;
                c.rect.w = req.w;
            }
            if req.has(ConfigureRequest::HEIGHT) {
                c.old_rect.h = c.rect.h;
                c.rect.h = req.h;
            }
            // centre floating windows that would overflow their monitor
            if c.rect.x + c.rect.w as i32 > screen.right() && c.floating {
                c.rect.x = screen.x + (screen.w as i32 / 2 - c.outer_width() / 2);
            }
            if c.rect.y + c.rect.h as i32 > screen.bottom() && c.floating {
                c.rect.y = screen.y + (screen.h as i32 / 2 - c.outer_height() / 2);
            }
            let moved = req.has(ConfigureRequest::X) || req.has(ConfigureRequest::Y);
            let sized = req.has(ConfigureRequest::WIDTH) || req.has(ConfigureRequest::HEIGHT);
            let (win, rect, bw) = (c.win, c.rect, c.bw);
            if moved && !sized {
                self.conn.send_configure_notify(win, rect, bw);
            }
            if visible {
                self.conn.configure_window(win, rect, bw);
            }
        } else {
            self.configure(id);
        }
    }

    fn handle_property_notify(&mut self, win: Xid, property: Property, deleted: bool, is_root: bool) {
        if is_root || deleted {
            return;
        }
        let id = match self.reg.win_to_client(win) {
            Some(id) => id,
            None => return,
        };
        match property {
            Property::TransientFor => {
                let parent = self.conn.transient_for(win).and_then(|t| self.reg.win_to_client(t));
                let mon = match self.reg.get_mut(id) {
                    Some(c) if !c.floating && parent.is_some() => {
                        c.floating = true;
                        c.mon
                    }
                    _ => return,
                };
                self.arrange(Some(mon));
            }
            Property::NormalHints => {
                let hints = self.conn.size_hints(win).unwrap_or_default();
                if let Some(c) = self.reg.get_mut(id) {
                    c.hints = hints;
                    c.fixed = hints.is_fixed();
                }
            }
            Property::WmHints => {
                self.update_wm_hints(id);
                self.draw_bars();
            }
            Property::Title => {
                let title = self.conn.title(win);
                let mon = match self.reg.get_mut(id) {
                    Some(c) => {
                        c.set_title(title);
                        c.mon
                    }
                    None => return,
                };
                if self.reg.monitors[mon].sel == Some(id) {
                    self.draw_bars();
                }
            }
            Property::WindowType => {
                if self.conn.requests_fullscreen(win) {
                    self.set_fullscreen(id, true);
                }
                if self.conn.is_dialog(win) {
                    if let Some(c) = self.reg.get_mut(id) {
                        c.floating = true;
                    }
                }
            }
            Property::Other => (),
        }
    }

    fn update_wm_hints(&mut self, id: ClientId) {
        let win = match self.reg.get(id) {
            Some(c) => c.win,
            None => return,
        };
        let mut hints = match self.conn.wm_hints(win) {
            Some(h) => h,
            None => return,
        };
        let focused = self.reg.sel() == Some(id);
        if focused && hints.is_urgent() {
            hints.set_urgent(false);
            self.conn.set_wm_hints(win, &hints);
        }
        if let Some(c) = self.reg.get_mut(id) {
            if !focused {
                c.urgent = hints.is_urgent();
            }
            c.never_focus = hints.accepts_input().map_or(false, |input| !input);
        }
    }

    fn handle_client_message(&mut self, win: Xid, message: ClientMessage) {
        let id = match self.reg.win_to_client(win) {
            Some(id) => id,
            None => return,
        };
        match message {
            ClientMessage::Fullscreen(action) => {
                let current = self.reg.get(id).map_or(false, |c| c.fullscreen);
                let wanted = match action {
                    StateAction::Add => true,
                    StateAction::Remove => false,
                    StateAction::Toggle => !current,
                };
                self.set_fullscreen(id, wanted);
            }
            ClientMessage::Activate => {
                let urgent = self.reg.get(id).map_or(false, |c| c.urgent);
                if self.reg.sel() != Some(id) && !urgent {
                    self.set_urgent(id, true);
                    self.draw_bars();
                }
            }
        }
    }

    fn handle_screen_change(&mut self, r: Rectangle) {
        self.screen = Rectangle::new(0, 0, r.w, r.h);
        let mut regions = self.conn.monitor_regions();
        if regions.is_empty() {
            regions.push(self.screen);
        }
        let defaults = self.config.monitor_defaults();
        let (dirty, gone) = self.reg.reconcile_monitors(&regions, &defaults, self.bar_height);
        for win in gone {
            self.conn.destroy_window(win);
        }
        if !dirty {
            return;
        }
        self.update_bars();
        for m in 0..self.reg.monitors.len() {
            let screen = self.reg.monitors[m].screen;
            for id in self.reg.monitors[m].clients.clone() {
                if self.reg.get(id).map_or(false, |c| c.fullscreen) {
                    self.resize_client(id, screen);
                }
            }
        }
        self.focus(None);
        self.arrange(None);
    }

    fn handle_enter_notify(&mut self, win: Xid, normal: bool) {
        if !normal && win != self.conn.root() {
            return;
        }
        let id = self.reg.win_to_client(win);
        let mon = self.win_to_mon(win);
        if mon != self.reg.selmon {
            self.select_monitor(mon);
            if id.is_none() {
                return;
            }
        } else if id.is_none() || id == self.reg.sel() {
            return;
        }
        self.focus(id);
    }

    fn handle_focus_in(&mut self, win: Xid) {
        if let Some(sel) = self.reg.sel() {
            if self.reg.get(sel).map_or(false, |c| c.win != win) {
                self.set_focus(sel);
            }
        }
    }

    fn handle_motion_notify(&mut self, win: Xid, root_x: i32, root_y: i32) {
        if win != self.conn.root() {
            return;
        }
        let mon = self.reg.rect_to_mon(Rectangle::new(root_x, root_y, 1, 1));
        if self.motion_mon.map_or(false, |prev| prev != mon) {
            self.select_monitor(mon);
        }
        self.motion_mon = Some(mon);
    }

    fn handle_key_press(&mut self, code: u8, state: u16) -> Result<()> {
        let keysym = self.conn.keycode_to_keysym(code);
        let action = find_key(&self.config.keys, keysym, state, self.numlock).map(|k| k.action);
        if let Some(action) = action {
            debug!("handling key {:#x}: {:?}", keysym, action);
            self.run_action(action)?;
        }
        Ok(())
    }

    fn handle_button_press(&mut self, win: Xid, button: u8, state: u16, x: i32) -> Result<()> {
        let mut click = Click::RootWin;
        let mut clicked_tag = 0;

        let mon = self.win_to_mon(win);
        self.select_monitor(mon);

        if let Some(bar_mon) = self.bar_monitor(win) {
            click = match self.services.bar.classify(bar_mon, x) {
                Some(BarRegion::Tag(t)) => {
                    clicked_tag = 1 << t;
                    Click::TagBar
                }
                Some(BarRegion::LtSymbol) => Click::LtSymbol,
                Some(BarRegion::Module(i)) => {
                    // the module owns the click, handled or not
                    let mask = clean_mask(state, self.numlock);
                    self.services.bar.click_module(i, mask, button);
                    return Ok(());
                }
                Some(BarRegion::Separator) => Click::StatusText,
                Some(BarRegion::WinTitle) | None => Click::WinTitle,
            };
        } else if let Some(id) = self.reg.win_to_client(win) {
            self.focus(Some(id));
            let selmon = self.reg.selmon;
            self.restack(selmon);
            self.conn.replay_pointer();
            click = Click::ClientWin;
        }

        let action = find_button(&self.config.buttons, click, button, state, self.numlock).map(|b| b.action);
        if let Some(action) = action {
            let action = if click == Click::TagBar {
                action.with_clicked_tag(clicked_tag)
            } else {
                action
            };
            self.run_action(action)?;
        }
        Ok(())
    }

    /*
     * Bars
     */

    /// Create missing bar windows and move existing ones into place.
    fn update_bars(&mut self) {
        let bh = self.bar_height;
        for m in self.reg.monitors.iter_mut() {
            let r = m.bar_rect(bh);
            match m.bar_win {
                Some(win) => self.conn.configure_window(win, r, 0),
                None => m.bar_win = Some(self.conn.create_bar_window(r)),
            }
        }
    }

    pub(crate) fn bar_snapshots(&self) -> Vec<BarSnapshot> {
        self.reg
            .monitors
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let (occupied, urgent) = self.reg.occupied_tags(i);
                let tags = self
                    .config
                    .tags
                    .iter()
                    .enumerate()
                    .map(|(t, label)| TagCell {
                        label: label.to_string(),
                        selected: m.tagset().contains(t),
                        occupied: occupied.contains(t),
                        urgent: urgent.contains(t),
                    })
                    .collect();
                let title = m.sel.and_then(|id| self.reg.get(id)).map(|c| c.title.clone());
                BarSnapshot {
                    win: m.bar_win.unwrap_or(0),
                    width: m.work.w,
                    visible: m.show_bar && m.bar_win.is_some(),
                    tags,
                    symbol: m.symbol.clone(),
                    highlight_title: i == self.reg.selmon && title.is_some(),
                    title,
                }
            })
            .collect()
    }

    pub(crate) fn draw_bars(&self) {
        self.services.bar.publish(self.bar_snapshots());
    }

    /// Where the pointer is, relative to the root window
    pub(crate) fn pointer(&self) -> Option<Point> {
        self.conn.pointer_position()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        bar::tests::FakeCanvas,
        bindings::{mask, Action},
        menu::tests::ScriptedMenu,
        mock::{MockConn, MockWindow, ROOT},
        spawn::tests::FakeSpawner,
        swallow::tests::FakeProcs,
    };

    const SEL_BORDER: u32 = 0xdbdbdb;

    pub fn wm_with(procs: FakeProcs, menu: ScriptedMenu) -> WindowManager<MockConn> {
        let config = Config::default();
        let spawner: Arc<dyn Spawner> = Arc::new(FakeSpawner::default());
        let bar = Bar::new(Box::new(FakeCanvas::default()), vec![], config.bar_style());
        let services = Services {
            status: StatusState::new(Arc::clone(&spawner), &["true"]),
            spawner,
            procs: Box::new(procs),
            menu: Box::new(menu),
            bar: Arc::new(bar),
            offset: UtcOffset::UTC,
        };
        WindowManager::new(MockConn::new(), config, services).unwrap()
    }

    pub fn wm() -> WindowManager<MockConn> {
        wm_with(FakeProcs::default(), ScriptedMenu::default())
    }

    pub fn map(wm: &mut WindowManager<MockConn>, win: Xid, w: MockWindow) -> ClientId {
        wm.conn.add_window(win, w);
        wm.handle_event(XEvent::MapRequest {
            id: win,
            override_redirect: false,
        })
        .unwrap();
        wm.reg.win_to_client(win).unwrap()
    }

    fn rect(wm: &WindowManager<MockConn>, id: ClientId) -> Rectangle {
        wm.reg.get(id).unwrap().rect
    }

    #[test]
    fn bar_takes_the_top_of_the_screen() {
        let wm = wm();
        // 12px font + 6 padding + 3px accent strip
        assert_eq!(wm.bar_height, 21);
        assert_eq!(wm.reg.monitors[0].work, Rectangle::new(0, 21, 1000, 800));
        assert_eq!(wm.conn.calls_matching("bar "), vec!["bar 1000 0 0 1000"]);
    }

    #[test]
    fn two_clients_tile_with_gaps() {
        let mut wm = wm();
        let a = map(&mut wm, 10, MockWindow::new("Xterm", 1));
        assert_eq!(rect(&wm, a), Rectangle::new(20, 41, 960, 760));

        let b = map(&mut wm, 11, MockWindow::new("Xterm", 2));
        // newest client is the master
        assert_eq!(rect(&wm, b), Rectangle::new(20, 41, 470, 760));
        assert_eq!(rect(&wm, a), Rectangle::new(500, 41, 480, 760));
        assert_eq!(wm.reg.sel(), Some(b));
        assert!(wm.conn.calls().contains(&format!("border_color 11 {:06x}", SEL_BORDER)));
        assert_eq!(wm.conn.calls_matching("client_list").last().unwrap(), "client_list [11, 10]");
    }

    #[test]
    fn override_redirect_and_known_windows_are_ignored() {
        let mut wm = wm();
        wm.conn.add_window(10, MockWindow::new("Xterm", 1));
        wm.handle_event(XEvent::MapRequest {
            id: 10,
            override_redirect: true,
        })
        .unwrap();
        assert!(wm.reg.is_empty());

        map(&mut wm, 10, MockWindow::new("Xterm", 1));
        wm.handle_event(XEvent::MapRequest {
            id: 10,
            override_redirect: false,
        })
        .unwrap();
        assert_eq!(wm.reg.len(), 1);
    }

    #[test]
    fn rules_pick_tags_and_floating() {
        let mut wm = wm();
        let ff = map(&mut wm, 10, MockWindow::new("Firefox", 1));
        let gimp = map(&mut wm, 11, MockWindow::new("Gimp", 2));
        assert_eq!(wm.reg.get(ff).unwrap().tags, TagSet::single(8));
        assert!(!wm.reg.is_visible(ff));
        assert!(wm.reg.get(gimp).unwrap().floating);
        assert!(wm.conn.calls().contains(&"raise 11".to_string()));
    }

    #[test]
    fn destroying_a_client_rearranges_the_rest() {
        let mut wm = wm();
        let a = map(&mut wm, 10, MockWindow::new("Xterm", 1));
        let _b = map(&mut wm, 11, MockWindow::new("Xterm", 2));
        wm.handle_event(XEvent::DestroyNotify { id: 11 }).unwrap();

        assert_eq!(wm.reg.len(), 1);
        assert_eq!(wm.reg.sel(), Some(a));
        assert_eq!(rect(&wm, a), Rectangle::new(20, 41, 960, 760));
    }

    #[test]
    fn unmap_of_a_live_window_withdraws_it() {
        let mut wm = wm();
        map(&mut wm, 10, MockWindow::new("Xterm", 1));
        wm.handle_event(XEvent::UnmapNotify {
            id: 10,
            send_event: false,
        })
        .unwrap();
        assert!(wm.reg.is_empty());
        assert!(wm.conn.calls().contains(&"state 10 Withdrawn".to_string()));
    }

    #[test]
    fn tiled_configure_requests_only_get_a_notify() {
        let mut wm = wm();
        let a = map(&mut wm, 10, MockWindow::new("Xterm", 1));
        wm.conn.clear_calls();
        let req = ConfigureRequest {
            id: 10,
            x: 5,
            y: 5,
            w: 50,
            h: 50,
            border: 0,
            sibling: 0,
            stack_mode: 0,
            mask: ConfigureRequest::X | ConfigureRequest::WIDTH,
        };
        wm.handle_event(XEvent::ConfigureRequest(req)).unwrap();
        assert_eq!(wm.conn.calls(), vec!["notify 10 20 41 960 760"]);
        assert_eq!(rect(&wm, a), Rectangle::new(20, 41, 960, 760));
    }

    #[test]
    fn floating_configure_requests_are_honoured() {
        let mut wm = wm();
        let g = map(&mut wm, 10, MockWindow::new("Gimp", 1));
        wm.conn.clear_calls();
        let req = ConfigureRequest {
            id: 10,
            x: 100,
            y: 120,
            w: 300,
            h: 200,
            border: 0,
            sibling: 0,
            stack_mode: 0,
            mask: ConfigureRequest::X | ConfigureRequest::Y | ConfigureRequest::WIDTH | ConfigureRequest::HEIGHT,
        };
        wm.handle_event(XEvent::ConfigureRequest(req)).unwrap();
        assert_eq!(rect(&wm, g), Rectangle::new(100, 120, 300, 200));
        assert_eq!(wm.conn.calls(), vec!["configure 10 100 120 300 200 0"]);
    }

    #[test]
    fn unmanaged_configure_requests_are_forwarded() {
        let mut wm = wm();
        let req = ConfigureRequest {
            id: 77,
            x: 0,
            y: 0,
            w: 1,
            h: 1,
            border: 0,
            sibling: 0,
            stack_mode: 0,
            mask: 0,
        };
        wm.handle_event(XEvent::ConfigureRequest(req)).unwrap();
        assert_eq!(wm.conn.calls_matching("forward"), vec!["forward 77"]);
    }

    #[test]
    fn swallow_round_trip_through_events() {
        let procs = FakeProcs([(300, 100)].into_iter().collect());
        let mut wm = wm_with(procs, ScriptedMenu::default());
        let mut term = MockWindow::new("St", 100);
        term.title = Some("st".into());
        let t = map(&mut wm, 10, term);
        let before = wm.reg.get(t).cloned().unwrap();

        wm.conn.clear_calls();
        wm.conn.add_window(20, MockWindow::new("mpv", 300));
        wm.handle_event(XEvent::MapRequest {
            id: 20,
            override_redirect: false,
        })
        .unwrap();

        assert_eq!(wm.reg.len(), 1);
        assert_eq!(wm.reg.win_to_client(20), Some(t));
        assert!(wm.conn.calls().contains(&"unmap 10".to_string()));
        assert!(wm.conn.calls().contains(&"map 20".to_string()));
        assert_eq!(wm.reg.get(t).unwrap().title, "mpv window");

        wm.handle_event(XEvent::DestroyNotify { id: 20 }).unwrap();
        let after = wm.reg.get(t).cloned().unwrap();
        assert_eq!(after.win, 10);
        assert_eq!(after.tags, before.tags);
        assert_eq!(after.floating, before.floating);
        assert_eq!(after.title, "st");
        assert!(after.swallowed.is_none());
        assert!(wm.conn.calls().contains(&"map 10".to_string()));
    }

    #[test]
    fn terminal_exit_keeps_the_swallowing_window() {
        let procs = FakeProcs([(300, 100)].into_iter().collect());
        let mut wm = wm_with(procs, ScriptedMenu::default());
        let t = map(&mut wm, 10, MockWindow::new("St", 100));
        wm.conn.add_window(20, MockWindow::new("mpv", 300));
        wm.handle_event(XEvent::MapRequest {
            id: 20,
            override_redirect: false,
        })
        .unwrap();

        wm.handle_event(XEvent::DestroyNotify { id: 10 }).unwrap();
        assert_eq!(wm.reg.win_to_client(20), Some(t));
        assert!(wm.reg.get(t).unwrap().swallowed.is_none());
    }

    #[test]
    fn layout_switch_without_selection_only_redraws() {
        let mut wm = wm();
        wm.conn.clear_calls();
        wm.run_action(Action::SetLayout(Some(2))).unwrap();
        assert_eq!(wm.reg.selmon().symbol, "[M]");
        assert!(wm.conn.calls_matching("configure").is_empty());
        assert!(wm.conn.calls_matching("move").is_empty());
    }

    #[test]
    fn monocle_shows_the_client_count() {
        let mut wm = wm();
        let a = map(&mut wm, 10, MockWindow::new("Xterm", 1));
        map(&mut wm, 11, MockWindow::new("Xterm", 2));
        wm.run_action(Action::SetLayout(Some(2))).unwrap();
        assert_eq!(wm.reg.selmon().symbol, "[2]");
        assert_eq!(rect(&wm, a), Rectangle::new(0, 21, 1000, 800));
    }

    #[test]
    fn fullscreen_covers_the_screen_and_restores() {
        let mut wm = wm();
        let a = map(&mut wm, 10, MockWindow::new("Xterm", 1));
        let tiled = rect(&wm, a);

        let msg = |action| XEvent::ClientMessage {
            id: 10,
            message: ClientMessage::Fullscreen(action),
        };
        wm.handle_event(msg(StateAction::Add)).unwrap();
        let c = wm.reg.get(a).unwrap();
        assert!(c.fullscreen && c.floating);
        assert_eq!(c.rect, Rectangle::new(0, 0, 1000, 821));

        wm.handle_event(msg(StateAction::Toggle)).unwrap();
        let c = wm.reg.get(a).unwrap();
        assert!(!c.fullscreen && !c.floating);
        assert_eq!(c.rect, tiled);
    }

    #[test]
    fn activation_requests_mark_unfocused_clients_urgent() {
        let mut wm = wm();
        let a = map(&mut wm, 10, MockWindow::new("Xterm", 1));
        let mut w = MockWindow::new("Xterm", 2);
        w.wm_hints = Some(crate::client::WmHints::default());
        let b = map(&mut wm, 11, w);
        wm.focus(Some(a));

        wm.handle_event(XEvent::ClientMessage {
            id: 11,
            message: ClientMessage::Activate,
        })
        .unwrap();
        assert!(wm.reg.get(b).unwrap().urgent);
        assert_eq!(wm.reg.occupied_tags(0).1, TagSet::single(0));

        wm.focus(Some(b));
        assert!(!wm.reg.get(b).unwrap().urgent);
        assert!(wm.conn.calls().contains(&"wm_hints 11 urgent=false".to_string()));
    }

    #[test]
    fn tag_keys_switch_the_view() {
        let mut wm = wm();
        wm.conn.keysyms.borrow_mut().insert(11, x11::keysym::XK_2);
        let a = map(&mut wm, 10, MockWindow::new("Xterm", 1));

        // numlock held: must still match
        wm.handle_event(XEvent::KeyPress {
            code: 11,
            state: mask::MOD4 | mask::MOD2,
        })
        .unwrap();
        assert_eq!(wm.reg.selmon().tagset(), TagSet::single(1));
        assert_eq!(wm.reg.sel(), None);
        assert!(!wm.reg.is_visible(a));

        // previous view
        wm.run_action(Action::View(0)).unwrap();
        assert_eq!(wm.reg.selmon().tagset(), TagSet::single(0));
        assert_eq!(wm.reg.sel(), Some(a));
    }

    #[test]
    fn clicking_an_occupied_tag_views_it() {
        let mut wm = wm();
        map(&mut wm, 10, MockWindow::new("Xterm", 1));
        wm.run_action(Action::Tag(1 << 2)).unwrap();

        // cells "1" (selected) then "3" (occupied), 18px each
        wm.handle_event(XEvent::ButtonPress {
            id: 1000,
            button: 1,
            state: 0,
            x: 20,
            y: 5,
            root_x: 20,
            root_y: 5,
        })
        .unwrap();
        assert_eq!(wm.reg.selmon().tagset(), TagSet::single(2));
    }

    #[test]
    fn module_clicks_never_reach_status_bindings() {
        let mut config = Config::default();
        config.bar_separator = 4;
        let fake = Arc::new(FakeSpawner::default());
        let spawner: Arc<dyn Spawner> = fake.clone();
        let modules: Vec<(Box<dyn crate::bar::BarModule>, u64)> = vec![
            (Box::new(crate::bar::tests::Fixed("12:00")), 0),
            (Box::new(crate::bar::tests::Fixed("vol")), 0),
        ];
        let bar = Bar::new(Box::new(FakeCanvas::default()), modules, config.bar_style());
        let services = Services {
            status: StatusState::new(Arc::clone(&spawner), &["true"]),
            spawner,
            procs: Box::new(FakeProcs::default()),
            menu: Box::new(ScriptedMenu::default()),
            bar: Arc::new(bar),
            offset: UtcOffset::UTC,
        };
        let mut wm = WindowManager::new(MockConn::new(), config, services).unwrap();
        let press = |x| XEvent::ButtonPress {
            id: 1000,
            button: 2,
            state: 0,
            x,
            y: 5,
            root_x: x,
            root_y: 5,
        };

        // "12:00" spans [956, 1000), the separator [952, 956)
        assert_eq!(wm.services.bar.classify(0, 990), Some(BarRegion::Module(0)));
        wm.handle_event(press(990)).unwrap();
        assert!(!fake.calls().contains(&"st".to_string()));

        assert_eq!(wm.services.bar.classify(0, 954), Some(BarRegion::Separator));
        wm.handle_event(press(954)).unwrap();
        assert!(fake.calls().contains(&"st".to_string()));
    }

    #[test]
    fn kill_prefers_the_delete_protocol() {
        let mut wm = wm();
        let mut polite = MockWindow::new("Xterm", 1);
        polite.protocols = vec![crate::xconnection::Protocol::Delete];
        map(&mut wm, 10, polite);
        wm.run_action(Action::KillClient).unwrap();
        assert_eq!(wm.conn.calls_matching("protocol 10"), vec!["protocol 10 Delete"]);
        assert!(wm.conn.calls_matching("kill").is_empty());

        map(&mut wm, 11, MockWindow::new("Xterm", 2));
        wm.run_action(Action::KillClient).unwrap();
        assert_eq!(wm.conn.calls_matching("kill"), vec!["kill 11"]);
    }

    #[test]
    fn fatal_errors_stop_the_loop_and_races_do_not() {
        let mut wm = wm();
        // BadWindow from anything
        assert!(wm
            .handle_event(XEvent::Error {
                request_code: 12,
                error_code: 3
            })
            .is_ok());
        // BadAlloc
        assert!(wm
            .handle_event(XEvent::Error {
                request_code: 53,
                error_code: 11
            })
            .is_err());
    }

    #[test]
    fn lost_monitor_hands_over_clients_and_drops_its_bar() {
        let mut wm = wm();
        wm.conn.regions.replace(vec![
            Rectangle::new(0, 0, 1000, 821),
            Rectangle::new(1000, 0, 1000, 821),
        ]);
        wm.handle_event(XEvent::ConfigureNotify {
            id: ROOT,
            r: Rectangle::new(0, 0, 2000, 821),
            is_root: true,
        })
        .unwrap();
        assert_eq!(wm.reg.monitors.len(), 2);
        assert_eq!(wm.reg.monitors[1].bar_win, Some(1001));

        wm.reg.selmon = 1;
        let a = map(&mut wm, 10, MockWindow::new("Xterm", 1));
        assert_eq!(wm.reg.get(a).unwrap().mon, 1);

        wm.conn.regions.replace(vec![Rectangle::new(0, 0, 1000, 821)]);
        wm.handle_event(XEvent::ConfigureNotify {
            id: ROOT,
            r: Rectangle::new(0, 0, 1000, 821),
            is_root: true,
        })
        .unwrap();
        assert_eq!(wm.reg.monitors.len(), 1);
        assert_eq!(wm.reg.get(a).unwrap().mon, 0);
        assert!(wm.conn.calls().contains(&"destroy 1001".to_string()));
    }

    #[test]
    fn power_menu_exit_stops_the_loop() {
        let menu = ScriptedMenu::new(&[Some(0), Some(1), Some(0)]);
        let mut wm = wm_with(FakeProcs::default(), menu);
        wm.conn.events.borrow_mut().push_back(XEvent::KeyPress { code: 1, state: 0 });
        wm.conn.keysyms.borrow_mut().insert(1, x11::keysym::XF86XK_PowerOff);
        map(&mut wm, 10, MockWindow::new("Xterm", 1));

        wm.run().unwrap();
        assert!(!wm.running);
        // cleanup hands windows back
        assert!(wm.reg.is_empty());
        assert!(wm.conn.calls().contains(&"cleanup".to_string()));
        assert!(wm.conn.calls().contains(&"destroy 1000".to_string()));
    }

    #[test]
    fn scan_manages_viewable_windows_parents_first() {
        let mut wm = wm();
        {
            let mut parent = MockWindow::new("Xterm", 1);
            parent.viewable = true;
            let mut dialog = MockWindow::new("Xterm", 1);
            dialog.viewable = true;
            dialog.transient_for = Some(30);
            let hidden = MockWindow::new("Xterm", 1);
            // the transient has the lower id so it is listed first
            wm.conn.add_window(20, dialog);
            wm.conn.add_window(30, parent);
            wm.conn.add_window(40, hidden);
        }
        wm.scan();
        assert_eq!(wm.reg.len(), 2);
        let dialog = wm.reg.win_to_client(20).unwrap();
        assert!(wm.reg.get(dialog).unwrap().floating);
        assert!(wm.reg.win_to_client(40).is_none());
    }
}
