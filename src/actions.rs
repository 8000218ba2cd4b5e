//! What key and button bindings do.
use anyhow::bail;

use crate::{
    bindings::Action,
    client::ClientId,
    events::XEvent,
    geometry::{Point, Rectangle},
    helpers::{cycle_keyboard_layout, take_screenshot},
    layout::Gaps,
    menu::{power_menu, PowerOutcome},
    tag::TagSet,
    wm::WindowManager,
    xconnection::{Protocol, XConn},
    Result,
};

/// Pointer motion is handled at most this often during a move or resize.
const MOTION_INTERVAL_MS: u32 = 1000 / 60;

/// Which part of a window edge the pointer holds during a resize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grip {
    Start,
    Middle,
    End,
}

/// Pull a moved window onto the work area edges when it comes within `snap`
/// pixels of them, leaving room for the outer gap.
pub fn snap_position(x: i32, y: i32, outer_w: i32, outer_h: i32, work: Rectangle, snap: u32, gap: u32) -> (i32, i32) {
    let (snap, gap) = (snap as i32, gap as i32);
    let snap_axis = |pos: i32, size: i32, start: i32, end: i32| {
        if (start + gap - pos).abs() < snap {
            start + gap
        } else if (end - gap - (pos + size)).abs() < snap {
            end - gap - size
        } else {
            pos
        }
    };
    (
        snap_axis(x, outer_w, work.x, work.right()),
        snap_axis(y, outer_h, work.y, work.bottom()),
    )
}

/// Grips for a resize started at (`px`, `py`) relative to a `w` x `h` window.
///
/// The window is split into a 3x3 grid; the centre cell picks the nearest corner.
pub fn resize_grips(px: i32, py: i32, w: u32, h: u32) -> (Grip, Grip) {
    let third = |p: i32, size: u32| {
        let size = size as i32;
        if p < size / 3 {
            Grip::Start
        } else if p >= size - size / 3 {
            Grip::End
        } else {
            Grip::Middle
        }
    };
    let nearest = |p: i32, size: u32| if p < size as i32 / 2 { Grip::Start } else { Grip::End };
    match (third(px, w), third(py, h)) {
        (Grip::Middle, Grip::Middle) => (nearest(px, w), nearest(py, h)),
        grips => grips,
    }
}

/// New geometry for a resize with the pointer at `pointer`.
///
/// The edge opposite each held grip stays where it was. Never smaller than 1x1.
pub fn resize_rect(orig: Rectangle, bw: u32, grips: (Grip, Grip), pointer: Point) -> Rectangle {
    fn axis(pos: i32, size: u32, bw: u32, grip: Grip, p: i32) -> (i32, u32) {
        let bw = 2 * bw as i32;
        match grip {
            Grip::Middle => (pos, size),
            Grip::End => (pos, (p - pos - bw).max(1) as u32),
            Grip::Start => {
                let far = pos + size as i32;
                let start = p.min(far - 1);
                (start, (far - start) as u32)
            }
        }
    }
    let (x, w) = axis(orig.x, orig.w, bw, grips.0, pointer.x);
    let (y, h) = axis(orig.y, orig.h, bw, grips.1, pointer.y);
    Rectangle::new(x, y, w, h)
}

impl<X: XConn> WindowManager<X> {
    pub(crate) fn run_action(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Spawn(argv) => self.services.spawner.spawn(argv),
            Action::SpawnWait(argv) => {
                self.services.spawner.spawn_wait(argv);
                self.refresh_bar();
            }
            Action::View(mask) => self.view(TagSet::from_bits(mask)),
            Action::ToggleView(mask) => {
                let selmon = self.reg.selmon;
                if self.reg.monitors[selmon].toggle_view(TagSet::from_bits(mask), self.valid_tags) {
                    self.focus(None);
                    self.arrange(Some(selmon));
                }
            }
            Action::Tag(mask) => {
                let tags = TagSet::from_bits(mask) & self.valid_tags;
                if !tags.is_empty() {
                    self.retag(|_| tags);
                }
            }
            Action::ToggleTag(mask) => {
                let flip = TagSet::from_bits(mask) & self.valid_tags;
                self.retag(|current| current ^ flip);
            }
            Action::FocusStack(dir) => self.focus_stack(dir),
            Action::IncNMaster(delta) => {
                self.reg.selmon_mut().inc_nmaster(delta);
                self.arrange(Some(self.reg.selmon));
            }
            Action::SetMFact(f) => {
                let selmon = self.reg.selmon;
                let m = &mut self.reg.monitors[selmon];
                if m.layout().arranges() && m.set_mfact(f) {
                    self.arrange(Some(selmon));
                }
            }
            Action::SetLayout(index) => {
                let layout = match index {
                    Some(i) => match self.config.layouts.get(i) {
                        Some(l) => Some(*l),
                        None => return Ok(()),
                    },
                    None => None,
                };
                self.reg.selmon_mut().set_layout(layout);
                if self.reg.sel().is_some() {
                    self.arrange(Some(self.reg.selmon));
                } else {
                    self.draw_bars();
                }
            }
            Action::ToggleFloating => self.toggle_floating(),
            Action::ToggleFullscreen => {
                if let Some(id) = self.reg.sel() {
                    let fullscreen = self.reg.get(id).map_or(false, |c| c.fullscreen);
                    self.set_fullscreen(id, !fullscreen);
                }
            }
            Action::Zoom => self.zoom(),
            Action::KillClient => {
                if let Some(c) = self.reg.sel().and_then(|id| self.reg.get(id)) {
                    if !self.conn.send_protocol(c.win, Protocol::Delete) {
                        self.conn.grab_server();
                        self.conn.kill_client(c.win);
                        self.conn.ungrab_server();
                    }
                }
            }
            Action::FocusMon(dir) => {
                if self.reg.monitors.len() > 1 {
                    let target = self.reg.dir_to_mon(dir);
                    self.select_monitor(target);
                }
            }
            Action::TagMon(dir) => {
                if let Some(id) = self.reg.sel() {
                    if self.reg.monitors.len() > 1 {
                        let target = self.reg.dir_to_mon(dir);
                        self.send_to_monitor(id, target);
                    }
                }
            }
            Action::ToggleBar => {
                let bh = self.bar_height;
                let m = self.reg.selmon_mut();
                m.show_bar = !m.show_bar;
                m.update_bar_pos(bh);
                if let Some(win) = m.bar_win {
                    let r = m.bar_rect(bh);
                    self.conn.configure_window(win, r, 0);
                }
                self.arrange(Some(self.reg.selmon));
            }
            Action::ModGaps(d) => {
                if self.reg.selmon().layout().arranges() {
                    self.gaps.inner = (self.gaps.inner as i32 + d).max(0) as u32;
                    self.gaps.outer = (self.gaps.outer as i32 + 2 * d).max(0) as u32;
                    debug!("gaps now {:?}", self.gaps);
                    self.arrange(Some(self.reg.selmon));
                }
            }
            Action::ToggleGaps(restore) => {
                if self.reg.selmon().layout().arranges() {
                    self.gaps = if restore { self.config.gaps } else { Gaps::default() };
                    self.arrange(Some(self.reg.selmon));
                }
            }
            Action::MoveMouse => self.move_mouse()?,
            Action::ResizeMouse => self.resize_mouse()?,
            Action::ToggleUpdateChecks => {
                self.services.status.updates.toggle();
                self.refresh_bar();
            }
            Action::SwitchKeyboardLayout => {
                cycle_keyboard_layout(
                    self.services.spawner.as_ref(),
                    self.config.keyboard_layouts,
                    &self.services.status.keyboard,
                );
                self.refresh_bar();
            }
            Action::Screenshot { select } => take_screenshot(
                self.services.spawner.as_ref(),
                &self.config.screenshot_dir,
                select,
                self.services.offset,
            ),
            Action::PowerMenu => {
                let cmds = self.config.power_commands();
                let outcome = power_menu(self.services.menu.as_ref(), self.services.spawner.as_ref(), &cmds);
                if outcome == PowerOutcome::Quit {
                    info!("exit requested from the power menu");
                    self.running = false;
                }
            }
            Action::RedrawBar => self.refresh_bar(),
            Action::Quit => self.running = false,
        }
        Ok(())
    }

    /// Recompute every bar module and redraw.
    fn refresh_bar(&self) {
        self.services.bar.invalidate();
        self.draw_bars();
    }

    fn view(&mut self, tags: TagSet) {
        let selmon = self.reg.selmon;
        if self.reg.monitors[selmon].view(tags, self.valid_tags) {
            self.focus(None);
            self.arrange(Some(selmon));
        }
    }

    /// Give the selected client new tags. Empty results are refused.
    fn retag(&mut self, f: impl FnOnce(TagSet) -> TagSet) {
        let id = match self.reg.sel() {
            Some(id) => id,
            None => return,
        };
        if let Some(c) = self.reg.get_mut(id) {
            let tags = f(c.tags);
            if tags.is_empty() {
                return;
            }
            c.tags = tags;
        }
        self.focus(None);
        self.arrange(Some(self.reg.selmon));
    }

    fn focus_stack(&mut self, dir: i32) {
        let sel = match self.reg.sel() {
            Some(id) => id,
            None => return,
        };
        if self.config.lock_fullscreen && self.reg.get(sel).map_or(false, |c| c.fullscreen) {
            return;
        }
        let visible = self.reg.visible(self.reg.selmon);
        let pos = match visible.iter().position(|&id| id == sel) {
            Some(p) => p as i32,
            None => return,
        };
        let next = visible[(pos + dir).rem_euclid(visible.len() as i32) as usize];
        self.focus(Some(next));
        self.restack(self.reg.selmon);
    }

    fn toggle_floating(&mut self) {
        let id = match self.reg.sel() {
            Some(id) => id,
            None => return,
        };
        let rect = match self.reg.get_mut(id) {
            Some(c) if !c.fullscreen => {
                c.floating = !c.floating || c.fixed;
                c.floating.then(|| c.rect)
            }
            _ => return,
        };
        if let Some(r) = rect {
            self.resize(id, r, false);
        }
        self.arrange(Some(self.reg.selmon));
    }

    /// Promote the selection to master, or the next tiled client if it already is.
    fn zoom(&mut self) {
        let selmon = self.reg.selmon;
        let sel = match self.reg.sel() {
            Some(id) => id,
            None => return,
        };
        if !self.reg.selmon().layout().arranges() || self.reg.get(sel).map_or(true, |c| c.floating) {
            return;
        }
        let tiled = self.reg.tiled(selmon);
        let target = if tiled.first() == Some(&sel) {
            match tiled.get(1) {
                Some(&next) => next,
                None => return,
            }
        } else {
            sel
        };
        self.reg.detach(target);
        self.reg.attach(target);
        self.focus(Some(target));
        self.arrange(Some(selmon));
    }

    pub(crate) fn send_to_monitor(&mut self, id: ClientId, target: usize) {
        if self.reg.get(id).map_or(true, |c| c.mon == target) {
            return;
        }
        self.unfocus(id, true);
        self.reg.send_to_monitor(id, target);
        self.focus(None);
        self.arrange(None);
    }

    /// Run the pointer grab loop until the button is released, calling
    /// `on_motion` with the root position of every handled motion event.
    fn grab_loop(&mut self, mut on_motion: impl FnMut(&mut Self, Point)) -> Result<()> {
        if !self.conn.grab_pointer() {
            return Ok(());
        }
        let mut last = 0;
        loop {
            let event = match self.conn.next_event() {
                Some(e) => e,
                None => bail!("lost the connection to the X server"),
            };
            match event {
                XEvent::ConfigureRequest(_) | XEvent::Expose { .. } | XEvent::MapRequest { .. } => {
                    self.handle_event(event)?
                }
                XEvent::MotionNotify {
                    root_x, root_y, time, ..
                } => {
                    if time.wrapping_sub(last) <= MOTION_INTERVAL_MS {
                        continue;
                    }
                    last = time;
                    on_motion(self, Point::new(root_x, root_y));
                }
                XEvent::ButtonRelease => break,
                _ => (),
            }
        }
        self.conn.ungrab_pointer();
        Ok(())
    }

    /// After a move or resize the client belongs to the monitor it overlaps most.
    fn settle_monitor(&mut self, id: ClientId) {
        let rect = match self.reg.get(id) {
            Some(c) => c.rect,
            None => return,
        };
        let target = self.reg.rect_to_mon(rect);
        if target != self.reg.selmon {
            self.send_to_monitor(id, target);
            self.reg.selmon = target;
            self.focus(None);
        }
    }

    /// Tiled clients dragged further than the snap distance start floating.
    fn float_if_dragged(&mut self, id: ClientId, moved: i32) {
        let tiled = self.reg.selmon().layout().arranges() && self.reg.get(id).map_or(false, |c| !c.floating);
        if tiled && moved > self.config.snap as i32 {
            self.toggle_floating();
        }
    }

    fn move_mouse(&mut self) -> Result<()> {
        let id = match self.reg.sel() {
            Some(id) => id,
            None => return Ok(()),
        };
        let orig = match self.reg.get(id) {
            Some(c) if !c.fullscreen => c.rect,
            _ => return Ok(()),
        };
        let start = match self.pointer() {
            Some(p) => p,
            None => return Ok(()),
        };
        self.restack(self.reg.selmon);

        self.grab_loop(|wm, p| {
            let (outer_w, outer_h, cur) = match wm.reg.get(id) {
                Some(c) => (c.outer_width(), c.outer_height(), c.rect),
                None => return,
            };
            let (x, y) = snap_position(
                orig.x + p.x - start.x,
                orig.y + p.y - start.y,
                outer_w,
                outer_h,
                wm.reg.selmon().work,
                wm.config.snap,
                wm.gaps.outer,
            );
            wm.float_if_dragged(id, (x - cur.x).abs().max((y - cur.y).abs()));
            let floats = !wm.reg.selmon().layout().arranges() || wm.reg.get(id).map_or(false, |c| c.floating);
            if floats {
                wm.resize(id, Rectangle::new(x, y, cur.w, cur.h), true);
            }
        })?;

        self.settle_monitor(id);
        Ok(())
    }

    fn resize_mouse(&mut self) -> Result<()> {
        let id = match self.reg.sel() {
            Some(id) => id,
            None => return Ok(()),
        };
        let (orig, bw, win) = match self.reg.get(id) {
            Some(c) if !c.fullscreen => (c.rect, c.bw, c.win),
            _ => return Ok(()),
        };
        let start = match self.pointer() {
            Some(p) => p,
            None => return Ok(()),
        };
        self.restack(self.reg.selmon);

        let grips = resize_grips(start.x - orig.x, start.y - orig.y, orig.w, orig.h);
        let anchor = |g: Grip, size: u32| match g {
            Grip::Start => -(bw as i32),
            Grip::Middle => size as i32 / 2,
            Grip::End => (size + bw) as i32 - 1,
        };
        self.conn.warp_pointer(win, anchor(grips.0, orig.w), anchor(grips.1, orig.h));

        self.grab_loop(|wm, p| {
            let cur = match wm.reg.get(id) {
                Some(c) => c.rect,
                None => return,
            };
            let r = resize_rect(orig, bw, grips, p);
            let grown = (r.w as i32 - cur.w as i32).abs().max((r.h as i32 - cur.h as i32).abs());
            wm.float_if_dragged(id, grown);
            let floats = !wm.reg.selmon().layout().arranges() || wm.reg.get(id).map_or(false, |c| c.floating);
            if floats {
                wm.resize(id, r, true);
            }
        })?;

        self.settle_monitor(id);
        Ok(())
    }
}
