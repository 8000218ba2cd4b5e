use crate::{geometry::Rectangle, tag::TagSet, xconnection::Xid};

/// Titles longer than this are cut before being stored.
pub const MAX_TITLE_LEN: usize = 255;
/// Shown for clients that do not set any usable title.
pub const BROKEN: &str = "broken";

// WM_NORMAL_HINTS flags (ICCCM 4.1.2.3)
const P_MIN_SIZE: u32 = 1 << 4;
const P_MAX_SIZE: u32 = 1 << 5;
const P_RESIZE_INC: u32 = 1 << 6;
const P_ASPECT: u32 = 1 << 7;
const P_BASE_SIZE: u32 = 1 << 8;

// WM_HINTS flags
const INPUT_HINT: u32 = 1;
const URGENCY_HINT: u32 = 1 << 8;

/// Stable handle for a managed client. Never reused while the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub(crate) u64);

/// Size constraints requested by a client through WM_NORMAL_HINTS.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SizeHints {
    pub base_w: u32,
    pub base_h: u32,
    pub inc_w: u32,
    pub inc_h: u32,
    pub max_w: u32,
    pub max_h: u32,
    pub min_w: u32,
    pub min_h: u32,
    pub min_aspect: f32,
    pub max_aspect: f32,
    /// false until the property has been read for the current client state
    pub valid: bool,
}

impl SizeHints {
    /// Decode the 18 CARD32 words of a WM_NORMAL_HINTS property.
    ///
    /// Missing trailing fields are treated as absent, so a truncated property
    /// still yields whatever it does carry.
    pub fn from_raw(raw: &[u32]) -> SizeHints {
        let field = |i: usize| raw.get(i).copied().unwrap_or(0);
        let flags = field(0);
        let mut hints = SizeHints {
            valid: true,
            ..SizeHints::default()
        };

        if flags & P_BASE_SIZE != 0 {
            hints.base_w = field(15);
            hints.base_h = field(16);
        } else if flags & P_MIN_SIZE != 0 {
            hints.base_w = field(5);
            hints.base_h = field(6);
        }
        if flags & P_RESIZE_INC != 0 {
            hints.inc_w = field(9);
            hints.inc_h = field(10);
        }
        if flags & P_MAX_SIZE != 0 {
            hints.max_w = field(7);
            hints.max_h = field(8);
        }
        if flags & P_MIN_SIZE != 0 {
            hints.min_w = field(5);
            hints.min_h = field(6);
        } else if flags & P_BASE_SIZE != 0 {
            hints.min_w = hints.base_w;
            hints.min_h = hints.base_h;
        }
        if flags & P_ASPECT != 0 {
            let (min_x, min_y, max_x, max_y) = (field(11), field(12), field(13), field(14));
            if min_x > 0 && max_y > 0 {
                hints.min_aspect = min_y as f32 / min_x as f32;
                hints.max_aspect = max_x as f32 / max_y as f32;
            }
        }

        hints
    }

    /// A client whose min and max sizes agree can't be tiled sensibly.
    pub fn is_fixed(&self) -> bool {
        self.max_w > 0 && self.max_h > 0 && self.max_w == self.min_w && self.max_h == self.min_h
    }
}

/// The subset of WM_HINTS we act on, plus the raw words so it can be written back.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WmHints {
    raw: [u32; 9],
}

impl WmHints {
    pub fn from_raw(raw: &[u32]) -> WmHints {
        let mut words = [0; 9];
        for (w, r) in words.iter_mut().zip(raw) {
            *w = *r;
        }
        WmHints { raw: words }
    }

    pub fn raw(&self) -> &[u32] {
        &self.raw
    }

    pub fn is_urgent(&self) -> bool {
        self.raw[0] & URGENCY_HINT != 0
    }

    pub fn set_urgent(&mut self, urgent: bool) {
        if urgent {
            self.raw[0] |= URGENCY_HINT;
        } else {
            self.raw[0] &= !URGENCY_HINT;
        }
    }

    /// `Some(accepts_input)` when the client states its input model explicitly.
    pub fn accepts_input(&self) -> Option<bool> {
        if self.raw[0] & INPUT_HINT != 0 {
            Some(self.raw[1] != 0)
        } else {
            None
        }
    }
}

/// Everything outside the client that size hint enforcement depends on.
#[derive(Debug, Clone, Copy)]
pub struct HintBounds {
    /// Whole X screen
    pub screen: Rectangle,
    /// Usable area of the client's monitor
    pub work: Rectangle,
    pub bar_height: u32,
    /// Enforce hints on tiled clients as well as floating ones
    pub respect_hints: bool,
    /// The monitor has no arrange function
    pub floating_layout: bool,
}

/**
 * Meta-data around a client window that we are handling.
 *
 * Primarily state flags and information used when determining which clients
 * to show for a given monitor and how they are tiled.
 */
#[derive(Debug, PartialEq, Clone)]
pub struct Client {
    pub win: Xid,
    pub title: String,
    pub class: String,
    pub instance: String,
    pub rect: Rectangle,
    pub old_rect: Rectangle,
    pub bw: u32,
    pub old_bw: u32,
    pub hints: SizeHints,
    pub tags: TagSet,
    /// Index of the owning monitor
    pub mon: usize,
    pub pid: u32,
    pub fixed: bool,
    pub floating: bool,
    /// Floating state saved on entering fullscreen
    pub old_floating: bool,
    pub urgent: bool,
    pub never_focus: bool,
    pub fullscreen: bool,
    pub terminal: bool,
    pub no_swallow: bool,
    /// The terminal this client has replaced on screen
    pub swallowed: Option<Box<Client>>,
}

impl Client {
    /// Track a new client window with its initial geometry
    pub fn new(win: Xid, rect: Rectangle, bw: u32) -> Client {
        Client {
            win,
            title: String::new(),
            class: BROKEN.to_string(),
            instance: BROKEN.to_string(),
            rect,
            old_rect: rect,
            bw,
            old_bw: bw,
            hints: SizeHints::default(),
            tags: TagSet::EMPTY,
            mon: 0,
            pid: 0,
            fixed: false,
            floating: false,
            old_floating: false,
            urgent: false,
            never_focus: false,
            fullscreen: false,
            terminal: false,
            no_swallow: false,
            swallowed: None,
        }
    }

    /// Width including both borders
    pub fn outer_width(&self) -> i32 {
        (self.rect.w + 2 * self.bw) as i32
    }

    /// Height including both borders
    pub fn outer_height(&self) -> i32 {
        (self.rect.h + 2 * self.bw) as i32
    }

    pub fn set_title(&mut self, title: Option<String>) {
        self.title = match title {
            Some(t) if !t.is_empty() => t.chars().take(MAX_TITLE_LEN).collect(),
            _ => BROKEN.to_string(),
        };
    }

    /// Constrain a requested geometry by the client's size hints and the visible screen.
    ///
    /// Returns the adjusted rectangle and whether it differs from the current
    /// one, so callers can skip redundant configure requests. `interact` is set
    /// for pointer driven moves, which are only kept on screen rather than
    /// inside the monitor's work area.
    pub fn apply_size_hints(&self, req: Rectangle, interact: bool, b: &HintBounds) -> (Rectangle, bool) {
        let bw2 = 2 * self.bw as i32;
        let (mut x, mut y) = (req.x, req.y);
        let mut w = (req.w as i32).max(1);
        let mut h = (req.h as i32).max(1);

        if interact {
            let (sw, sh) = (b.screen.right(), b.screen.bottom());
            if x > sw {
                x = sw - self.outer_width();
            }
            if y > sh {
                y = sh - self.outer_height();
            }
            if x + w + bw2 < b.screen.x {
                x = b.screen.x;
            }
            if y + h + bw2 < b.screen.y {
                y = b.screen.y;
            }
        } else {
            let work = b.work;
            if x >= work.right() {
                x = work.right() - self.outer_width();
            }
            if y >= work.bottom() {
                y = work.bottom() - self.outer_height();
            }
            if x + w + bw2 <= work.x {
                x = work.x;
            }
            if y + h + bw2 <= work.y {
                y = work.y;
            }
        }

        let bh = b.bar_height as i32;
        h = h.max(bh);
        w = w.max(bh);

        if b.respect_hints || self.floating || b.floating_layout {
            let hints = &self.hints;
            let (base_w, base_h) = (hints.base_w as i32, hints.base_h as i32);
            let base_is_min = hints.base_w == hints.min_w && hints.base_h == hints.min_h;

            // ICCCM 4.1.2.3: base size is subtracted before aspect checks unless it doubles as min size
            if !base_is_min {
                w -= base_w;
                h -= base_h;
            }
            if hints.min_aspect > 0.0 && hints.max_aspect > 0.0 && w > 0 && h > 0 {
                if hints.max_aspect < w as f32 / h as f32 {
                    w = (h as f32 * hints.max_aspect + 0.5) as i32;
                } else if hints.min_aspect < h as f32 / w as f32 {
                    h = (w as f32 * hints.min_aspect + 0.5) as i32;
                }
            }
            if base_is_min {
                w -= base_w;
                h -= base_h;
            }
            if hints.inc_w > 0 {
                w -= w % hints.inc_w as i32;
            }
            if hints.inc_h > 0 {
                h -= h % hints.inc_h as i32;
            }
            w = (w + base_w).max(hints.min_w as i32);
            h = (h + base_h).max(hints.min_h as i32);
            if hints.max_w > 0 {
                w = w.min(hints.max_w as i32);
            }
            if hints.max_h > 0 {
                h = h.min(hints.max_h as i32);
            }
        }

        let r = Rectangle::new(x, y, w.max(1) as u32, h.max(1) as u32);
        (r, r != self.rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> HintBounds {
        HintBounds {
            screen: Rectangle::new(0, 0, 1920, 1080),
            work: Rectangle::new(0, 20, 1920, 1060),
            bar_height: 20,
            respect_hints: true,
            floating_layout: false,
        }
    }

    #[test]
    fn unchanged_geometry_is_reported_as_such() {
        let c = Client::new(1, Rectangle::new(10, 30, 400, 300), 0);
        let (r, changed) = c.apply_size_hints(c.rect, false, &bounds());
        assert_eq!(r, c.rect);
        assert!(!changed);
    }

    #[test]
    fn increments_round_down_from_base() {
        let mut c = Client::new(1, Rectangle::new(0, 20, 100, 100), 0);
        c.hints = SizeHints::from_raw(&[
            P_RESIZE_INC | P_BASE_SIZE,
            0, 0, 0, 0,
            0, 0, 0, 0,
            7, 15,
            0, 0, 0, 0,
            4, 4,
            0,
        ]);
        let (r, _) = c.apply_size_hints(Rectangle::new(0, 20, 500, 500), false, &bounds());
        assert_eq!((r.w - 4) % 7, 0);
        assert_eq!((r.h - 4) % 15, 0);
        assert!(r.w <= 500 && r.h <= 500);
    }

    #[test]
    fn max_size_caps_requests() {
        let mut c = Client::new(1, Rectangle::new(0, 20, 100, 100), 0);
        c.hints.max_w = 200;
        c.hints.max_h = 150;
        let (r, changed) = c.apply_size_hints(Rectangle::new(0, 20, 800, 600), false, &bounds());
        assert_eq!((r.w, r.h), (200, 150));
        assert!(changed);
    }

    #[test]
    fn windows_pushed_off_the_work_area_are_pulled_back() {
        let c = Client::new(1, Rectangle::new(0, 20, 100, 100), 0);
        let (r, _) = c.apply_size_hints(Rectangle::new(5000, 20, 100, 100), false, &bounds());
        assert_eq!(r.x, 1920 - 100);
    }

    #[test]
    fn hints_are_ignored_for_tiled_clients_when_disabled() {
        let mut c = Client::new(1, Rectangle::new(0, 20, 100, 100), 0);
        c.hints.max_w = 50;
        let b = HintBounds {
            respect_hints: false,
            ..bounds()
        };
        let (r, _) = c.apply_size_hints(Rectangle::new(0, 20, 300, 300), false, &b);
        assert_eq!(r.w, 300);
    }

    #[test]
    fn fixed_size_detection() {
        let mut hints = SizeHints::from_raw(&[
            P_MIN_SIZE | P_MAX_SIZE,
            0, 0, 0, 0,
            300, 200, 300, 200,
        ]);
        assert!(hints.is_fixed());
        hints.max_w = 301;
        assert!(!hints.is_fixed());
    }

    #[test]
    fn wm_hints_urgency_round_trips_through_raw_words() {
        let mut hints = WmHints::from_raw(&[INPUT_HINT, 0]);
        assert_eq!(hints.accepts_input(), Some(false));
        assert!(!hints.is_urgent());
        hints.set_urgent(true);
        assert_eq!(hints.raw()[0], INPUT_HINT | URGENCY_HINT);
    }

    #[test]
    fn long_titles_are_truncated() {
        let mut c = Client::new(1, Rectangle::default(), 0);
        c.set_title(Some("x".repeat(1000)));
        assert_eq!(c.title.len(), MAX_TITLE_LEN);
        c.set_title(None);
        assert_eq!(c.title, BROKEN);
    }
}
