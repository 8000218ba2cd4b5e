use crate::{
    client::ClientId,
    geometry::Rectangle,
    layout::Layout,
    tag::TagSet,
    xconnection::Xid,
};

/// Per monitor defaults taken from the static config.
#[derive(Debug, Clone, Copy)]
pub struct MonitorDefaults {
    pub mfact: f32,
    pub nmaster: usize,
    pub show_bar: bool,
    pub top_bar: bool,
    pub layouts: [Layout; 2],
}

/// One display region with its own bar, tag view and client lists.
#[derive(Debug, Clone)]
pub struct Monitor {
    pub num: usize,
    /// Full region of the display
    pub screen: Rectangle,
    /// Region left for clients once the bar is accounted for
    pub work: Rectangle,
    pub bar_y: i32,
    pub show_bar: bool,
    pub top_bar: bool,
    pub layouts: [Layout; 2],
    pub sel_layout: usize,
    pub symbol: String,
    pub mfact: f32,
    pub nmaster: usize,
    pub tagsets: [TagSet; 2],
    pub sel_tags: usize,
    /// Insertion order, newest first
    pub clients: Vec<ClientId>,
    /// Focus order, most recently focused first
    pub stack: Vec<ClientId>,
    pub sel: Option<ClientId>,
    pub bar_win: Option<Xid>,
}

impl Monitor {
    pub fn new(num: usize, screen: Rectangle, defaults: &MonitorDefaults, bar_height: u32) -> Monitor {
        let mut m = Monitor {
            num,
            screen,
            work: screen,
            bar_y: 0,
            show_bar: defaults.show_bar,
            top_bar: defaults.top_bar,
            layouts: defaults.layouts,
            sel_layout: 0,
            symbol: defaults.layouts[0].symbol.to_string(),
            mfact: defaults.mfact,
            nmaster: defaults.nmaster,
            tagsets: [TagSet::single(0); 2],
            sel_tags: 0,
            clients: vec![],
            stack: vec![],
            sel: None,
            bar_win: None,
        };
        m.update_bar_pos(bar_height);
        m
    }

    pub fn tagset(&self) -> TagSet {
        self.tagsets[self.sel_tags]
    }

    pub fn layout(&self) -> Layout {
        self.layouts[self.sel_layout]
    }

    /// Recompute the work area and bar position after a geometry or bar toggle change.
    pub fn update_bar_pos(&mut self, bar_height: u32) {
        self.work = self.screen;
        if self.show_bar {
            self.work.h = self.work.h.saturating_sub(bar_height);
            if self.top_bar {
                self.bar_y = self.work.y;
                self.work.y += bar_height as i32;
            } else {
                self.bar_y = self.work.bottom();
            }
        } else {
            self.bar_y = -(bar_height as i32);
        }
    }

    pub fn bar_rect(&self, bar_height: u32) -> Rectangle {
        Rectangle::new(self.work.x, self.bar_y, self.work.w, bar_height)
    }

    /// Switch the visible tags, remembering the previous set.
    ///
    /// An empty `tags` (after masking) flips back to the previously viewed set.
    /// Returns false when nothing changed.
    pub fn view(&mut self, tags: TagSet, valid: TagSet) -> bool {
        let tags = tags & valid;
        if tags == self.tagset() {
            return false;
        }
        self.sel_tags ^= 1;
        if !tags.is_empty() {
            self.tagsets[self.sel_tags] = tags;
        }
        true
    }

    /// Add or remove tags from the current view. Refuses to empty the view.
    pub fn toggle_view(&mut self, tags: TagSet, valid: TagSet) -> bool {
        let new = self.tagset() ^ (tags & valid);
        if new.is_empty() {
            return false;
        }
        self.tagsets[self.sel_tags] = new;
        true
    }

    /// `None` toggles to the alternate layout, `Some` installs a layout in the
    /// alternate slot first when it differs from the current one.
    pub fn set_layout(&mut self, layout: Option<Layout>) {
        match layout {
            Some(l) if l == self.layout() => {}
            Some(l) => {
                self.sel_layout ^= 1;
                self.layouts[self.sel_layout] = l;
            }
            None => self.sel_layout ^= 1,
        }
        self.symbol = self.layout().symbol.to_string();
    }

    /// Values below 1.0 are relative steps, larger ones set `arg - 1.0` outright.
    pub fn set_mfact(&mut self, arg: f32) -> bool {
        let f = if arg < 1.0 { arg + self.mfact } else { arg - 1.0 };
        if !(0.05..=0.95).contains(&f) {
            return false;
        }
        self.mfact = f;
        true
    }

    pub fn inc_nmaster(&mut self, delta: i32) {
        self.nmaster = (self.nmaster as i32 + delta).max(0) as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutKind;

    const TILE: Layout = Layout::new("[]=", LayoutKind::Tile);
    const FLOAT: Layout = Layout::new("><>", LayoutKind::Floating);
    const MONOCLE: Layout = Layout::new("[M]", LayoutKind::Monocle);

    fn monitor() -> Monitor {
        let defaults = MonitorDefaults {
            mfact: 0.5,
            nmaster: 1,
            show_bar: true,
            top_bar: true,
            layouts: [TILE, FLOAT],
        };
        Monitor::new(0, Rectangle::new(0, 0, 1920, 1080), &defaults, 20)
    }

    #[test]
    fn bar_reserves_space_at_the_top() {
        let m = monitor();
        assert_eq!(m.work, Rectangle::new(0, 20, 1920, 1060));
        assert_eq!(m.bar_y, 0);
    }

    #[test]
    fn hidden_bar_gives_back_the_space() {
        let mut m = monitor();
        m.show_bar = false;
        m.update_bar_pos(20);
        assert_eq!(m.work, m.screen);
        assert_eq!(m.bar_y, -20);
    }

    #[test]
    fn view_then_view_previous_restores() {
        let valid = TagSet::mask(10);
        let mut m = monitor();
        for bits in 1..(1u32 << 10) {
            let before = m.tagset();
            let t = TagSet::from_bits(bits);
            if m.view(t, valid) {
                assert_eq!(m.tagset(), t);
                m.view(before, valid);
            }
            assert_eq!(m.tagset(), before);
        }
    }

    #[test]
    fn view_zero_swaps_to_previous_set() {
        let valid = TagSet::mask(10);
        let mut m = monitor();
        m.view(TagSet::single(3), valid);
        m.view(TagSet::EMPTY, valid);
        assert_eq!(m.tagset(), TagSet::single(0));
        m.view(TagSet::EMPTY, valid);
        assert_eq!(m.tagset(), TagSet::single(3));
    }

    #[test]
    fn toggle_view_refuses_empty_view() {
        let valid = TagSet::mask(10);
        let mut m = monitor();
        assert!(!m.toggle_view(TagSet::single(0), valid));
        assert!(m.toggle_view(TagSet::single(4), valid));
        assert_eq!(m.tagset(), TagSet::from_bits(0b1_0001));
    }

    #[test]
    fn set_layout_keeps_previous_as_alternate() {
        let mut m = monitor();
        m.set_layout(Some(MONOCLE));
        assert_eq!(m.layout(), MONOCLE);
        m.set_layout(None);
        assert_eq!(m.layout(), TILE);
        assert_eq!(m.symbol, "[]=");
    }

    #[test]
    fn mfact_is_bounded() {
        let mut m = monitor();
        assert!(!m.set_mfact(0.5));
        assert!(m.set_mfact(1.3));
        assert!((m.mfact - 0.3).abs() < 1e-6);
        assert!(m.set_mfact(-0.05));
    }
}
