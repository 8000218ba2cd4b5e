//! Status bar rendering and click classification.
//!
//! The main thread publishes a [BarSnapshot] per monitor whenever the model
//! changes. Redraws, whether triggered by the event loop or by the refresh
//! timer, only ever read those snapshots, so the bar never reaches back into
//! the client/monitor model.
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::{geometry::Rectangle, xconnection::Xid};

/// Foreground / background / border colours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheme {
    pub fg: u32,
    pub bg: u32,
    pub border: u32,
}

/// Primitive drawing operations on bar windows.
pub trait Canvas: Send {
    fn font_height(&self) -> u32;
    fn text_width(&self, text: &str) -> u32;
    fn fill_rect(&mut self, win: Xid, r: Rectangle, color: u32);
    /// Fill `r` with `bg` and draw `text` in `fg`, `pad` pixels from the left, vertically centred.
    fn draw_text(&mut self, win: Xid, r: Rectangle, pad: u32, text: &str, fg: u32, bg: u32);
    fn flush(&mut self);
}

/// Text and optional accent colour produced by a module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleOutput {
    pub text: String,
    pub accent: Option<u32>,
}

impl ModuleOutput {
    pub fn text(text: impl Into<String>) -> ModuleOutput {
        ModuleOutput {
            text: text.into(),
            accent: None,
        }
    }

    pub fn accented(text: impl Into<String>, accent: u32) -> ModuleOutput {
        ModuleOutput {
            text: text.into(),
            accent: Some(accent),
        }
    }

    pub fn empty() -> ModuleOutput {
        ModuleOutput::default()
    }
}

/// An independent producer of status text.
///
/// `compute` runs under the bar lock and must only format state that is
/// already at hand. Anything that waits on a helper belongs in a worker or
/// in `on_click`, which runs on its own thread.
pub trait BarModule: Send + Sync {
    fn compute(&self) -> ModuleOutput;

    /// Handle a click with the cleaned modifier mask. Returns true if the
    /// module state changed and it should be recomputed.
    fn on_click(&self, _mask: u16, _button: u8) -> bool {
        false
    }
}

struct ModuleSlot {
    module: Arc<dyn BarModule>,
    period: Duration,
    last: Option<Instant>,
    output: ModuleOutput,
    width: u32,
}

impl ModuleSlot {
    fn due(&self, now: Instant) -> bool {
        match self.last {
            None => true,
            Some(_) if self.period.is_zero() => true,
            Some(t) => now.duration_since(t) >= self.period,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCell {
    pub label: String,
    pub selected: bool,
    pub occupied: bool,
    pub urgent: bool,
}

impl TagCell {
    /// Empty unselected tags are not drawn and take no space
    pub fn shown(&self) -> bool {
        self.selected || self.occupied
    }
}

/// What the main thread wants a monitor's bar to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarSnapshot {
    pub win: Xid,
    pub width: u32,
    pub visible: bool,
    pub tags: Vec<TagCell>,
    pub symbol: String,
    pub title: Option<String>,
    /// Draw the title with the selected scheme
    pub highlight_title: bool,
}

/// Regions of a bar a click can land in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarRegion {
    Tag(usize),
    LtSymbol,
    Module(usize),
    Separator,
    WinTitle,
}

/// Result of testing an x position against the module area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleHit {
    Module(usize),
    Separator,
    Outside,
}

#[derive(Debug, Clone, Copy)]
pub struct BarStyle {
    pub norm: Scheme,
    pub sel: Scheme,
    /// Thickness of the accent strip along the bottom edge
    pub lobar: u32,
    /// Thickness of the accent strip along the top edge
    pub hibar: u32,
    pub separator: u32,
    /// Horizontal padding on each side of a module's text
    pub side_padding: u32,
}

/// Left edge and width of every module, laid out right to left from `bar_width`.
///
/// Empty modules take no space. Separators sit only between non-empty modules.
pub fn module_spans(widths: &[u32], sep: u32, bar_width: u32) -> Vec<(i32, u32)> {
    let last_shown = widths.iter().rposition(|&w| w > 0);
    let mut right = bar_width as i32;
    let mut spans = Vec::with_capacity(widths.len());
    for (i, &w) in widths.iter().enumerate() {
        let left = right - w as i32;
        spans.push((left, w));
        right = left;
        if w > 0 && Some(i) != last_shown {
            right -= sep as i32;
        }
    }
    spans
}

/// Total width of the module area, separators included.
pub fn modules_width(widths: &[u32], sep: u32) -> u32 {
    let shown = widths.iter().filter(|&&w| w > 0).count() as u32;
    widths.iter().sum::<u32>() + sep * shown.saturating_sub(1)
}

/// Which module, if any, a click at `x` falls into.
pub fn hit_test(widths: &[u32], sep: u32, bar_width: u32, x: i32) -> ModuleHit {
    let left_edge = bar_width as i32 - modules_width(widths, sep) as i32;
    if x < left_edge || x >= bar_width as i32 {
        return ModuleHit::Outside;
    }
    module_spans(widths, sep, bar_width)
        .iter()
        .position(|&(left, w)| w > 0 && x >= left && x < left + w as i32)
        .map_or(ModuleHit::Separator, ModuleHit::Module)
}

struct BarInner {
    canvas: Box<dyn Canvas>,
    modules: Vec<ModuleSlot>,
    snapshots: Vec<BarSnapshot>,
}

/// Shared renderer for every monitor's bar.
///
/// All drawing and all module width bookkeeping happens under one lock, so a
/// timer triggered redraw never interleaves with one from the event loop.
pub struct Bar {
    inner: Mutex<BarInner>,
    style: BarStyle,
    height: u32,
    lrpad: u32,
}

impl Bar {
    pub fn new(canvas: Box<dyn Canvas>, modules: Vec<(Box<dyn BarModule>, u64)>, style: BarStyle) -> Bar {
        let font_h = canvas.font_height();
        let modules = modules
            .into_iter()
            .map(|(module, secs)| ModuleSlot {
                module: Arc::from(module),
                period: Duration::from_secs(secs),
                last: None,
                output: ModuleOutput::empty(),
                width: 0,
            })
            .collect();

        Bar {
            inner: Mutex::new(BarInner {
                canvas,
                modules,
                snapshots: vec![],
            }),
            style,
            height: font_h + 6 + style.lobar + style.hibar,
            lrpad: font_h,
        }
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Replace what every bar shows, then redraw.
    pub fn publish(&self, snapshots: Vec<BarSnapshot>) {
        let mut inner = self.inner.lock();
        inner.snapshots = snapshots;
        self.redraw(&mut inner);
    }

    /// Redraw from the last published snapshots.
    pub fn draw_all(&self) {
        let mut inner = self.inner.lock();
        self.redraw(&mut inner);
    }

    /// Force every module to recompute on the next draw.
    pub fn invalidate(&self) {
        for slot in self.inner.lock().modules.iter_mut() {
            slot.last = None;
        }
    }

    /// Classify a click at `x` on the bar of monitor `mon`.
    pub fn classify(&self, mon: usize, x: i32) -> Option<BarRegion> {
        let inner = self.inner.lock();
        let snap = inner.snapshots.get(mon)?;

        let mut edge = 0;
        for (i, cell) in snap.tags.iter().enumerate() {
            if !cell.shown() {
                continue;
            }
            edge += (inner.canvas.text_width(&cell.label) + self.lrpad) as i32;
            if x < edge {
                return Some(BarRegion::Tag(i));
            }
        }
        edge += (inner.canvas.text_width(&snap.symbol) + self.lrpad) as i32;
        if x < edge {
            return Some(BarRegion::LtSymbol);
        }

        let widths: Vec<u32> = inner.modules.iter().map(|m| m.width).collect();
        Some(match hit_test(&widths, self.style.separator, snap.width, x) {
            ModuleHit::Module(i) => BarRegion::Module(i),
            ModuleHit::Separator => BarRegion::Separator,
            ModuleHit::Outside => BarRegion::WinTitle,
        })
    }

    /// Hand a click to module `i` on a thread of its own. If the module asks
    /// for it, it is recomputed and the bars are redrawn once the click is done.
    ///
    /// Returns the click thread, or None if there is no such module.
    pub fn click_module(self: &Arc<Self>, i: usize, mask: u16, button: u8) -> Option<JoinHandle<()>> {
        let module = Arc::clone(&self.inner.lock().modules.get(i)?.module);
        let bar = Arc::clone(self);
        let spawned = thread::Builder::new().name("bar-click".into()).spawn(move || {
            if module.on_click(mask, button) {
                bar.expire(i);
                bar.draw_all();
            }
        });
        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("unable to handle bar click: {}", e);
                None
            }
        }
    }

    fn expire(&self, i: usize) {
        if let Some(slot) = self.inner.lock().modules.get_mut(i) {
            slot.last = None;
        }
    }

    fn refresh_modules(&self, inner: &mut BarInner) {
        let now = Instant::now();
        let pad = 2 * self.style.side_padding;
        let BarInner { canvas, modules, .. } = inner;
        for slot in modules.iter_mut() {
            if slot.due(now) {
                slot.output = slot.module.compute();
                slot.last = Some(now);
            }
            slot.width = if slot.output.text.is_empty() {
                0
            } else {
                canvas.text_width(&slot.output.text) + pad
            };
        }
    }

    fn redraw(&self, inner: &mut BarInner) {
        self.refresh_modules(inner);
        let snapshots = inner.snapshots.clone();
        for snap in snapshots.iter().filter(|s| s.visible) {
            self.draw(inner, snap);
        }
        inner.canvas.flush();
    }

    fn draw(&self, inner: &mut BarInner, snap: &BarSnapshot) {
        let BarStyle {
            norm,
            sel,
            lobar,
            hibar,
            separator,
            side_padding,
        } = self.style;
        let (bh, win) = (self.height, snap.win);
        let text_h = bh.saturating_sub(lobar + hibar);
        let BarInner { canvas, modules, .. } = inner;

        canvas.fill_rect(win, Rectangle::new(0, 0, snap.width, bh), norm.bg);

        // modules, right to left
        let widths: Vec<u32> = modules.iter().map(|m| m.width).collect();
        for (slot, (left, w)) in modules.iter().zip(module_spans(&widths, separator, snap.width)) {
            if w == 0 {
                continue;
            }
            let text_w = w - 2 * side_padding;
            let r = Rectangle::new(left, hibar as i32, w, text_h);
            canvas.draw_text(win, r, side_padding, &slot.output.text, norm.fg, norm.bg);
            if let Some(accent) = slot.output.accent {
                let x = left + side_padding as i32;
                if hibar > 0 {
                    canvas.fill_rect(win, Rectangle::new(x, 0, text_w, hibar), accent);
                }
                if lobar > 0 {
                    canvas.fill_rect(win, Rectangle::new(x, (bh - lobar) as i32, text_w, lobar), accent);
                }
            }
        }
        let modules_w = modules_width(&widths, separator);

        // tags
        let mut x = 0;
        for cell in snap.tags.iter().filter(|c| c.shown()) {
            let w = canvas.text_width(&cell.label) + self.lrpad;
            let scheme = if cell.selected || cell.urgent { sel } else { norm };
            let (fg, bg) = if cell.urgent && !cell.selected {
                (scheme.bg, scheme.fg)
            } else {
                (scheme.fg, scheme.bg)
            };
            canvas.draw_text(win, Rectangle::new(x, hibar as i32, w, text_h), self.lrpad / 2, &cell.label, fg, bg);
            if hibar > 0 {
                canvas.fill_rect(win, Rectangle::new(x, 0, w, hibar), fg);
            }
            if lobar > 0 {
                canvas.fill_rect(win, Rectangle::new(x, (bh - lobar) as i32, w, lobar), fg);
            }
            x += w as i32;
        }

        // layout symbol
        let w = canvas.text_width(&snap.symbol) + self.lrpad;
        canvas.draw_text(win, Rectangle::new(x, hibar as i32, w, text_h), self.lrpad / 2, &snap.symbol, norm.fg, norm.bg);
        x += w as i32;

        // title
        let title_w = snap.width as i32 - modules_w as i32 - x;
        if title_w > bh as i32 {
            let r = Rectangle::new(x, hibar as i32, title_w as u32, text_h);
            match &snap.title {
                Some(title) => {
                    let scheme = if snap.highlight_title { sel } else { norm };
                    canvas.draw_text(win, r, self.lrpad / 2, title, scheme.fg, scheme.bg);
                }
                None => canvas.fill_rect(win, r, norm.bg),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::spawn::Spawner;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::{channel, Receiver},
    };

    pub const GLYPH: u32 = 6;
    pub const FONT_H: u32 = 12;

    /// Fixed width glyphs; records drawn strings.
    #[derive(Default, Clone)]
    pub struct FakeCanvas {
        pub drawn: Arc<parking_lot::Mutex<Vec<String>>>,
    }

    impl Canvas for FakeCanvas {
        fn font_height(&self) -> u32 {
            FONT_H
        }

        fn text_width(&self, text: &str) -> u32 {
            text.chars().count() as u32 * GLYPH
        }

        fn fill_rect(&mut self, _: Xid, _: Rectangle, _: u32) {}

        fn draw_text(&mut self, _: Xid, r: Rectangle, _: u32, text: &str, _: u32, _: u32) {
            self.drawn.lock().push(format!("{}@{}", text, r.x));
        }

        fn flush(&mut self) {}
    }

    pub struct Fixed(pub &'static str);

    impl BarModule for Fixed {
        fn compute(&self) -> ModuleOutput {
            ModuleOutput::text(self.0)
        }
    }

    struct Counting(Arc<AtomicUsize>);

    impl BarModule for Counting {
        fn compute(&self) -> ModuleOutput {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            ModuleOutput::text(format!("n{}", n))
        }

        fn on_click(&self, _: u16, button: u8) -> bool {
            button == 1
        }
    }

    /// Every helper run blocks until the test lets it finish.
    struct GatedSpawner(Mutex<Receiver<()>>);

    impl Spawner for GatedSpawner {
        fn spawn(&self, _: &[&str]) {}

        fn spawn_wait(&self, _: &[&str]) -> Option<i32> {
            self.0.lock().recv().ok().map(|_| 0)
        }

        fn capture(&self, _: &[&str]) -> String {
            String::new()
        }

        fn capture_with_stdin(&self, _: &[&str], _: &str) -> String {
            String::new()
        }
    }

    /// Runs a helper when clicked
    struct Toggle(Arc<dyn Spawner>);

    impl BarModule for Toggle {
        fn compute(&self) -> ModuleOutput {
            ModuleOutput::text("tog")
        }

        fn on_click(&self, _: u16, _: u8) -> bool {
            self.0.spawn_wait(&["toggle"]) == Some(0)
        }
    }

    pub fn style() -> BarStyle {
        let s = Scheme {
            fg: 0xffffff,
            bg: 0,
            border: 0,
        };
        BarStyle {
            norm: s,
            sel: s,
            lobar: 3,
            hibar: 0,
            separator: 2,
            side_padding: 7,
        }
    }

    fn snapshot(width: u32) -> BarSnapshot {
        BarSnapshot {
            win: 1,
            width,
            visible: true,
            tags: (1..=3)
                .map(|i| TagCell {
                    label: i.to_string(),
                    selected: i == 1,
                    occupied: i == 3,
                    urgent: false,
                })
                .collect(),
            symbol: "[]=".into(),
            title: Some("term".into()),
            highlight_title: false,
        }
    }

    #[test]
    fn hit_test_brackets_three_modules_with_separators() {
        // rightmost first: [900,1000) sep [870,898) sep [828,868)
        let widths = [100, 28, 40];
        let sep = 2;
        assert_eq!(modules_width(&widths, sep), 172);
        assert_eq!(hit_test(&widths, sep, 1000, 999), ModuleHit::Module(0));
        assert_eq!(hit_test(&widths, sep, 1000, 900), ModuleHit::Module(0));
        assert_eq!(hit_test(&widths, sep, 1000, 899), ModuleHit::Separator);
        assert_eq!(hit_test(&widths, sep, 1000, 897), ModuleHit::Module(1));
        assert_eq!(hit_test(&widths, sep, 1000, 870), ModuleHit::Module(1));
        assert_eq!(hit_test(&widths, sep, 1000, 868), ModuleHit::Separator);
        assert_eq!(hit_test(&widths, sep, 1000, 828), ModuleHit::Module(2));
        assert_eq!(hit_test(&widths, sep, 1000, 827), ModuleHit::Outside);
    }

    #[test]
    fn empty_modules_take_no_space() {
        let widths = [50, 0, 30];
        assert_eq!(modules_width(&widths, 4), 84);
        assert_eq!(module_spans(&widths, 4, 200), vec![(150, 50), (146, 0), (116, 30)]);
        assert_eq!(hit_test(&widths, 4, 200, 120), ModuleHit::Module(2));
    }

    #[test]
    fn clicks_are_classified_left_to_right() {
        let canvas = FakeCanvas::default();
        let modules: Vec<(Box<dyn BarModule>, u64)> =
            vec![(Box::new(Fixed("12:00")), 0), (Box::new(Fixed("vol")), 0)];
        let bar = Bar::new(Box::new(canvas), modules, style());
        bar.publish(vec![snapshot(1000)]);

        // shown tags "1" and "3" are 6 + 12 wide each, then "[]=" is 18 + 12
        assert_eq!(bar.classify(0, 0), Some(BarRegion::Tag(0)));
        assert_eq!(bar.classify(0, 17), Some(BarRegion::Tag(0)));
        assert_eq!(bar.classify(0, 18), Some(BarRegion::Tag(2)));
        assert_eq!(bar.classify(0, 40), Some(BarRegion::LtSymbol));
        assert_eq!(bar.classify(0, 300), Some(BarRegion::WinTitle));
        // "12:00" = 30 + 14 padding at the right edge
        assert_eq!(bar.classify(0, 999), Some(BarRegion::Module(0)));
        assert_eq!(bar.classify(0, 955), Some(BarRegion::Separator));
        assert_eq!(bar.classify(0, 940), Some(BarRegion::Module(1)));
        assert_eq!(bar.classify(1, 10), None);
    }

    #[test]
    fn periodic_modules_are_cached_until_invalidated() {
        let count = Arc::new(AtomicUsize::new(0));
        let modules: Vec<(Box<dyn BarModule>, u64)> = vec![(Box::new(Counting(count.clone())), 3600)];
        let bar = Arc::new(Bar::new(Box::new(FakeCanvas::default()), modules, style()));

        bar.publish(vec![snapshot(500)]);
        bar.draw_all();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        bar.click_module(0, 0, 3).unwrap().join().unwrap();
        bar.draw_all();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // the click thread redraws by itself
        bar.click_module(0, 0, 1).unwrap().join().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        bar.draw_all();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(bar.click_module(4, 0, 1).is_none());

        bar.invalidate();
        bar.draw_all();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn a_hung_click_helper_does_not_block_drawing() {
        let (release, gate) = channel();
        let spawner: Arc<dyn Spawner> = Arc::new(GatedSpawner(Mutex::new(gate)));
        let canvas = FakeCanvas::default();
        let drawn = canvas.drawn.clone();
        let modules: Vec<(Box<dyn BarModule>, u64)> = vec![(Box::new(Toggle(spawner)), 0)];
        let bar = Arc::new(Bar::new(Box::new(canvas), modules, style()));
        bar.publish(vec![snapshot(1000)]);

        let click = bar.click_module(0, 0, 1).unwrap();
        drawn.lock().clear();
        bar.publish(vec![snapshot(800)]);
        bar.draw_all();
        assert_eq!(bar.classify(0, 799), Some(BarRegion::Module(0)));
        assert!(drawn.lock().iter().any(|d| d.starts_with("tog@")));
        assert!(!click.is_finished());

        release.send(()).unwrap();
        click.join().unwrap();
    }

    #[test]
    fn hidden_bars_are_not_drawn() {
        let canvas = FakeCanvas::default();
        let drawn = canvas.drawn.clone();
        let bar = Bar::new(Box::new(canvas), vec![], style());
        let mut snap = snapshot(500);
        snap.visible = false;
        bar.publish(vec![snap]);
        assert!(drawn.lock().is_empty());
    }

    #[test]
    fn height_follows_font_and_accent_strips() {
        let bar = Bar::new(Box::new(FakeCanvas::default()), vec![], style());
        assert_eq!(bar.height(), FONT_H + 6 + 3);
    }
}
