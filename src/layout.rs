//! Arrangement algorithms. These are pure: they map a work area and a client
//! count to outer rectangles (borders included) and never touch X.
use crate::geometry::Rectangle;

/// How a monitor positions its tiled clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    /// master column on the left, stack on the right
    Tile,
    /// every client takes the whole work area
    Monocle,
    /// no arrange function: clients stay where they were put
    Floating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub symbol: &'static str,
    pub kind: LayoutKind,
}

impl Layout {
    pub const fn new(symbol: &'static str, kind: LayoutKind) -> Layout {
        Layout { symbol, kind }
    }

    pub fn arranges(&self) -> bool {
        self.kind != LayoutKind::Floating
    }
}

/// Inner gaps sit between clients, outer gaps against the work area edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Gaps {
    pub inner: u32,
    pub outer: u32,
}

/// Master/stack tiling.
///
/// The master column is `floor(w * mfact)` wide when a stack exists, and the
/// whole work area otherwise. Each column is split into equal heights with the
/// last client taking the rounding remainder, so every column ends exactly one
/// outer gap above the bottom edge.
pub fn tile(work: Rectangle, n: usize, nmaster: usize, mfact: f32, gaps: Gaps) -> Vec<Rectangle> {
    if n == 0 {
        return vec![];
    }

    let (gi, go) = (gaps.inner as i32, gaps.outer as i32);
    let ww = work.w as i32;
    let n_master = n.min(nmaster);
    let n_stack = n - n_master;

    let mw = if n_stack == 0 {
        ww
    } else if nmaster > 0 {
        (work.w as f32 * mfact) as i32
    } else {
        0
    };

    let (master_x, master_w) = if n_stack > 0 {
        (work.x + go, mw - go - gi)
    } else {
        (work.x + go, ww - 2 * go)
    };
    let (stack_x, stack_w) = if n_master > 0 {
        (work.x + mw, ww - mw - go)
    } else {
        (work.x + go, ww - 2 * go)
    };

    let mut rects = column(work, master_x, master_w, n_master, gi, go);
    rects.extend(column(work, stack_x, stack_w, n_stack, gi, go));
    rects
}

fn column(work: Rectangle, x: i32, w: i32, k: usize, gi: i32, go: i32) -> Vec<Rectangle> {
    if k == 0 {
        return vec![];
    }
    let k32 = k as i32;
    let bottom = work.y + work.h as i32 - go;
    let each = ((work.h as i32 - 2 * go - (k32 - 1) * gi) / k32).max(1);

    let mut y = work.y + go;
    (0..k)
        .map(|i| {
            let h = if i + 1 == k { (bottom - y).max(1) } else { each };
            let r = Rectangle::new(x, y, w.max(1) as u32, h as u32);
            y += h + gi;
            r
        })
        .collect()
}

/// One client at a time: everything gets the full work area.
pub fn monocle(work: Rectangle, n: usize) -> Vec<Rectangle> {
    vec![work; n]
}

/// Symbol shown in the bar for monocle mode, carrying the visible client count.
pub fn monocle_symbol(visible: usize) -> Option<String> {
    if visible > 0 {
        Some(format!("[{}]", visible))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAPS: Gaps = Gaps { inner: 10, outer: 20 };

    #[test]
    fn master_and_slave_pixel_exact() {
        let work = Rectangle::new(0, 0, 1000, 800);
        let rects = tile(work, 2, 1, 0.5, GAPS);
        assert_eq!(rects[0], Rectangle::new(20, 20, 470, 760));
        assert_eq!(rects[1], Rectangle::new(500, 20, 480, 760));
    }

    #[test]
    fn single_client_fills_work_area_minus_outer_gaps() {
        let work = Rectangle::new(0, 18, 1000, 782);
        let rects = tile(work, 1, 1, 0.5, GAPS);
        assert_eq!(rects, vec![Rectangle::new(20, 38, 960, 742)]);
    }

    #[test]
    fn columns_reach_the_bottom_edge_exactly() {
        let work = Rectangle::new(0, 0, 1000, 803);
        for n in 1..9 {
            for nmaster in 0..4 {
                let rects = tile(work, n, nmaster, 0.55, GAPS);
                assert_eq!(rects.len(), n);
                let n_master = n.min(nmaster);
                for col in [&rects[..n_master], &rects[n_master..]] {
                    if col.is_empty() {
                        continue;
                    }
                    let sum: u32 = col.iter().map(|r| r.h).sum();
                    let gaps = (col.len() as u32 - 1) * GAPS.inner;
                    assert_eq!(sum + gaps, 803 - 2 * GAPS.outer, "n={} nmaster={}", n, nmaster);
                    assert_eq!(col.last().map(|r| r.bottom()), Some(803 - 20));
                }
            }
        }
    }

    #[test]
    fn zero_nmaster_puts_everything_in_the_stack() {
        let work = Rectangle::new(0, 0, 1000, 800);
        let rects = tile(work, 2, 0, 0.5, GAPS);
        assert!(rects.iter().all(|r| r.x == 20 && r.w == 960));
    }

    #[test]
    fn monocle_symbol_counts_clients() {
        assert_eq!(monocle_symbol(3).as_deref(), Some("[3]"));
        assert_eq!(monocle_symbol(0), None);
    }
}
