//! Bar drawing with core X fonts over a dedicated connection.
//!
//! The bar is redrawn from worker threads as well as the event loop, so it
//! gets its own connection rather than sharing the window manager's.
use anyhow::{anyhow, Context, Result};

use crate::{bar::Canvas, geometry::Rectangle, xconnection::Xid};

/// ImageText8 takes at most 255 bytes.
const MAX_TEXT_BYTES: usize = 255;

pub struct XcbCanvas {
    conn: xcb::Connection,
    gc: xcb::Gcontext,
    ascent: i16,
    descent: i16,
    /// Advance widths indexed from `first_char`
    widths: Vec<i16>,
    first_char: u16,
    default_width: i16,
}

impl XcbCanvas {
    /// Connect and open `font`. Failing to load the font is fatal.
    pub fn new(font: &str) -> Result<XcbCanvas> {
        let (conn, screen_num) = xcb::Connection::connect(None).context("Unable to connect to the X server")?;
        let root = conn
            .get_setup()
            .roots()
            .nth(screen_num as usize)
            .context("Unable to get the root window of the preferred screen")?
            .root();

        let fid = conn.generate_id();
        xcb::open_font_checked(&conn, fid, font)
            .request_check()
            .map_err(|e| anyhow!("cannot load font '{}' (error {})", font, e.error_code()))?;
        let info = xcb::query_font(&conn, fid)
            .get_reply()
            .map_err(|e| anyhow!("cannot query font '{}' (error {})", font, e.error_code()))?;

        let gc = conn.generate_id();
        xcb::create_gc(
            &conn,
            gc,
            root,
            &[(xcb::GC_FONT, fid), (xcb::GC_GRAPHICS_EXPOSURES, 0)],
        );
        // the gc keeps its own reference to the font
        xcb::close_font(&conn, fid);
        conn.flush();

        debug!("loaded bar font {}", font);
        Ok(XcbCanvas {
            gc,
            ascent: info.font_ascent(),
            descent: info.font_descent(),
            widths: info.char_infos().map(|c| c.character_width()).collect(),
            first_char: info.min_char_or_byte2(),
            default_width: info.max_bounds().character_width(),
            conn,
        })
    }

    fn char_width(&self, b: u8) -> u32 {
        let w = (b as u16)
            .checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .unwrap_or(self.default_width);
        w.max(0) as u32
    }

    /// Core fonts only know single bytes: anything outside ASCII is shown as '?'.
    fn encode(text: &str) -> Vec<u8> {
        text.chars()
            .take(MAX_TEXT_BYTES)
            .map(|c| if c.is_ascii() && !c.is_ascii_control() { c as u8 } else { b'?' })
            .collect()
    }

    fn set_colors(&self, fg: u32, bg: u32) {
        xcb::change_gc(&self.conn, self.gc, &[(xcb::GC_FOREGROUND, fg), (xcb::GC_BACKGROUND, bg)]);
    }

    fn fill(&self, win: Xid, r: Rectangle) {
        let rect = xcb::Rectangle::new(r.x as i16, r.y as i16, r.w as u16, r.h as u16);
        xcb::poly_fill_rectangle(&self.conn, win, self.gc, &[rect]);
    }
}

// SAFETY: libxcb connections are thread safe, and the canvas is only ever
// driven by one thread at a time from behind the bar lock.
unsafe impl Send for XcbCanvas {}

impl Canvas for XcbCanvas {
    fn font_height(&self) -> u32 {
        (self.ascent + self.descent).max(1) as u32
    }

    fn text_width(&self, text: &str) -> u32 {
        Self::encode(text).into_iter().map(|b| self.char_width(b)).sum()
    }

    fn fill_rect(&mut self, win: Xid, r: Rectangle, color: u32) {
        self.set_colors(color, color);
        self.fill(win, r);
    }

    fn draw_text(&mut self, win: Xid, r: Rectangle, pad: u32, text: &str, fg: u32, bg: u32) {
        self.set_colors(bg, bg);
        self.fill(win, r);

        let room = r.w.saturating_sub(pad);
        let mut bytes = Self::encode(text);
        let mut used = 0;
        let fits = bytes
            .iter()
            .take_while(|&&b| {
                used += self.char_width(b);
                used <= room
            })
            .count();
        bytes.truncate(fits);
        if bytes.is_empty() {
            return;
        }

        let font_h = self.font_height() as i32;
        let y = r.y + (r.h as i32 - font_h) / 2 + self.ascent as i32;
        let s = String::from_utf8_lossy(&bytes).into_owned();
        self.set_colors(fg, bg);
        xcb::image_text_8(&self.conn, win, self.gc, (r.x + pad as i32) as i16, y as i16, &s);
    }

    fn flush(&mut self) {
        self.conn.flush();
        // errors from drawing into bars that went away meanwhile
        while let Some(event) = self.conn.poll_for_event() {
            trace!("bar connection event type {}", event.response_type());
        }
    }
}
