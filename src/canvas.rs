//! Device independent drawing layer.
//!
//! Every primitive here reduces to [`Canvas::set_pixel`], which the
//! concrete display supplies. Coordinates are logical (after rotation);
//! anything outside the visible area is dropped silently so shapes may
//! run past the edges.

use embedded_graphics_core::pixelcolor::BinaryColor;

/// What a pixel write does to the target bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Color {
    Off,
    On,
    Invert,
}

impl From<BinaryColor> for Color {
    fn from(color: BinaryColor) -> Self {
        match color {
            BinaryColor::Off => Color::Off,
            BinaryColor::On => Color::On,
        }
    }
}

/// Logical rotation of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Quarter turns, taken modulo 4.
    pub fn from_index(index: u8) -> Self {
        match index & 3 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Clockwise angle in degrees.
    pub fn degrees(self) -> u16 {
        self.index() as u16 * 90
    }

    pub fn is_transposed(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// Map a logical coordinate to the panel's physical grid of
    /// `width` x `height`. The input must already be inside the logical
    /// bounds.
    pub fn transform(self, x: i32, y: i32, width: i32, height: i32) -> (i32, i32) {
        match self {
            Rotation::Deg0 => (x, y),
            Rotation::Deg90 => (width - y - 1, x),
            Rotation::Deg180 => (width - x - 1, height - y - 1),
            Rotation::Deg270 => (y, height - x - 1),
        }
    }
}

/// Classic 5x8 bitmap font: five column bytes per code, bit 0 is the
/// top row.
#[derive(Debug, Clone, Copy)]
pub struct GlyphTable {
    columns: &'static [u8],
}

impl GlyphTable {
    pub const GLYPH_COLUMNS: usize = 5;

    pub const fn new(columns: &'static [u8]) -> Self {
        Self { columns }
    }

    /// Column `column` of glyph `code`; blank past the end of the table.
    pub fn column(&self, code: u8, column: usize) -> u8 {
        self.columns
            .get(code as usize * Self::GLYPH_COLUMNS + column)
            .copied()
            .unwrap_or(0)
    }
}

/// Geometry, rotation and text state shared by every [`Canvas`].
#[derive(Debug, Clone)]
pub struct CanvasState {
    width: i32,
    height: i32,
    rotation: Rotation,
    cursor_x: i32,
    cursor_y: i32,
    text_color: Color,
    text_bg: Color,
    text_size_x: u8,
    text_size_y: u8,
    cp437: bool,
    font: Option<GlyphTable>,
}

impl CanvasState {
    /// State for a panel of `width` x `height` physical pixels.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width: width as i32,
            height: height as i32,
            rotation: Rotation::Deg0,
            cursor_x: 0,
            cursor_y: 0,
            text_color: Color::On,
            text_bg: Color::On,
            text_size_x: 1,
            text_size_y: 1,
            cp437: false,
            font: None,
        }
    }

    pub fn physical_width(&self) -> i32 {
        self.width
    }

    pub fn physical_height(&self) -> i32 {
        self.height
    }

    /// Width after rotation.
    pub fn width(&self) -> i32 {
        if self.rotation.is_transposed() {
            self.height
        } else {
            self.width
        }
    }

    /// Height after rotation.
    pub fn height(&self) -> i32 {
        if self.rotation.is_transposed() {
            self.width
        } else {
            self.height
        }
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Bounds-check a logical coordinate and map it to the physical grid.
    pub fn to_physical(&self, x: i32, y: i32) -> Option<(u32, u32)> {
        if x < 0 || y < 0 || x >= self.width() || y >= self.height() {
            return None;
        }
        let (px, py) = self.rotation.transform(x, y, self.width, self.height);
        Some((px as u32, py as u32))
    }
}

/// Minor-axis steps taken by the Bresenham walk after `step` major steps
/// along a line of extent `dx` x `dy` (`dy <= dx`).
///
/// The error term starts at `dx / 2`, loses `dy` per step and gains `dx`
/// on each minor step while staying in `[0, dx)`, so the count is
/// `ceil((step * dy - dx / 2) / dx)` clamped at zero.
fn minor_steps(step: i64, dx: i64, dy: i64) -> i64 {
    let excess = step as i128 * dy as i128 - (dx / 2) as i128;
    if excess <= 0 {
        0
    } else {
        ((excess + dx as i128 - 1) / dx as i128) as i64
    }
}

/// Drawing primitives over a single abstract pixel write.
///
/// Implementors embed a [`CanvasState`] and provide [`set_pixel`]. The
/// `write_*` methods draw without batching and are meant for use inside
/// a [`begin_batch`]/[`end_batch`] pair; the `draw_*`/`fill_*` methods
/// bracket themselves.
///
/// [`set_pixel`]: Canvas::set_pixel
/// [`begin_batch`]: Canvas::begin_batch
/// [`end_batch`]: Canvas::end_batch
pub trait Canvas {
    fn canvas(&self) -> &CanvasState;

    fn canvas_mut(&mut self) -> &mut CanvasState;

    /// Apply `color` to the logical pixel `(x, y)`, ignoring anything out
    /// of bounds.
    fn set_pixel(&mut self, x: i32, y: i32, color: Color);

    /// Called before a shape's pixel writes.
    fn begin_batch(&mut self) {}

    /// Called after a shape's pixel writes.
    fn end_batch(&mut self) {}

    fn width(&self) -> i32 {
        self.canvas().width()
    }

    fn height(&self) -> i32 {
        self.canvas().height()
    }

    fn rotation(&self) -> Rotation {
        self.canvas().rotation
    }

    /// Store `rotation mod 4`; affects every later pixel write.
    fn set_rotation(&mut self, rotation: u8) {
        let rotation = Rotation::from_index(rotation);
        #[cfg(feature = "defmt")]
        defmt::debug!("canvas: rotation {} degrees", rotation.degrees());
        self.canvas_mut().rotation = rotation;
    }

    fn write_pixel(&mut self, x: i32, y: i32, color: Color) {
        self.set_pixel(x, y, color);
    }

    /// Bresenham line between both endpoints, inclusive.
    ///
    /// Only the stretch of the major axis that lies on the surface is
    /// walked, so endpoints may sit anywhere in `i32`.
    fn write_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        let (mut x0, mut y0, mut x1, mut y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
        let steep = (y1 - y0).abs() > (x1 - x0).abs();
        if steep {
            core::mem::swap(&mut x0, &mut y0);
            core::mem::swap(&mut x1, &mut y1);
        }
        if x0 > x1 {
            core::mem::swap(&mut x0, &mut x1);
            core::mem::swap(&mut y0, &mut y1);
        }

        let dx = x1 - x0;
        let dy = (y1 - y0).abs();
        let ystep = if y0 < y1 { 1 } else { -1 };
        let extent = (if steep { self.height() } else { self.width() }) as i64;

        for x in x0.max(0)..=x1.min(extent - 1) {
            let y = y0 + ystep * minor_steps(x - x0, dx, dy);
            if steep {
                self.write_pixel(y as i32, x as i32, color);
            } else {
                self.write_pixel(x as i32, y as i32, color);
            }
        }
    }

    /// `h` pixels downward from `(x, y)`; nothing when `h <= 0`.
    fn write_fast_vline(&mut self, x: i32, y: i32, h: i32, color: Color) {
        if h > 0 {
            self.write_line(x, y, x, y.saturating_add(h - 1), color);
        }
    }

    /// `w` pixels rightward from `(x, y)`; nothing when `w <= 0`.
    fn write_fast_hline(&mut self, x: i32, y: i32, w: i32, color: Color) {
        if w > 0 {
            self.write_line(x, y, x.saturating_add(w - 1), y, color);
        }
    }

    /// Covers exactly `[x, x + w) x [y, y + h)`.
    fn write_fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        if w <= 0 || h <= 0 {
            return;
        }
        for column in x.max(0)..x.saturating_add(w).min(self.width()) {
            self.write_fast_vline(column, y, h, color);
        }
    }

    fn draw_pixel(&mut self, x: i32, y: i32, color: Color) {
        self.set_pixel(x, y, color);
    }

    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        self.begin_batch();
        self.write_line(x0, y0, x1, y1, color);
        self.end_batch();
    }

    fn draw_fast_vline(&mut self, x: i32, y: i32, h: i32, color: Color) {
        self.begin_batch();
        self.write_fast_vline(x, y, h, color);
        self.end_batch();
    }

    fn draw_fast_hline(&mut self, x: i32, y: i32, w: i32, color: Color) {
        self.begin_batch();
        self.write_fast_hline(x, y, w, color);
        self.end_batch();
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        self.begin_batch();
        self.write_fill_rect(x, y, w, h, color);
        self.end_batch();
    }

    /// Rectangle outline, one pixel wide.
    fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        if w <= 0 || h <= 0 {
            return;
        }
        self.begin_batch();
        self.write_fast_hline(x, y, w, color);
        self.write_fast_hline(x, y.saturating_add(h - 1), w, color);
        self.write_fast_vline(x, y.saturating_add(1), h - 2, color);
        self.write_fast_vline(x.saturating_add(w - 1), y.saturating_add(1), h - 2, color);
        self.end_batch();
    }

    fn fill_screen(&mut self, color: Color) {
        let (w, h) = (self.width(), self.height());
        self.fill_rect(0, 0, w, h, color);
    }

    fn set_font(&mut self, font: GlyphTable) {
        self.canvas_mut().font = Some(font);
    }

    /// Use the full code page 437 layout instead of the classic table,
    /// which skips one glyph at 176.
    fn cp437(&mut self, enable: bool) {
        self.canvas_mut().cp437 = enable;
    }

    fn set_cursor(&mut self, x: i32, y: i32) {
        let state = self.canvas_mut();
        state.cursor_x = x;
        state.cursor_y = y;
    }

    fn cursor(&self) -> (i32, i32) {
        (self.canvas().cursor_x, self.canvas().cursor_y)
    }

    /// Text color with a transparent background.
    fn set_text_color(&mut self, color: Color) {
        self.set_text_color_bg(color, color);
    }

    fn set_text_color_bg(&mut self, color: Color, background: Color) {
        let state = self.canvas_mut();
        state.text_color = color;
        state.text_bg = background;
    }

    fn set_text_size(&mut self, size: u8) {
        self.set_text_size_xy(size, size);
    }

    /// Per-axis magnification; zero is treated as one.
    fn set_text_size_xy(&mut self, size_x: u8, size_y: u8) {
        let state = self.canvas_mut();
        state.text_size_x = size_x.max(1);
        state.text_size_y = size_y.max(1);
    }

    fn text_size(&self) -> (u8, u8) {
        (self.canvas().text_size_x, self.canvas().text_size_y)
    }

    /// Render one 5x8 glyph plus a blank trailing column at `(x, y)`.
    ///
    /// When `bg == color` the background is left untouched; otherwise every
    /// cell of the 6x8 (scaled) box is painted.
    fn draw_char(&mut self, x: i32, y: i32, code: u8, color: Color, bg: Color, size_x: u8, size_y: u8) {
        let (sx, sy) = (size_x as i32, size_y as i32);
        if x >= self.width() || y >= self.height() || x.saturating_add(6 * sx) <= 0 || y.saturating_add(8 * sy) <= 0 {
            return;
        }

        let code = if !self.canvas().cp437 && code >= 176 {
            code.wrapping_add(1)
        } else {
            code
        };
        let font = self.canvas().font;
        let opaque = bg != color;

        self.begin_batch();
        for i in 0..GlyphTable::GLYPH_COLUMNS as i32 {
            let mut line = font.map_or(0, |f| f.column(code, i as usize));
            for j in 0..8 {
                let paint = if line & 1 != 0 {
                    Some(color)
                } else if opaque {
                    Some(bg)
                } else {
                    None
                };
                if let Some(paint) = paint {
                    if sx == 1 && sy == 1 {
                        self.write_pixel(x + i, y + j, paint);
                    } else {
                        self.write_fill_rect(x + i * sx, y + j * sy, sx, sy, paint);
                    }
                }
                line >>= 1;
            }
        }
        if opaque {
            if sx == 1 && sy == 1 {
                self.write_fast_vline(x + 5, y, 8, bg);
            } else {
                self.write_fill_rect(x + 5 * sx, y, sx, 8 * sy, bg);
            }
        }
        self.end_batch();
    }

    /// Emit one byte at the cursor, wrapping at the right edge.
    fn write(&mut self, byte: u8) {
        let (size_x, size_y) = self.text_size();
        let (advance_x, advance_y) = (6 * size_x as i32, 8 * size_y as i32);

        match byte {
            b'\n' => {
                let state = self.canvas_mut();
                state.cursor_x = 0;
                state.cursor_y = state.cursor_y.saturating_add(advance_y);
            }
            b'\r' => {}
            _ => {
                let width = self.width();
                let state = self.canvas_mut();
                if state.cursor_x.saturating_add(advance_x) > width {
                    state.cursor_x = 0;
                    state.cursor_y = state.cursor_y.saturating_add(advance_y);
                }
                let (cx, cy, fg, bg) = (state.cursor_x, state.cursor_y, state.text_color, state.text_bg);
                self.draw_char(cx, cy, byte, fg, bg, size_x, size_y);
                let state = self.canvas_mut();
                state.cursor_x = state.cursor_x.saturating_add(advance_x);
            }
        }
    }

    fn print(&mut self, text: &str) {
        for byte in text.bytes() {
            self.write(byte);
        }
    }
}
