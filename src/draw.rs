// Window + HUD drawing.
// Visual effects provided here:
// 1) A window that shows the rendered particle field.
// 2) A thin bar along the bottom that fills while a morph runs.
// 3) A tiny 5x7 bitmap font for the status line in the top-left corner.

use crate::error::Error;
use crate::types::FrameBuffer;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

const TARGET_FPS: usize = 60;

pub struct Drawer {
    window: Window,
}

impl Drawer {
    /// Visual: a new window appears, dark until the first frame is presented.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(TARGET_FPS);
        Ok(Self { window })
    }

    /// Push this frame's pixels to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// False once the user closes the window.
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    // streaks on/off
    pub fn s_pressed_once(&self) -> bool {
        self.window.is_key_pressed(Key::S, KeyRepeat::No)
    }

    // scan lines on/off
    pub fn l_pressed_once(&self) -> bool {
        self.window.is_key_pressed(Key::L, KeyRepeat::No)
    }

    // start the next morph now
    pub fn n_pressed_once(&self) -> bool {
        self.window.is_key_pressed(Key::N, KeyRepeat::No)
    }
}

/* ---------- Software drawing: pixels, progress bar, tiny bitmap font ---------- */

#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Horizontal bar `width` px wide, filled to `fraction` (clamped to 0..1).
/// Visual: a dim track with a bright fill growing left to right.
pub fn draw_progress_bar(fb: &mut FrameBuffer, x: i32, y: i32, width: i32, height: i32, fraction: f32, color: u32) {
    let filled = (width as f32 * fraction.clamp(0.0, 1.0)).round() as i32;
    for dy in 0..height {
        for dx in 0..width {
            let c = if dx < filled { color } else { 0x00_10_18_28 };
            put_pixel(fb, x + dx, y + dy, c);
        }
    }
}

/* ---------- 5x7 bitmap font (digits, A-Z and the punctuation the HUD uses) ---------- */

/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
/// Lowercase letters map to their uppercase glyph.
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        '/' => g!(0b00001,0b00010,0b00010,0b00100,0b01000,0b01000,0b10000),
        '%' => g!(0b11000,0b11001,0b00010,0b00100,0b01000,0b10011,0b00011),
        '-' => g!(0b00000,0b00000,0b00000,0b01110,0b00000,0b00000,0b00000),

        _ => None,
    }
}

/// Draw a single 5x7 character at (x,y).
/// Visual: a tiny glyph with a 1-pixel black shadow for contrast.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32) {
    let Some(rows) = glyph5x7(ch) else { return };
    for (offset, c) in [(1, 0x00000000), (0, color)] {
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..5 {
                if (rowbits & (1 << (4 - rx))) != 0 {
                    put_pixel(fb, x + rx as i32 + offset, y + ry as i32 + offset, c);
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs, 1 px apart.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color);
        x += 6;
    }
}
