//! Half-block terminal rendering of game snapshots.

use crate::chart::{LANE_COUNT, Lane, LaneColor};
use crate::config::{BASELINE_Y, CANVAS_HEIGHT, CANVAS_WIDTH, TAIL_WIDTH};
use crate::state::{Circle, State, Tail, target};
use crossterm::{
    cursor, queue,
    style::{self, Color as CColor},
};
use std::io::{self, Write};

// ── Colors ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    const fn lerp(a: Rgb, b: Rgb, t_256: u16) -> Rgb {
        let t = t_256 as i32;
        Rgb(
            (a.0 as i32 + (b.0 as i32 - a.0 as i32) * t / 256) as u8,
            (a.1 as i32 + (b.1 as i32 - a.1 as i32) * t / 256) as u8,
            (a.2 as i32 + (b.2 as i32 - a.2 as i32) * t / 256) as u8,
        )
    }

    const fn dim(self) -> Rgb {
        Rgb(self.0 / 3, self.1 / 3, self.2 / 3)
    }
}

const FIELD_TOP: Rgb = Rgb(18, 16, 40);
const FIELD_BOT: Rgb = Rgb(44, 30, 70);
const MARGIN: Rgb = Rgb(10, 10, 16);
const GUIDE: Rgb = Rgb(60, 56, 90);
const BASELINE: Rgb = Rgb(150, 150, 170);
const FLASH: Rgb = Rgb(200, 30, 30);
const WHITE: Rgb = Rgb(255, 255, 255);
const SHADOW: Rgb = Rgb(30, 30, 30);
const GOLD: Rgb = Rgb(245, 200, 66);
const MISS: Rgb = Rgb(230, 70, 70);
const PANEL: Rgb = Rgb(60, 52, 96);
const PANEL_IN: Rgb = Rgb(84, 74, 130);

fn lane_rgb(color: LaneColor) -> Rgb {
    match color {
        LaneColor::Green => Rgb(70, 200, 90),
        LaneColor::Red => Rgb(230, 70, 70),
        LaneColor::Blue => Rgb(70, 130, 240),
        LaneColor::Yellow => Rgb(240, 210, 60),
    }
}

// ── Pixel buffer with half-block rendering ──────────────────────────────────

pub struct PixelBuf {
    w: usize,
    h: usize, // pixel height = terminal rows * 2
    px: Vec<Rgb>,
}

impl PixelBuf {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            px: vec![MARGIN; w * h],
        }
    }

    pub fn resize(&mut self, w: usize, h: usize) {
        self.w = w;
        self.h = h;
        self.px.resize(w * h, MARGIN);
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    fn set(&mut self, x: i32, y: i32, c: Rgb) {
        if x >= 0 && y >= 0 && (x as usize) < self.w && (y as usize) < self.h {
            self.px[y as usize * self.w + x as usize] = c;
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Rgb {
        self.px[y * self.w + x]
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, c: Rgb) {
        for dy in 0..h {
            for dx in 0..w {
                self.set(x + dx, y + dy, c);
            }
        }
    }

    fn fill_circle(&mut self, cx: f64, cy: f64, r: f64, c: Rgb) {
        let r = r.max(0.5);
        let (x0, x1) = ((cx - r).floor() as i32, (cx + r).ceil() as i32);
        let (y0, y1) = ((cy - r).floor() as i32, (cy + r).ceil() as i32);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= r * r {
                    self.set(x, y, c);
                }
            }
        }
    }

    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        queue!(out, cursor::MoveTo(0, 0))?;
        let rows = self.h / 2;
        let mut prev_fg = Rgb(0, 0, 0);
        let mut prev_bg = Rgb(0, 0, 0);
        let mut need_fg = true;
        let mut need_bg = true;

        for row in 0..rows {
            for col in 0..self.w {
                let top = self.get(col, row * 2);
                let bot = self.get(col, row * 2 + 1);

                if top == bot {
                    if need_bg || prev_bg != top {
                        queue!(out, style::SetBackgroundColor(to_color(top)))?;
                        prev_bg = top;
                        need_bg = false;
                    }
                    queue!(out, style::Print(' '))?;
                } else {
                    if need_fg || prev_fg != top {
                        queue!(out, style::SetForegroundColor(to_color(top)))?;
                        prev_fg = top;
                        need_fg = false;
                    }
                    if need_bg || prev_bg != bot {
                        queue!(out, style::SetBackgroundColor(to_color(bot)))?;
                        prev_bg = bot;
                        need_bg = false;
                    }
                    queue!(out, style::Print('\u{2580}'))?; // ▀
                }
            }
            if row + 1 < rows {
                queue!(out, style::ResetColor, style::Print("\r\n"))?;
                need_fg = true;
                need_bg = true;
            }
        }
        queue!(out, style::ResetColor)?;
        out.flush()
    }
}

fn to_color(c: Rgb) -> CColor {
    CColor::Rgb {
        r: c.0,
        g: c.1,
        b: c.2,
    }
}

// ── 3x5 bitmap glyphs ──────────────────────────────────────────────────────

#[rustfmt::skip]
const DIGITS: [[u8; 15]; 10] = [
    [1,1,1, 1,0,1, 1,0,1, 1,0,1, 1,1,1], // 0
    [0,1,0, 1,1,0, 0,1,0, 0,1,0, 1,1,1], // 1
    [1,1,1, 0,0,1, 1,1,1, 1,0,0, 1,1,1], // 2
    [1,1,1, 0,0,1, 0,1,1, 0,0,1, 1,1,1], // 3
    [1,0,1, 1,0,1, 1,1,1, 0,0,1, 0,0,1], // 4
    [1,1,1, 1,0,0, 1,1,1, 0,0,1, 1,1,1], // 5
    [1,1,1, 1,0,0, 1,1,1, 1,0,1, 1,1,1], // 6
    [1,1,1, 0,0,1, 0,1,0, 0,1,0, 0,1,0], // 7
    [1,1,1, 1,0,1, 1,1,1, 1,0,1, 1,1,1], // 8
    [1,1,1, 1,0,1, 1,1,1, 0,0,1, 1,1,1], // 9
];

#[rustfmt::skip]
const DOT: [u8; 15] = [0,0,0, 0,0,0, 0,0,0, 0,0,0, 0,1,0];
#[rustfmt::skip]
const TIMES: [u8; 15] = [0,0,0, 1,0,1, 0,1,0, 1,0,1, 0,0,0];

fn glyph(ch: char) -> Option<&'static [u8; 15]> {
    match ch {
        '0'..='9' => Some(&DIGITS[(ch as u8 - b'0') as usize]),
        '.' => Some(&DOT),
        'x' => Some(&TIMES),
        _ => None,
    }
}

fn draw_glyph(buf: &mut PixelBuf, x: i32, y: i32, glyph: &[u8; 15], fg: Rgb) {
    for row in 0..5 {
        for col in 0..3 {
            if glyph[row * 3 + col] == 1 {
                let px = x + col as i32;
                let py = y + row as i32;
                buf.set(px + 1, py + 1, SHADOW);
                buf.set(px, py, fg);
            }
        }
    }
}

/// Draws `text` (digits, `.` and `x`) starting at `x`.
fn draw_text(buf: &mut PixelBuf, x: i32, y: i32, text: &str, fg: Rgb) {
    for (i, ch) in text.chars().enumerate() {
        if let Some(g) = glyph(ch) {
            draw_glyph(buf, x + i as i32 * 4, y, g, fg);
        }
    }
}

fn draw_text_centered(buf: &mut PixelBuf, cx: i32, y: i32, text: &str, fg: Rgb) {
    let total_w = text.chars().count() as i32 * 4 - 1; // 3px per glyph + 1px spacing
    draw_text(buf, cx - total_w / 2, y, text, fg);
}

// ── Playfield ───────────────────────────────────────────────────────────────

/// Front-end state that is not part of the simulation.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    pub keys_down: [bool; LANE_COUNT],
    /// Tint the field red, following a mis-press.
    pub flash: bool,
}

/// Maps canvas units to buffer pixels, keeping the canvas aspect ratio and
/// leaving room for the HUD on the right.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    scale: f64,
    left: f64,
    top: f64,
}

impl Viewport {
    pub fn fit(pw: usize, ph: usize) -> Self {
        let hud_w = 24.0;
        let avail_w = (pw as f64 - hud_w).max(8.0);
        let scale = (ph as f64 / CANVAS_HEIGHT).min(avail_w / CANVAS_WIDTH).max(0.01);
        let field_w = CANVAS_WIDTH * scale;
        Self {
            scale,
            left: ((avail_w - field_w) / 2.0).max(0.0),
            top: ((ph as f64 - CANVAS_HEIGHT * scale) / 2.0).max(0.0),
        }
    }

    pub fn x(&self, cx: f64) -> f64 {
        self.left + cx * self.scale
    }

    pub fn y(&self, cy: f64) -> f64 {
        self.top + cy * self.scale
    }

    pub fn len(&self, d: f64) -> f64 {
        d * self.scale
    }

    fn right(&self) -> i32 {
        self.x(CANVAS_WIDTH).ceil() as i32
    }
}

/// Draws a snapshot into the buffer.
pub fn draw(state: &State, overlay: &Overlay, buf: &mut PixelBuf) {
    let vp = Viewport::fit(buf.width(), buf.height());
    draw_field(buf, &vp, overlay);
    draw_targets(buf, &vp, overlay);
    for tail in state.active_tails.iter().chain(&state.collided_tails) {
        draw_tail(buf, &vp, tail);
    }
    for body in state.active_bodies.iter().filter(|b| b.note.user_played) {
        draw_circle(buf, &vp, &body.circle(), lane_rgb(body.lane.color()));
    }
    draw_hud(buf, &vp, state);
    if state.game_end {
        draw_game_over(buf, state);
    }
}

fn draw_field(buf: &mut PixelBuf, vp: &Viewport, overlay: &Overlay) {
    for y in 0..buf.height() {
        for x in 0..buf.width() {
            buf.set(x as i32, y as i32, MARGIN);
        }
    }

    let x0 = vp.x(0.0) as i32;
    let x1 = vp.right();
    let y0 = vp.y(0.0) as i32;
    let y1 = vp.y(CANVAS_HEIGHT).ceil() as i32;
    let span = (y1 - y0).max(1);
    for y in y0..y1 {
        let t = ((y - y0) as u32 * 256 / span as u32) as u16;
        let mut c = Rgb::lerp(FIELD_TOP, FIELD_BOT, t);
        if overlay.flash {
            c = Rgb::lerp(c, FLASH, 90);
        }
        for x in x0..x1 {
            buf.set(x, y, c);
        }
    }

    for lane in Lane::ALL {
        let x = vp.x(target(lane).x) as i32;
        for y in y0..y1 {
            buf.set(x, y, GUIDE);
        }
    }
    let by = vp.y(BASELINE_Y) as i32;
    for x in x0..x1 {
        buf.set(x, by, BASELINE);
    }
}

fn draw_targets(buf: &mut PixelBuf, vp: &Viewport, overlay: &Overlay) {
    for lane in Lane::ALL {
        let t = target(lane);
        let color = lane_rgb(lane.color());
        let fill = if overlay.keys_down[lane.index()] {
            Rgb::lerp(color, WHITE, 100)
        } else {
            color.dim()
        };
        draw_circle(buf, vp, &t, fill);
    }
}

fn draw_circle(buf: &mut PixelBuf, vp: &Viewport, c: &Circle, color: Rgb) {
    buf.fill_circle(vp.x(c.x), vp.y(c.y), vp.len(c.radius), color);
}

fn draw_tail(buf: &mut PixelBuf, vp: &Viewport, tail: &Tail) {
    let color = lane_rgb(tail.lane.color());
    let body = if tail.is_pressed {
        Rgb::lerp(color, WHITE, 80)
    } else {
        Rgb::lerp(color, SHADOW, 100)
    };
    let w = vp.len(TAIL_WIDTH).max(1.0);
    let x = vp.x(tail.x) - w / 2.0;
    let top = vp.y(tail.y_start.max(0.0));
    let bot = vp.y(tail.y_end.clamp(0.0, CANVAS_HEIGHT));
    if bot > top {
        buf.fill_rect(
            x.round() as i32,
            top.round() as i32,
            w.round().max(1.0) as i32,
            (bot - top).round().max(1.0) as i32,
            body,
        );
    }
    let t = target(tail.lane);
    if tail.head.y <= t.y + t.radius {
        draw_circle(buf, vp, &tail.head, color);
    }
}

fn draw_hud(buf: &mut PixelBuf, vp: &Viewport, state: &State) {
    let x = vp.right() + 3;
    let y = vp.y(0.0) as i32 + 2;
    draw_text(buf, x, y, &format!("{:.1}", state.score), WHITE);
    draw_text(buf, x, y + 8, &format!("x{:.1}", state.multiplier), GOLD);
    draw_text(buf, x, y + 16, &state.consecutive_hits.to_string(), WHITE);
    draw_text(buf, x, y + 24, &state.missed_clicks.to_string(), MISS);
}

fn draw_game_over(buf: &mut PixelBuf, state: &State) {
    let cx = buf.width() as i32 / 2;
    let cy = buf.height() as i32 / 2;
    let panel_w = 36;
    let panel_h = 22;

    // Dark overlay
    for y in 0..buf.height() {
        for x in 0..buf.width() {
            let c = buf.get(x, y);
            buf.set(x as i32, y as i32, Rgb(c.0 / 2, c.1 / 2, c.2 / 2));
        }
    }

    let px = cx - panel_w / 2;
    let py = cy - panel_h / 2;
    buf.fill_rect(px - 1, py - 1, panel_w + 2, panel_h + 2, SHADOW);
    buf.fill_rect(px, py, panel_w, panel_h, PANEL);
    buf.fill_rect(px + 1, py + 1, panel_w - 2, panel_h - 2, PANEL_IN);

    draw_text_centered(buf, cx, py + 4, &format!("{:.1}", state.score), GOLD);
    draw_text_centered(buf, cx, py + 12, &state.missed_clicks.to_string(), MISS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Note;
    use crate::event::Event;
    use crate::reducer::reduce;

    #[test]
    fn viewport_keeps_field_inside_buffer() {
        let vp = Viewport::fit(80, 48);
        assert!(vp.x(CANVAS_WIDTH) <= 80.0);
        assert!(vp.y(CANVAS_HEIGHT) <= 48.0 + 1e-9);
        assert!(vp.y(0.0) >= 0.0);
    }

    #[test]
    fn played_body_is_drawn_in_lane_color() {
        let note = Note {
            user_played: true,
            instrument_name: "piano".into(),
            velocity: 1.0,
            pitch: 61,
            start: 0.0,
            end: 0.2,
        };
        let mut s = reduce(State::default(), &Event::BodySpawn(note));
        s.active_bodies[0].y = 200.0;
        let mut buf = PixelBuf::new(120, 96);
        draw(&s, &Overlay::default(), &mut buf);

        let vp = Viewport::fit(120, 96);
        let b = &s.active_bodies[0];
        let px = buf.get(vp.x(b.x) as usize, vp.y(b.y) as usize);
        assert_eq!(px, lane_rgb(LaneColor::Red));
    }

    #[test]
    fn render_emits_escape_sequences() {
        let mut buf = PixelBuf::new(30, 20);
        draw(&State::default(), &Overlay::default(), &mut buf);
        let mut out = Vec::new();
        buf.render(&mut out).unwrap();
        assert!(!out.is_empty());
        assert!(out.starts_with(b"\x1b["));
    }
}
