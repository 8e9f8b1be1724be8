//! GameView: maps a [`TermBoard`] into a terminal framebuffer.
//!
//! This module is pure (no I/O). It can be unit-tested.

use crate::board::{TermBoard, Tile};
use crate::fb::{CellStyle, FrameBuffer, Rgb};
use crate::types::{grid_columns, grid_rows, CardId, Symbol};

/// Tile width in terminal columns, borders included.
pub const TILE_W: u16 = 7;
/// Tile height in terminal rows, borders included.
pub const TILE_H: u16 = 3;
const GAP_X: u16 = 1;
const GAP_Y: u16 = 0;

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterStatusView {
    pub enabled: bool,
    pub client_count: u16,
    pub controller_id: Option<usize>,
    pub streaming_count: u16,
}

/// Where the board frame and its tiles land for a given card count and viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardLayout {
    pub cols: u16,
    pub rows: u16,
    pub frame_x: u16,
    pub frame_y: u16,
    pub frame_w: u16,
    pub frame_h: u16,
    card_count: usize,
}

impl BoardLayout {
    /// Top-left corner of the tile for card index `i`.
    pub fn tile_origin(&self, i: usize) -> (u16, u16) {
        let col = (i % self.cols as usize) as u16;
        let row = (i / self.cols as usize) as u16;
        (
            self.frame_x + 2 + col * (TILE_W + GAP_X),
            self.frame_y + 1 + row * (TILE_H + GAP_Y),
        )
    }

    /// Card whose tile covers terminal cell `(x, y)`.
    pub fn card_at(&self, x: u16, y: u16) -> Option<CardId> {
        let gx = x.checked_sub(self.frame_x + 2)?;
        let gy = y.checked_sub(self.frame_y + 1)?;
        let (col, dx) = (gx / (TILE_W + GAP_X), gx % (TILE_W + GAP_X));
        let (row, dy) = (gy / (TILE_H + GAP_Y), gy % (TILE_H + GAP_Y));
        if dx >= TILE_W || dy >= TILE_H || col >= self.cols || row >= self.rows {
            return None;
        }
        let index = row as usize * self.cols as usize + col as usize;
        (index < self.card_count).then_some(CardId(index as u8))
    }
}

/// A lightweight terminal renderer for the pairs board, centered in the viewport.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameView;

const BOARD_BG: Rgb = Rgb::new(24, 24, 32);
const PANEL_BG: Rgb = Rgb::new(0, 0, 0);

impl GameView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(&self, card_count: usize, viewport: Viewport) -> BoardLayout {
        let cols = grid_columns(card_count) as u16;
        let rows = grid_rows(card_count) as u16;
        let grid_w = cols * TILE_W + cols.saturating_sub(1) * GAP_X;
        let grid_h = rows * TILE_H + rows.saturating_sub(1) * GAP_Y;
        let frame_w = grid_w + 4;
        let frame_h = grid_h + 2;
        let panel_w = 22;

        let frame_x = viewport.width.saturating_sub(frame_w + panel_w) / 2;
        let frame_y = viewport.height.saturating_sub(frame_h) / 2;
        BoardLayout {
            cols,
            rows,
            frame_x,
            frame_y,
            frame_w,
            frame_h,
            card_count,
        }
    }

    /// Mouse hit testing against the layout `render_into` would use.
    pub fn card_at(&self, board: &TermBoard, viewport: Viewport, x: u16, y: u16) -> Option<CardId> {
        self.layout(board.len(), viewport).card_at(x, y)
    }

    pub fn render_into(
        &self,
        board: &TermBoard,
        cursor: Option<CardId>,
        viewport: Viewport,
        fb: &mut FrameBuffer,
    ) {
        self.render_into_with_adapter(board, cursor, None, viewport, fb);
    }

    /// Render into a reused framebuffer. Allocation-free once `fb` is sized.
    pub fn render_into_with_adapter(
        &self,
        board: &TermBoard,
        cursor: Option<CardId>,
        adapter: Option<&AdapterStatusView>,
        viewport: Viewport,
        fb: &mut FrameBuffer,
    ) {
        fb.resize(viewport.width, viewport.height);
        fb.clear(CellStyle::default().cell(' '));

        let layout = self.layout(board.len(), viewport);
        let border = CellStyle::new(Rgb::new(200, 200, 200), PANEL_BG);
        fb.fill_rect(
            layout.frame_x + 1,
            layout.frame_y + 1,
            layout.frame_w.saturating_sub(2),
            layout.frame_h.saturating_sub(2),
            ' ',
            CellStyle::new(BOARD_BG, BOARD_BG),
        );
        draw_box(
            fb,
            (layout.frame_x, layout.frame_y, layout.frame_w, layout.frame_h),
            border,
            false,
        );

        for (i, tile) in board.tiles().iter().enumerate() {
            let (x, y) = layout.tile_origin(i);
            draw_tile(fb, x, y, tile, cursor == Some(tile.id));
        }

        self.draw_side_panel(fb, board, adapter, viewport, &layout);

        if board.win_announced() {
            draw_overlay(fb, &layout, "YOU WIN", "press r to play again");
        }
    }

    /// Convenience helper that allocates a new framebuffer.
    pub fn render(&self, board: &TermBoard, cursor: Option<CardId>, viewport: Viewport) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into(board, cursor, viewport, &mut fb);
        fb
    }

    fn draw_side_panel(
        &self,
        fb: &mut FrameBuffer,
        board: &TermBoard,
        adapter: Option<&AdapterStatusView>,
        viewport: Viewport,
        layout: &BoardLayout,
    ) {
        let panel_x = layout.frame_x.saturating_add(layout.frame_w).saturating_add(2);
        if panel_x.saturating_add(12) > viewport.width {
            return;
        }

        let label = CellStyle::new(Rgb::new(220, 220, 220), PANEL_BG).bold();
        let value = CellStyle::new(Rgb::new(200, 200, 200), PANEL_BG);
        let dim = value.dim();

        let mut y = layout.frame_y;
        fb.put_str(panel_x, y, "PAIRS", label);
        y += 1;
        let x = fb.put_u32(panel_x, y, board.matched_pairs() as u32, value);
        fb.put_char(x, y, '/', value);
        fb.put_u32(x + 1, y, board.total_pairs() as u32, value);
        y += 2;

        fb.put_str(panel_x, y, "STATUS", label);
        y += 1;
        let status = if board.win_announced() {
            "WON"
        } else if !board.input_enabled() {
            "WAIT"
        } else {
            "PLAY"
        };
        fb.put_str(panel_x, y, status, value);
        y += 2;

        fb.put_str(panel_x, y, "KEYS", label);
        y += 1;
        for line in ["arrows move", "space flip", "r restart", "q quit"] {
            fb.put_str(panel_x, y, line, dim);
            y += 1;
        }
        y += 1;

        fb.put_str(panel_x, y, "AI", label);
        y += 1;
        match adapter {
            Some(st) if st.enabled => {
                let x = fb.put_str(panel_x, y, "ON ", value);
                fb.put_u32(x, y, st.client_count as u32, dim);
                y += 1;
                let x = fb.put_str(panel_x, y, "CTRL ", value);
                match st.controller_id {
                    Some(id) => fb.put_u32(x, y, id as u32, value),
                    None => fb.put_str(x, y, "-", value),
                };
                y += 1;
                let x = fb.put_str(panel_x, y, "OBS ", value);
                fb.put_u32(x, y, st.streaming_count as u32, value);
            }
            _ => {
                fb.put_str(panel_x, y, "OFF", value);
            }
        }
    }
}

/// Per-symbol face color.
pub fn symbol_color(symbol: Symbol) -> Rgb {
    const PALETTE: [Rgb; 8] = [
        Rgb::new(80, 220, 220),
        Rgb::new(240, 220, 80),
        Rgb::new(200, 120, 220),
        Rgb::new(100, 220, 120),
        Rgb::new(230, 90, 90),
        Rgb::new(90, 140, 240),
        Rgb::new(255, 165, 0),
        Rgb::new(240, 240, 240),
    ];
    PALETTE[symbol.glyph() as usize % PALETTE.len()]
}

fn draw_tile(fb: &mut FrameBuffer, x: u16, y: u16, tile: &Tile, under_cursor: bool) {
    let (face_bg, border_fg) = match (tile.matched, tile.face_up) {
        (true, _) => (Rgb::new(20, 44, 24), Rgb::new(90, 160, 90)),
        (false, true) => (Rgb::new(52, 52, 70), Rgb::new(220, 220, 230)),
        (false, false) => (Rgb::new(40, 40, 58), Rgb::new(110, 110, 130)),
    };
    let mut border = CellStyle::new(border_fg, BOARD_BG);
    if under_cursor {
        border = CellStyle::new(Rgb::new(250, 220, 90), BOARD_BG).bold();
    }
    draw_box(fb, (x, y, TILE_W, TILE_H), border, under_cursor);
    fb.fill_rect(x + 1, y + 1, TILE_W - 2, TILE_H - 2, ' ', CellStyle::new(face_bg, face_bg));

    let mid_x = x + TILE_W / 2;
    let mid_y = y + TILE_H / 2;
    if tile.face_up || tile.matched {
        let mut style = CellStyle::new(symbol_color(tile.symbol), face_bg).bold();
        if tile.matched {
            style = CellStyle::new(symbol_color(tile.symbol), face_bg).dim();
        }
        fb.put_char(mid_x, mid_y, tile.symbol.glyph(), style);
    } else {
        fb.put_char(mid_x, mid_y, '?', CellStyle::new(Rgb::new(150, 150, 170), face_bg));
    }
}

fn draw_box(fb: &mut FrameBuffer, (x, y, w, h): (u16, u16, u16, u16), style: CellStyle, heavy: bool) {
    if w < 2 || h < 2 {
        return;
    }
    let [tl, tr, bl, br, hz, vt] = if heavy {
        ['╔', '╗', '╚', '╝', '═', '║']
    } else {
        ['┌', '┐', '└', '┘', '─', '│']
    };

    fb.put_char(x, y, tl, style);
    fb.put_char(x + w - 1, y, tr, style);
    fb.put_char(x, y + h - 1, bl, style);
    fb.put_char(x + w - 1, y + h - 1, br, style);
    for dx in 1..w - 1 {
        fb.put_char(x + dx, y, hz, style);
        fb.put_char(x + dx, y + h - 1, hz, style);
    }
    for dy in 1..h - 1 {
        fb.put_char(x, y + dy, vt, style);
        fb.put_char(x + w - 1, y + dy, vt, style);
    }
}

fn draw_overlay(fb: &mut FrameBuffer, layout: &BoardLayout, title: &str, hint: &str) {
    let mid_y = layout.frame_y.saturating_add(layout.frame_h / 2);
    let style = CellStyle::new(Rgb::new(255, 255, 255), PANEL_BG).bold();
    let hint_style = CellStyle::new(Rgb::new(200, 200, 200), PANEL_BG);

    for (dy, text, style) in [(0u16, title, style), (1, hint, hint_style)] {
        let text_w = text.chars().count() as u16;
        let x = layout
            .frame_x
            .saturating_add(layout.frame_w.saturating_sub(text_w) / 2);
        fb.put_str(x, mid_y.saturating_sub(1) + dy, text, style);
    }
}
