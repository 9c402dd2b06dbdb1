/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Each maze cell is two terminal columns wide. Walls are drawn from
/// their connectivity to neighbouring walls, so level files may use any
/// wall glyph they like.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{Direction, Ghost, Player};
use crate::domain::grid::Grid;
use crate::sim::save::HighScore;
use crate::sim::world::{Outcome, SessionState, Snapshot};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background so row gaps match the cells on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 16, g: 16, b: 28 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Palette ──

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const WALL_FG: Color = Color::Rgb { r: 60, g: 90, b: 255 };
const PELLET_FG: Color = Color::Rgb { r: 230, g: 200, b: 170 };
const PLAYER_FG: Color = Color::Rgb { r: 255, g: 230, b: 0 };
const GHOST_FG: Color = Color::Rgb { r: 255, g: 60, b: 60 };
const FRIGHT_FG: Color = Color::Rgb { r: 80, g: 200, b: 255 };
const TITLE_FG: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const HI_FG: Color = Color::Rgb { r: 80, g: 255, b: 80 };

// ── Glyph rules ──

/// Box-drawing glyph for the wall at (x, y), from which orthogonal
/// neighbours are also walls. Out-of-grid counts as open.
pub fn wall_glyph(grid: &Grid, x: i32, y: i32) -> char {
    let wall = |cx: i32, cy: i32| grid.contains((cx, cy)) && grid.is_wall(cx, cy);
    let up = wall(x, y - 1);
    let down = wall(x, y + 1);
    let left = wall(x - 1, y);
    let right = wall(x + 1, y);
    match (up, down, left, right) {
        (false, false, false, false) => '■',
        (_, _, false, false) => '│',
        (false, false, _, _) => '─',
        (false, true, false, true) => '┌',
        (false, true, true, false) => '┐',
        (true, false, false, true) => '└',
        (true, false, true, false) => '┘',
        (true, true, false, true) => '├',
        (true, true, true, false) => '┤',
        (false, true, true, true) => '┬',
        (true, false, true, true) => '┴',
        (true, true, true, true) => '┼',
    }
}

/// Mouth opens toward the direction of travel.
pub fn player_glyph(player: &Player) -> char {
    match player.dir {
        Direction::Right => '>',
        Direction::Left => '<',
        Direction::Up => '^',
        Direction::Down => 'v',
        Direction::None => 'C',
    }
}

/// Ghost colour: frightened ghosts blink during the last `blink_time` seconds.
pub fn ghost_color(ghost: &Ghost, blink_time: f64) -> Color {
    if !ghost.is_frightened() {
        return GHOST_FG;
    }
    if ghost.frightened < blink_time && (ghost.frightened * 8.0) as i32 % 2 == 1 {
        return Color::White;
    }
    FRIGHT_FG
}

// ── Screen views ──

/// Which screen was drawn last; a change forces a full repaint.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Screen {
    Landing,
    Game,
    Result,
}

pub struct LandingView<'a> {
    pub scores: &'a [HighScore],
    pub can_continue: bool,
    pub levels: usize,
    pub gamepad: bool,
}

pub struct ResultView<'a> {
    pub title: &'a str,
    pub outcome: Outcome,
    pub score: u32,
    pub lives: i32,
    pub has_next: bool,
    /// Initials typed so far, while a new high score is being entered.
    pub initials: Option<&'a str>,
}

// ── Renderer ──

const CELL_W: usize = 2;
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_screen: Option<Screen>,
    blink_time: f64,
}

impl Renderer {
    pub fn new(blink_time: f64) -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_screen: None,
            blink_time,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render_landing(&mut self, view: &LandingView<'_>) -> io::Result<()> {
        self.begin(Screen::Landing)?;
        self.compose_landing(view);
        self.finish()
    }

    pub fn render_game(&mut self, frame: &Snapshot<'_>) -> io::Result<()> {
        self.begin(Screen::Game)?;
        self.compose_game(frame);
        if frame.state == SessionState::Paused {
            self.compose_pause_overlay(frame);
        }
        self.finish()
    }

    pub fn render_result(&mut self, view: &ResultView<'_>) -> io::Result<()> {
        self.begin(Screen::Result)?;
        self.compose_result(view);
        self.finish()
    }

    /// Track resizes and screen switches, then clear the front buffer.
    fn begin(&mut self, screen: Screen) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        let resized = tw as usize != self.term_w || th as usize != self.term_h;
        if resized {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
        }
        if resized || self.last_screen != Some(screen) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_screen = Some(screen);
        }
        self.front.clear();
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colours, never ResetColor: the terminal default may differ.
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_landing(&mut self, view: &LandingView<'_>) {
        let banner = [
            r"  ___  __  __    _    _  _ ",
            r" / __||  \/  |  /_\  | \| |",
            r"| (__ | |\/| | / _ \ | .` |",
            r" \___||_|  |_|/_/ \_\|_|\_|",
        ];
        for (i, line) in banner.iter().enumerate() {
            self.front.put_str(4, 1 + i, line, TITLE_FG, Color::Reset);
        }

        self.front.put_str(4, 7, "HIGH SCORES", HI_FG, Color::Reset);
        if view.scores.is_empty() {
            self.front.put_str(4, 9, "No high scores yet!", Color::DarkGrey, Color::Reset);
        }
        for (i, entry) in view.scores.iter().enumerate() {
            let date = entry.date.get(..10).unwrap_or(&entry.date);
            let line = format!("{:2}. {:<3} {:>6}  ({})", i + 1, entry.initials, entry.score, date);
            self.front.put_str(4, 9 + i, &line, Color::White, Color::Reset);
        }

        let menu = 21;
        self.front.put_str(4, menu, "ENTER  Start", HI_FG, Color::Reset);
        if view.can_continue {
            self.front.put_str(4, menu + 1, "  C    Continue", TITLE_FG, Color::Reset);
        } else {
            self.front.put_str(4, menu + 1, "  C    Continue  (no saved run)", Color::DarkGrey, Color::Reset);
        }
        self.front.put_str(4, menu + 2, "  Q    Quit", Color::White, Color::Reset);

        let info = format!(
            "{} level{}{}",
            view.levels,
            if view.levels == 1 { "" } else { "s" },
            if view.gamepad { "  ·  gamepad connected" } else { "" }
        );
        self.front.put_str(4, menu + 4, &info, Color::DarkGrey, Color::Reset);
    }

    fn compose_game(&mut self, f: &Snapshot<'_>) {
        // ── HUD row ──
        let left = f.pickups.pellets_left() + f.pickups.powers_left();
        let hud = format!(
            " Level: {}  Score: {}  Power:{:4.1}  Left: {}",
            f.title, f.score, f.power, left
        );
        // Lives are right-aligned and drawn last so a narrow terminal keeps them.
        let lives = format!("Lives: {} ", f.lives.max(0));
        let lives_col = self.front.width.saturating_sub(lives.chars().count());
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
        self.front.put_str(lives_col, HUD_ROW, &lives, HI_FG, HUD_BG);

        // ── Maze and pickups ──
        let grid = f.grid;
        for y in 0..grid.height() as i32 {
            let row = MAP_ROW + y as usize;
            for x in 0..grid.width() as i32 {
                let col = x as usize * CELL_W;
                if grid.is_wall(x, y) {
                    let glyph = wall_glyph(grid, x, y);
                    let joins_right = grid.contains((x + 1, y)) && grid.is_wall(x + 1, y)
                        && matches!(glyph, '─' | '┌' | '└' | '├' | '┬' | '┴' | '┼');
                    self.front.set(col, row, Cell::new(glyph, WALL_FG, Color::Reset));
                    if joins_right {
                        self.front.set(col + 1, row, Cell::new('─', WALL_FG, Color::Reset));
                    }
                } else if f.pickups.has_power((x, y)) {
                    self.front.set(col, row, Cell::new('o', PELLET_FG, Color::Reset));
                } else if f.pickups.has_pellet((x, y)) {
                    self.front.set(col, row, Cell::new('.', PELLET_FG, Color::Reset));
                }
            }
        }

        // ── Actors (ghosts first, player on top) ──
        for ghost in f.ghosts {
            let color = ghost_color(ghost, self.blink_time);
            self.put_actor(grid, ghost.pos.cell(), 'M', color);
        }
        self.put_actor(grid, f.player.pos.cell(), player_glyph(f.player), PLAYER_FG);

        // ── Status / help ──
        let status_row = MAP_ROW + grid.height() + 1;
        let status = match f.state {
            SessionState::Idle => "READY!  Press a direction to start",
            SessionState::Won => "YOU WIN!",
            SessionState::Lost => "GAME OVER",
            _ => "",
        };
        self.front.put_str(0, status_row, status, TITLE_FG, Color::Reset);
        let help = " ←→↑↓ / WASD  Move    P  Pause    Q / Esc  Quit";
        self.front.put_str(0, status_row + 1, help, Color::DarkGrey, Color::Reset);
    }

    fn put_actor(&mut self, grid: &Grid, (x, y): (i32, i32), glyph: char, fg: Color) {
        let (x, y) = grid.wrap_cell(x, y);
        if !grid.contains((x, y)) {
            return;
        }
        self.front.set(x as usize * CELL_W, MAP_ROW + y as usize, Cell::new(glyph, fg, Color::Reset));
    }

    fn compose_pause_overlay(&mut self, f: &Snapshot<'_>) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let view_cols = f.grid.width() * CELL_W;
        let box_w = 24_usize.min(view_cols.max(1));
        let box_h = 5_usize;
        let box_x = view_cols.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + f.grid.height().saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::Reset, dim));
            }
        }
        self.front.put_str(box_x + 2, box_y + 1, "PAUSED", TITLE_FG, dim);
        self.front.put_str(box_x + 2, box_y + 3, "P resume   Q quit", Color::Rgb { r: 100, g: 200, b: 255 }, dim);
    }

    fn compose_result(&mut self, v: &ResultView<'_>) {
        let (headline, color) = match v.outcome {
            Outcome::Won => ("YOU WIN!", HI_FG),
            Outcome::Lost => ("GAME OVER", GHOST_FG),
            Outcome::Quit => ("Bye!", Color::White),
        };
        self.front.put_str(6, 3, headline, color, Color::Reset);
        self.front.put_str(6, 5, &format!("Level: {}", v.title), Color::White, Color::Reset);
        self.front.put_str(6, 6, &format!("Score: {}", v.score), Color::White, Color::Reset);
        self.front.put_str(6, 7, &format!("Lives: {}", v.lives.max(0)), Color::White, Color::Reset);

        if let Some(initials) = v.initials {
            self.front.put_str(6, 9, "NEW HIGH SCORE!  Enter your initials:", TITLE_FG, Color::Reset);
            let shown = format!("[{:_<3}]", initials);
            self.front.put_str(8, 10, &shown, HI_FG, Color::Reset);
            self.front.put_str(6, 12, "ENTER confirm", Color::DarkGrey, Color::Reset);
            return;
        }

        let prompt = if v.outcome == Outcome::Won && v.has_next {
            "ENTER next level, Q quit"
        } else {
            "ENTER back to title, Q quit"
        };
        self.front.put_str(6, 9, prompt, Color::DarkGrey, Color::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::tests::grid_from;
    use crate::sim::world::tests::session_from;

    fn renderer(w: usize, h: usize) -> Renderer {
        let mut r = Renderer::new(2.0);
        r.front.resize(w, h);
        r
    }

    fn row_text(r: &Renderer, y: usize) -> String {
        (0..r.front.width).map(|x| r.front.get(x, y).ch).collect()
    }

    #[test]
    fn wall_glyphs_follow_connectivity() {
        let g = grid_from(&["###", "# #", "###"]);
        assert_eq!(wall_glyph(&g, 0, 0), '┌');
        assert_eq!(wall_glyph(&g, 2, 0), '┐');
        assert_eq!(wall_glyph(&g, 0, 2), '└');
        assert_eq!(wall_glyph(&g, 2, 2), '┘');
        assert_eq!(wall_glyph(&g, 1, 0), '─');
        assert_eq!(wall_glyph(&g, 0, 1), '│');

        let t = grid_from(&["###", " # ", "   "]);
        assert_eq!(wall_glyph(&t, 1, 0), '┬');
        let lone = grid_from(&["   ", " # ", "   "]);
        assert_eq!(wall_glyph(&lone, 1, 1), '■');
    }

    #[test]
    fn player_glyph_tracks_direction() {
        let mut s = session_from(&["#####", "#C  #", "#####"]);
        assert_eq!(player_glyph(&s.player), 'C');
        s.player.dir = Direction::Up;
        assert_eq!(player_glyph(&s.player), '^');
        s.player.dir = Direction::Down;
        assert_eq!(player_glyph(&s.player), 'v');
        s.player.dir = Direction::Left;
        assert_eq!(player_glyph(&s.player), '<');
    }

    #[test]
    fn frightened_ghosts_blink_near_the_end() {
        let mut s = session_from(&["#####", "#C M#", "#####"]);
        let g = &mut s.ghosts[0];
        assert_eq!(ghost_color(g, 2.0), GHOST_FG);
        g.frightened = 5.0;
        assert_eq!(ghost_color(g, 2.0), FRIGHT_FG);
        g.frightened = 1.0; // 8 -> even
        assert_eq!(ghost_color(g, 2.0), FRIGHT_FG);
        g.frightened = 1.2; // 9 -> odd
        assert_eq!(ghost_color(g, 2.0), Color::White);
    }

    #[test]
    fn game_frame_shows_hud_maze_and_actors() {
        let mut s = session_from(&["#######", "#C.o M#", "#######"]);
        s.player.dir = Direction::Right;
        s.player.score = 12;
        let mut r = renderer(60, 10);
        r.compose_game(&s.snapshot());

        let hud = row_text(&r, HUD_ROW);
        assert!(hud.contains("Level: test"));
        assert!(hud.contains("Score: 12"));
        assert!(hud.contains("Power: 0.0"));
        assert!(hud.contains("Left: 2"));
        assert!(hud.trim_end().ends_with("Lives: 3"));

        assert_eq!(r.front.get(0, MAP_ROW).ch, '┌');
        assert_eq!(r.front.get(1, MAP_ROW).ch, '─');
        assert_eq!(r.front.get(CELL_W, MAP_ROW + 1).ch, '>');
        assert_eq!(r.front.get(2 * CELL_W, MAP_ROW + 1).ch, '.');
        assert_eq!(r.front.get(3 * CELL_W, MAP_ROW + 1).ch, 'o');
        assert_eq!(r.front.get(5 * CELL_W, MAP_ROW + 1).ch, 'M');
        assert!(row_text(&r, MAP_ROW + 4).contains("READY!"));
    }

    #[test]
    fn narrow_hud_keeps_lives_visible() {
        let s = session_from(&["#######", "#C.o M#", "#######"]);
        let mut r = renderer(20, 10);
        r.compose_game(&s.snapshot());
        let hud = row_text(&r, HUD_ROW);
        assert_eq!(hud.chars().count(), 20);
        assert!(hud.starts_with(" Level: "));
        assert!(hud.ends_with("Lives: 3 "));
    }

    #[test]
    fn pause_overlay_is_drawn() {
        let mut s = session_from(&["############", "#C........M#", "#          #", "############"]);
        assert!(s.pause());
        let mut r = renderer(40, 12);
        let frame = s.snapshot();
        r.compose_game(&frame);
        r.compose_pause_overlay(&frame);
        assert!((0..r.front.height).any(|y| row_text(&r, y).contains("PAUSED")));
    }

    #[test]
    fn result_screen_prompts() {
        let mut r = renderer(60, 16);
        let view = ResultView {
            title: "classic",
            outcome: Outcome::Won,
            score: 99,
            lives: 2,
            has_next: true,
            initials: None,
        };
        r.compose_result(&view);
        assert!(row_text(&r, 3).contains("YOU WIN!"));
        assert!(row_text(&r, 9).contains("ENTER next level"));

        let mut r = renderer(60, 16);
        r.compose_result(&ResultView { outcome: Outcome::Lost, initials: Some("AB"), ..view });
        assert!(row_text(&r, 3).contains("GAME OVER"));
        assert!(row_text(&r, 10).contains("[AB_]"));
    }

    #[test]
    fn landing_lists_scores() {
        let scores = vec![HighScore { score: 120, initials: "ZED".into(), date: "2024-05-01T10:00:00".into() }];
        let mut r = renderer(60, 30);
        r.compose_landing(&LandingView { scores: &scores, can_continue: false, levels: 1, gamepad: false });
        assert!(row_text(&r, 9).contains(" 1. ZED    120  (2024-05-01)"));
        assert!(row_text(&r, 22).contains("no saved run"));
    }
}
