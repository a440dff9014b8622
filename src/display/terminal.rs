use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io::{self, stdout};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::color::Rgb8;
use crate::config::DisplayConfig;
use crate::renderer::{Canvas, Surface};
use crate::spectrogram::Spectrogram;

/// Upper half block: foreground paints the top pixel, background the bottom.
const HALF_BLOCK: &str = "▀";

pub async fn run(spectrogram: Spectrogram, display_config: DisplayConfig) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, spectrogram, display_config).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut spectrogram: Spectrogram,
    display_config: DisplayConfig,
) -> Result<()> {
    let shutdown_rx = spawn_signal_watch();
    let frames = spectrogram.subscribe();
    let fps = display_config.fps.max(1);
    let frame_budget = Duration::from_secs_f64(1.0 / fps as f64);
    let mut last_frame = Instant::now();

    info!("Rendering at {} fps", fps);
    if spectrogram.mirrors_channels() {
        info!("Input has fewer channels than the view; both panels show the same signal");
    }

    loop {
        if *shutdown_rx.borrow() {
            debug!("Interrupt received");
            break;
        }

        // Capture everything that came due since the last frame
        let now = Instant::now();
        spectrogram.tick(now.duration_since(last_frame));
        last_frame = now;

        terminal.draw(|frame| {
            let area = frame.area();
            let image_area = Rect::new(
                area.x,
                area.y + 1,
                area.width,
                area.height.saturating_sub(1),
            );
            frame.render_widget(SurfaceView::new(spectrogram.surface()), image_area);
            let peak_bin = frames.borrow().peak_bin();
            render_status(frame, area, &spectrogram, peak_bin);
        })?;

        // Handle input for the remainder of the frame
        let timeout = frame_budget.saturating_sub(now.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key {
                    KeyEvent {
                        code: KeyCode::Char('q') | KeyCode::Esc,
                        ..
                    }
                    | KeyEvent {
                        code: KeyCode::Char('c'),
                        modifiers: KeyModifiers::CONTROL,
                        ..
                    } => {
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    spectrogram.shutdown();
    Ok(())
}

/// Flips to `true` once SIGINT arrives.
fn spawn_signal_watch() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(true);
        }
    });
    rx
}

fn render_status(frame: &mut Frame, area: Rect, spectrogram: &Spectrogram, peak_bin: Option<usize>) {
    if area.height == 0 {
        return;
    }
    let status = status_line(spectrogram, peak_bin);
    let width = area.width as usize;
    let status: String = status.chars().take(width).collect();
    frame
        .buffer_mut()
        .set_string(area.x, area.y, status, Style::default().fg(Color::DarkGray));
}

fn status_line(spectrogram: &Spectrogram, peak_bin: Option<usize>) -> String {
    let window = spectrogram.frequency_window();
    let peak = peak_bin.map_or_else(|| "-".to_string(), |bin| bin.to_string());
    format!(
        " micgram | {} | {} columns | bins {}..={} | peak {} | {} captures, {} redraws | [q]uit ",
        spectrogram.view_name(),
        spectrogram.buffer().time_width(),
        window.min_bin(),
        window.max_bin(),
        peak,
        spectrogram.captures(),
        spectrogram.surface().commits()
    )
}

fn to_color(pixel: Rgb8) -> Color {
    Color::Rgb(pixel.red, pixel.green, pixel.blue)
}

/// Scales a committed canvas onto terminal cells, two pixel rows per cell.
pub struct SurfaceView<'a> {
    canvas: &'a Canvas,
}

impl<'a> SurfaceView<'a> {
    pub fn new(canvas: &'a Canvas) -> Self {
        Self { canvas }
    }

    /// Canvas pixel shown at screen pixel (sx, sy) of a `cols` x `rows`
    /// screen. Screen rows run top down, canvas rows bottom up.
    fn sample(&self, sx: usize, sy: usize, cols: usize, rows: usize) -> Rgb8 {
        let width = self.canvas.width();
        let height = self.canvas.height();
        let x = sx * width / cols.max(1);
        let from_top = sy * height / rows.max(1);
        self.canvas.pixel(x, height.saturating_sub(1 + from_top))
    }
}

impl Widget for SurfaceView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let cols = area.width as usize;
        let rows = area.height as usize * 2;
        for cy in 0..area.height {
            for cx in 0..area.width {
                let top = self.sample(cx as usize, cy as usize * 2, cols, rows);
                let bottom = self.sample(cx as usize, cy as usize * 2 + 1, cols, rows);
                if let Some(cell) = buf.cell_mut((area.x + cx, area.y + cy)) {
                    cell.set_symbol(HALF_BLOCK)
                        .set_fg(to_color(top))
                        .set_bg(to_color(bottom));
                }
            }
        }
    }
}
