// SPDX-License-Identifier: GPL-3.0-only

//! Terminal preview
//!
//! Shows the renderer's output in the terminal using Unicode half-block
//! characters, two image rows per terminal row. Each refresh asks the
//! session for a snapshot of the drawn frame, so what appears here has been
//! through the transform, the orientation mapping and the GPU read-back.

use crate::backends::camera::SourceFactory;
use crate::config::Config;
use crate::constants::timing::TERMINAL_REFRESH;
use crate::preview::{Orientation, PreviewSession, SnapshotReceiver};
use crate::storage;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use image::RgbaImage;
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, stdout};
use tracing::{error, info, warn};

/// Run the terminal preview until the user quits
pub fn run(config: &Config, factory: Box<dyn SourceFactory>) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = PreviewSession::start(config, factory)?;

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut session, config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    session.shutdown();
    result
}

/// Mutable state of the preview screen
struct PreviewScreen {
    frame_widget: FrameWidget,
    show_help: bool,
    message: Option<String>,
    preview: Option<SnapshotReceiver>,
    capture: Option<SnapshotReceiver>,
}

impl PreviewScreen {
    fn new() -> Self {
        Self {
            frame_widget: FrameWidget::new(),
            show_help: false,
            message: None,
            preview: None,
            capture: None,
        }
    }

    /// Collect finished snapshots and keep one preview request in flight
    fn poll_snapshots(&mut self, session: &PreviewSession, config: &Config) {
        if let Some(receiver) = &mut self.capture
            && let Some(result) = receiver.try_recv()
        {
            self.capture = None;
            self.message = Some(match result {
                Ok(image) => {
                    let saved = storage::save_snapshot(
                        &image,
                        config.snapshot_dir.as_deref(),
                        config.jpeg_quality,
                    );
                    self.frame_widget.update_frame(image);
                    match saved {
                        Ok(path) => format!("Saved: {}", path.display()),
                        Err(e) => {
                            error!(error = %e, "Failed to save snapshot");
                            format!("Error: {}", e)
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Snapshot failed");
                    format!("Error: {}", e)
                }
            });
        }

        if let Some(receiver) = &mut self.preview
            && let Some(result) = receiver.try_recv()
        {
            self.preview = None;
            if let Ok(image) = result {
                self.frame_widget.update_frame(image);
            }
        }

        // A pending capture owns the snapshot slot
        if self.capture.is_none() && self.preview.is_none() {
            self.preview = Some(session.handle().request_snapshot_async());
        }
    }

    fn take_picture(&mut self, session: &PreviewSession) {
        self.show_help = false;
        // The preview request is replaced and resolves as cancelled
        self.preview = None;
        self.capture = Some(session.handle().request_snapshot_async());
        self.message = Some("Capturing...".to_string());
    }

    fn status_line(&self, session: &PreviewSession) -> String {
        if self.show_help {
            return build_help_message();
        }
        let handle = session.handle();
        build_status_message(handle.fps(), handle.orientation(), self.message.as_deref())
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &mut PreviewSession,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut screen = PreviewScreen::new();

    loop {
        screen.poll_snapshots(session, config);
        let status_message = screen.status_line(session);

        terminal.draw(|f| {
            let area = f.area();

            // Reserve bottom line for status
            let camera_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(1),
            };
            f.render_widget(&screen.frame_widget, camera_area);

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            f.render_widget(
                StatusBar {
                    message: &status_message,
                },
                status_area,
            );
        })?;

        if event::poll(TERMINAL_REFRESH)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                KeyCode::Char('q') => break,
                KeyCode::Char('p') => screen.take_picture(session),
                KeyCode::Char('s') => {
                    screen.show_help = false;
                    match session.switch_camera() {
                        Ok(facing) => {
                            info!(facing = %facing, "Switched camera");
                            screen.message = None;
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to switch camera");
                            screen.message = Some(format!("Error: {}", e));
                        }
                    }
                }
                KeyCode::Char('h') => screen.show_help = !screen.show_help,
                _ => {}
            }
        }
    }

    Ok(())
}

fn build_status_message(fps: Option<f64>, facing: Orientation, message: Option<&str>) -> String {
    let mut msg = match fps {
        Some(rate) => format!("{:.1} fps | {}", rate, facing),
        None => format!("-- fps | {}", facing),
    };
    match message {
        Some(text) => {
            msg.push_str(" | ");
            msg.push_str(text);
        }
        None => msg.push_str(" | 'p' picture | 's' switch camera | 'h' help | 'q' quit"),
    }
    msg
}

fn build_help_message() -> String {
    String::from("p: Take picture | s: Switch camera | h: Toggle help | q/Ctrl+C: Quit")
}

/// Widget that renders the last preview image using half-block characters
struct FrameWidget {
    frame: Option<RgbaImage>,
}

impl FrameWidget {
    fn new() -> Self {
        Self { frame: None }
    }

    fn update_frame(&mut self, frame: RgbaImage) {
        self.frame = Some(frame);
    }
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = &self.frame else {
            let msg = "Waiting for camera...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        };

        let Some((display_width, display_height)) =
            fit_half_blocks(frame.width(), frame.height(), area.width, area.height)
        else {
            return;
        };

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width() as f64 / display_width as f64;
        let y_scale = frame.height() as f64 / (display_height as f64 * 2.0);

        // Upper half (▀) takes the top pixel as foreground, the lower half
        // shows the bottom pixel through the background
        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;
                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(sample_pixel(frame, src_x, src_y_top));
                    cell.set_bg(sample_pixel(frame, src_x, src_y_bottom));
                }
            }
        }
    }
}

/// Largest cell area with the image's aspect ratio that fits the terminal
fn fit_half_blocks(width: u32, height: u32, cols: u16, rows: u16) -> Option<(u16, u16)> {
    if width == 0 || height == 0 || cols == 0 || rows == 0 {
        return None;
    }
    let frame_aspect = width as f64 / height as f64;
    let term_width = cols as f64;
    let term_height = rows as f64 * 2.0;

    let (w, h) = if term_width / term_height > frame_aspect {
        (term_height * frame_aspect, term_height)
    } else {
        (term_width, term_width / frame_aspect)
    };
    let size = ((w as u16).max(1), ((h / 2.0) as u16).max(1));
    Some(size)
}

fn sample_pixel(frame: &RgbaImage, x: u32, y: u32) -> Color {
    let x = x.min(frame.width() - 1);
    let y = y.min(frame.height() - 1);
    let [r, g, b, _] = frame.get_pixel(x, y).0;
    Color::Rgb(r, g, b)
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_wide_terminal() {
        // 80x24 cells is 80x48 half-block pixels; 4:3 fits to height
        assert_eq!(fit_half_blocks(640, 480, 80, 24), Some((64, 24)));
    }

    #[test]
    fn test_fit_tall_terminal() {
        assert_eq!(fit_half_blocks(640, 480, 40, 40), Some((40, 15)));
    }

    #[test]
    fn test_fit_empty_area() {
        assert_eq!(fit_half_blocks(640, 480, 0, 10), None);
    }

    #[test]
    fn test_status_message() {
        let msg = build_status_message(Some(29.96), Orientation::Front, None);
        assert!(msg.starts_with("30.0 fps | Front"));
        let msg = build_status_message(None, Orientation::Back, Some("Saved: x.jpg"));
        assert_eq!(msg, "-- fps | Back | Saved: x.jpg");
    }

    #[test]
    fn test_widget_draws_half_blocks() {
        let mut widget = FrameWidget::new();
        widget.update_frame(RgbaImage::from_fn(2, 2, |_, y| {
            if y == 0 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        }));
        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        (&widget).render(area, &mut buf);

        let cell = &buf[(0, 0)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
        assert_eq!(cell.bg, Color::Rgb(0, 0, 255));
    }
}
