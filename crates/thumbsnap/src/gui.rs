//! Preview window.

use anyhow::Context;
use minifb::{Key, Window, WindowOptions};

use crate::image::{draw, Color, Image, Resolution};

/// Shows annotated frames and reports when the user wants to quit.
pub trait Display {
    /// Presents `frame`. `overlay` is the status text shown alongside it, if any.
    fn show(&mut self, frame: &Image, overlay: Option<&str>) -> anyhow::Result<()>;

    /// Returns `true` once the user asked to quit.
    fn exit_requested(&self) -> bool;
}

/// Draws `text` in the top left corner of `image`.
pub fn draw_overlay(image: &mut Image, text: &str) {
    // Drop shadow, keeps the text readable on bright backgrounds.
    draw::text(image, 12, 12, text)
        .large()
        .align_top()
        .align_left()
        .color(Color::BLACK);
    draw::text(image, 10, 10, text)
        .large()
        .align_top()
        .align_left()
        .color(Color::YELLOW);
}

/// A desktop window displaying the camera preview.
///
/// The window is opened on the first call to [`Display::show`] with the resolution of that frame,
/// and reopened if the frame resolution changes. `Q` and `Escape` request exit, as does closing
/// the window.
pub struct PreviewWindow {
    title: String,
    window: Option<(Window, Resolution)>,
    buf: Vec<u32>,
}

impl PreviewWindow {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            window: None,
            buf: Vec::new(),
        }
    }

    fn window_for(&mut self, res: Resolution) -> anyhow::Result<&mut Window> {
        let window = match &mut self.window {
            Some((window, current)) if *current == res => window,
            slot => {
                log::debug!("opening preview window '{}' at {res}", self.title);
                let window = Window::new(
                    &self.title,
                    res.width() as usize,
                    res.height() as usize,
                    WindowOptions::default(),
                )
                .with_context(|| format!("failed to open preview window at {res}"))?;
                &mut slot.insert((window, res)).0
            }
        };
        Ok(window)
    }
}

impl Display for PreviewWindow {
    fn show(&mut self, frame: &Image, overlay: Option<&str>) -> anyhow::Result<()> {
        let mut buf = std::mem::take(&mut self.buf);
        frame.write_0rgb(&mut buf);

        let title = match overlay {
            Some(text) => format!("{} - {text}", self.title),
            None => self.title.clone(),
        };
        let res = frame.resolution();
        let window = self.window_for(res)?;
        window.set_title(&title);
        let result = window
            .update_with_buffer(&buf, res.width() as usize, res.height() as usize)
            .context("failed to update preview window");

        self.buf = buf;
        result
    }

    fn exit_requested(&self) -> bool {
        match &self.window {
            Some((window, _)) => {
                !window.is_open() || window.is_key_down(Key::Q) || window.is_key_down(Key::Escape)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_touches_top_left() {
        let mut image = Image::new(320, 60);
        draw_overlay(&mut image, "Capturing in 3 sec");

        let yellow = (0..image.height())
            .flat_map(|y| (0..image.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| image.get(x, y) == Color::YELLOW)
            .collect::<Vec<_>>();
        assert!(!yellow.is_empty());
        assert!(yellow.iter().all(|&(x, y)| x >= 10 && y >= 10));
        assert!(yellow.iter().any(|&(x, _)| x < 40));
    }

    #[test]
    fn no_exit_before_first_frame() {
        let window = PreviewWindow::new("test");
        assert!(!window.exit_requested());
    }
}
