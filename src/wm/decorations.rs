//! Window decorations (frames, title bars, controls) for labwm

use anyhow::Result;
use x11rb::protocol::xproto::{ConfigureWindowAux, EventMask, Window};

use crate::config::{DecorationConfig, TitleControl, TitleControlsConfig};
use crate::shared::Geometry;
use crate::wm::client::Client;
use crate::wm::xconn::{FontMetrics, Paint, WindowKind, WindowSpec, XConn};

/// Events selected on every frame
pub fn frame_events() -> EventMask {
    EventMask::SUBSTRUCTURE_REDIRECT
        | EventMask::SUBSTRUCTURE_NOTIFY
        | EventMask::BUTTON_PRESS
        | EventMask::EXPOSURE
        | EventMask::ENTER_WINDOW
}

/// Decoration sizes and the title-bar control layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decorations {
    /// Height of a full title band
    pub bar_height: i32,
    pub border_width: i32,
    pub transient_border_width: i32,
    pub text_padding: i32,
    pub font_ascent: i32,
    /// Controls from the right edge of the title bar
    pub controls: Vec<TitleControl>,
    pub control_width: i32,
}

impl Decorations {
    pub fn new(
        config: &DecorationConfig,
        controls: &TitleControlsConfig,
        font: FontMetrics,
    ) -> Self {
        let bar_height = font.ascent + font.descent + 2 * config.text_padding + 2;
        let control_width = if controls.control_width > 0 {
            controls.control_width
        } else {
            bar_height
        };
        Self {
            bar_height,
            border_width: i32::from(config.border_width),
            transient_border_width: i32::from(config.transient_border_width),
            text_padding: config.text_padding,
            font_ascent: font.ascent,
            controls: controls.order.clone(),
            control_width: control_width.max(1),
        }
    }

    pub fn border_for(&self, is_transient: bool) -> i32 {
        if is_transient {
            self.transient_border_width
        } else {
            self.border_width
        }
    }

    /// Control under a point `offset_from_right` pixels left of the title
    /// bar's right edge, if any
    pub fn hit_test(&self, offset_from_right: i32) -> Option<TitleControl> {
        if offset_from_right < 0 {
            return None;
        }
        self.controls
            .get((offset_from_right / self.control_width) as usize)
            .copied()
    }

    /// The frame window wrapping a client
    pub fn frame_spec(&self, root: Window, client: &Client) -> WindowSpec {
        WindowSpec {
            parent: root,
            geometry: client.frame_geometry(self.bar_height),
            border_width: client.border_width.max(0) as u16,
            kind: WindowKind::InputOutput,
            background: Some(Paint::Empty),
            border: Some(Paint::Border),
            override_redirect: true,
            event_mask: frame_events(),
        }
    }

    /// Repaint a frame's title band
    pub fn redraw<X: XConn>(&self, conn: &X, client: &Client, focused: bool) -> Result<()> {
        let title = client.title_height(self.bar_height);
        if title == 0 {
            return Ok(());
        }
        let width = client.geometry.width;
        let fill = if focused { Paint::Active } else { Paint::Inactive };

        conn.fill_rectangle(client.frame, fill, Geometry::new(0, 0, width, title))?;
        conn.draw_line(client.frame, Paint::Border, (0, title - 1), (width, title - 1))?;

        for index in 0..self.controls.len() as i32 {
            let left = width - (index + 1) * self.control_width;
            if left < 0 {
                break;
            }
            conn.draw_line(client.frame, Paint::Border, (left, 0), (left, title - 1))?;
            let inset = self.text_padding.max(1);
            conn.fill_rectangle(
                client.frame,
                Paint::Depressed,
                Geometry::new(
                    left + inset,
                    inset,
                    self.control_width - 2 * inset,
                    title - 2 * inset - 1,
                ),
            )?;
        }

        self.write_title(conn, client, client.frame)
    }

    fn write_title<X: XConn>(&self, conn: &X, client: &Client, target: Window) -> Result<()> {
        if let Some(name) = client.name.as_deref().filter(|_| client.title_height(1) > 0) {
            conn.draw_text(
                target,
                self.text_padding,
                self.text_padding + self.font_ascent,
                name,
            )?;
        }
        Ok(())
    }

    /// Outline windows tracking a sweep in progress
    pub fn create_preview<X: XConn>(
        &self,
        conn: &X,
        client: &Client,
        candidate: Geometry,
    ) -> Result<SweepPreview> {
        let title = client.title_height(self.bar_height);
        let body = conn.create_window(&WindowSpec {
            parent: conn.root(),
            geometry: Self::preview_body(candidate, title),
            border_width: self.border_width.max(0) as u16,
            kind: WindowKind::InputOutput,
            background: Some(Paint::Inactive),
            border: Some(Paint::Border),
            override_redirect: true,
            event_mask: EventMask::EXPOSURE,
        })?;
        conn.map_window(body)?;

        let bar = if title > 0 {
            let bar = conn.create_window(&WindowSpec {
                parent: body,
                geometry: Self::preview_bar(candidate, title, self.border_width),
                border_width: self.border_width.max(0) as u16,
                kind: WindowKind::InputOutput,
                background: Some(Paint::Active),
                border: Some(Paint::Border),
                override_redirect: true,
                event_mask: EventMask::EXPOSURE,
            })?;
            conn.map_window(bar)?;
            self.write_title(conn, client, bar)?;
            Some(bar)
        } else {
            None
        };

        Ok(SweepPreview { body, bar, title })
    }

    fn preview_body(candidate: Geometry, title: i32) -> Geometry {
        Geometry::new(
            candidate.x,
            candidate.y - title,
            candidate.width,
            candidate.height + title,
        )
    }

    fn preview_bar(candidate: Geometry, title: i32, border: i32) -> Geometry {
        Geometry::new(-border, -border, candidate.width, (title - border).max(1))
    }

    pub fn update_preview<X: XConn>(
        &self,
        conn: &X,
        preview: &SweepPreview,
        client: &Client,
        candidate: Geometry,
    ) -> Result<()> {
        let body = Self::preview_body(candidate, preview.title);
        conn.configure_window(
            preview.body,
            &ConfigureWindowAux::new()
                .width(body.width.max(1) as u32)
                .height(body.height.max(1) as u32),
        )?;
        if let Some(bar) = preview.bar {
            conn.configure_window(
                bar,
                &ConfigureWindowAux::new()
                    .width(candidate.width.max(1) as u32),
            )?;
            conn.clear_window(bar)?;
            self.write_title(conn, client, bar)?;
        }
        Ok(())
    }
}

/// Helper windows shown during a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPreview {
    pub body: Window,
    pub bar: Option<Window>,
    title: i32,
}

impl SweepPreview {
    pub fn destroy<X: XConn>(self, conn: &X) -> Result<()> {
        // The bar is a child of the body and goes with it
        conn.destroy_window(self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decorations(order: Vec<TitleControl>, control_width: i32) -> Decorations {
        Decorations::new(
            &DecorationConfig::default(),
            &TitleControlsConfig {
                order,
                control_width,
            },
            FontMetrics {
                ascent: 10,
                descent: 3,
            },
        )
    }

    #[test]
    fn test_bar_height_from_font() {
        let decor = decorations(TitleControlsConfig::default().order, 0);
        assert_eq!(decor.bar_height, 10 + 3 + 6 + 2);
        assert_eq!(decor.control_width, decor.bar_height);
    }

    #[test]
    fn test_hit_test_default_layout() {
        let decor = decorations(TitleControlsConfig::default().order, 0);
        assert_eq!(decor.hit_test(0), Some(TitleControl::Close));
        assert_eq!(decor.hit_test(20), Some(TitleControl::Close));
        assert_eq!(decor.hit_test(21), Some(TitleControl::RaiseLower));
        assert_eq!(decor.hit_test(62), Some(TitleControl::Resize));
        assert_eq!(decor.hit_test(63), None);
        assert_eq!(decor.hit_test(-1), None);
    }

    #[test]
    fn test_hit_test_custom_layout() {
        let decor = decorations(vec![TitleControl::Resize, TitleControl::Close], 16);
        assert_eq!(decor.hit_test(15), Some(TitleControl::Resize));
        assert_eq!(decor.hit_test(16), Some(TitleControl::Close));
        assert_eq!(decor.hit_test(32), None);
    }

    #[test]
    fn test_transient_border() {
        let decor = decorations(vec![], 0);
        assert_eq!(decor.border_for(true), 1);
        assert_eq!(decor.border_for(false), 2);
    }
}
