//! Read-only projection of persisted overlays onto a viewer surface.

use crate::mapper::CanvasSurface;
use crate::overlay::{Overlay, OverlayId, OverlayKind, TextStyle};
use kurbo::{Point, Rect};

/// Base font size for text overlays at scale 1.0.
pub const TEXT_FONT_SIZE: f64 = 24.0;
/// Base glyph size for emoji overlays at scale 1.0.
pub const EMOJI_FONT_SIZE: f64 = 48.0;
/// Base font size for sticker labels at scale 1.0.
pub const STICKER_FONT_SIZE: f64 = 20.0;

/// An overlay resolved to viewer pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedOverlay {
    pub id: OverlayId,
    pub kind: OverlayKind,
    pub value: String,
    /// Anchor position in viewer pixels.
    pub position: Point,
    pub scale: f64,
    pub text_style: Option<TextStyle>,
    /// Draw order, 0 is the bottom.
    pub z_index: usize,
    pub font_size: f64,
}

/// Something that draws projected overlays (the viewer's UI layer).
pub trait OverlayPainter {
    fn paint(&mut self, overlay: &ProjectedOverlay);
}

impl OverlayPainter for Vec<ProjectedOverlay> {
    fn paint(&mut self, overlay: &ProjectedOverlay) {
        self.push(overlay.clone());
    }
}

fn base_font_size(kind: OverlayKind) -> f64 {
    match kind {
        OverlayKind::Text => TEXT_FONT_SIZE,
        OverlayKind::Emoji => EMOJI_FONT_SIZE,
        OverlayKind::Sticker => STICKER_FONT_SIZE,
    }
}

/// Viewer for a persisted story's overlays.
#[derive(Debug, Clone, Default)]
pub struct PlaybackView {
    surface: CanvasSurface,
}

impl PlaybackView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the viewer's layout rect.
    pub fn measure(&mut self, rect: Rect) {
        self.surface.measure(rect);
    }

    /// Whether overlays can be placed yet.
    pub fn is_ready(&self) -> bool {
        self.surface.is_measured()
    }

    /// Project overlays in z-order. `None` until the viewer has been measured.
    pub fn project(&self, overlays: &[Overlay]) -> Option<Vec<ProjectedOverlay>> {
        let rect = self.surface.rect()?;
        Some(
            overlays
                .iter()
                .enumerate()
                .map(|(z_index, overlay)| {
                    let kind = overlay.kind();
                    let scale = overlay.scale.get();
                    ProjectedOverlay {
                        id: overlay.id.clone(),
                        kind,
                        value: overlay.value().to_string(),
                        position: crate::mapper::to_pixels(overlay.position, rect),
                        scale,
                        text_style: overlay.text_style(),
                        z_index,
                        font_size: base_font_size(kind) * scale,
                    }
                })
                .collect(),
        )
    }

    /// Paint overlays bottom to top. Returns false if rendering was deferred.
    pub fn render(&self, overlays: &[Overlay], painter: &mut impl OverlayPainter) -> bool {
        if !self.is_ready() {
            log::debug!("Viewer not measured yet, deferring {} overlays", overlays.len());
            return false;
        }
        for overlay in self.project(overlays).iter().flatten() {
            painter.paint(overlay);
        }
        true
    }
}
