//! Authoring controller: turns gestures and toolbar actions into overlay edits.

use crate::mapper::CanvasSurface;
use crate::overlay::{OverlayId, OverlayList, StickerLabel, TextStyle};
use kurbo::{Point, Rect};

/// Scale change applied by one press of the grow/shrink buttons.
pub const SCALE_STEP: f64 = 0.1;

/// Interaction mode of the authoring session.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AuthoringMode {
    /// Nothing in progress.
    #[default]
    Idle,
    /// A drag gesture is moving the given overlay.
    Selecting { id: OverlayId },
    /// The text entry field is open.
    TextEntry { draft: String, style: TextStyle },
}

/// Input to the authoring controller.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthoringEvent {
    /// The canvas view reported its layout rect.
    CanvasMeasured(Rect),
    /// A drag began on an overlay.
    PressOverlay { id: OverlayId },
    /// Pointer moved during a drag, in the same coordinate space as the
    /// rect passed to `CanvasMeasured` (the rect origin is subtracted).
    PointerMoved { position: Point },
    /// The drag gesture ended.
    Released,
    OpenTextEntry,
    EditDraft(String),
    ToggleTextStyle,
    SubmitText,
    CancelTextEntry,
    AddEmoji(String),
    AddSticker(StickerLabel),
    GrowSelected,
    ShrinkSelected,
    DeleteSelected,
    ClearSelection,
    ClearAll,
}

/// Tracks the overlay list being authored plus transient UI state.
#[derive(Debug, Clone, Default)]
pub struct AuthoringController {
    overlays: OverlayList,
    mode: AuthoringMode,
    selected: Option<OverlayId>,
    canvas: CanvasSurface,
}

impl AuthoringController {
    /// Start an empty authoring session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overlays(&self) -> &OverlayList {
        &self.overlays
    }

    pub fn mode(&self) -> &AuthoringMode {
        &self.mode
    }

    /// The overlay showing resize/delete affordances, if any.
    pub fn selected(&self) -> Option<&OverlayId> {
        self.selected.as_ref()
    }

    pub fn canvas(&self) -> &CanvasSurface {
        &self.canvas
    }

    /// Current text entry draft, if the field is open.
    pub fn draft(&self) -> Option<&str> {
        match &self.mode {
            AuthoringMode::TextEntry { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// Consume the controller, keeping only the authored overlays.
    pub fn into_overlays(self) -> OverlayList {
        self.overlays
    }

    /// Apply an event. Returns true if the overlay list changed.
    pub fn apply(&mut self, event: AuthoringEvent) -> bool {
        let next = match event {
            AuthoringEvent::CanvasMeasured(rect) => {
                self.canvas.measure(rect);
                None
            }
            AuthoringEvent::PressOverlay { id } => {
                if matches!(self.mode, AuthoringMode::TextEntry { .. }) || !self.overlays.contains(&id) {
                    return false;
                }
                self.selected = Some(id.clone());
                self.mode = AuthoringMode::Selecting { id };
                None
            }
            AuthoringEvent::PointerMoved { position } => self.drag_to(position),
            AuthoringEvent::Released => {
                if matches!(self.mode, AuthoringMode::Selecting { .. }) {
                    self.mode = AuthoringMode::Idle;
                }
                None
            }
            AuthoringEvent::OpenTextEntry => {
                self.mode = AuthoringMode::TextEntry {
                    draft: String::new(),
                    style: TextStyle::default(),
                };
                None
            }
            AuthoringEvent::EditDraft(text) => {
                if let AuthoringMode::TextEntry { draft, .. } = &mut self.mode {
                    *draft = text;
                }
                None
            }
            AuthoringEvent::ToggleTextStyle => {
                if let AuthoringMode::TextEntry { style, .. } = &mut self.mode {
                    *style = style.toggle();
                }
                None
            }
            AuthoringEvent::SubmitText => self.submit_text(),
            AuthoringEvent::CancelTextEntry => {
                if matches!(self.mode, AuthoringMode::TextEntry { .. }) {
                    self.mode = AuthoringMode::Idle;
                }
                None
            }
            AuthoringEvent::AddEmoji(glyph) => Some(self.overlays.add_emoji(&glyph)),
            AuthoringEvent::AddSticker(label) => Some(self.overlays.add_sticker(label)),
            AuthoringEvent::GrowSelected => self
                .selected
                .as_ref()
                .map(|id| self.overlays.adjust_scale(id, SCALE_STEP)),
            AuthoringEvent::ShrinkSelected => self
                .selected
                .as_ref()
                .map(|id| self.overlays.adjust_scale(id, -SCALE_STEP)),
            AuthoringEvent::DeleteSelected => self.selected.take().map(|id| {
                if self.mode == (AuthoringMode::Selecting { id: id.clone() }) {
                    self.mode = AuthoringMode::Idle;
                }
                self.overlays.remove(&id)
            }),
            AuthoringEvent::ClearSelection => {
                self.selected = None;
                None
            }
            AuthoringEvent::ClearAll => {
                self.selected = None;
                self.mode = AuthoringMode::Idle;
                Some(self.overlays.clear())
            }
        };

        match next {
            Some(list) if list != self.overlays => {
                self.commit(list);
                true
            }
            _ => false,
        }
    }

    fn drag_to(&self, position: Point) -> Option<OverlayList> {
        let AuthoringMode::Selecting { id } = &self.mode else {
            return None;
        };
        let previous = self.overlays.get(id)?.position;
        let target = self.canvas.to_normalized_or(position, previous);
        Some(self.overlays.update_position(id, target))
    }

    fn submit_text(&mut self) -> Option<OverlayList> {
        let AuthoringMode::TextEntry { draft, style } = &mut self.mode else {
            return None;
        };
        let draft = std::mem::take(draft);
        let style = *style;
        self.mode = AuthoringMode::Idle;
        let next = self.overlays.add_text(&draft, style);
        if next.len() > self.overlays.len() {
            self.selected = next.last().map(|overlay| overlay.id.clone());
        }
        Some(next)
    }

    /// Install a new overlay list, dropping state that points at removed overlays.
    fn commit(&mut self, list: OverlayList) {
        if let Some(id) = &self.selected {
            if !list.contains(id) {
                self.selected = None;
            }
        }
        if let AuthoringMode::Selecting { id } = &self.mode {
            if !list.contains(id) {
                self.mode = AuthoringMode::Idle;
            }
        }
        self.overlays = list;
    }
}
