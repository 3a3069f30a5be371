//! Story overlay definitions and the overlay list model.
//!
//! An overlay is a text, emoji or sticker annotation positioned in normalized
//! canvas coordinates. The list order is the z-order: later entries are drawn
//! on top.

use crate::mapper::NormalizedPoint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Default anchor for new text overlays (canvas center).
pub const TEXT_ANCHOR: NormalizedPoint = NormalizedPoint::from_unit(0.5, 0.5);
/// Default anchor for new emoji overlays (lower third).
pub const EMOJI_ANCHOR: NormalizedPoint = NormalizedPoint::from_unit(0.5, 0.8);
/// Default anchor for new sticker overlays (upper fifth).
pub const STICKER_ANCHOR: NormalizedPoint = NormalizedPoint::from_unit(0.5, 0.2);

/// Errors raised while building or parsing overlay lists.
#[derive(Debug, Error, PartialEq)]
pub enum OverlayError {
    #[error("Overlay id is empty")]
    EmptyId,
    #[error("Overlay {0} has an empty value")]
    EmptyValue(String),
    #[error("Overlay {id} uses unknown sticker label {label:?}")]
    UnknownSticker { id: String, label: String },
    #[error("Overlay {0} has a text style but is not a text overlay")]
    StyleOnNonText(String),
    #[error("Duplicate overlay id: {0}")]
    DuplicateId(String),
    #[error("Invalid overlay JSON: {0}")]
    Json(String),
}

/// A sticker label outside the fixed vocabulary.
#[derive(Debug, Error, PartialEq)]
#[error("Unknown sticker label {0:?}")]
pub struct UnknownStickerLabel(pub String);

/// Result type for overlay operations.
pub type OverlayResult<T> = Result<T, OverlayError>;

/// Opaque overlay identifier, unique within one overlay list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayId(String);

impl OverlayId {
    /// Generate a fresh client-side id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OverlayId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OverlayId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Overlay kind, serialized in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    Text,
    Emoji,
    Sticker,
}

/// Visual treatment of a text overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStyle {
    /// Plain text with a drop shadow.
    #[default]
    Normal,
    /// Bold text on a background pill.
    Highlight,
}

impl TextStyle {
    /// Toggle between the two styles.
    pub fn toggle(self) -> Self {
        match self {
            TextStyle::Normal => TextStyle::Highlight,
            TextStyle::Highlight => TextStyle::Normal,
        }
    }
}

/// The fixed sticker vocabulary presented by the sticker tray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StickerLabel {
    Amen,
    Praise,
    Blessed,
    Pray,
    Grace,
    Joy,
    Hallelujah,
}

impl StickerLabel {
    /// The label as rendered and persisted.
    pub fn label(&self) -> &'static str {
        match self {
            StickerLabel::Amen => "AMEN",
            StickerLabel::Praise => "PRAISE",
            StickerLabel::Blessed => "BLESSED",
            StickerLabel::Pray => "PRAY",
            StickerLabel::Grace => "GRACE",
            StickerLabel::Joy => "JOY",
            StickerLabel::Hallelujah => "HALLELUJAH",
        }
    }

    /// All stickers, in tray order.
    pub fn all() -> &'static [StickerLabel] {
        &[
            StickerLabel::Amen,
            StickerLabel::Praise,
            StickerLabel::Blessed,
            StickerLabel::Pray,
            StickerLabel::Grace,
            StickerLabel::Joy,
            StickerLabel::Hallelujah,
        ]
    }
}

impl FromStr for StickerLabel {
    type Err = UnknownStickerLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StickerLabel::all()
            .iter()
            .copied()
            .find(|sticker| sticker.label() == s)
            .ok_or_else(|| UnknownStickerLabel(s.to_string()))
    }
}

/// Overlay scale multiplier, always within [`Scale::MIN`, `Scale::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Scale(f64);

impl Scale {
    pub const MIN: f64 = 0.5;
    pub const MAX: f64 = 2.5;
    pub const DEFAULT: Scale = Scale(1.0);

    /// Create a scale, clamping into range. NaN falls back to the default.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            Self::DEFAULT
        } else {
            Self(value.clamp(Self::MIN, Self::MAX))
        }
    }

    pub fn get(&self) -> f64 {
        self.0
    }

    /// Apply a delta, clamping the result. Non-finite deltas are ignored.
    pub fn adjust(self, delta: f64) -> Self {
        if !delta.is_finite() {
            return self;
        }
        Self::new(self.0 + delta)
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What an overlay draws.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayContent {
    Text { value: String, style: TextStyle },
    Emoji(String),
    Sticker(StickerLabel),
}

impl OverlayContent {
    pub fn kind(&self) -> OverlayKind {
        match self {
            OverlayContent::Text { .. } => OverlayKind::Text,
            OverlayContent::Emoji(_) => OverlayKind::Emoji,
            OverlayContent::Sticker(_) => OverlayKind::Sticker,
        }
    }

    /// The literal string to render.
    pub fn value(&self) -> &str {
        match self {
            OverlayContent::Text { value, .. } => value,
            OverlayContent::Emoji(glyph) => glyph,
            OverlayContent::Sticker(label) => label.label(),
        }
    }

    /// Text style, for text overlays only.
    pub fn text_style(&self) -> Option<TextStyle> {
        match self {
            OverlayContent::Text { style, .. } => Some(*style),
            _ => None,
        }
    }
}

/// A positioned annotation drawn on top of story media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OverlayRecord", into = "OverlayRecord")]
pub struct Overlay {
    pub id: OverlayId,
    pub content: OverlayContent,
    pub position: NormalizedPoint,
    pub scale: Scale,
}

impl Overlay {
    /// Create an overlay with a fresh id and default scale.
    pub fn new(content: OverlayContent, position: NormalizedPoint) -> Self {
        Self {
            id: OverlayId::generate(),
            content,
            position,
            scale: Scale::DEFAULT,
        }
    }

    pub fn kind(&self) -> OverlayKind {
        self.content.kind()
    }

    pub fn value(&self) -> &str {
        self.content.value()
    }

    pub fn text_style(&self) -> Option<TextStyle> {
        self.content.text_style()
    }
}

/// Wire shape of an overlay in the story's JSON column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OverlayRecord {
    id: String,
    #[serde(rename = "type")]
    kind: OverlayKind,
    value: String,
    normalized_x: f64,
    normalized_y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text_style: Option<TextStyle>,
}

impl TryFrom<OverlayRecord> for Overlay {
    type Error = OverlayError;

    fn try_from(record: OverlayRecord) -> Result<Self, Self::Error> {
        if record.id.trim().is_empty() {
            return Err(OverlayError::EmptyId);
        }
        if record.value.trim().is_empty() {
            return Err(OverlayError::EmptyValue(record.id));
        }
        if record.text_style.is_some() && record.kind != OverlayKind::Text {
            return Err(OverlayError::StyleOnNonText(record.id));
        }

        let content = match record.kind {
            OverlayKind::Text => OverlayContent::Text {
                value: record.value,
                style: record.text_style.unwrap_or_default(),
            },
            OverlayKind::Emoji => OverlayContent::Emoji(record.value),
            OverlayKind::Sticker => match record.value.parse::<StickerLabel>() {
                Ok(label) => OverlayContent::Sticker(label),
                Err(_) => {
                    return Err(OverlayError::UnknownSticker {
                        id: record.id,
                        label: record.value,
                    });
                }
            },
        };

        Ok(Self {
            id: OverlayId(record.id),
            content,
            position: NormalizedPoint::new(record.normalized_x, record.normalized_y),
            scale: record.scale.map(Scale::new).unwrap_or_default(),
        })
    }
}

impl From<Overlay> for OverlayRecord {
    fn from(overlay: Overlay) -> Self {
        let text_style = overlay.text_style();
        let kind = overlay.kind();
        let value = match overlay.content {
            OverlayContent::Text { value, .. } => value,
            OverlayContent::Emoji(glyph) => glyph,
            OverlayContent::Sticker(label) => label.label().to_string(),
        };
        Self {
            id: overlay.id.0,
            kind,
            value,
            normalized_x: overlay.position.x(),
            normalized_y: overlay.position.y(),
            scale: Some(overlay.scale.get()),
            text_style,
        }
    }
}

/// An ordered list of overlays with unique ids.
///
/// Every edit returns a new list value; the receiver is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Overlay>", into = "Vec<Overlay>")]
pub struct OverlayList {
    overlays: Vec<Overlay>,
}

impl TryFrom<Vec<Overlay>> for OverlayList {
    type Error = OverlayError;

    fn try_from(overlays: Vec<Overlay>) -> Result<Self, Self::Error> {
        Self::from_overlays(overlays)
    }
}

impl From<OverlayList> for Vec<Overlay> {
    fn from(list: OverlayList) -> Self {
        list.overlays
    }
}

impl OverlayList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from existing overlays, rejecting duplicate ids.
    pub fn from_overlays(overlays: Vec<Overlay>) -> OverlayResult<Self> {
        let mut seen = std::collections::HashSet::with_capacity(overlays.len());
        for overlay in &overlays {
            if !seen.insert(overlay.id.as_str()) {
                return Err(OverlayError::DuplicateId(overlay.id.to_string()));
            }
        }
        Ok(Self { overlays })
    }

    /// Parse a persisted overlay JSON array.
    pub fn from_json(json: &str) -> OverlayResult<Self> {
        serde_json::from_str(json).map_err(|e| OverlayError::Json(e.to_string()))
    }

    /// Serialize to the persisted JSON array shape.
    pub fn to_json(&self) -> OverlayResult<String> {
        serde_json::to_string(self).map_err(|e| OverlayError::Json(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn get(&self, id: &OverlayId) -> Option<&Overlay> {
        self.overlays.iter().find(|overlay| &overlay.id == id)
    }

    pub fn contains(&self, id: &OverlayId) -> bool {
        self.get(id).is_some()
    }

    /// Overlays in z-order (back to front).
    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.iter()
    }

    /// The topmost overlay.
    pub fn last(&self) -> Option<&Overlay> {
        self.overlays.last()
    }

    pub fn as_slice(&self) -> &[Overlay] {
        &self.overlays
    }

    fn with_pushed(&self, overlay: Overlay) -> Self {
        let mut overlays = self.overlays.clone();
        overlays.push(overlay);
        Self { overlays }
    }

    fn with_updated(&self, id: &OverlayId, update: impl FnOnce(&mut Overlay)) -> Self {
        let mut next = self.clone();
        if let Some(overlay) = next.overlays.iter_mut().find(|overlay| &overlay.id == id) {
            update(overlay);
        }
        next
    }

    /// Append a text overlay at the canvas center. Blank text is ignored.
    #[must_use]
    pub fn add_text(&self, value: &str, style: TextStyle) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return self.clone();
        }
        self.with_pushed(Overlay::new(
            OverlayContent::Text {
                value: value.to_string(),
                style,
            },
            TEXT_ANCHOR,
        ))
    }

    /// Append an emoji overlay in the lower third. Blank input is ignored.
    #[must_use]
    pub fn add_emoji(&self, glyph: &str) -> Self {
        let glyph = glyph.trim();
        if glyph.is_empty() {
            return self.clone();
        }
        self.with_pushed(Overlay::new(
            OverlayContent::Emoji(glyph.to_string()),
            EMOJI_ANCHOR,
        ))
    }

    /// Append a sticker overlay in the upper fifth.
    #[must_use]
    pub fn add_sticker(&self, label: StickerLabel) -> Self {
        self.with_pushed(Overlay::new(OverlayContent::Sticker(label), STICKER_ANCHOR))
    }

    /// Move an overlay. Unknown ids are ignored.
    #[must_use]
    pub fn update_position(&self, id: &OverlayId, position: NormalizedPoint) -> Self {
        self.with_updated(id, |overlay| overlay.position = position)
    }

    /// Change an overlay's scale by `delta`, clamped into range. Unknown ids are ignored.
    #[must_use]
    pub fn adjust_scale(&self, id: &OverlayId, delta: f64) -> Self {
        self.with_updated(id, |overlay| overlay.scale = overlay.scale.adjust(delta))
    }

    /// Remove an overlay. Unknown ids are ignored.
    #[must_use]
    pub fn remove(&self, id: &OverlayId) -> Self {
        let overlays = self
            .overlays
            .iter()
            .filter(|overlay| &overlay.id != id)
            .cloned()
            .collect();
        Self { overlays }
    }

    /// An empty list.
    #[must_use]
    pub fn clear(&self) -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_text_defaults() {
        let list = OverlayList::new().add_text("  Amen ", TextStyle::Highlight);
        assert_eq!(list.len(), 1);
        let overlay = list.last().unwrap();
        assert_eq!(overlay.kind(), OverlayKind::Text);
        assert_eq!(overlay.value(), "Amen");
        assert_eq!(overlay.position, TEXT_ANCHOR);
        assert_eq!(overlay.scale, Scale::DEFAULT);
        assert_eq!(overlay.text_style(), Some(TextStyle::Highlight));
    }

    #[test]
    fn test_add_blank_text_is_noop() {
        let list = OverlayList::new().add_emoji("🙏");
        assert_eq!(list.add_text("", TextStyle::Normal).len(), 1);
        assert_eq!(list.add_text("   ", TextStyle::Normal).len(), 1);
        assert_eq!(list.add_emoji(" ").len(), 1);
    }

    #[test]
    fn test_default_anchors() {
        let list = OverlayList::new()
            .add_emoji("🔥")
            .add_sticker(StickerLabel::Amen);
        let overlays = list.as_slice();
        assert_eq!(overlays[0].position, EMOJI_ANCHOR);
        assert_eq!(overlays[1].position, STICKER_ANCHOR);
        assert_eq!(overlays[1].value(), "AMEN");
        assert_eq!(overlays[1].text_style(), None);
    }

    #[test]
    fn test_edits_return_new_value() {
        let original = OverlayList::new().add_sticker(StickerLabel::Joy);
        let id = original.last().unwrap().id.clone();
        let moved = original.update_position(&id, NormalizedPoint::new(0.1, 0.9));
        assert_eq!(original.get(&id).unwrap().position, STICKER_ANCHOR);
        assert_eq!(moved.get(&id).unwrap().position, NormalizedPoint::new(0.1, 0.9));
    }

    #[test]
    fn test_ids_are_unique() {
        let list = OverlayList::new()
            .add_text("a", TextStyle::Normal)
            .add_text("a", TextStyle::Normal)
            .add_sticker(StickerLabel::Grace);
        let ids: std::collections::HashSet<_> = list.iter().map(|o| o.id.clone()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_adjust_scale_clamps() {
        let list = OverlayList::new().add_emoji("❤️");
        let id = list.last().unwrap().id.clone();

        let mut grown = list.clone();
        for _ in 0..100 {
            grown = grown.adjust_scale(&id, 0.7);
        }
        assert!((grown.get(&id).unwrap().scale.get() - Scale::MAX).abs() < f64::EPSILON);

        let shrunk = list.adjust_scale(&id, -1000.0);
        assert!((shrunk.get(&id).unwrap().scale.get() - Scale::MIN).abs() < f64::EPSILON);

        let unchanged = list.adjust_scale(&id, f64::NAN);
        assert_eq!(unchanged.get(&id).unwrap().scale, Scale::DEFAULT);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let list = OverlayList::new().add_text("Grace", TextStyle::Normal);
        let missing = OverlayId::from("missing");
        assert_eq!(list.remove(&missing), list);
        assert_eq!(list.adjust_scale(&missing, 1.0), list);
        assert_eq!(list.update_position(&missing, NormalizedPoint::CENTER), list);
    }

    #[test]
    fn test_remove_and_clear() {
        let list = OverlayList::new()
            .add_text("one", TextStyle::Normal)
            .add_emoji("✨");
        let first = list.as_slice()[0].id.clone();
        let removed = list.remove(&first);
        assert_eq!(removed.len(), 1);
        assert!(!removed.contains(&first));
        assert!(list.clear().is_empty());
    }

    #[test]
    fn test_parse_persisted_json() {
        let json = r#"[
            {"id":"a","type":"sticker","value":"AMEN","normalizedX":0.5,"normalizedY":0.2},
            {"id":"b","type":"text","value":"He is risen","normalizedX":1.4,"normalizedY":-0.2,
             "scale":9.0,"textStyle":"highlight"}
        ]"#;
        let list = OverlayList::from_json(json).unwrap();
        assert_eq!(list.len(), 2);
        let text = &list.as_slice()[1];
        assert_eq!(text.position, NormalizedPoint::new(1.0, 0.0));
        assert!((text.scale.get() - Scale::MAX).abs() < f64::EPSILON);
        assert_eq!(text.text_style(), Some(TextStyle::Highlight));
        assert_eq!(list.as_slice()[0].scale, Scale::DEFAULT);
    }

    #[test]
    fn test_parse_fails_closed() {
        let cases = [
            r#"[{"id":"a","type":"gif","value":"x","normalizedX":0.5,"normalizedY":0.5}]"#,
            r#"[{"id":"a","type":"sticker","value":"HELLO","normalizedX":0.5,"normalizedY":0.5}]"#,
            r#"[{"id":"","type":"emoji","value":"🙏","normalizedX":0.5,"normalizedY":0.5}]"#,
            r#"[{"id":"a","type":"emoji","value":"  ","normalizedX":0.5,"normalizedY":0.5}]"#,
            r#"[{"id":"a","type":"emoji","value":"🙏","normalizedX":0.5,"normalizedY":0.5,"textStyle":"normal"}]"#,
            r#"[{"id":"a","type":"emoji","value":"🙏","normalizedY":0.5}]"#,
            r#"[{"id":"a","type":"emoji","value":"🙏","normalizedX":0.5,"normalizedY":0.5},
                {"id":"a","type":"emoji","value":"🔥","normalizedX":0.5,"normalizedY":0.5}]"#,
        ];
        for json in cases {
            assert!(OverlayList::from_json(json).is_err(), "accepted: {}", json);
        }
    }

    #[test]
    fn test_json_shape() {
        let list = OverlayList::new()
            .add_text("Amen", TextStyle::Normal)
            .add_sticker(StickerLabel::Praise);
        let value: serde_json::Value = serde_json::from_str(&list.to_json().unwrap()).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items[0]["type"], "text");
        assert_eq!(items[0]["textStyle"], "normal");
        assert_eq!(items[0]["normalizedX"], 0.5);
        assert_eq!(items[1]["type"], "sticker");
        assert_eq!(items[1]["value"], "PRAISE");
        assert!(items[1].get("textStyle").is_none());
        assert_eq!(OverlayList::from_json(&list.to_json().unwrap()).unwrap(), list);
    }

    #[test]
    fn test_sticker_vocabulary() {
        for sticker in StickerLabel::all() {
            assert_eq!(sticker.label().parse::<StickerLabel>(), Ok(*sticker));
        }
        assert_eq!(
            "amen".parse::<StickerLabel>(),
            Err(UnknownStickerLabel("amen".to_string()))
        );
    }
}
