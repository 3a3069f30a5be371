//! Subcommand implementations. Each returns the text printed on success.

use anyhow::{Context, bail};
use kurbo::Rect;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use storykit_core::media::check_size;
use storykit_core::{
    MediaFile, MediaType, OverlayKind, OverlayList, PlaybackView, StoryKitConfig, StoryRecord,
    extract_video_id,
};

/// Read overlays from either a bare overlay array or a full story row.
fn load_overlays(path: &Path) -> anyhow::Result<OverlayList> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))?;
    match value {
        Value::Array(_) => Ok(OverlayList::from_json(&text)?),
        Value::Object(_) => Ok(StoryRecord::from_json(value)?.overlays().clone()),
        _ => bail!("{} must hold an overlay array or a story row", path.display()),
    }
}

pub fn validate(path: &Path) -> anyhow::Result<String> {
    let overlays = load_overlays(path)?;
    let count = |kind: OverlayKind| overlays.iter().filter(|o| o.kind() == kind).count();
    log::info!("Validated {} overlays from {}", overlays.len(), path.display());
    Ok(format!(
        "{} overlays ({} text, {} emoji, {} sticker)",
        overlays.len(),
        count(OverlayKind::Text),
        count(OverlayKind::Emoji),
        count(OverlayKind::Sticker)
    ))
}

pub fn project(path: &Path, viewer: Rect) -> anyhow::Result<String> {
    let overlays = load_overlays(path)?;
    let mut view = PlaybackView::new();
    view.measure(viewer);
    let Some(projected) = view.project(overlays.as_slice()) else {
        bail!("Viewer size must be positive, got {}x{}", viewer.width(), viewer.height());
    };

    let rows: Vec<Value> = projected
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "type": p.kind,
                "value": p.value,
                "x": p.position.x,
                "y": p.position.y,
                "scale": p.scale,
                "textStyle": p.text_style,
                "zIndex": p.z_index,
                "fontSize": p.font_size,
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

pub fn check_media(path: &Path, media_type: MediaType, config: &StoryKitConfig) -> anyhow::Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = MediaFile::new(media_type, file_name, bytes);
    check_size(&file, &config.limits)?;
    Ok(format!(
        "{} ok: {} {} bytes, limit {}",
        file.file_name,
        media_type.as_str(),
        file.size(),
        config.limits.cap_for(media_type)
    ))
}

pub fn youtube(input: &str) -> anyhow::Result<String> {
    let Some(id) = extract_video_id(input) else {
        bail!("No YouTube video id in {:?}", input);
    };
    Ok(format!(
        "id: {}\nembed: {}\nwatch: {}\nthumbnail: {}",
        id,
        id.embed_url(),
        id.watch_url(),
        id.thumbnail_url()
    ))
}
