//! StoryKit Core Library
//!
//! Platform-agnostic data structures and logic for authoring, publishing and
//! viewing community stories with text, emoji and sticker overlays.

pub mod authoring;
pub mod backend;
pub mod composer;
pub mod config;
pub mod mapper;
pub mod media;
pub mod overlay;
pub mod playback;
pub mod publish;
pub mod reactions;
pub mod story;
pub mod youtube;

pub use authoring::{AuthoringController, AuthoringEvent, AuthoringMode, SCALE_STEP};
pub use backend::{BackendError, BackendOp, MemoryBackend, StoryBackend, UploadMethod, upload_object_with_fallback};
pub use composer::{Composer, ComposerCommand, ComposerMsg, ComposerPhase};
pub use config::{ConfigError, StoryKitConfig};
pub use mapper::{CanvasSurface, NormalizedPoint, to_normalized, to_normalized_or, to_pixels};
pub use media::{MediaError, MediaFile, MediaUploadRequest, UploadLimits, UploadedMedia, VideoCompressor, PassthroughCompressor};
pub use overlay::{Overlay, OverlayContent, OverlayError, OverlayId, OverlayKind, OverlayList, Scale, StickerLabel, TextStyle, UnknownStickerLabel};
pub use playback::{OverlayPainter, PlaybackView, ProjectedOverlay};
pub use publish::{PublishError, StoryPublisher};
pub use reactions::{ReactionBook, ReactionIntent, ReactionKind, ReactionRow, ReactionSnapshot, SyncStatus, refresh_reactions, sync_reaction};
pub use story::{MediaType, NewStory, StoryError, StoryFeed, StoryRecord};
pub use youtube::{EmbedPlan, VideoId, detect_links, extract_video_id};
