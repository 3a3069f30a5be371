//! Story composer state and its update function.
//!
//! The composer never performs I/O. `update` consumes the current state and
//! a message and returns the next state together with the commands the
//! caller has to run; their results come back as further messages.

use crate::authoring::{AuthoringController, AuthoringEvent};
use crate::config::StoryKitConfig;
use crate::media::{MediaError, MediaFile, MediaUploadRequest, UploadLimits, UploadedMedia, check_size};
use crate::overlay::OverlayList;
use crate::story::{MediaType, NewStory, StoryRecord};
use uuid::Uuid;

/// Where the composer is in the publish flow.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ComposerPhase {
    #[default]
    Editing,
    Compressing,
    Uploading,
    Inserting,
    Published(Uuid),
}

/// Input to [`Composer::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum ComposerMsg {
    Authoring(AuthoringEvent),
    SetCaption(String),
    AttachMedia(MediaFile),
    /// Camera or photo library access was refused.
    PermissionDenied(String),
    Submit { user_id: String },
    Compressed(Result<MediaFile, String>),
    Uploaded(Result<UploadedMedia, String>),
    Inserted(Result<StoryRecord, String>),
}

/// Side effects requested by the composer.
#[derive(Debug, Clone, PartialEq)]
pub enum ComposerCommand {
    CompressVideo { file: MediaFile, target_bytes: u64 },
    UploadMedia(MediaUploadRequest),
    InsertStory(NewStory),
    /// Show a one-shot message to the user.
    Alert(String),
}

/// State of the story composer screen.
#[derive(Debug, Clone)]
pub struct Composer {
    authoring: AuthoringController,
    caption: String,
    media: Option<MediaFile>,
    user_id: Option<String>,
    phase: ComposerPhase,
    limits: UploadLimits,
    path_prefix: String,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(&StoryKitConfig::default())
    }
}

impl Composer {
    pub fn new(config: &StoryKitConfig) -> Self {
        Self {
            authoring: AuthoringController::new(),
            caption: String::new(),
            media: None,
            user_id: None,
            phase: ComposerPhase::Editing,
            limits: config.limits,
            path_prefix: config.story_path_prefix.clone(),
        }
    }

    pub fn phase(&self) -> &ComposerPhase {
        &self.phase
    }

    pub fn authoring(&self) -> &AuthoringController {
        &self.authoring
    }

    pub fn overlays(&self) -> &OverlayList {
        self.authoring.overlays()
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn media(&self) -> Option<&MediaFile> {
        self.media.as_ref()
    }

    /// Whether the user can still edit the story.
    pub fn is_editing(&self) -> bool {
        self.phase == ComposerPhase::Editing
    }

    /// Advance the state machine by one message.
    pub fn update(mut self, msg: ComposerMsg) -> (Self, Vec<ComposerCommand>) {
        let commands = match msg {
            ComposerMsg::Authoring(event) => {
                if self.is_editing() {
                    self.authoring.apply(event);
                }
                Vec::new()
            }
            ComposerMsg::SetCaption(caption) => {
                if self.is_editing() {
                    self.caption = caption;
                }
                Vec::new()
            }
            ComposerMsg::AttachMedia(file) => {
                if self.is_editing() {
                    self.media = Some(file);
                }
                Vec::new()
            }
            ComposerMsg::PermissionDenied(what) => {
                vec![ComposerCommand::Alert(format!(
                    "Permission to access your {} was denied",
                    what
                ))]
            }
            ComposerMsg::Submit { user_id } => self.submit(user_id),
            ComposerMsg::Compressed(result) => self.compressed(result),
            ComposerMsg::Uploaded(result) => self.uploaded(result),
            ComposerMsg::Inserted(result) => self.inserted(result),
        };
        (self, commands)
    }

    fn submit(&mut self, user_id: String) -> Vec<ComposerCommand> {
        if !self.is_editing() {
            return Vec::new();
        }
        let Some(file) = self.media.clone() else {
            return vec![ComposerCommand::Alert("Choose a photo or video first".to_string())];
        };
        self.user_id = Some(user_id);

        let target_bytes = self.limits.video_target_bytes;
        match check_size(&file, &self.limits) {
            Err(MediaError::TooLarge { .. }) if file.media_type == MediaType::Video => {
                self.phase = ComposerPhase::Compressing;
                vec![ComposerCommand::CompressVideo { file, target_bytes }]
            }
            Err(e) => self.abort(e.to_string()),
            Ok(()) => self.start_upload(&file),
        }
    }

    fn compressed(&mut self, result: Result<MediaFile, String>) -> Vec<ComposerCommand> {
        if self.phase != ComposerPhase::Compressing {
            return Vec::new();
        }
        match result {
            Ok(file) => match check_size(&file, &self.limits) {
                Ok(()) => {
                    let commands = self.start_upload(&file);
                    self.media = Some(file);
                    commands
                }
                Err(e) => self.abort(format!("Video is still too large after compression. {}", e)),
            },
            Err(message) => self.abort(message),
        }
    }

    fn uploaded(&mut self, result: Result<UploadedMedia, String>) -> Vec<ComposerCommand> {
        if self.phase != ComposerPhase::Uploading {
            return Vec::new();
        }
        let uploaded = match result {
            Ok(uploaded) => uploaded,
            Err(message) => return self.abort(message),
        };
        let media_type = self.media.as_ref().map(|file| file.media_type);
        let (Some(user_id), Some(media_type)) = (self.user_id.clone(), media_type) else {
            return self.abort("Upload failed".to_string());
        };
        let story = NewStory::new(user_id, media_type, uploaded.public_url)
            .with_caption(&self.caption)
            .with_overlays(self.authoring.overlays().clone());
        self.phase = ComposerPhase::Inserting;
        vec![ComposerCommand::InsertStory(story)]
    }

    fn inserted(&mut self, result: Result<StoryRecord, String>) -> Vec<ComposerCommand> {
        if self.phase != ComposerPhase::Inserting {
            return Vec::new();
        }
        match result {
            Ok(record) => {
                self.phase = ComposerPhase::Published(record.id);
                Vec::new()
            }
            Err(message) => self.abort(message),
        }
    }

    fn start_upload(&mut self, file: &MediaFile) -> Vec<ComposerCommand> {
        let user_id = self.user_id.as_deref().unwrap_or_default();
        let request = MediaUploadRequest::encode(file, &self.path_prefix, user_id);
        self.phase = ComposerPhase::Uploading;
        vec![ComposerCommand::UploadMedia(request)]
    }

    /// Return to editing with a message for the user.
    fn abort(&mut self, message: String) -> Vec<ComposerCommand> {
        self.phase = ComposerPhase::Editing;
        vec![ComposerCommand::Alert(message)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::StickerLabel;
    use chrono::Utc;

    fn small_limits() -> StoryKitConfig {
        let mut config = StoryKitConfig::default();
        config.limits = UploadLimits {
            max_image_bytes: 16,
            video_target_bytes: 32,
        };
        config
    }

    fn uploaded() -> UploadedMedia {
        UploadedMedia {
            public_url: "https://cdn/stories/u1/x.jpg".into(),
            path: "stories/u1/x.jpg".into(),
        }
    }

    fn step(composer: Composer, msg: ComposerMsg) -> (Composer, Vec<ComposerCommand>) {
        composer.update(msg)
    }

    #[test]
    fn test_submit_without_media_alerts() {
        let (composer, commands) = step(Composer::default(), ComposerMsg::Submit { user_id: "u1".into() });
        assert!(matches!(commands.as_slice(), [ComposerCommand::Alert(_)]));
        assert!(composer.is_editing());
    }

    #[test]
    fn test_happy_path_upload_then_insert() {
        let composer = Composer::new(&small_limits());
        let (composer, _) = step(
            composer,
            ComposerMsg::AttachMedia(MediaFile::new(MediaType::Image, "a.jpg", vec![7; 8])),
        );
        let (composer, _) = step(
            composer,
            ComposerMsg::Authoring(AuthoringEvent::AddSticker(StickerLabel::Amen)),
        );
        let (composer, _) = step(composer, ComposerMsg::SetCaption(" Sunday ".into()));

        let (composer, commands) = step(composer, ComposerMsg::Submit { user_id: "u1".into() });
        assert_eq!(composer.phase(), &ComposerPhase::Uploading);
        let [ComposerCommand::UploadMedia(request)] = commands.as_slice() else {
            panic!("expected upload, got {:?}", commands);
        };
        assert_eq!(request.path_prefix.as_deref(), Some("stories/u1"));

        // Overlays are frozen once submitted.
        let (composer, _) = step(
            composer,
            ComposerMsg::Authoring(AuthoringEvent::AddSticker(StickerLabel::Joy)),
        );
        assert_eq!(composer.overlays().len(), 1);

        let (composer, commands) = step(composer, ComposerMsg::Uploaded(Ok(uploaded())));
        let [ComposerCommand::InsertStory(story)] = commands.as_slice() else {
            panic!("expected insert, got {:?}", commands);
        };
        assert_eq!(story.media_url, "https://cdn/stories/u1/x.jpg");
        assert_eq!(story.caption.as_deref(), Some("Sunday"));
        assert_eq!(story.overlays.as_ref().map(OverlayList::len), Some(1));

        let record = StoryRecord::from_insert(Uuid::new_v4(), story.clone(), Utc::now());
        let id = record.id;
        let (composer, commands) = step(composer, ComposerMsg::Inserted(Ok(record)));
        assert!(commands.is_empty());
        assert_eq!(composer.phase(), &ComposerPhase::Published(id));
    }

    #[test]
    fn test_oversized_image_rejected_locally() {
        let composer = Composer::new(&small_limits());
        let (composer, _) = step(
            composer,
            ComposerMsg::AttachMedia(MediaFile::new(MediaType::Image, "a.jpg", vec![0; 17])),
        );
        let (composer, commands) = step(composer, ComposerMsg::Submit { user_id: "u1".into() });
        assert!(matches!(commands.as_slice(), [ComposerCommand::Alert(_)]));
        assert!(composer.is_editing());
    }

    #[test]
    fn test_oversized_video_compressed_then_rejected() {
        let composer = Composer::new(&small_limits());
        let big = MediaFile::new(MediaType::Video, "clip.mp4", vec![0; 64]);
        let (composer, _) = step(composer, ComposerMsg::AttachMedia(big.clone()));
        let (composer, commands) = step(composer, ComposerMsg::Submit { user_id: "u1".into() });
        assert_eq!(
            commands,
            vec![ComposerCommand::CompressVideo {
                file: big.clone(),
                target_bytes: 32
            }]
        );
        assert_eq!(composer.phase(), &ComposerPhase::Compressing);

        let (composer, commands) = step(composer, ComposerMsg::Compressed(Ok(big)));
        assert!(matches!(commands.as_slice(), [ComposerCommand::Alert(_)]));
        assert!(composer.is_editing());
    }

    #[test]
    fn test_compressed_video_uploads() {
        let composer = Composer::new(&small_limits());
        let (composer, _) = step(
            composer,
            ComposerMsg::AttachMedia(MediaFile::new(MediaType::Video, "clip.mp4", vec![0; 64])),
        );
        let (composer, _) = step(composer, ComposerMsg::Submit { user_id: "u1".into() });
        let smaller = MediaFile::new(MediaType::Video, "clip.mp4", vec![0; 30]);
        let (composer, commands) = step(composer, ComposerMsg::Compressed(Ok(smaller)));
        assert!(matches!(commands.as_slice(), [ComposerCommand::UploadMedia(_)]));
        assert_eq!(composer.media().map(MediaFile::size), Some(30));
    }

    #[test]
    fn test_upload_failure_returns_to_editing() {
        let composer = Composer::new(&small_limits());
        let (composer, _) = step(
            composer,
            ComposerMsg::AttachMedia(MediaFile::new(MediaType::Image, "a.jpg", vec![1])),
        );
        let (composer, _) = step(composer, ComposerMsg::Submit { user_id: "u1".into() });
        let (composer, commands) = step(composer, ComposerMsg::Uploaded(Err("Storage offline".into())));
        assert_eq!(commands, vec![ComposerCommand::Alert("Storage offline".into())]);
        assert!(composer.is_editing());
    }

    #[test]
    fn test_stale_results_are_ignored() {
        let (composer, commands) = step(Composer::default(), ComposerMsg::Uploaded(Ok(uploaded())));
        assert!(commands.is_empty());
        assert!(composer.is_editing());
    }

    #[test]
    fn test_permission_denied_alerts() {
        let (_, commands) = step(Composer::default(), ComposerMsg::PermissionDenied("camera".into()));
        assert_eq!(
            commands,
            vec![ComposerCommand::Alert("Permission to access your camera was denied".into())]
        );
    }
}
