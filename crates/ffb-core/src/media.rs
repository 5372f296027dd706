//! Media descriptors: what an input is, or what an output should become.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

/// A raw command-line option attached to an input or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomOption {
    /// The flag, including its dash (e.g. `-pix_fmt`).
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl CustomOption {
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Video stream parameters. Zero means "let the encoder decide".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    /// Encoder name; `None` uses the muxer's default.
    pub codec: Option<String>,
    pub width: u32,
    pub height: u32,
    pub framerate: f64,
    /// Bits per second.
    pub bitrate: u64,
    /// Encoder profile index, `-1` for none.
    pub profile: i32,
    /// 0 (unset) to 100 (best).
    pub quality: u8,
    /// Loop count, only used by the GIF encoder.
    pub loop_count: i32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            codec: None,
            width: 0,
            height: 0,
            framerate: 0.0,
            bitrate: 0,
            profile: -1,
            quality: 0,
            loop_count: 0,
        }
    }
}

/// Audio stream parameters. Zero means "let the encoder decide".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub codec: Option<String>,
    /// Hertz.
    pub sampling_rate: u32,
    /// Bits per second.
    pub bitrate: u64,
}

/// One input or output of a transcoding job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaDescriptor {
    pub path: PathBuf,
    pub image_sequence: bool,
    /// First frame number of an image sequence.
    pub start_number: u32,
    pub has_video: bool,
    pub has_audio: bool,
    /// Length in seconds, when known.
    pub duration_secs: f64,
    pub video: VideoSettings,
    pub audio: AudioSettings,
    /// Container name; `None` lets the encoder guess from the extension.
    pub muxer: Option<String>,
    /// Raw options emitted verbatim, in order.
    pub options: Vec<CustomOption>,
}

impl Default for MediaDescriptor {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            image_sequence: false,
            start_number: 0,
            has_video: true,
            has_audio: true,
            duration_secs: 0.0,
            video: VideoSettings::default(),
            audio: AudioSettings::default(),
            muxer: None,
            options: Vec::new(),
        }
    }
}

impl MediaDescriptor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Number of frames implied by duration and framerate, truncated.
    pub fn total_frames(&self) -> u64 {
        let frames = self.duration_secs * self.video.framerate;
        if frames.is_finite() && frames > 0.0 {
            frames as u64
        } else {
            0
        }
    }

    /// Clear codec and muxer references that do not exist in `catalog`.
    ///
    /// Returns the names that were dropped.
    pub fn retain_resolvable(&mut self, catalog: &Catalog) -> Vec<String> {
        let mut dropped = Vec::new();

        if let Some(name) = self.video.codec.take() {
            if catalog.video_encoder(&name).is_some() {
                self.video.codec = Some(name);
            } else {
                dropped.push(name);
            }
        }
        if let Some(name) = self.audio.codec.take() {
            if catalog.audio_encoder(&name).is_some() {
                self.audio.codec = Some(name);
            } else {
                dropped.push(name);
            }
        }
        if let Some(name) = self.muxer.take() {
            if catalog.muxer(&name).is_some() {
                self.muxer = Some(name);
            } else {
                dropped.push(name);
            }
        }

        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Codec, CodecBuckets, Muxer, StreamKind};

    #[test]
    fn defaults() {
        let media = MediaDescriptor::new("/tmp/in.mov");
        assert!(media.has_video);
        assert!(media.has_audio);
        assert_eq!(media.video.profile, -1);
        assert_eq!(media.video.quality, 0);
        assert!(media.muxer.is_none());
    }

    #[test]
    fn total_frames_truncates() {
        let mut media = MediaDescriptor::new("in.mov");
        media.duration_secs = 10.5;
        media.video.framerate = 23.976;
        assert_eq!(media.total_frames(), 251);

        media.video.framerate = 0.0;
        assert_eq!(media.total_frames(), 0);
    }

    #[test]
    fn retain_resolvable_drops_unknown_names() {
        let catalog = Catalog::new(
            CodecBuckets {
                video_encoders: vec![Codec::copy(StreamKind::Video)],
                audio_encoders: vec![Codec::copy(StreamKind::Audio)],
                ..Default::default()
            },
            vec![Muxer::new("matroska", "Matroska")],
        );

        let mut media = MediaDescriptor::new("out.mkv");
        media.video.codec = Some("copy".into());
        media.audio.codec = Some("opus".into());
        media.muxer = Some("matroska".into());

        let dropped = media.retain_resolvable(&catalog);
        assert_eq!(dropped, vec!["opus".to_string()]);
        assert_eq!(media.video.codec.as_deref(), Some("copy"));
        assert!(media.audio.codec.is_none());
        assert_eq!(media.muxer.as_deref(), Some("matroska"));
    }

    #[test]
    fn deserializes_partial_toml_like_json() {
        let json = r#"{"path": "out.gif", "has_audio": false, "video": {"codec": "gif", "loop_count": -1}}"#;
        let media: MediaDescriptor = serde_json::from_str(json).unwrap();
        assert!(!media.has_audio);
        assert!(media.has_video);
        assert_eq!(media.video.codec.as_deref(), Some("gif"));
        assert_eq!(media.video.loop_count, -1);
        assert_eq!(media.video.profile, -1);
    }
}
