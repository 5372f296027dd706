//! Output presets: a versioned JSON record describing an output without its
//! path.
//!
//! ```json
//! { "ffbatch": {
//!     "version": "0.1.0",
//!     "muxer": { "name": "mp4" },
//!     "loop": 0,
//!     "hasVideo": true,
//!     "video": { "codecName": "h264", "width": 1920, "height": 1080,
//!                "framerate": 24.0, "bitrate": 0, "profile": -1,
//!                "quality": 80, "startNumber": 0 },
//!     "hasAudio": true,
//!     "audio": { "codecName": "default", "sampling": 48000, "bitrate": 192000 },
//!     "options": [ { "name": "-movflags", "value": "+faststart" } ]
//! } }
//! ```
//!
//! A codec name of `"default"` leaves the choice to the muxer. Integer
//! fields also accept floats (`80.0`, `2.5e6`), rounded to the nearest
//! whole number.

use std::path::Path;

use ffb_core::{AudioSettings, Catalog, CustomOption, Error, MediaDescriptor, VideoSettings};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Root key of a preset document.
pub const ROOT_KEY: &str = "ffbatch";

/// Codec name meaning "no explicit codec".
const DEFAULT_CODEC: &str = "default";

#[derive(Debug, Serialize)]
struct PresetDocument {
    ffbatch: PresetRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PresetRecord {
    version: String,
    muxer: MuxerRecord,
    #[serde(rename = "loop", deserialize_with = "whole_number")]
    loop_count: i32,
    has_video: bool,
    video: VideoRecord,
    has_audio: bool,
    audio: AudioRecord,
    options: Vec<OptionRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct MuxerRecord {
    name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VideoRecord {
    codec_name: String,
    #[serde(deserialize_with = "whole_number")]
    width: u32,
    #[serde(deserialize_with = "whole_number")]
    height: u32,
    framerate: f64,
    #[serde(deserialize_with = "whole_number")]
    bitrate: u64,
    #[serde(deserialize_with = "whole_number")]
    profile: i32,
    #[serde(deserialize_with = "whole_number")]
    quality: u8,
    #[serde(deserialize_with = "whole_number")]
    start_number: u32,
}

impl Default for VideoRecord {
    fn default() -> Self {
        Self {
            codec_name: DEFAULT_CODEC.to_string(),
            width: 0,
            height: 0,
            framerate: 0.0,
            bitrate: 0,
            profile: -1,
            quality: 0,
            start_number: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AudioRecord {
    codec_name: String,
    #[serde(deserialize_with = "whole_number")]
    sampling: u32,
    #[serde(deserialize_with = "whole_number")]
    bitrate: u64,
}

impl Default for AudioRecord {
    fn default() -> Self {
        Self {
            codec_name: DEFAULT_CODEC.to_string(),
            sampling: 0,
            bitrate: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct OptionRecord {
    name: String,
    value: String,
}

fn whole_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let value = f64::deserialize(deserializer)?;
    let rounded = value.round();
    // i64::MAX rounds up to 2^63 as f64, hence the strict upper bound.
    if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return Err(D::Error::custom(format!("{value} is not a whole number in range")));
    }
    T::try_from(rounded as i64).map_err(|_| D::Error::custom(format!("{value} is out of range")))
}

fn codec_name(name: String) -> Option<String> {
    Some(name).filter(|n| !n.is_empty() && n != DEFAULT_CODEC)
}

/// Map a preset document onto a descriptor with an empty path.
///
/// Names that do not resolve in `catalog` are cleared.
///
/// # Errors
///
/// [`Error::MalformedPresetRecord`] if the document is not a JSON object,
/// lacks the root key, or has fields of the wrong type.
pub fn from_json(json: &str, catalog: &Catalog) -> ffb_core::Result<MediaDescriptor> {
    let doc: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| Error::MalformedPresetRecord(format!("invalid JSON: {e}")))?;
    let root = doc
        .as_object()
        .ok_or_else(|| Error::MalformedPresetRecord("document is not an object".into()))?
        .get(ROOT_KEY)
        .ok_or_else(|| Error::MalformedPresetRecord(format!("missing \"{ROOT_KEY}\" object")))?;
    let record: PresetRecord = serde_json::from_value(root.clone())
        .map_err(|e| Error::MalformedPresetRecord(e.to_string()))?;

    tracing::debug!(version = %record.version, muxer = %record.muxer.name, "Loading preset");

    let mut media = MediaDescriptor {
        muxer: Some(record.muxer.name).filter(|n| !n.is_empty()),
        has_video: record.has_video,
        has_audio: record.has_audio,
        ..Default::default()
    };
    media.video.loop_count = record.loop_count;

    if record.has_video {
        let v = record.video;
        media.video = VideoSettings {
            codec: codec_name(v.codec_name),
            width: v.width,
            height: v.height,
            framerate: v.framerate,
            bitrate: v.bitrate,
            profile: v.profile,
            quality: v.quality,
            loop_count: record.loop_count,
        };
        media.start_number = v.start_number;
    }
    if record.has_audio {
        let a = record.audio;
        media.audio = AudioSettings {
            codec: codec_name(a.codec_name),
            sampling_rate: a.sampling,
            bitrate: a.bitrate,
        };
    }
    media.options = record
        .options
        .into_iter()
        .map(|o| CustomOption {
            name: o.name,
            value: Some(o.value).filter(|v| !v.is_empty()),
        })
        .collect();

    for name in media.retain_resolvable(catalog) {
        tracing::warn!("Preset refers to unknown codec or muxer: {name}");
    }
    Ok(media)
}

/// Like [`from_json`], but logs and returns `None` on a malformed record.
pub fn load_preset(json: &str, catalog: &Catalog) -> Option<MediaDescriptor> {
    match from_json(json, catalog) {
        Ok(media) => Some(media),
        Err(e) => {
            tracing::warn!("Invalid preset: {e}");
            None
        }
    }
}

/// Read and load a preset file. Unreadable files are logged and yield `None`.
pub fn load_preset_file(path: &Path, catalog: &Catalog) -> Option<MediaDescriptor> {
    match std::fs::read_to_string(path) {
        Ok(json) => load_preset(&json, catalog),
        Err(e) => {
            tracing::warn!("Cannot read preset {}: {e}", path.display());
            None
        }
    }
}

/// Serialize the output settings of `media` as a preset document.
pub fn to_json(media: &MediaDescriptor) -> ffb_core::Result<String> {
    let record = PresetRecord {
        version: env!("CARGO_PKG_VERSION").to_string(),
        muxer: MuxerRecord {
            name: media.muxer.clone().unwrap_or_default(),
        },
        loop_count: media.video.loop_count,
        has_video: media.has_video,
        video: VideoRecord {
            codec_name: media
                .video
                .codec
                .clone()
                .unwrap_or_else(|| DEFAULT_CODEC.to_string()),
            width: media.video.width,
            height: media.video.height,
            framerate: media.video.framerate,
            bitrate: media.video.bitrate,
            profile: media.video.profile,
            quality: media.video.quality,
            start_number: media.start_number,
        },
        has_audio: media.has_audio,
        audio: AudioRecord {
            codec_name: media
                .audio
                .codec
                .clone()
                .unwrap_or_else(|| DEFAULT_CODEC.to_string()),
            sampling: media.audio.sampling_rate,
            bitrate: media.audio.bitrate,
        },
        options: media
            .options
            .iter()
            .map(|o| OptionRecord {
                name: o.name.clone(),
                value: o.value.clone().unwrap_or_default(),
            })
            .collect(),
    };

    serde_json::to_string_pretty(&PresetDocument { ffbatch: record }).map_err(|e| Error::Internal(e.to_string()))
}
