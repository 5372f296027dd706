//! Compile a queue item into the encoder's argument vector.
//!
//! [`build`] is a pure function: it reads the item and the catalog snapshot
//! and returns arguments, nothing else. Codec and muxer names that do not
//! resolve in the catalog are ignored as if unset.

use std::borrow::Cow;
use std::path::Path;

use ffb_core::{Catalog, CustomOption, MediaDescriptor, Muxer, QueueItem, COPY_CODEC, SEQUENCE_FORMAT};

static_pattern!(sequence_placeholder, r"\{(#+)\}");
static_pattern!(command_token, r#""([^"]*)"|(\S+)"#);

/// Video codec that understands a constant rate factor.
const CRF_CODEC: &str = "h264";
/// Video codec that honours a loop count.
const LOOP_CODEC: &str = "gif";

/// Map a 0-100 quality (100 best) to an H.264 constant rate factor.
///
/// The scale is piecewise linear over five bands so that most of the
/// quality range lands on visually useful factors:
///
/// | inverted quality | factor  |
/// |------------------|---------|
/// | 0..10            | 0..15   |
/// | 10..25           | 15..21  |
/// | 25..50           | 21..28  |
/// | 50..75           | 28..34  |
/// | 75..=100         | 34..=51 |
///
/// Integer arithmetic truncates at every step. Quality above 100 is
/// clamped.
pub fn crf_from_quality(quality: u8) -> u32 {
    let q = 100 - u32::from(quality.min(100));
    match q {
        0..=9 => q * 15 / 10,
        10..=24 => (q - 10) * 6 / 15 + 15,
        25..=49 => (q - 25) * 6 / 25 + 21,
        50..=74 => (q - 50) * 6 / 25 + 28,
        _ => (q - 75) * 17 / 25 + 34,
    }
}

/// Rewrite `{#}`-style frame placeholders into printf-style specifiers.
///
/// Each run of N `#` between braces becomes a zero-padded field of width N:
/// `frame_{###}.png` becomes `frame_%03d.png`.
pub fn convert_sequence_name(name: &str) -> Cow<'_, str> {
    sequence_placeholder().replace_all(name, |caps: &regex::Captures<'_>| {
        format!("%0{}d", caps[1].len())
    })
}

/// Split a free-form command line into arguments.
///
/// Double-quoted segments are kept together with the quotes removed;
/// everything else splits on whitespace.
pub fn split_command_line(command: &str) -> Vec<String> {
    command_token()
        .captures_iter(command)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Build the full argument vector for `item`.
pub fn build(item: &QueueItem, catalog: &Catalog) -> Vec<String> {
    let mut args = ArgList::default();
    args.push("-stats");
    args.push("-y");

    for input in &item.inputs {
        args.options(&input.options);
        let mut path = path_string(&input.path);
        if input.image_sequence {
            args.pair("-framerate", input.video.framerate);
            args.pair("-start_number", input.start_number);
            path = convert_sequence_name(&path).into_owned();
        }
        args.push("-i");
        args.push(path);
    }

    for output in &item.outputs {
        build_output(&mut args, output, catalog);
    }

    args.0
}

fn build_output(args: &mut ArgList, output: &MediaDescriptor, catalog: &Catalog) {
    let muxer: Option<&Muxer> = output.muxer.as_deref().and_then(|name| catalog.muxer(name));
    let format = muxer.map(Muxer::format_name);
    if let Some(format) = format {
        args.pair("-f", format);
    }

    args.options(&output.options);

    if output.has_video {
        let codec = output
            .video
            .codec
            .as_deref()
            .and_then(|name| catalog.video_encoder(name))
            .map(|c| c.name.as_str());
        if let Some(codec) = codec {
            args.pair("-vcodec", codec);
        }

        if codec != Some(COPY_CODEC) {
            let video = &output.video;
            if video.bitrate != 0 {
                args.pair("-b:v", video.bitrate);
            }
            if video.width != 0 && video.height != 0 {
                args.pair("-s", format!("{}x{}", video.width, video.height));
            }
            if video.framerate != 0.0 {
                args.pair("-r", video.framerate);
            }
            if codec == Some(LOOP_CODEC) {
                args.pair("-loop", video.loop_count);
            }
            if video.profile > -1 {
                args.pair("-profile", video.profile);
            }
            if codec == Some(CRF_CODEC) && video.quality > 0 {
                args.pair("-crf", crf_from_quality(video.quality));
            }
            if format == Some(SEQUENCE_FORMAT) {
                args.pair("-start_number", output.start_number);
            }
        }
    } else {
        args.push("-vn");
    }

    if output.has_audio {
        let codec = output
            .audio
            .codec
            .as_deref()
            .and_then(|name| catalog.audio_encoder(name))
            .map(|c| c.name.as_str());
        if let Some(codec) = codec {
            args.pair("-acodec", codec);
        }

        if codec != Some(COPY_CODEC) {
            if output.audio.bitrate != 0 {
                args.pair("-b:a", output.audio.bitrate);
            }
            if output.audio.sampling_rate != 0 {
                args.pair("-ar", output.audio.sampling_rate);
            }
        }
    } else {
        args.push("-an");
    }

    let path = path_string(&output.path);
    if muxer.is_some_and(|m| m.is_sequence) {
        args.push(convert_sequence_name(&path).into_owned());
    } else {
        args.push(path);
    }
}

/// Paths that are not valid UTF-8 are passed with replacement characters,
/// which will not name the same file.
fn path_string(path: &Path) -> String {
    match path.to_str() {
        Some(s) => s.to_string(),
        None => {
            let lossy = path.to_string_lossy().into_owned();
            tracing::warn!(path = %lossy, "Path is not valid UTF-8, the encoder may not find it");
            lossy
        }
    }
}

#[derive(Default)]
struct ArgList(Vec<String>);

impl ArgList {
    fn push(&mut self, arg: impl Into<String>) {
        self.0.push(arg.into());
    }

    fn pair(&mut self, flag: &str, value: impl ToString) {
        self.0.push(flag.to_string());
        self.0.push(value.to_string());
    }

    /// Raw options: the name, then the value unless empty.
    fn options(&mut self, options: &[CustomOption]) {
        for option in options {
            self.push(option.name.clone());
            if let Some(value) = option.value.as_deref().filter(|v| !v.is_empty()) {
                self.push(value);
            }
        }
    }
}
