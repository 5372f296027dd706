//! Parser for the stream summary printed by `ffmpeg -i <file>`.

use std::path::Path;

use ffb_core::{Catalog, Error, MediaDescriptor};

static_pattern!(input_line, r"Input #0, (.+), from ");
static_pattern!(
    duration,
    r"Duration: (\d+):(\d\d):(\d\d)\.(\d\d)"
);
static_pattern!(overall_bitrate, r"Duration: .*bitrate: (\d+) kb/s");
static_pattern!(video_stream, r"Stream #\d+:\d+.*?: Video: (\w+)(.*)");
static_pattern!(audio_stream, r"Stream #\d+:\d+.*?: Audio: (\w+)(.*)");
static_pattern!(resolution, r", (\d+)x(\d+)");
static_pattern!(frame_rate, r"([\d.]+) fps");
static_pattern!(timebase_rate, r"([\d.]+) tbr");
static_pattern!(stream_bitrate, r"(\d+) kb/s");
static_pattern!(sampling_rate, r"(\d+) Hz");

/// Build a descriptor for `path` from the encoder's `-i` output.
///
/// Codec and container names that do not resolve in `catalog` are left
/// unset. Bitrates are reported in kilobits of 1000 bits.
///
/// # Errors
///
/// [`Error::Validation`] if the text carries no input summary, typically
/// because the file does not exist or is not media.
pub fn parse_media_info(
    text: &str,
    path: &Path,
    catalog: &Catalog,
) -> ffb_core::Result<MediaDescriptor> {
    let containers = input_line()
        .captures(text)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| {
            Error::Validation(format!("{}: no media information", path.display()))
        })?;

    let mut media = MediaDescriptor::new(path);
    media.muxer = containers
        .split(',')
        .map(str::trim)
        .find(|name| catalog.muxer(name).is_some())
        .map(String::from);

    if let Some(caps) = duration().captures(text) {
        let field = |i: usize| caps[i].parse::<f64>().unwrap_or(0.0);
        media.duration_secs = field(1) * 3600.0 + field(2) * 60.0 + field(3) + field(4) / 100.0;
    }
    let overall_bps = overall_bitrate()
        .captures(text)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .map(|kbps| kbps * 1000)
        .unwrap_or(0);

    media.has_video = false;
    if let Some(caps) = video_stream().captures(text) {
        media.has_video = true;
        let rest = &caps[2];
        media.video.codec = catalog
            .video_encoder(&caps[1])
            .map(|codec| codec.name.clone());
        if let Some(res) = resolution().captures(rest) {
            media.video.width = res[1].parse().unwrap_or(0);
            media.video.height = res[2].parse().unwrap_or(0);
        }
        media.video.framerate = frame_rate()
            .captures(rest)
            .or_else(|| timebase_rate().captures(rest))
            .and_then(|fr| fr[1].parse().ok())
            .unwrap_or(0.0);
        media.video.bitrate = first_bitrate(rest).unwrap_or(overall_bps);
    }

    media.has_audio = false;
    if let Some(caps) = audio_stream().captures(text) {
        media.has_audio = true;
        let rest = &caps[2];
        media.audio.codec = catalog
            .audio_encoder(&caps[1])
            .map(|codec| codec.name.clone());
        media.audio.sampling_rate = sampling_rate()
            .captures(rest)
            .and_then(|hz| hz[1].parse().ok())
            .unwrap_or(0);
        media.audio.bitrate = first_bitrate(rest).unwrap_or(0);
    }

    Ok(media)
}

fn first_bitrate(stream: &str) -> Option<u64> {
    stream_bitrate()
        .captures(stream)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .map(|kbps| kbps * 1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffb_core::{Codec, CodecBuckets, CodecFlags, Muxer, StreamKind};

    const MOV: &str = "\
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'in.mov':
  Metadata:
    major_brand     : qt
  Duration: 00:01:10.50, start: 0.000000, bitrate: 5234 kb/s
    Stream #0:0(und): Video: h264 (High) (avc1 / 0x31637661), yuv420p(tv, bt709), 1920x1080 [SAR 1:1 DAR 16:9], 5000 kb/s, 23.98 fps, 23.98 tbr, 24k tbn (default)
    Stream #0:1(und): Audio: aac (LC) (mp4a / 0x6134706D), 48000 Hz, stereo, fltp, 317 kb/s (default)
At least one output file must be specified
";

    fn catalog() -> Catalog {
        let encoder = |name: &str, kind| {
            Codec::new(
                name,
                name,
                kind,
                CodecFlags {
                    encoder: true,
                    ..Default::default()
                },
            )
        };
        Catalog::new(
            CodecBuckets {
                video_encoders: vec![encoder("h264", StreamKind::Video)],
                audio_encoders: vec![encoder("flac", StreamKind::Audio)],
                ..Default::default()
            },
            vec![Muxer::new("mp4", "MP4")],
        )
    }

    #[test]
    fn parses_video_and_audio_streams() {
        let media = parse_media_info(MOV, Path::new("in.mov"), &catalog()).unwrap();

        assert!((media.duration_secs - 70.5).abs() < 1e-9);
        assert_eq!(media.muxer.as_deref(), Some("mp4"));

        assert!(media.has_video);
        assert_eq!(media.video.codec.as_deref(), Some("h264"));
        assert_eq!((media.video.width, media.video.height), (1920, 1080));
        assert!((media.video.framerate - 23.98).abs() < 1e-9);
        assert_eq!(media.video.bitrate, 5_000_000);

        assert!(media.has_audio);
        // aac is not an encoder in this catalog.
        assert!(media.audio.codec.is_none());
        assert_eq!(media.audio.sampling_rate, 48000);
        assert_eq!(media.audio.bitrate, 317_000);
        assert_eq!(media.total_frames(), 1690);
    }

    #[test]
    fn image_without_audio() {
        let text = "\
Input #0, png_pipe, from 'frame.png':
  Duration: N/A, bitrate: N/A
    Stream #0:0: Video: png, rgba(pc), 640x480, 25 tbr, 25 tbn
";
        let media = parse_media_info(text, Path::new("frame.png"), &catalog()).unwrap();
        assert!(media.has_video);
        assert!(!media.has_audio);
        assert_eq!(media.duration_secs, 0.0);
        assert_eq!(media.video.framerate, 25.0);
        assert_eq!(media.video.bitrate, 0);
        assert!(media.muxer.is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        let text = "missing.mov: No such file or directory\n";
        let result = parse_media_info(text, Path::new("missing.mov"), &catalog());
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
