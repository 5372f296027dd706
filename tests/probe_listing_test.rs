//! Capability listing integration tests.
//!
//! Runs captured listing text through the same steps as a live refresh and
//! checks the resulting catalog.

use ffb_av::probe::{
    assemble_catalog, parse_codecs, parse_media_info, parse_muxer_details, parse_muxer_listing,
    sequence_muxers,
};
use ffb_core::{Catalog, StreamKind};
use std::path::Path;

const CODECS: &str = "\
Codecs:
 D..... = Decoding supported
 .E.... = Encoding supported
 ..V... = Video codec
 ..A... = Audio codec
 ..S... = Subtitle codec
 ...I.. = Intra frame-only codec
 ....L. = Lossy compression
 .....S = Lossless compression
 -------
 DEV.L. gif                  CompuServe GIF (Graphics Interchange Format)
 DEV.LS h264                 H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10 (decoders: h264) (encoders: libx264)
 DEV.L. mpeg4                MPEG-4 part 2
 DEVI.S png                  PNG (Portable Network Graphics) image
 DEVIL. mjpeg                Motion JPEG
 D.V.L. vp6                  On2 VP6
 DEA.L. aac                  AAC (Advanced Audio Coding) (decoders: aac aac_fixed)
 DEA.L. mp3                  MP3 (MPEG audio layer 3) (decoders: mp3float mp3) (encoders: libmp3lame)
 DEA..S flac                 FLAC (Free Lossless Audio Codec)
 D.A.L. wmav1                Windows Media Audio 1
 DES... subrip               SubRip subtitle
";

const FORMATS: &str = "\
File formats:
 D. = Demuxing supported
 .E = Muxing supported
 --
  E avi             AVI (Audio Video Interleaved)
 DE gif             CompuServe Graphics Interchange Format (GIF)
 DE image2          image2 sequence
 D  mov,mp4,m4a,3gp,3g2,mj2 QuickTime / MOV
  E mp4             MP4 (MPEG-4 Part 14)
 DE mp3             MP3 (MPEG audio layer 3)
  E null            raw null video
";

fn muxer_help(name: &str) -> &'static str {
    match name {
        "avi" => "Muxer avi [AVI (Audio Video Interleaved)]:\n    Common extensions: avi.\n    Mime type: video/x-msvideo.\n    Default video codec: mpeg4.\n    Default audio codec: mp3.\n",
        "gif" => "Muxer gif [CompuServe Graphics Interchange Format (GIF)]:\n    Common extensions: gif.\n    Default video codec: gif.\n    Default audio codec: none.\n",
        "mp4" => "Muxer mp4 [MP4 (MPEG-4 Part 14)]:\n    Common extensions: mp4.\n    Default video codec: h264.\n    Default audio codec: aac.\n",
        "mp3" => "Muxer mp3 [MP3 (MPEG audio layer 3)]:\n    Common extensions: mp3.\n    Default video codec: png.\n    Default audio codec: mp3.\n",
        "null" => "Muxer null [raw null video]:\n    Default video codec: wrapped_avframe.\n    Default audio codec: pcm_s16le.\n",
        _ => "",
    }
}

fn catalog() -> Catalog {
    let codecs = parse_codecs(CODECS);
    let mut muxers = parse_muxer_listing(FORMATS);
    for muxer in &mut muxers {
        parse_muxer_details(muxer_help(&muxer.name)).apply(muxer, &codecs);
    }
    muxers.extend(sequence_muxers(&codecs));
    assemble_catalog(codecs, muxers)
}

#[test]
fn buckets_follow_first_match() {
    let catalog = catalog();
    let names = |codecs: &[ffb_core::Codec]| {
        codecs.iter().map(|c| c.name.clone()).collect::<Vec<_>>()
    };

    // Sorted by pretty name, copy first because "Copy" sorts before the rest.
    assert_eq!(
        names(catalog.video_encoders()),
        ["gif", "copy", "h264", "mjpeg", "mpeg4", "png"]
    );
    assert_eq!(names(catalog.audio_encoders()), ["aac", "copy", "flac", "mp3"]);
    assert_eq!(names(catalog.video_decoders()), ["vp6"]);
    assert_eq!(names(catalog.audio_decoders()), ["wmav1"]);
    assert_eq!(catalog.encoders().count(), 10);
}

#[test]
fn copy_codec_flags() {
    let catalog = catalog();
    let copy = catalog.video_encoder("copy").unwrap();
    assert!(copy.flags.lossy && copy.flags.lossless && copy.flags.intra_only);
    assert_eq!(catalog.audio_encoder("copy").unwrap().kind, StreamKind::Audio);
}

#[test]
fn muxers_with_resolved_defaults() {
    let catalog = catalog();

    assert!(catalog.muxer("image2").is_none());
    assert!(catalog.muxer("mov").is_none());

    let avi = catalog.muxer("avi").unwrap();
    assert_eq!(avi.default_video_codec.as_deref(), Some("mpeg4"));
    assert_eq!(avi.default_audio_codec.as_deref(), Some("mp3"));

    // "none" and unknown encoders do not resolve.
    let gif = catalog.muxer("gif").unwrap();
    assert!(gif.default_audio_codec.is_none());
    let null = catalog.muxer("null").unwrap();
    assert!(null.default_video_codec.is_none() && null.default_audio_codec.is_none());

    assert_eq!(
        catalog
            .muxer_default_codec("mp4", StreamKind::Video)
            .map(|c| c.name.as_str()),
        Some("h264")
    );
    assert!(catalog.muxer_default_codec("mp4", StreamKind::Subtitle).is_none());
}

#[test]
fn sequence_muxers_are_appended() {
    let catalog = catalog();

    let png = catalog.muxer("png").unwrap();
    assert!(png.is_sequence);
    assert_eq!(png.format_name(), "image2");
    assert_eq!(png.default_video_codec.as_deref(), Some("png"));

    // No tiff encoder in this listing.
    let tiff = catalog.muxer("tiff").unwrap();
    assert!(tiff.is_sequence);
    assert!(tiff.default_video_codec.is_none());
}

#[test]
fn muxers_sorted_by_first_extension() {
    let catalog = catalog();
    let muxers = catalog.muxers();

    // Extension-less muxers come first.
    assert_eq!(muxers[0].name, "null");

    let firsts: Vec<&str> = muxers[1..]
        .iter()
        .map(|m| m.extensions[0].as_str())
        .collect();
    let mut sorted = firsts.clone();
    sorted.sort_unstable();
    assert_eq!(firsts, sorted);

    assert_eq!(muxers[1].name, "avi");
    assert_eq!(muxers[2].name, "bmp");
}

#[test]
fn media_info_resolves_against_catalog() {
    let text = "\
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'clip.mp4':
  Metadata:
    major_brand     : isom
  Duration: 00:01:30.50, start: 0.000000, bitrate: 2500 kb/s
  Stream #0:0[0x1](und): Video: h264 (High) (avc1 / 0x31637661), yuv420p(progressive), 1920x1080 [SAR 1:1 DAR 16:9], 2300 kb/s, 25 fps, 25 tbr, 12800 tbn (default)
  Stream #0:1[0x2](und): Audio: aac (LC) (mp4a / 0x6134706D), 48000 Hz, stereo, fltp, 192 kb/s (default)
At least one output file must be specified
";
    let media = parse_media_info(text, Path::new("clip.mp4"), &catalog()).unwrap();

    assert_eq!(media.muxer.as_deref(), Some("mp4"));
    assert_eq!(media.duration_secs, 90.5);
    assert_eq!(media.video.codec.as_deref(), Some("h264"));
    assert_eq!((media.video.width, media.video.height), (1920, 1080));
    assert_eq!(media.video.framerate, 25.0);
    assert_eq!(media.video.bitrate, 2_300_000);
    assert_eq!(media.audio.codec.as_deref(), Some("aac"));
    assert_eq!(media.audio.sampling_rate, 48_000);
    assert_eq!(media.audio.bitrate, 192_000);
    assert_eq!(media.total_frames(), 2262);
}
