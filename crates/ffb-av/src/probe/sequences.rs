//! Still-image sequence muxers.
//!
//! The encoder exposes every image format through the single `image2`
//! muxer, so the individual sequence formats are described here rather
//! than discovered.

use ffb_core::{CodecBuckets, Muxer};

/// `(name, pretty name, extensions)`; the default video codec shares the name.
const SEQUENCES: &[(&str, &str, &[&str])] = &[
    ("bmp", "Bitmap Sequence", &["bmp"]),
    ("dpx", "DPX Sequence", &["dpx"]),
    ("mjpeg", "JPEG Sequence", &["jpg", "jpeg"]),
    ("ljpeg", "Lossless JPEG Sequence", &["ljpg"]),
    ("pam", "PAM (Portable AnyMap) Sequence", &["pam"]),
    ("pbm", "PBM (Portable BitMap) Sequence", &["pbm"]),
    ("pcx", "PC Paintbrush PCX Sequence", &["pcx"]),
    ("pgm", "PGM (Portable GrayMap) Sequence", &["pgm"]),
    ("pgmyuv", "PGMYUV (Portable GrayMap YUV) Sequence", &["pgmyuv"]),
    ("png", "PNG (Portable Network Graphics) Sequence", &["png"]),
    ("ppm", "PPM (Portable PixelMap) Sequence", &["ppm"]),
    ("sgi", "SGI Sequence", &["sgi"]),
    ("targa", "TARGA (Truevision Targa) Sequence", &["tga"]),
    ("tiff", "TIFF Sequence", &["tif", "tiff"]),
    ("jpeg2000", "JPEG 2000 Sequence", &["jp2", "j2k"]),
    ("xwd", "XWD (X Window Dump) Sequence", &["xwd"]),
    ("xbm", "XBM (X BitMap) Sequence", &["xbm"]),
];

/// The static sequence muxers, with default codecs resolved against `codecs`.
pub fn sequence_muxers(codecs: &CodecBuckets) -> Vec<Muxer> {
    SEQUENCES
        .iter()
        .map(|&(name, pretty, extensions)| {
            let resolved = codecs.video_encoders.iter().any(|c| c.name == name);
            Muxer {
                name: name.to_string(),
                pretty_name: pretty.to_string(),
                extensions: extensions.iter().map(|e| e.to_string()).collect(),
                is_sequence: true,
                default_video_codec: resolved.then(|| name.to_string()),
                default_audio_codec: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffb_core::{Codec, CodecFlags, StreamKind};

    #[test]
    fn all_sequences_flagged() {
        let muxers = sequence_muxers(&CodecBuckets::default());
        assert_eq!(muxers.len(), 17);
        assert!(muxers.iter().all(|m| m.is_sequence && !m.extensions.is_empty()));
        assert!(muxers.iter().all(|m| m.format_name() == "image2"));
    }

    #[test]
    fn default_codec_only_when_encoder_exists() {
        let codecs = CodecBuckets {
            video_encoders: vec![Codec::new(
                "png",
                "PNG (Portable Network Graphics) image",
                StreamKind::Video,
                CodecFlags {
                    encoder: true,
                    decoder: true,
                    lossless: true,
                    ..Default::default()
                },
            )],
            ..Default::default()
        };
        let muxers = sequence_muxers(&codecs);

        let png = muxers.iter().find(|m| m.name == "png").unwrap();
        assert_eq!(png.default_video_codec.as_deref(), Some("png"));
        let tiff = muxers.iter().find(|m| m.name == "tiff").unwrap();
        assert!(tiff.default_video_codec.is_none());
        assert_eq!(tiff.extensions, ["tif", "tiff"]);
    }
}
