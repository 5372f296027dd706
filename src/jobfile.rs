//! Job files: one queue item per file.
//!
//! TOML by default, JSON when the extension is `.json`:
//!
//! ```toml
//! [[inputs]]
//! path = "clip.mov"
//! duration_secs = 12.0
//! video = { framerate = 25.0 }
//!
//! [[outputs]]
//! path = "clip.mp4"
//! muxer = "mp4"
//! video = { codec = "h264", quality = 80 }
//! audio = { codec = "aac", bitrate = 192000 }
//!
//! [[presets]]
//! preset = "web.json"
//! path = "clip-web.mp4"
//! ```
//!
//! Each `presets` entry adds an output whose settings come from a preset
//! document.

use anyhow::{Context, Result};
use ffb_av::preset;
use ffb_core::{Catalog, MediaDescriptor, QueueItem};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFile {
    #[serde(default)]
    pub inputs: Vec<MediaDescriptor>,

    #[serde(default)]
    pub outputs: Vec<MediaDescriptor>,

    #[serde(default)]
    pub presets: Vec<PresetOutput>,
}

/// An output described by a preset file plus a destination.
#[derive(Debug, Clone, Deserialize)]
pub struct PresetOutput {
    pub preset: PathBuf,
    pub path: PathBuf,
}

impl JobFile {
    pub fn parse(content: &str, json: bool) -> Result<Self> {
        if json {
            serde_json::from_str(content).context("Invalid JSON job file")
        } else {
            toml::from_str(content).context("Invalid TOML job file")
        }
    }

    /// Turn the job into a queue item.
    ///
    /// Relative preset paths resolve against `base_dir`.
    pub fn into_item(self, base_dir: &Path, catalog: &Catalog) -> Result<QueueItem> {
        let mut outputs = self.outputs;
        for entry in self.presets {
            let preset_path = base_dir.join(&entry.preset);
            let json = std::fs::read_to_string(&preset_path)
                .with_context(|| format!("Failed to read preset: {:?}", preset_path))?;
            let mut media = preset::from_json(&json, catalog)
                .with_context(|| format!("Failed to load preset: {:?}", preset_path))?;
            media.path = entry.path;
            outputs.push(media);
        }

        if self.inputs.is_empty() {
            anyhow::bail!("Job has no inputs");
        }
        if outputs.is_empty() {
            anyhow::bail!("Job has no outputs");
        }
        Ok(QueueItem::new(self.inputs, outputs))
    }
}

/// Read a job file and build its queue item.
pub fn load_job(path: &Path, catalog: &Catalog) -> Result<QueueItem> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file: {:?}", path))?;
    let json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let job = JobFile::parse(&content, json)
        .with_context(|| format!("Failed to parse job file: {:?}", path))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    job.into_item(base_dir, catalog)
}
