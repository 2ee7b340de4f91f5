//! All recordings of the experiment against one shared corpus.
//!
//! A recording that fails to parse or decode is logged and skipped; the
//! rest of the batch still loads. The whole study can be written to a
//! binary snapshot (bincode) and read back without decoding the
//! containers again.
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::StudyConfig;
use crate::event::Event;
use crate::recording::Recording;
use crate::stimuli::StimulusCorpus;

/// Position of an event inside a [`Study`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRef {
    pub recording: usize,
    pub event:     usize,
}

/// A file left out of the study and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path:  PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub corpus:     StimulusCorpus,
    /// Ordered by file name.
    pub recordings: Vec<Recording>,
    pub non_artefact_events: Vec<EventRef>,
    pub non_reject_events:   Vec<EventRef>,
    pub skipped:    Vec<SkippedFile>,
}

/// Recording files in `cfg.data_dir` matching prefix and suffix, sorted.
pub fn recording_files(cfg: &StudyConfig) -> Result<Vec<PathBuf>> {
    let dir = &cfg.data_dir;
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        if name.starts_with(&cfg.recording_prefix) && name.ends_with(&cfg.recording_suffix) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

impl Study {
    /// Load the corpus and every recording under `cfg.data_dir`.
    ///
    /// Fails only when the corpus or the directory cannot be read.
    pub fn load(cfg: &StudyConfig) -> Result<Self> {
        let corpus = StimulusCorpus::load(cfg.corpus_path())?;
        let files = recording_files(cfg)?;
        Ok(Self::load_files(corpus, &files, cfg))
    }

    /// Load the given recording files against `corpus`, skipping failures.
    pub fn load_files(corpus: StimulusCorpus, files: &[PathBuf], cfg: &StudyConfig) -> Self {
        let mut recordings = Vec::with_capacity(files.len());
        let mut skipped = Vec::new();
        for path in files {
            match Recording::load(path, &corpus, cfg) {
                Ok(r) => recordings.push(r),
                Err(e) => {
                    warn!("skipping {}: {e:#}", path.display());
                    skipped.push(SkippedFile { path: path.clone(), error: format!("{e:#}") });
                }
            }
        }
        let study = Self::from_recordings(corpus, recordings, skipped);
        info!("{study}");
        study
    }

    /// Assemble a study and its cross-recording event subsets.
    pub fn from_recordings(
        corpus: StimulusCorpus,
        recordings: Vec<Recording>,
        skipped: Vec<SkippedFile>,
    ) -> Self {
        let mut non_artefact_events = Vec::new();
        let mut non_reject_events = Vec::new();
        for (r, rec) in recordings.iter().enumerate() {
            non_artefact_events.extend(
                rec.events.non_artefact.iter().map(|&event| EventRef { recording: r, event }),
            );
            non_reject_events.extend(
                rec.events.non_reject.iter().map(|&event| EventRef { recording: r, event }),
            );
        }
        Study { corpus, recordings, non_artefact_events, non_reject_events, skipped }
    }

    /// Resolve an [`EventRef`].
    pub fn event(&self, r: EventRef) -> Option<(&Recording, &Event)> {
        let rec = self.recordings.get(r.recording)?;
        Some((rec, rec.events.events.get(r.event)?))
    }

    pub fn recording(&self, participant_id: u32) -> Option<&Recording> {
        self.recordings.iter().find(|r| r.participant_id == participant_id)
    }

    /// Write a snapshot of the full study.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, self)
            .with_context(|| format!("write snapshot {}", path.display()))?;
        writer.flush()?;
        Ok(())
    }

    /// Read a snapshot written by [`Study::save`].
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let study = bincode::deserialize_from(BufReader::new(file))
            .with_context(|| format!("read snapshot {}", path.display()))?;
        Ok(study)
    }
}

impl fmt::Display for Study {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Participants: {} | non-artefact events: {} | non-reject events: {}",
            self.recordings.len(),
            self.non_artefact_events.len(),
            self.non_reject_events.len(),
        )?;
        if !self.skipped.is_empty() {
            write!(f, " | skipped files: {}", self.skipped.len())?;
        }
        Ok(())
    }
}
