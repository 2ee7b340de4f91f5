//! One participant's recording: decoded metadata, continuous signal and
//! the events reconstructed from its marker stream.
//!
//! # Loading
//! 1. Parse the participant id from the file name (`EEG3.json` → 3).
//! 2. Read the container and unwrap the `EEG` variable to its struct record.
//! 3. Apply the field layout ([`crate::container::layout`]).
//! 4. Decode marker records into [`RawMarker`]s.
//! 5. Reconstruct events against the shared [`StimulusCorpus`].
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::{EpochConfig, StudyConfig};
use crate::container::{decode_recording, nan_eq, to_vector, Container, DecodedRecording, MatValue};
use crate::epoch::Epoch;
use crate::error::{DecodeError, EpochError, ParseError};
use crate::event::{decode_markers, Event, EventReconstructor, EventSet, EventSubset, RawMarker};
use crate::stimuli::StimulusCorpus;

/// Name of the recording variable inside a recording container.
pub const RECORDING_VARIABLE: &str = "EEG";

/// Participant id from a recording file name.
///
/// The file stem (name without extension) must be `prefix` followed by
/// decimal digits only: `EEG12.json` → 12. Ids are 1-based.
pub fn participant_id_from_path(path: &Path, prefix: &str) -> Result<u32, ParseError> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let id = stem.strip_prefix(prefix).ok_or_else(|| ParseError::MissingPrefix {
        name: stem.clone(),
        prefix: prefix.to_string(),
    })?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::NotNumeric { name: stem.clone(), id: id.to_string() });
    }
    let n: u32 = id
        .parse()
        .map_err(|_| ParseError::NotNumeric { name: stem.clone(), id: id.to_string() })?;
    if n == 0 {
        return Err(ParseError::ZeroId(stem));
    }
    Ok(n)
}

/// A loaded recording.
///
/// Equality compares float fields with NaN equal to NaN, since missing
/// samples are stored as NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    /// 1-based participant id.
    pub participant_id: u32,
    /// File this was read from.
    pub path:           PathBuf,
    pub channel_count:  usize,
    pub sample_count:   usize,
    /// Hz.
    pub sample_rate:    f64,
    pub xmin:           f64,
    pub xmax:           f64,
    pub times:          Vec<f64>,
    /// `[channel_count, sample_count]`.
    pub signal:         Array2<f64>,
    pub channel_labels: Vec<String>,
    pub channel_info:   MatValue,
    pub raw_markers:    Vec<RawMarker>,
    pub events:         EventSet,
}

impl Recording {
    /// Read and decode a recording file.
    pub fn load<P: AsRef<Path>>(path: P, corpus: &StimulusCorpus, cfg: &StudyConfig) -> Result<Self> {
        let path = path.as_ref();
        let participant_id = participant_id_from_path(path, &cfg.recording_prefix)?;
        let container = Container::read(path)?;
        Self::from_container(participant_id, path, &container, corpus, cfg.first_word_offset)
            .with_context(|| format!("recording {}", path.display()))
    }

    /// Decode a recording container already in memory.
    pub fn from_container(
        participant_id: u32,
        path: &Path,
        container: &Container,
        corpus: &StimulusCorpus,
        first_word_offset: i64,
    ) -> Result<Self> {
        let record = to_vector(container.get(RECORDING_VARIABLE)?)?
            .first()
            .ok_or(DecodeError::Empty)?;
        let decoded = decode_recording(record)?;
        Self::from_decoded(participant_id, path, decoded, corpus, first_word_offset)
    }

    /// Build from decoded metadata: decode markers, reconstruct events.
    pub fn from_decoded(
        participant_id: u32,
        path: &Path,
        decoded: DecodedRecording,
        corpus: &StimulusCorpus,
        first_word_offset: i64,
    ) -> Result<Self> {
        let raw_markers = decode_markers(&decoded.raw_markers).context("marker stream")?;
        let participant_index = participant_id
            .checked_sub(1)
            .ok_or_else(|| ParseError::ZeroId(path.display().to_string()))?
            as usize;
        let events = EventReconstructor::new(corpus, participant_index)
            .with_first_word_offset(first_word_offset)
            .reconstruct(&raw_markers)?;

        let recording = Recording {
            participant_id,
            path: path.to_path_buf(),
            channel_count:  decoded.channel_count,
            sample_count:   decoded.sample_count,
            sample_rate:    decoded.sample_rate,
            xmin:           decoded.xmin,
            xmax:           decoded.xmax,
            times:          decoded.times,
            signal:         decoded.signal,
            channel_labels: decoded.channel_labels,
            channel_info:   decoded.channel_info,
            raw_markers,
            events,
        };
        info!(
            "{recording} | {} ch × {} samples @ {} Hz",
            recording.channel_count, recording.sample_count, recording.sample_rate
        );
        Ok(recording)
    }

    /// 0-based index into the corpus flag tables.
    ///
    /// A loaded recording always has a non-zero id; `None` only for a
    /// hand-built one with id 0.
    #[inline]
    pub fn participant_index(&self) -> Option<usize> {
        self.participant_id.checked_sub(1).map(|i| i as usize)
    }

    /// Total duration in seconds.
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.sample_count as f64 / self.sample_rate
    }

    /// First sample index where channel 0 is not NaN.
    pub fn first_finite_sample(&self) -> Option<usize> {
        self.signal.rows().into_iter().next()?.iter().position(|v| !v.is_nan())
    }

    /// Epoch around one event of this recording.
    pub fn epoch(&self, event: &Event, cfg: &EpochConfig) -> Result<Epoch<'_>, EpochError> {
        Epoch::new(self.signal.view(), event.sample_point, self.sample_rate, cfg)
    }

    /// Epochs for one event subset, in stream order.
    pub fn epochs<'r>(
        &'r self,
        subset: EventSubset,
        cfg: &'r EpochConfig,
    ) -> impl Iterator<Item = (&'r Event, Result<Epoch<'r>, EpochError>)> + 'r {
        self.events.subset(subset).map(move |e| (e, self.epoch(e, cfg)))
    }

    pub fn epochs_non_artefact<'r>(
        &'r self,
        cfg: &'r EpochConfig,
    ) -> impl Iterator<Item = (&'r Event, Result<Epoch<'r>, EpochError>)> + 'r {
        self.epochs(EventSubset::NonArtefact, cfg)
    }

    pub fn epochs_non_reject<'r>(
        &'r self,
        cfg: &'r EpochConfig,
    ) -> impl Iterator<Item = (&'r Event, Result<Epoch<'r>, EpochError>)> + 'r {
        self.epochs(EventSubset::NonReject, cfg)
    }
}

impl PartialEq for Recording {
    fn eq(&self, other: &Self) -> bool {
        self.participant_id == other.participant_id
            && self.path == other.path
            && self.channel_count == other.channel_count
            && self.sample_count == other.sample_count
            && nan_eq(self.sample_rate, other.sample_rate)
            && nan_eq(self.xmin, other.xmin)
            && nan_eq(self.xmax, other.xmax)
            && self.times.len() == other.times.len()
            && self.times.iter().zip(&other.times).all(|(a, b)| nan_eq(*a, *b))
            && self.signal.dim() == other.signal.dim()
            && self.signal.iter().zip(other.signal.iter()).all(|(a, b)| nan_eq(*a, *b))
            && self.channel_labels == other.channel_labels
            && self.channel_info == other.channel_info
            && self.raw_markers == other.raw_markers
            && self.events == other.events
    }
}

impl fmt::Display for Recording {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "participant: {} | events: {}", self.participant_id, self.events.len())
    }
}
