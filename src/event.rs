//! Event reconstruction from the recording's marker stream.
//!
//! Each marker record carries `(code, latency, source id)`. Codes encode the
//! stimulus without a sentence id on every word:
//!
//! ```text
//! code > 50   first word of sentence (code − 50); word number 1
//! code ≤ 50   word number `code` of the current sentence
//!
//! stream    51   1   2   52   1
//! sentence   1   1   1    2   2
//! word       1   1   2    1   1
//! first      ✓            ✓
//! last               ✓             ← set when the next first word arrives
//! ```
//!
//! The current sentence is running state of one reconstruction pass. A
//! continuation code before any sentence start gives an invalid event.
//! The last event of the whole stream is never marked as a last word,
//! since no later first-word marker arrives for it.
use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::container::layout::{MARKER_CODE_FIELD, MARKER_LATENCY_FIELD, MARKER_SOURCE_FIELD};
use crate::container::{to_integer, MatValue};
use crate::error::{CorpusError, DecodeError};
use crate::stimuli::{Sentence, StimulusCorpus, Word};

/// Default code offset separating first-word markers from word numbers.
pub const FIRST_WORD_OFFSET: i64 = 50;

// ── Raw marker ───────────────────────────────────────────────────────────

/// One decoded element of the marker stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMarker {
    pub code:            i64,
    /// Sample index of the marker in the continuous signal.
    pub sample_latency:  usize,
    pub source_event_id: i64,
}

impl RawMarker {
    pub fn new(code: i64, sample_latency: usize, source_event_id: i64) -> Self {
        RawMarker { code, sample_latency, source_event_id }
    }

    /// Decode one marker struct record.
    pub fn from_value(value: &MatValue) -> Result<Self, DecodeError> {
        let get = |index: usize, name: &'static str| {
            value
                .field(index)
                .ok_or(DecodeError::MissingField { index, name })
                .and_then(to_integer)
        };
        let code            = get(MARKER_CODE_FIELD, "type")?;
        let latency         = get(MARKER_LATENCY_FIELD, "latency")?;
        let source_event_id = get(MARKER_SOURCE_FIELD, "urevent")?;
        let sample_latency = usize::try_from(latency).map_err(|_| DecodeError::Field {
            field: "latency",
            reason: format!("negative sample latency {latency}"),
        })?;
        Ok(RawMarker { code, sample_latency, source_event_id })
    }
}

/// Decode every marker record, failing on the first malformed one.
pub fn decode_markers(values: &[MatValue]) -> Result<Vec<RawMarker>, DecodeError> {
    values.iter().map(RawMarker::from_value).collect()
}

// ── Event ────────────────────────────────────────────────────────────────

/// Stimulus text copied from the corpus for a resolved event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolved {
    pub word_text:     String,
    pub sentence_text: String,
    pub is_clean_lowercase_ascii: bool,
}

/// The presentation of one word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub marker: RawMarker,
    /// `None` when no sentence had started yet.
    pub sentence_id: Option<i64>,
    pub word_number: i64,
    pub is_first_word_in_sentence: bool,
    /// Set after the fact by the following first-word event.
    pub is_last_word_in_sentence:  bool,
    pub sample_point: usize,
    /// Present only when sentence and word resolved against the corpus.
    pub resolved: Option<Resolved>,
    /// `None` for invalid events.
    pub is_artefact: Option<bool>,
    pub is_reject:   Option<bool>,
}

impl Event {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.resolved.is_some()
    }

    pub fn word_text(&self) -> Option<&str> {
        self.resolved.as_ref().map(|r| r.word_text.as_str())
    }

    pub fn sentence_text(&self) -> Option<&str> {
        self.resolved.as_ref().map(|r| r.sentence_text.as_str())
    }

    /// The corpus sentence and word this event resolved to.
    pub fn stimulus<'c>(&self, corpus: &'c StimulusCorpus) -> Option<(&'c Sentence, &'c Word)> {
        if !self.is_valid() {
            return None;
        }
        let sentence = corpus.sentence(self.sentence_id?).ok()?;
        let word = sentence.word(self.word_number).ok()?;
        Some((sentence, word))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(r) = &self.resolved else {
            return write!(f, "sentence loading error");
        };
        write!(f, "{:<2} {:<12}", self.word_number, r.word_text)?;
        match self.sentence_id {
            Some(id) => write!(f, "| {:<3} {}", id, r.sentence_text)?,
            None     => write!(f, "| -   {}", r.sentence_text)?,
        }
        if self.is_first_word_in_sentence { write!(f, " | first word")?; }
        if self.is_last_word_in_sentence  { write!(f, " | last word")?; }
        Ok(())
    }
}

// ── Event set ────────────────────────────────────────────────────────────

/// The two quality subsets of valid events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSubset {
    NonArtefact,
    NonReject,
}

/// All events of one recording, plus the two quality subsets.
///
/// Subsets hold positions into `events`, in stream order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSet {
    pub events: Vec<Event>,
    pub non_artefact: Vec<usize>,
    pub non_reject:   Vec<usize>,
}

impl EventSet {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn valid(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|e| e.is_valid())
    }

    pub fn non_artefact_events(&self) -> impl Iterator<Item = &Event> {
        self.non_artefact.iter().map(|&i| &self.events[i])
    }

    pub fn non_reject_events(&self) -> impl Iterator<Item = &Event> {
        self.non_reject.iter().map(|&i| &self.events[i])
    }

    /// Positions of one subset.
    pub fn subset_indices(&self, subset: EventSubset) -> &[usize] {
        match subset {
            EventSubset::NonArtefact => &self.non_artefact,
            EventSubset::NonReject   => &self.non_reject,
        }
    }

    pub fn subset(&self, subset: EventSubset) -> impl Iterator<Item = &Event> {
        self.subset_indices(subset).iter().map(|&i| &self.events[i])
    }
}

// ── Reconstruction ───────────────────────────────────────────────────────

/// Rebuilds events from a marker stream against a corpus.
#[derive(Debug, Clone, Copy)]
pub struct EventReconstructor<'c> {
    corpus: &'c StimulusCorpus,
    participant_index: usize,
    first_word_offset: i64,
}

impl<'c> EventReconstructor<'c> {
    pub fn new(corpus: &'c StimulusCorpus, participant_index: usize) -> Self {
        EventReconstructor { corpus, participant_index, first_word_offset: FIRST_WORD_OFFSET }
    }

    pub fn with_first_word_offset(mut self, offset: i64) -> Self {
        self.first_word_offset = offset;
        self
    }

    /// One event per marker, in stream order.
    ///
    /// Unresolvable sentence / word numbers give invalid events. A flag
    /// table without an entry for a resolved word is an error.
    pub fn reconstruct(&self, markers: &[RawMarker]) -> Result<EventSet, CorpusError> {
        let mut set = EventSet {
            events: Vec::with_capacity(markers.len()),
            ..EventSet::default()
        };
        let mut current_sentence: Option<i64> = None;

        for marker in markers {
            let is_first = marker.code - self.first_word_offset > 0;
            let word_number = if is_first {
                current_sentence = Some(marker.code - self.first_word_offset);
                1
            } else {
                marker.code
            };

            let mut event = Event {
                marker: *marker,
                sentence_id: current_sentence,
                word_number,
                is_first_word_in_sentence: is_first,
                is_last_word_in_sentence: false,
                sample_point: marker.sample_latency,
                resolved: None,
                is_artefact: None,
                is_reject: None,
            };
            self.resolve(&mut event)?;

            if is_first {
                if let Some(prev) = set.events.last_mut() {
                    prev.is_last_word_in_sentence = true;
                }
            }

            let index = set.events.len();
            if event.is_valid() {
                if event.is_artefact == Some(false) { set.non_artefact.push(index); }
                if event.is_reject   == Some(false) { set.non_reject.push(index); }
            }
            set.events.push(event);
        }

        let invalid = set.events.iter().filter(|e| !e.is_valid()).count();
        if invalid > 0 {
            warn!("participant index {}: {invalid} of {} events did not resolve",
                self.participant_index, set.len());
        }
        debug!(
            "participant index {}: {} events, {} non-artefact, {} non-reject",
            self.participant_index, set.len(), set.non_artefact.len(), set.non_reject.len(),
        );
        Ok(set)
    }

    fn resolve(&self, event: &mut Event) -> Result<(), CorpusError> {
        let Some(sentence_id) = event.sentence_id else { return Ok(()) };
        let Ok(sentence) = self.corpus.sentence(sentence_id) else { return Ok(()) };
        let Ok(word) = sentence.word(event.word_number) else { return Ok(()) };

        let flags = self.corpus.flags_for(sentence.number, word.number, self.participant_index)?;
        event.resolved = Some(Resolved {
            word_text: word.text.clone(),
            sentence_text: sentence.text.clone(),
            is_clean_lowercase_ascii: word.is_clean_lowercase_ascii,
        });
        event.is_artefact = Some(flags.artefact);
        event.is_reject   = Some(flags.reject);
        Ok(())
    }
}

/// Shorthand for `EventReconstructor::new(corpus, participant_index).reconstruct(markers)`.
pub fn reconstruct(
    markers: &[RawMarker],
    corpus: &StimulusCorpus,
    participant_index: usize,
) -> Result<EventSet, CorpusError> {
    EventReconstructor::new(corpus, participant_index).reconstruct(markers)
}
