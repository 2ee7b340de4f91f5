//! # sentence-erp: word-level events and epochs for sentence-reading EEG
//!
//! Participants read sentences word by word while EEG is recorded. Every
//! word onset leaves a marker in the recording; this crate turns those
//! markers back into word events tied to the stimulus corpus, attaches
//! per-participant quality flags and cuts baseline-corrected epochs around
//! each event.
//!
//! ## Pipeline overview
//!
//! ```text
//! stimuli_erp.json                EEG<id>.json  (one per participant)
//!   │                               │
//!   ├─ StimulusCorpus::load()       ├─ participant_id_from_path()   EEG3 → 3
//!   │    sentences, words,          ├─ container::decode_recording() field layout
//!   │    artefact / reject tables   ├─ decode_markers()             (code, latency, urevent)
//!   │                               │
//!   └──────────────┬────────────────┘
//!                  ├─ EventReconstructor   code > 50 → new sentence, else word number
//!                  │                       resolve text + quality flags
//!                  ├─ EventSet             all events, non-artefact, non-reject
//!                  ├─ Recording::epoch()   [sp − 0.1 s, sp + 0.7 s), baseline mean
//!                  └─ Study                all recordings, snapshot, epoch export
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use sentence_erp::{Study, StudyConfig};
//!
//! let cfg = StudyConfig { data_dir: "/data/reading".into(), ..StudyConfig::default() };
//! let study = Study::load(&cfg).unwrap();
//! println!("{study}");
//!
//! for rec in &study.recordings {
//!     for (event, epoch) in rec.epochs_non_artefact(&cfg.epoch) {
//!         let Ok(epoch) = epoch else { continue };
//!         println!("{event}: baseline mean {:.3}", epoch.baseline_mean());
//!     }
//! }
//! ```
//!
//! ## Reconstructing a marker stream directly
//!
//! ```
//! use sentence_erp::{reconstruct, FlagTable, RawMarker, StimulusCorpus};
//!
//! let corpus = StimulusCorpus::new(
//!     &[vec!["The", "cat", "sat"], vec!["It", "ran"]],
//!     FlagTable::cleared((2, 3, 1)),
//!     FlagTable::cleared((2, 3, 1)),
//! );
//! let markers: Vec<RawMarker> = [51, 2, 3, 52, 2]
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &code)| RawMarker::new(code, 1000 + 200 * i, i as i64 + 1))
//!     .collect();
//!
//! let set = reconstruct(&markers, &corpus, 0).unwrap();
//! assert_eq!(set.len(), 5);
//! assert!(set.events[2].is_last_word_in_sentence);
//! assert_eq!(set.events[4].word_text(), Some("ran"));
//! ```

pub mod config;
pub mod container;
pub mod epoch;
pub mod error;
pub mod event;
pub mod io;
pub mod recording;
pub mod stimuli;
pub mod study;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{EpochConfig, StudyConfig};

// container: generic values + recording layout
pub use container::{Container, DecodedRecording, MatValue};

// epoch
pub use epoch::{has_nan, stack_corrected, Epoch, EpochWindow};

// error
pub use error::{CorpusError, DecodeError, EpochError, ParseError};

// event
pub use event::{
    decode_markers, reconstruct,
    Event, EventReconstructor, EventSet, EventSubset, RawMarker, Resolved,
    FIRST_WORD_OFFSET,
};

// io: safetensors helpers
pub use io::{write_epochs, ExportSummary, StReader, StWriter};

// recording
pub use recording::{participant_id_from_path, Recording, RECORDING_VARIABLE};

// stimuli
pub use stimuli::{FlagTable, QualityFlags, Sentence, StimulusCorpus, Word, SPECIAL_CHARACTERS};

// study
pub use study::{recording_files, EventRef, SkippedFile, Study};
