//! Study configuration.
//!
//! [`StudyConfig`] holds where the files live and how they are named;
//! [`EpochConfig`] holds the window lengths of the reading paradigm. All
//! fields are `pub` and have defaults matching the experiment.

use std::path::PathBuf;

use crate::event::FIRST_WORD_OFFSET;

/// Epoch window lengths around each word onset.
///
/// ```
/// use sentence_erp::EpochConfig;
///
/// let cfg = EpochConfig::default();
/// assert_eq!(cfg.baseline_samples(1000.0), 100);
/// assert_eq!(cfg.trial_samples(1000.0), 700);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochConfig {
    /// Pre-stimulus baseline length in seconds.
    ///
    /// Default: `0.1` s.
    pub baseline_secs: f64,

    /// Post-stimulus trial length in seconds.
    ///
    /// Default: `0.7` s.
    pub trial_secs: f64,
}

impl Default for EpochConfig {
    fn default() -> Self {
        Self { baseline_secs: 0.1, trial_secs: 0.700 }
    }
}

impl EpochConfig {
    /// `floor(baseline_secs × sample_rate)`; 0 for non-finite or negative products.
    pub fn baseline_samples(&self, sample_rate: f64) -> usize {
        floor_samples(self.baseline_secs, sample_rate)
    }

    /// `floor(trial_secs × sample_rate)`; 0 for non-finite or negative products.
    pub fn trial_samples(&self, sample_rate: f64) -> usize {
        floor_samples(self.trial_secs, sample_rate)
    }
}

fn floor_samples(secs: f64, sample_rate: f64) -> usize {
    let n = (secs * sample_rate).floor();
    if n.is_finite() && n > 0.0 { n as usize } else { 0 }
}

/// Where the study lives on disk and how its files are named.
///
/// ```
/// use sentence_erp::StudyConfig;
///
/// let cfg = StudyConfig {
///     data_dir: "/data/reading".into(),
///     ..StudyConfig::default()
/// };
/// assert_eq!(cfg.corpus_path(), std::path::Path::new("/data/reading/stimuli_erp.json"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StudyConfig {
    /// Directory holding the corpus and recording files.
    ///
    /// Default: `../data`.
    pub data_dir: PathBuf,

    /// Corpus container file name inside `data_dir`.
    ///
    /// Default: `stimuli_erp.json`.
    pub corpus_file: String,

    /// Recording files are `<recording_prefix><id><recording_suffix>`.
    ///
    /// Default: `EEG`.
    pub recording_prefix: String,

    /// Default: `.json`.
    pub recording_suffix: String,

    /// Marker codes above this value start a new sentence.
    ///
    /// Default: `50`.
    pub first_word_offset: i64,

    pub epoch: EpochConfig,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("../data"),
            corpus_file: "stimuli_erp.json".to_string(),
            recording_prefix: "EEG".to_string(),
            recording_suffix: ".json".to_string(),
            first_word_offset: FIRST_WORD_OFFSET,
            epoch: EpochConfig::default(),
        }
    }
}

impl StudyConfig {
    pub fn corpus_path(&self) -> PathBuf {
        self.data_dir.join(&self.corpus_file)
    }
}
