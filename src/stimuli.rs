//! Stimulus corpus: the sentences shown word by word, and the
//! per-(sentence, word, participant) artefact / reject annotations.
//!
//! Container layout consumed by [`StimulusCorpus::from_container`]:
//!
//! ```text
//! sentences[i][0][0]      → list of word items, each unwrapped to text
//! artefact[s][0][w][p]    → flag code, 1 = flagged
//! reject[s][0][w][p]      → flag code, 1 = flagged
//!              ^
//!              structural axis of the container, dropped on load
//! ```
//!
//! Sentence and word numbers are 1-based and contiguous.
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::container::{to_number, to_text, Container, MatValue};
use crate::error::{CorpusError, DecodeError};

/// Punctuation that marks a word as "special".
pub const SPECIAL_CHARACTERS: [char; 4] = ['.', '\'', ',', '-'];

// ── Word ─────────────────────────────────────────────────────────────────

/// One presented word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// 1-based position in its sentence.
    pub number: u32,
    pub text:   String,
    pub is_first: bool,
    pub is_last:  bool,
    /// Members of [`SPECIAL_CHARACTERS`] found in the word, in set order.
    pub special_characters: Vec<char>,
    pub has_special_character: bool,
    pub has_uppercase: bool,
    /// Neither uppercase nor special characters.
    pub is_clean_lowercase_ascii: bool,
}

impl Word {
    pub fn new(number: u32, text: &str, is_first: bool, is_last: bool) -> Self {
        let special_characters: Vec<char> = SPECIAL_CHARACTERS
            .iter()
            .copied()
            .filter(|c| text.contains(*c))
            .collect();
        let has_special_character = !special_characters.is_empty();
        let has_uppercase = text.chars().any(char::is_uppercase);
        Word {
            number,
            text: text.to_string(),
            is_first,
            is_last,
            special_characters,
            has_special_character,
            has_uppercase,
            is_clean_lowercase_ascii: !has_uppercase && !has_special_character,
        }
    }

    /// 0-based position in its sentence.
    #[inline]
    pub fn index(&self) -> usize {
        self.number as usize - 1
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "number: {:<3} | {:<12}", self.number, self.text)?;
        if self.has_special_character    { write!(f, " | special")?; }
        if self.has_uppercase            { write!(f, " | uppercase")?; }
        if self.is_clean_lowercase_ascii { write!(f, " | ok")?; }
        if self.is_first                 { write!(f, " | first word")?; }
        if self.is_last                  { write!(f, " | last word")?; }
        Ok(())
    }
}

// ── Sentence ─────────────────────────────────────────────────────────────

/// One sentence; words are stored in presentation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    /// 1-based.
    pub number: u32,
    pub words:  Vec<Word>,
    /// Words joined by single spaces.
    pub text:   String,
}

impl Sentence {
    pub fn new<S: AsRef<str>>(number: u32, words: &[S]) -> Self {
        let n = words.len();
        let words: Vec<Word> = words
            .iter()
            .enumerate()
            .map(|(i, w)| Word::new(i as u32 + 1, w.as_ref(), i == 0, i + 1 == n))
            .collect();
        let text = words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Sentence { number, words, text }
    }

    /// 0-based.
    #[inline]
    pub fn index(&self) -> usize {
        self.number as usize - 1
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Look up a word by its 1-based number.
    pub fn word(&self, number: i64) -> Result<&Word, CorpusError> {
        usize::try_from(number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.words.get(i))
            .ok_or(CorpusError::WordOutOfRange { sentence: self.number, word: number })
    }

    /// Numbers of words containing special characters.
    pub fn special_word_numbers(&self) -> Vec<u32> {
        self.words
            .iter()
            .filter(|w| w.has_special_character)
            .map(|w| w.number)
            .collect()
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "number: {} | {} | {}", self.number, self.text, self.word_count())
    }
}

// ── Flag tables ──────────────────────────────────────────────────────────

/// Boolean annotations indexed `[sentence_index, word_index, participant_index]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagTable {
    flags: Array3<bool>,
}

impl FlagTable {
    pub fn new(flags: Array3<bool>) -> Self {
        FlagTable { flags }
    }

    /// All-false table of the given `(sentences, words, participants)` shape.
    pub fn cleared(shape: (usize, usize, usize)) -> Self {
        FlagTable { flags: Array3::from_elem(shape, false) }
    }

    pub fn set(&mut self, sentence_index: usize, word_index: usize, participant_index: usize, value: bool) {
        self.flags[[sentence_index, word_index, participant_index]] = value;
    }

    pub fn get(&self, sentence_index: usize, word_index: usize, participant_index: usize) -> Option<bool> {
        self.flags.get([sentence_index, word_index, participant_index]).copied()
    }

    /// `(sentences, words, participants)`.
    pub fn dim(&self) -> (usize, usize, usize) {
        self.flags.dim()
    }

    /// Parse a `[S][1][W][P]` container array of codes; code `1` is true.
    pub fn from_value(value: &MatValue) -> Result<Self, DecodeError> {
        let MatValue::Array(sentences) = value else {
            return Err(DecodeError::NotAVector { found: value.kind() });
        };
        let mut rows: Vec<Vec<Vec<bool>>> = Vec::with_capacity(sentences.len());
        for s in sentences {
            // Structural axis: exactly one element wraps the word × participant block.
            let block = s.first().ok_or(DecodeError::Empty)?;
            let MatValue::Array(words) = block else {
                return Err(DecodeError::NotAMatrix { found: block.kind() });
            };
            let mut w_rows = Vec::with_capacity(words.len());
            for w in words {
                let MatValue::Array(codes) = w else {
                    return Err(DecodeError::NotAVector { found: w.kind() });
                };
                let flags = codes
                    .iter()
                    .map(|c| to_number(c).map(|v| v == 1.0))
                    .collect::<Result<Vec<_>, _>>()?;
                w_rows.push(flags);
            }
            rows.push(w_rows);
        }

        let n_s = rows.len();
        let n_w = rows.first().map_or(0, Vec::len);
        let n_p = rows.first().and_then(|r| r.first()).map_or(0, Vec::len);
        let mut flags = Array3::from_elem((n_s, n_w, n_p), false);
        for (si, w_rows) in rows.iter().enumerate() {
            if w_rows.len() != n_w {
                return Err(DecodeError::Ragged { row: si, got: w_rows.len(), expected: n_w });
            }
            for (wi, p_row) in w_rows.iter().enumerate() {
                if p_row.len() != n_p {
                    return Err(DecodeError::Ragged { row: wi, got: p_row.len(), expected: n_p });
                }
                for (pi, &v) in p_row.iter().enumerate() {
                    flags[[si, wi, pi]] = v;
                }
            }
        }
        Ok(FlagTable { flags })
    }
}

/// Artefact / reject pair for one (sentence, word, participant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityFlags {
    pub artefact: bool,
    pub reject:   bool,
}

// ── Corpus ───────────────────────────────────────────────────────────────

/// All sentences of the experiment plus the quality annotations.
///
/// Read-only once built; share it by reference across recordings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusCorpus {
    pub sentences: Vec<Sentence>,
    pub artefact:  FlagTable,
    pub reject:    FlagTable,
}

impl StimulusCorpus {
    /// Build from word lists in presentation order; sentence `i` gets number `i + 1`.
    pub fn new<S: AsRef<str>>(word_lists: &[Vec<S>], artefact: FlagTable, reject: FlagTable) -> Self {
        let sentences = word_lists
            .iter()
            .enumerate()
            .map(|(i, words)| Sentence::new(i as u32 + 1, words))
            .collect();
        StimulusCorpus { sentences, artefact, reject }
    }

    /// Read the corpus container file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let container = Container::read(path)?;
        let corpus = Self::from_container(&container)
            .with_context(|| format!("stimulus corpus {}", path.display()))?;
        info!("{corpus} ({})", path.display());
        Ok(corpus)
    }

    /// Build from the `sentences`, `artefact` and `reject` variables.
    pub fn from_container(container: &Container) -> Result<Self, CorpusError> {
        let raw = container.get("sentences")?;
        let MatValue::Array(entries) = raw else {
            return Err(DecodeError::NotAVector { found: raw.kind() }.into());
        };
        let mut word_lists = Vec::with_capacity(entries.len());
        for entry in entries {
            let items = entry
                .first()
                .and_then(MatValue::first)
                .ok_or(DecodeError::Empty)?;
            let MatValue::Array(items) = items else {
                return Err(DecodeError::NotAVector { found: items.kind() }.into());
            };
            let words = items
                .iter()
                .map(|item| to_text(item).map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?;
            word_lists.push(words);
        }

        let artefact = FlagTable::from_value(container.get("artefact")?)?;
        let reject   = FlagTable::from_value(container.get("reject")?)?;
        Ok(Self::new(&word_lists, artefact, reject))
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    pub fn word_count(&self) -> usize {
        self.sentences.iter().map(Sentence::word_count).sum()
    }

    /// Look up a sentence by its 1-based number.
    pub fn sentence(&self, number: i64) -> Result<&Sentence, CorpusError> {
        usize::try_from(number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.sentences.get(i))
            .ok_or(CorpusError::SentenceOutOfRange(number))
    }

    /// Quality flags for a 1-based sentence / word number and a 0-based participant.
    pub fn flags_for(
        &self,
        sentence_number: u32,
        word_number: u32,
        participant_index: usize,
    ) -> Result<QualityFlags, CorpusError> {
        let out_of_range = || CorpusError::FlagOutOfRange {
            sentence: sentence_number,
            word: word_number,
            participant: participant_index,
        };
        let s = (sentence_number as usize).checked_sub(1).ok_or_else(out_of_range)?;
        let w = (word_number as usize).checked_sub(1).ok_or_else(out_of_range)?;
        let artefact = self.artefact.get(s, w, participant_index).ok_or_else(out_of_range)?;
        let reject   = self.reject.get(s, w, participant_index).ok_or_else(out_of_range)?;
        Ok(QualityFlags { artefact, reject })
    }
}

impl fmt::Display for StimulusCorpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stimuli | sentences: {} | words: {}",
            self.sentence_count(),
            self.word_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_character_classes() {
        let w = Word::new(1, "The", true, false);
        assert!(w.has_uppercase);
        assert!(!w.has_special_character);
        assert!(!w.is_clean_lowercase_ascii);

        let w = Word::new(2, "cat's,", false, true);
        assert_eq!(w.special_characters, vec!['\'', ',']);
        assert!(!w.is_clean_lowercase_ascii);

        let w = Word::new(3, "ran", false, false);
        assert!(w.is_clean_lowercase_ascii);
        assert_eq!(w.char_count(), 3);
        assert_eq!(w.index(), 2);
    }

    #[test]
    fn clean_iff_no_upper_and_no_special() {
        for text in ["a", "B", "c-d", "e.", "Ff'", "ghi", "ÉTÉ", "well,"] {
            let w = Word::new(1, text, true, true);
            assert_eq!(
                w.is_clean_lowercase_ascii,
                !w.has_uppercase && !w.has_special_character,
                "{text}"
            );
        }
    }

    #[test]
    fn sentence_numbers_words_and_joins_text() {
        let s = Sentence::new(4, &["The", "old-fashioned", "cat"]);
        assert_eq!(s.index(), 3);
        assert_eq!(s.text, "The old-fashioned cat");
        assert!(s.words[0].is_first && !s.words[0].is_last);
        assert!(s.words[2].is_last);
        assert_eq!(s.word(2).unwrap().text, "old-fashioned");
        assert_eq!(s.special_word_numbers(), vec![2]);
        assert_eq!(s.word(0), Err(CorpusError::WordOutOfRange { sentence: 4, word: 0 }));
        assert!(s.word(4).is_err());
    }

    #[test]
    fn corpus_lookup_range() {
        let corpus = StimulusCorpus::new(
            &[vec!["The", "cat"], vec!["It", "ran"]],
            FlagTable::cleared((2, 2, 1)),
            FlagTable::cleared((2, 2, 1)),
        );
        assert_eq!(corpus.sentence_count(), 2);
        assert_eq!(corpus.word_count(), 4);
        assert_eq!(corpus.sentence(2).unwrap().text, "It ran");
        assert_eq!(corpus.sentence(3), Err(CorpusError::SentenceOutOfRange(3)));
        assert_eq!(corpus.sentence(-1), Err(CorpusError::SentenceOutOfRange(-1)));
    }

    #[test]
    fn flags_convert_code_one_only() {
        let v = |x: f64| MatValue::Array(vec![MatValue::Number(x)]);
        // [S=1][1][W=2][P=2]
        let table = MatValue::Array(vec![MatValue::Array(vec![MatValue::Array(vec![
            MatValue::Array(vec![v(1.0), v(0.0)]),
            MatValue::Array(vec![v(2.0), v(1.0)]),
        ])])]);
        let t = FlagTable::from_value(&table).unwrap();
        assert_eq!(t.dim(), (1, 2, 2));
        assert_eq!(t.get(0, 0, 0), Some(true));
        assert_eq!(t.get(0, 0, 1), Some(false));
        assert_eq!(t.get(0, 1, 0), Some(false));
        assert_eq!(t.get(0, 1, 1), Some(true));
        assert_eq!(t.get(1, 0, 0), None);
    }

    #[test]
    fn flags_for_reports_out_of_range() {
        let mut artefact = FlagTable::cleared((1, 2, 1));
        artefact.set(0, 1, 0, true);
        let corpus = StimulusCorpus::new(&[vec!["a", "b"]], artefact, FlagTable::cleared((1, 2, 1)));
        assert_eq!(
            corpus.flags_for(1, 2, 0).unwrap(),
            QualityFlags { artefact: true, reject: false },
        );
        assert_eq!(
            corpus.flags_for(1, 2, 1),
            Err(CorpusError::FlagOutOfRange { sentence: 1, word: 2, participant: 1 }),
        );
        assert!(corpus.flags_for(0, 1, 0).is_err());
    }
}
