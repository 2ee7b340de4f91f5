/// Shared helpers: synthetic corpus and recording containers.
use sentence_erp::{Container, MatValue};
use std::path::{Path, PathBuf};

/// Field count of a recording struct record.
const RECORDING_FIELDS: usize = 27;

fn num(v: f64) -> MatValue {
    MatValue::Number(v)
}

/// `[[v]]`, the way scalars arrive from the container export.
pub fn wrapped(v: MatValue) -> MatValue {
    MatValue::Array(vec![MatValue::Array(vec![v])])
}

/// `[[a, b, ..]]`.
fn row(items: Vec<MatValue>) -> MatValue {
    MatValue::Array(vec![MatValue::Array(items)])
}

#[allow(unused)]
pub fn reading_sentences() -> Vec<Vec<&'static str>> {
    vec![vec!["The", "cat"], vec!["It", "ran"]]
}

/// Corpus container with `[S][1][W][P]` flag tables.
///
/// `artefact` / `reject` list 1-based `(sentence, word)` and 0-based
/// participant triples that are flagged.
#[allow(unused)]
pub fn corpus_container(
    sentences: &[Vec<&str>],
    n_participants: usize,
    artefact: &[(usize, usize, usize)],
    reject: &[(usize, usize, usize)],
) -> Container {
    let n_words = sentences.iter().map(Vec::len).max().unwrap_or(0);

    let sentence_values = sentences
        .iter()
        .map(|words| {
            let items = words
                .iter()
                .map(|w| MatValue::Array(vec![MatValue::Text(w.to_string())]))
                .collect();
            MatValue::Array(vec![row(items)])
        })
        .collect();

    let table = |flagged: &[(usize, usize, usize)]| {
        MatValue::Array(
            (1..=sentences.len())
                .map(|s| {
                    let block = (1..=n_words)
                        .map(|w| {
                            MatValue::Array(
                                (0..n_participants)
                                    .map(|p| num(if flagged.contains(&(s, w, p)) { 1.0 } else { 0.0 }))
                                    .collect(),
                            )
                        })
                        .collect();
                    MatValue::Array(vec![MatValue::Array(block)])
                })
                .collect(),
        )
    };

    let mut c = Container::default();
    c.insert("sentences", MatValue::Array(sentence_values));
    c.insert("artefact", table(artefact));
    c.insert("reject", table(reject));
    c
}

/// Recording container: `n_ch × n_t` signal from `signal(c, t)` and
/// markers as `(code, sample latency)` pairs.
#[allow(unused)]
pub fn recording_container(
    n_ch: usize,
    n_t: usize,
    sample_rate: f64,
    markers: &[(i64, usize)],
    signal: impl Fn(usize, usize) -> f64,
) -> Container {
    let mut fields = vec![MatValue::Missing; RECORDING_FIELDS];
    fields[8]  = wrapped(num(n_ch as f64));
    fields[10] = wrapped(num(n_t as f64));
    fields[11] = wrapped(num(sample_rate));
    fields[12] = wrapped(num(0.0));
    fields[13] = wrapped(num((n_t.saturating_sub(1)) as f64 / sample_rate));
    fields[14] = row((0..n_t).map(|t| num(t as f64 * 1000.0 / sample_rate)).collect());
    fields[15] = MatValue::Array(
        (0..n_ch)
            .map(|c| MatValue::Array((0..n_t).map(|t| num(signal(c, t))).collect()))
            .collect(),
    );
    fields[21] = row(
        (0..n_ch)
            .map(|c| MatValue::record(vec![wrapped(MatValue::Text(format!("E{}", c + 1)))]))
            .collect(),
    );
    fields[23] = wrapped(MatValue::Text("synthetic".into()));
    fields[25] = row(
        markers
            .iter()
            .enumerate()
            .map(|(i, &(code, latency))| {
                MatValue::record(vec![
                    wrapped(num(code as f64)),
                    wrapped(num(latency as f64)),
                    wrapped(num(i as f64 + 1.0)),
                ])
            })
            .collect(),
    );

    let mut c = Container::default();
    c.insert("EEG", wrapped(MatValue::record(fields)));
    c
}

/// Write a container under `dir` and return its path.
#[allow(unused)]
pub fn write_container(dir: &Path, name: &str, container: &Container) -> PathBuf {
    let path = dir.join(name);
    container
        .write(&path)
        .unwrap_or_else(|e| panic!("writing fixture {}: {e:#}", path.display()));
    path
}
