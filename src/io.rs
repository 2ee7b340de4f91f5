//! Safetensors export of baseline-corrected epochs.
//!
//! One file per recording and subset:
//!
//! ```text
//! epoch_<i>      F64 [C, T]   baseline-corrected window of event i
//! sample_point   I32 [E]      onset sample of each exported event
//! sentence_id    I32 [E]
//! word_number    I32 [E]
//! n_epochs       I32 [1]
//! ```
//!
//! Events whose window leaves the signal are not exported; they are logged
//! and counted in [`ExportSummary`]. A NaN inside a window panics (see
//! [`crate::epoch`]).
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::EpochConfig;
use crate::event::EventSubset;
use crate::recording::Recording;

// ── Writer ──────────────────────────────────────────────────────────────────

/// Safetensors file writer for F64 and I32 tensors.
///
/// ```rust,no_run
/// use sentence_erp::io::StWriter;
/// let mut w = StWriter::new();
/// w.add_f64("signal", &[1.0, 2.0, 3.0], &[1, 3]);
/// w.add_i32("n", &[1], &[1]);
/// w.write("/tmp/out.safetensors").unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    /// Row-major `[rows, cols]` tensor.
    pub fn add_f64_arr2(&mut self, name: &str, arr: &ndarray::Array2<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I32", shape.to_vec()));
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut header_map = serde_json::Map::new();
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        let padded: Vec<u8> = hdr_bytes.into_iter()
            .chain(std::iter::repeat(b' ').take(pad))
            .collect();

        let file = std::fs::File::create(path)
            .with_context(|| format!("create {}", path.display()))?;
        let mut f = BufWriter::new(file);
        f.write_all(&(padded.len() as u64).to_le_bytes())?;
        f.write_all(&padded)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        f.flush()?;
        Ok(())
    }
}

// ── Reader ──────────────────────────────────────────────────────────────────

/// One tensor's header entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorInfo {
    pub dtype: String,
    pub shape: Vec<usize>,
    begin:     usize,
    end:       usize,
}

/// Whole-file safetensors reader for files written by [`StWriter`].
pub struct StReader {
    bytes:      Vec<u8>,
    data_start: usize,
    tensors:    HashMap<String, TensorInfo>,
}

impl StReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("open {}", path.display()))?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < 8 {
            bail!("safetensors file too small");
        }
        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[..8]);
        let n = u64::from_le_bytes(len) as usize;
        if n > bytes.len() - 8 {
            bail!("safetensors header truncated");
        }
        let header: HashMap<String, serde_json::Value> = serde_json::from_slice(&bytes[8..8 + n])
            .context("failed to parse safetensors header")?;

        let mut tensors = HashMap::with_capacity(header.len());
        for (name, entry) in header {
            if name == "__metadata__" {
                continue;
            }
            let dtype = entry["dtype"].as_str().context("dtype")?.to_string();
            let shape = entry["shape"]
                .as_array()
                .context("shape")?
                .iter()
                .map(|v| v.as_u64().map(|d| d as usize).context("shape entry"))
                .collect::<Result<Vec<_>>>()?;
            let offsets = entry["data_offsets"].as_array().context("data_offsets")?;
            let begin = offsets.first().and_then(|v| v.as_u64()).context("data_offsets[0]")? as usize;
            let end = offsets.get(1).and_then(|v| v.as_u64()).context("data_offsets[1]")? as usize;
            if begin > end || 8 + n + end > bytes.len() {
                bail!("tensor {name}: offsets {begin}..{end} outside data");
            }
            tensors.insert(name, TensorInfo { dtype, shape, begin, end });
        }
        Ok(Self { bytes, data_start: 8 + n, tensors })
    }

    pub fn info(&self, name: &str) -> Option<&TensorInfo> {
        self.tensors.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    fn raw(&self, name: &str, dtype: &str) -> Result<&[u8]> {
        let t = self.tensors.get(name).with_context(|| format!("missing '{name}' key"))?;
        if t.dtype != dtype {
            bail!("tensor {name}: dtype {}, expected {dtype}", t.dtype);
        }
        Ok(&self.bytes[self.data_start + t.begin..self.data_start + t.end])
    }

    pub fn f64(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.raw(name, "F64")?
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect())
    }

    pub fn i32(&self, name: &str) -> Result<Vec<i32>> {
        Ok(self.raw(name, "I32")?
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}

// ── Epoch export ────────────────────────────────────────────────────────────

/// What [`write_epochs`] wrote and left out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub exported:      usize,
    pub out_of_bounds: usize,
}

/// Write the baseline-corrected epochs of one event subset.
///
/// # Panics
/// If a window that fits the recording contains NaN.
pub fn write_epochs<P: AsRef<Path>>(
    recording: &Recording,
    subset: EventSubset,
    cfg: &EpochConfig,
    path: P,
) -> Result<ExportSummary> {
    let path = path.as_ref();
    let mut w = StWriter::new();
    let mut summary = ExportSummary::default();
    let mut sample_points = Vec::new();
    let mut sentence_ids = Vec::new();
    let mut word_numbers = Vec::new();

    for (event, epoch) in recording.epochs(subset, cfg) {
        let epoch = match epoch {
            Ok(e) => e,
            Err(e) => {
                warn!("participant {}: {event}: {e}", recording.participant_id);
                summary.out_of_bounds += 1;
                continue;
            }
        };
        w.add_f64_arr2(&format!("epoch_{}", summary.exported), epoch.corrected());
        sample_points.push(i32::try_from(event.sample_point).context("sample point overflows i32")?);
        sentence_ids.push(event.sentence_id.unwrap_or(-1) as i32);
        word_numbers.push(event.word_number as i32);
        summary.exported += 1;
    }

    let n = summary.exported;
    w.add_i32("sample_point", &sample_points, &[n]);
    w.add_i32("sentence_id", &sentence_ids, &[n]);
    w.add_i32("word_number", &word_numbers, &[n]);
    w.add_i32("n_epochs", &[n as i32], &[1]);
    w.write(path)?;

    info!(
        "participant {} | {subset:?} | exported {} epochs → {}",
        recording.participant_id, n, path.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_output_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.safetensors");
        let mut w = StWriter::new();
        w.add_f64("a", &[1.5, -2.0], &[2]);
        w.add_i32("b", &[7, 8, 9], &[3]);
        w.write(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[..8]);
        assert_eq!(u64::from_le_bytes(len) % 8, 0, "header is padded to 8 bytes");

        let r = StReader::open(&path).unwrap();
        assert_eq!(r.f64("a").unwrap(), vec![1.5, -2.0]);
        assert_eq!(r.i32("b").unwrap(), vec![7, 8, 9]);
        assert_eq!(r.info("b").unwrap().shape, vec![3]);
        assert!(r.f64("b").is_err(), "dtype mismatch");
        assert!(r.i32("missing").is_err());
    }

    #[test]
    fn truncated_file_is_rejected() {
        assert!(StReader::from_bytes(vec![1, 2, 3]).is_err());
        let mut bytes = 100u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        assert!(StReader::from_bytes(bytes).is_err());
    }
}
