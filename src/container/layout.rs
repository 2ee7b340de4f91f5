//! Positional layout of the recording struct.
//!
//! The recording variable is a struct record whose fields sit at fixed
//! positions. This table is the single place that knows them; every field
//! is read through its entry once, at load time.
//!
//! ```text
//! field           index  mode
//! channel_count       8  number
//! sample_count       10  number
//! sample_rate        11  number
//! xmin               12  number
//! xmax               13  number
//! times              14  vector
//! signal             15  raw (channels × samples)
//! channel_labels     21  vector of records
//! channel_info       23  raw
//! raw_markers        25  vector of records
//! ```
use super::decode::{to_f64_vector, to_integer, to_matrix, to_number, to_text, to_vector};
use super::value::MatValue;
use crate::error::DecodeError;
use ndarray::Array2;

/// How a field is normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    Number,
    Vector,
    Raw,
}

/// One row of the decode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name:  &'static str,
    pub index: usize,
    pub mode:  DecodeMode,
}

pub const CHANNEL_COUNT:  FieldSpec = FieldSpec { name: "channel_count",  index: 8,  mode: DecodeMode::Number };
pub const SAMPLE_COUNT:   FieldSpec = FieldSpec { name: "sample_count",   index: 10, mode: DecodeMode::Number };
pub const SAMPLE_RATE:    FieldSpec = FieldSpec { name: "sample_rate",    index: 11, mode: DecodeMode::Number };
pub const XMIN:           FieldSpec = FieldSpec { name: "xmin",           index: 12, mode: DecodeMode::Number };
pub const XMAX:           FieldSpec = FieldSpec { name: "xmax",           index: 13, mode: DecodeMode::Number };
pub const TIMES:          FieldSpec = FieldSpec { name: "times",          index: 14, mode: DecodeMode::Vector };
pub const SIGNAL:         FieldSpec = FieldSpec { name: "signal",         index: 15, mode: DecodeMode::Raw };
pub const CHANNEL_LABELS: FieldSpec = FieldSpec { name: "channel_labels", index: 21, mode: DecodeMode::Vector };
pub const CHANNEL_INFO:   FieldSpec = FieldSpec { name: "channel_info",   index: 23, mode: DecodeMode::Raw };
pub const RAW_MARKERS:    FieldSpec = FieldSpec { name: "raw_markers",    index: 25, mode: DecodeMode::Vector };

/// The full decode table, in field order.
pub const RECORDING_LAYOUT: [FieldSpec; 10] = [
    CHANNEL_COUNT, SAMPLE_COUNT, SAMPLE_RATE, XMIN, XMAX,
    TIMES, SIGNAL, CHANNEL_LABELS, CHANNEL_INFO, RAW_MARKERS,
];

/// Positions inside one marker record: `(type, latency, urevent)`.
pub const MARKER_CODE_FIELD:    usize = 0;
pub const MARKER_LATENCY_FIELD: usize = 1;
pub const MARKER_SOURCE_FIELD:  usize = 2;

/// Position of the label inside one channel record.
pub const CHANNEL_LABEL_FIELD: usize = 0;

/// Recording metadata after applying [`RECORDING_LAYOUT`].
///
/// Marker records are kept as container values here; turning them into
/// [`crate::event::RawMarker`]s is the event module's job.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecording {
    pub channel_count:  usize,
    pub sample_count:   usize,
    pub sample_rate:    f64,
    pub xmin:           f64,
    pub xmax:           f64,
    pub times:          Vec<f64>,
    pub signal:         Array2<f64>,
    pub channel_labels: Vec<String>,
    pub channel_info:   MatValue,
    pub raw_markers:    Vec<MatValue>,
}

/// Fetch a field by its table entry.
pub fn field<'a>(record: &'a MatValue, spec: &FieldSpec) -> Result<&'a MatValue, DecodeError> {
    record
        .field(spec.index)
        .ok_or(DecodeError::MissingField { index: spec.index, name: spec.name })
}

/// Decode a recording struct record.
///
/// `record` is the struct itself (already unwrapped from the variable's
/// outer `[0][0]`). Shape mismatches between counts and arrays are
/// reported as [`DecodeError::Field`].
pub fn decode_recording(record: &MatValue) -> Result<DecodedRecording, DecodeError> {
    let count = |spec: &FieldSpec| -> Result<usize, DecodeError> {
        debug_assert_eq!(spec.mode, DecodeMode::Number);
        let v = to_integer(field(record, spec)?)?;
        usize::try_from(v).map_err(|_| DecodeError::Field {
            field: spec.name,
            reason: format!("negative count {v}"),
        })
    };
    let number = |spec: &FieldSpec| -> Result<f64, DecodeError> {
        debug_assert_eq!(spec.mode, DecodeMode::Number);
        to_number(field(record, spec)?)
    };

    let channel_count = count(&CHANNEL_COUNT)?;
    let sample_count  = count(&SAMPLE_COUNT)?;
    let sample_rate   = number(&SAMPLE_RATE)?;
    let xmin          = number(&XMIN)?;
    let xmax          = number(&XMAX)?;

    let times = to_f64_vector(field(record, &TIMES)?)?;
    if times.len() != sample_count {
        return Err(DecodeError::Field {
            field: TIMES.name,
            reason: format!("{} entries, expected {sample_count}", times.len()),
        });
    }

    let signal = to_matrix(field(record, &SIGNAL)?)?;
    if signal.dim() != (channel_count, sample_count) {
        return Err(DecodeError::Field {
            field: SIGNAL.name,
            reason: format!(
                "shape {:?}, expected ({channel_count}, {sample_count})",
                signal.dim()
            ),
        });
    }

    let channel_labels = to_vector(field(record, &CHANNEL_LABELS)?)?
        .iter()
        .map(|ch| {
            let label = ch.field(CHANNEL_LABEL_FIELD).ok_or(DecodeError::MissingField {
                index: CHANNEL_LABEL_FIELD,
                name: "channel label",
            })?;
            to_text(label).map(str::to_string)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let channel_info = field(record, &CHANNEL_INFO)?.clone();
    let raw_markers  = to_vector(field(record, &RAW_MARKERS)?)?.to_vec();

    Ok(DecodedRecording {
        channel_count,
        sample_count,
        sample_rate,
        xmin,
        xmax,
        times,
        signal,
        channel_labels,
        channel_info,
        raw_markers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(v: MatValue) -> MatValue { MatValue::Array(vec![MatValue::Array(vec![v])]) }
    fn num(v: f64) -> MatValue { wrap(MatValue::Number(v)) }

    fn minimal_record(n_ch: usize, n_t: usize) -> MatValue {
        let mut fields = vec![MatValue::Missing; 27];
        fields[CHANNEL_COUNT.index] = num(n_ch as f64);
        fields[SAMPLE_COUNT.index]  = num(n_t as f64);
        fields[SAMPLE_RATE.index]   = num(500.0);
        fields[XMIN.index]          = num(0.0);
        fields[XMAX.index]          = num((n_t - 1) as f64 / 500.0);
        fields[TIMES.index] = MatValue::Array(vec![MatValue::Array(
            (0..n_t).map(|t| MatValue::Number(t as f64 * 2.0)).collect(),
        )]);
        fields[SIGNAL.index] = MatValue::Array(
            (0..n_ch)
                .map(|c| MatValue::Array((0..n_t).map(|t| MatValue::Number((c * t) as f64)).collect()))
                .collect(),
        );
        fields[CHANNEL_LABELS.index] = MatValue::Array(vec![MatValue::Array(
            (0..n_ch)
                .map(|c| MatValue::record(vec![wrap(MatValue::Text(format!("{}", c + 1)))]))
                .collect(),
        )]);
        fields[RAW_MARKERS.index] = MatValue::Array(vec![MatValue::Array(vec![])]);
        MatValue::record(fields)
    }

    #[test]
    fn table_indices_are_unique() {
        for (i, a) in RECORDING_LAYOUT.iter().enumerate() {
            for b in &RECORDING_LAYOUT[i + 1..] {
                assert_ne!(a.index, b.index, "{} and {} share an index", a.name, b.name);
            }
        }
    }

    #[test]
    fn decodes_minimal_record() {
        let rec = decode_recording(&minimal_record(3, 10)).unwrap();
        assert_eq!(rec.channel_count, 3);
        assert_eq!(rec.sample_count, 10);
        assert_eq!(rec.sample_rate, 500.0);
        assert_eq!(rec.times.len(), 10);
        assert_eq!(rec.signal.dim(), (3, 10));
        assert_eq!(rec.signal[[2, 4]], 8.0);
        assert_eq!(rec.channel_labels, vec!["1", "2", "3"]);
        assert!(rec.raw_markers.is_empty());
    }

    #[test]
    fn signal_shape_mismatch_is_rejected() {
        let MatValue::Struct(mut fields) = minimal_record(3, 10) else { unreachable!() };
        fields[CHANNEL_COUNT.index] = num(4.0);
        let err = decode_recording(&MatValue::record(fields)).unwrap_err();
        assert!(matches!(err, DecodeError::Field { field: "signal", .. }));
    }

    #[test]
    fn missing_field_is_rejected() {
        let record = MatValue::record(vec![MatValue::Missing; 5]);
        assert_eq!(
            decode_recording(&record).unwrap_err(),
            DecodeError::MissingField { index: 8, name: "channel_count" },
        );
    }
}
