//! Unwrapping of redundantly nested container values.
//!
//! Every metadata and marker field goes through one of these functions;
//! nothing else in the crate peels array wrappers by hand.
//!
//! `to_number`: take the first element while the value is an array.
//! `to_vector`: take the first sub-array while the value has more than one
//!              dimension, then read the remaining 1-D array.
//!
//! A value that never reaches the expected shape is a [`DecodeError`].
use ndarray::Array2;

use super::value::MatValue;
use crate::error::DecodeError;

/// Unwrap to the innermost scalar. `Missing` decodes to NaN.
pub fn to_number(value: &MatValue) -> Result<f64, DecodeError> {
    let mut x = value;
    while let MatValue::Array(items) = x {
        x = items.first().ok_or(DecodeError::Empty)?;
    }
    match x {
        MatValue::Number(v) => Ok(*v),
        MatValue::Missing   => Ok(f64::NAN),
        other => Err(DecodeError::NotANumber { found: other.kind() }),
    }
}

/// Unwrap to the innermost 1-D array, returned as its elements.
pub fn to_vector(value: &MatValue) -> Result<&[MatValue], DecodeError> {
    let mut x = value;
    while x.ndim() > 1 {
        x = x.first().ok_or(DecodeError::Empty)?;
    }
    match x {
        MatValue::Array(items) => Ok(items.as_slice()),
        other => Err(DecodeError::NotAVector { found: other.kind() }),
    }
}

/// [`to_vector`] followed by [`to_number`] on each element.
pub fn to_f64_vector(value: &MatValue) -> Result<Vec<f64>, DecodeError> {
    to_vector(value)?.iter().map(to_number).collect()
}

/// Unwrap to the innermost text.
pub fn to_text(value: &MatValue) -> Result<&str, DecodeError> {
    let mut x = value;
    while let MatValue::Array(items) = x {
        x = items.first().ok_or(DecodeError::Empty)?;
    }
    match x {
        MatValue::Text(s) => Ok(s.as_str()),
        other => Err(DecodeError::NotText { found: other.kind() }),
    }
}

/// Read a 2-D numeric array `[rows][cols]` as-is (no unwrapping).
///
/// Rows must all have the same length. Elements may themselves be wrapped
/// scalars; they go through [`to_number`].
pub fn to_matrix(value: &MatValue) -> Result<Array2<f64>, DecodeError> {
    if value.ndim() < 2 {
        return Err(DecodeError::NotAMatrix { found: value.kind() });
    }
    let MatValue::Array(rows) = value else {
        return Err(DecodeError::NotAMatrix { found: value.kind() });
    };
    let n_rows = rows.len();
    let n_cols = match rows.first() {
        Some(MatValue::Array(r)) => r.len(),
        _ => 0,
    };
    let mut flat = Vec::with_capacity(n_rows * n_cols);
    for (i, row) in rows.iter().enumerate() {
        let MatValue::Array(cells) = row else {
            return Err(DecodeError::NotAMatrix { found: row.kind() });
        };
        if cells.len() != n_cols {
            return Err(DecodeError::Ragged { row: i, got: cells.len(), expected: n_cols });
        }
        for cell in cells {
            flat.push(to_number(cell)?);
        }
    }
    // Shape and length agree by construction.
    Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|_| DecodeError::NotAMatrix { found: "array" })
}

/// Decode a number that must be a whole value (marker codes, counts).
pub fn to_integer(value: &MatValue) -> Result<i64, DecodeError> {
    let v = to_number(value)?;
    if !v.is_finite() || v.fract() != 0.0 {
        return Err(DecodeError::NotANumber { found: "non-integral number" });
    }
    Ok(v as i64)
}
