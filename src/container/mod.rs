//! Boundary to the matrix-laboratory struct container.
//!
//! The container is consumed as a JSON export of its variables. Nothing
//! past this module sees nested wrappers: [`decode`] normalises values and
//! [`layout`] maps the recording struct onto named fields.
//!
//! # Quick start
//! ```no_run
//! use sentence_erp::container::{Container, layout::decode_recording};
//! use sentence_erp::container::decode::to_vector;
//!
//! let c = Container::read("data/EEG3.json").unwrap();
//! let record = &to_vector(c.get("EEG").unwrap()).unwrap()[0];
//! let rec = decode_recording(record).unwrap();
//! println!("{} channels @ {} Hz", rec.channel_count, rec.sample_rate);
//! ```
pub mod decode;
pub mod layout;
pub mod value;

pub use decode::{to_f64_vector, to_integer, to_matrix, to_number, to_text, to_vector};
pub use layout::{decode_recording, DecodeMode, DecodedRecording, FieldSpec, RECORDING_LAYOUT};
pub use value::{nan_eq, Container, MatValue};
