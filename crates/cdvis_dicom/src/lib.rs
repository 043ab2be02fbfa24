//! # cdvis_dicom - Volume Loading
//!
//! Turns a folder of single-frame DICOM slices into the interleaved
//! two-channel `u16` buffer the renderer uploads as its source texture:
//!
//! ```text
//! scan *.dcm ──► read headers ──► sort by SliceLocation
//!                                       │
//!            decode on N workers ◄──────┘   (one disjoint chunk each)
//!                    │
//!                    ▼
//!   [intensity, 0xFFFF, intensity, 0xFFFF, ...]  + physical size in meters
//! ```
//!
//! A segmentation mask is a second folder of grayscale images whose luma
//! replaces the second channel.

pub mod loader;
pub mod mask;
pub mod slice;

pub use loader::*;
pub use mask::*;
pub use slice::*;

use std::path::PathBuf;

use thiserror::Error;

/// Errors from volume and mask loading
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No DICOM files found in {0}")]
    Empty(PathBuf),

    #[error("Failed to read {path}: {message}")]
    Dicom { path: PathBuf, message: String },

    #[error("{path} is missing {attribute}")]
    MissingAttribute {
        path: PathBuf,
        attribute: &'static str,
    },

    #[error("{path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },

    #[error("{path} is {actual:?} pixels, expected {expected:?}")]
    DimensionMismatch {
        path: PathBuf,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("{path} holds {actual} bytes of pixel data, expected at least {expected}")]
    PixelDataSize {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("Incorrect mask slice count ({actual} != {expected})")]
    MaskSliceCount { expected: usize, actual: usize },

    #[error("Failed to decode mask image {path}: {message}")]
    MaskImage { path: PathBuf, message: String },

    #[error("A decode worker panicked")]
    WorkerPanicked,
}

impl LoadError {
    pub(crate) fn dicom(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Dicom {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;

pub mod prelude {
    pub use crate::loader::{VolumeData, VolumeLoader};
    pub use crate::mask::load_mask;
    pub use crate::{LoadError, Result};
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;

    use dicom_core::{dicom_value, DataElement, PrimitiveValue, VR};
    use dicom_dictionary_std::tags;
    use dicom_object::{meta::FileMetaTableBuilder, InMemDicomObject};

    /// Description of one synthetic CT slice
    pub struct TestSlice {
        pub rows: u16,
        pub columns: u16,
        pub location: f64,
        pub signed: bool,
        pub pixels: Vec<u16>,
    }

    impl TestSlice {
        pub fn new(rows: u16, columns: u16, location: f64, pixels: Vec<u16>) -> Self {
            Self {
                rows,
                columns,
                location,
                signed: false,
                pixels,
            }
        }
    }

    /// Write a single-frame explicit VR little endian file
    pub fn write_slice(path: &Path, slice: &TestSlice) {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1_u16)));
        obj.put(DataElement::new(
            tags::PHOTOMETRIC_INTERPRETATION,
            VR::CS,
            PrimitiveValue::from("MONOCHROME2"),
        ));
        obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(slice.rows)));
        obj.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(slice.columns)));
        obj.put(DataElement::new(
            tags::PIXEL_SPACING,
            VR::DS,
            dicom_value!(Strs, ["0.5", "0.25"]),
        ));
        obj.put(DataElement::new(tags::SLICE_THICKNESS, VR::DS, PrimitiveValue::from("2")));
        obj.put(DataElement::new(
            tags::SLICE_LOCATION,
            VR::DS,
            PrimitiveValue::from(slice.location.to_string()),
        ));
        obj.put(DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16_u16)));
        obj.put(DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(16_u16)));
        obj.put(DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(15_u16)));
        obj.put(DataElement::new(
            tags::PIXEL_REPRESENTATION,
            VR::US,
            PrimitiveValue::from(u16::from(slice.signed)),
        ));
        obj.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OW,
            PrimitiveValue::U16(slice.pixels.iter().copied().collect()),
        ));

        let file = obj
            .with_meta(
                FileMetaTableBuilder::new()
                    .transfer_syntax("1.2.840.10008.1.2.1")
                    .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.2")
                    .media_storage_sop_instance_uid("2.25.1"),
            )
            .unwrap();
        file.write_to_file(path).unwrap();
    }
}
