//! Single DICOM slice: header attributes and pixel decoding

use std::path::{Path, PathBuf};

use dicom_core::Tag;
use dicom_dictionary_std::tags;
use dicom_object::{open_file, InMemDicomObject, OpenFileOptions};

use crate::{LoadError, Result};

/// Attributes read from a slice before its pixels are decoded
#[derive(Clone, Debug, PartialEq)]
pub struct SliceHeader {
    pub path: PathBuf,
    pub rows: u32,
    pub columns: u32,
    /// Pixel spacing in millimeters, (x, y)
    pub spacing: (f64, f64),
    /// Slice thickness in millimeters
    pub thickness: f64,
    pub location: f64,
    pub bits_allocated: u32,
    pub signed: bool,
}

impl SliceHeader {
    /// Read the header of `path`, stopping before the pixel data
    pub fn read(path: &Path) -> Result<Self> {
        let obj = OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(path)
            .map_err(|e| LoadError::dicom(path, e))?;
        Self::from_object(path, &obj)
    }

    pub fn from_object(path: &Path, obj: &InMemDicomObject) -> Result<Self> {
        let rows = required_uint(path, obj, tags::ROWS, "Rows")?;
        let columns = required_uint(path, obj, tags::COLUMNS, "Columns")?;
        let bits_allocated = required_uint(path, obj, tags::BITS_ALLOCATED, "BitsAllocated")?;
        let signed = optional_uint(obj, tags::PIXEL_REPRESENTATION).unwrap_or(0) == 1;

        if bits_allocated != 8 && bits_allocated != 16 {
            return Err(LoadError::Unsupported {
                path: path.to_path_buf(),
                reason: format!("{} bits allocated", bits_allocated),
            });
        }

        let spacing = match obj
            .element(tags::PIXEL_SPACING)
            .ok()
            .and_then(|e| e.to_multi_float64().ok())
            .as_deref()
        {
            Some([x, y, ..]) => (*x, *y),
            Some([s]) => (*s, *s),
            _ => {
                log::warn!("{} has no PixelSpacing, assuming 1mm", path.display());
                (1.0, 1.0)
            }
        };
        let thickness = optional_float(obj, tags::SLICE_THICKNESS).unwrap_or_else(|| {
            log::warn!("{} has no SliceThickness, assuming 1mm", path.display());
            1.0
        });
        let location = optional_float(obj, tags::SLICE_LOCATION).unwrap_or(0.0);

        Ok(Self {
            path: path.to_path_buf(),
            rows,
            columns,
            spacing,
            thickness,
            location,
            bits_allocated,
            signed,
        })
    }

    /// (width, height) in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    pub fn pixel_count(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    /// Decode this slice into `out`, which holds two `u16` per pixel
    pub fn read_pixels(&self, out: &mut [u16]) -> Result<()> {
        let obj = open_file(&self.path).map_err(|e| LoadError::dicom(&self.path, e))?;
        let bytes = obj
            .element(tags::PIXEL_DATA)
            .map_err(|_| LoadError::MissingAttribute {
                path: self.path.clone(),
                attribute: "PixelData",
            })?
            .to_bytes()
            .map_err(|e| LoadError::Unsupported {
                path: self.path.clone(),
                reason: format!("pixel data is not native ({})", e),
            })?;

        let samples = self.decode_samples(&bytes)?;
        window_into(&samples, out);
        Ok(())
    }

    /// Raw stored values of the first frame
    pub fn decode_samples(&self, bytes: &[u8]) -> Result<Vec<i32>> {
        let count = self.pixel_count();
        let width = (self.bits_allocated / 8) as usize;
        if bytes.len() < count * width {
            return Err(LoadError::PixelDataSize {
                path: self.path.clone(),
                expected: count * width,
                actual: bytes.len(),
            });
        }

        let samples = match (width, self.signed) {
            (1, false) => bytes[..count].iter().map(|&b| i32::from(b)).collect(),
            (1, true) => bytes[..count].iter().map(|&b| i32::from(b as i8)).collect(),
            (_, false) => bytes[..count * 2]
                .chunks_exact(2)
                .map(|b| i32::from(u16::from_le_bytes([b[0], b[1]])))
                .collect(),
            (_, true) => bytes[..count * 2]
                .chunks_exact(2)
                .map(|b| i32::from(i16::from_le_bytes([b[0], b[1]])))
                .collect(),
        };
        Ok(samples)
    }
}

/// Map `samples` onto 0..=65535 by their own min and max, writing
/// `(value, 0xFFFF)` pairs. A flat slice maps to zero.
pub fn window_into(samples: &[i32], out: &mut [u16]) {
    let (min, max) = samples
        .iter()
        .fold((i32::MAX, i32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = i64::from(max) - i64::from(min);

    for (texel, &v) in out.chunks_exact_mut(2).zip(samples) {
        texel[0] = if range > 0 {
            ((i64::from(v) - i64::from(min)) * 65535 / range) as u16
        } else {
            0
        };
        texel[1] = u16::MAX;
    }
}

fn required_uint(
    path: &Path,
    obj: &InMemDicomObject,
    tag: Tag,
    attribute: &'static str,
) -> Result<u32> {
    optional_uint(obj, tag).ok_or_else(|| LoadError::MissingAttribute {
        path: path.to_path_buf(),
        attribute,
    })
}

fn optional_uint(obj: &InMemDicomObject, tag: Tag) -> Option<u32> {
    obj.element(tag).ok()?.to_int::<u32>().ok()
}

fn optional_float(obj: &InMemDicomObject, tag: Tag) -> Option<f64> {
    obj.element(tag).ok()?.to_float64().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{write_slice, TestSlice};

    #[test]
    fn test_window_spans_full_range() {
        let mut out = vec![0u16; 8];
        window_into(&[0, 100, 200, 300], &mut out);
        assert_eq!(out, vec![0, 0xFFFF, 21845, 0xFFFF, 43690, 0xFFFF, 65535, 0xFFFF]);
    }

    #[test]
    fn test_window_flat_slice_is_zero() {
        let mut out = vec![7u16; 4];
        window_into(&[42, 42], &mut out);
        assert_eq!(out, vec![0, 0xFFFF, 0, 0xFFFF]);
    }

    #[test]
    fn test_window_negative_values() {
        let mut out = vec![0u16; 6];
        window_into(&[-1024, 0, 1024], &mut out);
        assert_eq!(out[0], 0);
        assert_eq!(out[2], 32767);
        assert_eq!(out[4], 65535);
    }

    #[test]
    fn test_read_header_and_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slice.dcm");
        write_slice(&path, &TestSlice::new(2, 3, -12.5, vec![0, 10, 20, 30, 40, 50]));

        let header = SliceHeader::read(&path).unwrap();
        assert_eq!(header.dimensions(), (3, 2));
        assert_eq!(header.spacing, (0.5, 0.25));
        assert_eq!(header.thickness, 2.0);
        assert_eq!(header.location, -12.5);
        assert_eq!(header.bits_allocated, 16);
        assert!(!header.signed);

        let mut out = vec![0u16; 12];
        header.read_pixels(&mut out).unwrap();
        assert_eq!(out[0], 0);
        assert_eq!(out[10], 65535);
        assert!(out.iter().skip(1).step_by(2).all(|&aux| aux == 0xFFFF));
    }

    #[test]
    fn test_signed_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signed.dcm");
        let mut slice = TestSlice::new(1, 2, 0.0, vec![(-1000_i16) as u16, 1000]);
        slice.signed = true;
        write_slice(&path, &slice);

        let header = SliceHeader::read(&path).unwrap();
        assert!(header.signed);
        let mut out = vec![0u16; 4];
        header.read_pixels(&mut out).unwrap();
        assert_eq!((out[0], out[2]), (0, 65535));
    }

    #[test]
    fn test_short_pixel_data() {
        let header = SliceHeader {
            path: PathBuf::from("short.dcm"),
            rows: 2,
            columns: 2,
            spacing: (1.0, 1.0),
            thickness: 1.0,
            location: 0.0,
            bits_allocated: 16,
            signed: false,
        };
        let err = header.decode_samples(&[0u8; 6]).unwrap_err();
        assert!(matches!(err, LoadError::PixelDataSize { expected: 8, actual: 6, .. }));
    }
}
