//! Segmentation masks stored as one grayscale image per slice

use std::cmp::Reverse;
use std::path::Path;

use image::GrayImage;

use crate::loader::{scan_folder, VolumeData};
use crate::{LoadError, Result};

pub const MASK_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Leading integer of the file stem, 0 when there is none
pub fn stem_number(path: &Path) -> i64 {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let stem = stem.trim_start();
    let (sign, digits) = match stem.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, stem.strip_prefix('+').unwrap_or(stem)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

/// Replace the aux channel of `volume` with the mask images in `folder`.
///
/// Images are ordered by the number in their file name, highest first.
/// Nothing is written unless every image matches the volume.
pub fn load_mask(folder: &Path, volume: &mut VolumeData) -> Result<()> {
    log::info!("Loading mask from {}", folder.display());

    let mut files = scan_folder(folder, MASK_EXTENSIONS)?;
    if files.len() != volume.depth as usize {
        log::error!(
            "Incorrect mask slice count! ({} != {})",
            files.len(),
            volume.depth
        );
        return Err(LoadError::MaskSliceCount {
            expected: volume.depth as usize,
            actual: files.len(),
        });
    }
    files.sort_by_key(|p| Reverse(stem_number(p)));

    let mut images: Vec<GrayImage> = Vec::with_capacity(files.len());
    for path in &files {
        let image = image::open(path)
            .map_err(|e| LoadError::MaskImage {
                path: path.clone(),
                message: e.to_string(),
            })?
            .to_luma8();
        if image.dimensions() != (volume.width, volume.height) {
            log::error!(
                "Mask image {} is {:?}, volume slices are {:?}",
                path.display(),
                image.dimensions(),
                (volume.width, volume.height)
            );
            return Err(LoadError::DimensionMismatch {
                path: path.clone(),
                expected: (volume.width, volume.height),
                actual: image.dimensions(),
            });
        }
        images.push(image);
    }

    let slice_len = volume.slice_len();
    for (slice, image) in volume.voxels.chunks_exact_mut(slice_len).zip(&images) {
        for (texel, &luma) in slice.chunks_exact_mut(2).zip(image.as_raw()) {
            texel[1] = u16::from(luma) * 257;
        }
    }
    volume.mask = true;

    log::info!("Applied {} mask slices", images.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdvis_math::Vec3;
    use image::Luma;

    fn blank_volume(width: u32, height: u32, depth: u32) -> VolumeData {
        let texels = (width * height * depth) as usize;
        VolumeData {
            width,
            height,
            depth,
            voxels: (0..texels).flat_map(|i| [i as u16, u16::MAX]).collect(),
            size: Vec3::ONE,
            mask: false,
        }
    }

    fn write_mask(dir: &Path, name: &str, width: u32, height: u32, value: u8) {
        GrayImage::from_pixel(width, height, Luma([value]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_stem_number() {
        assert_eq!(stem_number(Path::new("12.png")), 12);
        assert_eq!(stem_number(Path::new("/masks/007.bmp")), 7);
        assert_eq!(stem_number(Path::new("42_label.png")), 42);
        assert_eq!(stem_number(Path::new("-3.png")), -3);
        assert_eq!(stem_number(Path::new("label.png")), 0);
    }

    #[test]
    fn test_mask_sorted_descending() {
        let dir = tempfile::tempdir().unwrap();
        write_mask(dir.path(), "1.png", 2, 2, 10);
        write_mask(dir.path(), "2.png", 2, 2, 20);
        write_mask(dir.path(), "10.png", 2, 2, 100);

        let mut volume = blank_volume(2, 2, 3);
        load_mask(dir.path(), &mut volume).unwrap();
        assert!(volume.mask);

        let slice_len = volume.slice_len();
        let aux: Vec<u16> = volume
            .voxels
            .chunks_exact(slice_len)
            .map(|slice| slice[1])
            .collect();
        assert_eq!(aux, vec![100 * 257, 20 * 257, 10 * 257]);
        // intensity is untouched
        assert_eq!(volume.voxels[2], 1);
    }

    #[test]
    fn test_mask_full_luma_is_full_range() {
        let dir = tempfile::tempdir().unwrap();
        write_mask(dir.path(), "0.png", 1, 1, 255);
        let mut volume = blank_volume(1, 1, 1);
        load_mask(dir.path(), &mut volume).unwrap();
        assert_eq!(volume.voxels[1], u16::MAX);
    }

    #[test]
    fn test_mask_slice_count_mismatch_leaves_volume() {
        let dir = tempfile::tempdir().unwrap();
        write_mask(dir.path(), "1.png", 2, 2, 10);
        let mut volume = blank_volume(2, 2, 2);
        let before = volume.clone();

        let err = load_mask(dir.path(), &mut volume).unwrap_err();
        assert!(matches!(err, LoadError::MaskSliceCount { expected: 2, actual: 1 }));
        assert_eq!(volume, before);
    }

    #[test]
    fn test_mask_dimension_mismatch_leaves_volume() {
        let dir = tempfile::tempdir().unwrap();
        write_mask(dir.path(), "2.png", 2, 2, 10);
        write_mask(dir.path(), "1.png", 3, 2, 10);
        let mut volume = blank_volume(2, 2, 2);
        let before = volume.clone();

        let err = load_mask(dir.path(), &mut volume).unwrap_err();
        assert!(matches!(err, LoadError::DimensionMismatch { .. }));
        assert_eq!(volume, before);
    }
}
