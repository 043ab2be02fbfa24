//! Folder scanning and parallel slice-stack assembly

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use cdvis_math::Vec3;
use crossbeam_utils::thread;

use crate::slice::SliceHeader;
use crate::{LoadError, Result};

/// An assembled volume ready for upload
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeData {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    /// Interleaved `(intensity, aux)` pairs, x fastest then y then z
    pub voxels: Vec<u16>,
    /// Physical extent in meters
    pub size: Vec3,
    /// Whether the aux channel holds a segmentation mask
    pub mask: bool,
}

impl VolumeData {
    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    /// Number of `u16` values in one slice
    pub fn slice_len(&self) -> usize {
        self.width as usize * self.height as usize * 2
    }
}

/// Loads DICOM folders on a fixed pool of workers
#[derive(Clone, Debug)]
pub struct VolumeLoader {
    workers: usize,
}

impl Default for VolumeLoader {
    fn default() -> Self {
        Self::new(0)
    }
}

impl VolumeLoader {
    /// `workers == 0` uses the available parallelism
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            workers
        };
        Self { workers }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Load every `.dcm` slice in `folder` into one volume
    pub fn load_folder(&self, folder: &Path) -> Result<VolumeData> {
        let start = Instant::now();
        log::info!("Loading DICOM volume from {}", folder.display());

        let files = scan_folder(folder, &["dcm"])?;
        if files.is_empty() {
            return Err(LoadError::Empty(folder.to_path_buf()));
        }

        let mut headers = files
            .iter()
            .map(|path| SliceHeader::read(path))
            .collect::<Result<Vec<_>>>()?;
        headers.sort_by(|a, b| a.location.total_cmp(&b.location));

        let first = &headers[0];
        let (width, height) = first.dimensions();
        if let Some(odd) = headers.iter().find(|h| h.dimensions() != (width, height)) {
            return Err(LoadError::DimensionMismatch {
                path: odd.path.clone(),
                expected: (width, height),
                actual: odd.dimensions(),
            });
        }

        let depth = headers.len() as u32;
        let size = Vec3::new(
            (0.001 * first.spacing.0 * f64::from(width)) as f32,
            (0.001 * first.spacing.1 * f64::from(height)) as f32,
            (0.001 * first.thickness * f64::from(depth)) as f32,
        );

        let slice_len = first.pixel_count() * 2;
        let mut voxels = vec![0u16; slice_len * headers.len()];
        self.decode(&headers, slice_len, &mut voxels)?;

        log::info!(
            "Loaded {}x{}x{} volume ({:.3}m x {:.3}m x {:.3}m) in {:.2?}",
            width,
            height,
            depth,
            size.x,
            size.y,
            size.z,
            start.elapsed()
        );

        Ok(VolumeData {
            width,
            height,
            depth,
            voxels,
            size,
            mask: false,
        })
    }

    /// Each worker owns a contiguous batch of slices and the matching
    /// chunk of `voxels`
    fn decode(&self, headers: &[SliceHeader], slice_len: usize, voxels: &mut [u16]) -> Result<()> {
        let per_worker = headers.len().div_ceil(self.workers.max(1));
        log::debug!(
            "Decoding {} slices on {} workers",
            headers.len(),
            headers.len().div_ceil(per_worker)
        );

        let results = thread::scope(|scope| {
            let handles: Vec<_> = headers
                .chunks(per_worker)
                .zip(voxels.chunks_mut(per_worker * slice_len))
                .map(|(batch, out)| {
                    scope.spawn(move |_| -> Result<()> {
                        for (header, slice) in batch.iter().zip(out.chunks_exact_mut(slice_len)) {
                            header.read_pixels(slice)?;
                        }
                        Ok(())
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().unwrap_or(Err(LoadError::WorkerPanicked)))
                .collect::<Vec<_>>()
        })
        .map_err(|_| LoadError::WorkerPanicked)?;

        results.into_iter().collect()
    }
}

/// Files directly inside `folder` with one of `extensions`
/// (case-insensitive), hidden files skipped, sorted by path
pub fn scan_folder(folder: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let io_err = |source| LoadError::Io {
        path: folder.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(folder).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.file_type().map_err(io_err)?.is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|x| ext.eq_ignore_ascii_case(x)));
        if matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{write_slice, TestSlice};

    fn write_stack(dir: &Path, locations: &[f64]) {
        for (i, &location) in locations.iter().enumerate() {
            // each slice is a ramp offset by its index so order is observable
            let base = i as u16 * 10;
            let pixels = vec![base, base + 1, base + 2, base + 100];
            write_slice(
                &dir.join(format!("img{}.dcm", i)),
                &TestSlice::new(2, 2, location, pixels),
            );
        }
    }

    #[test]
    fn test_worker_count_defaults_to_parallelism() {
        assert!(VolumeLoader::new(0).workers() >= 1);
        assert_eq!(VolumeLoader::new(3).workers(), 3);
    }

    #[test]
    fn test_load_sorts_by_location() {
        let dir = tempfile::tempdir().unwrap();
        // file order is the reverse of anatomical order
        write_stack(dir.path(), &[30.0, 20.0, 10.0]);

        let volume = VolumeLoader::new(2).load_folder(dir.path()).unwrap();
        assert_eq!((volume.width, volume.height, volume.depth), (2, 2, 3));
        assert_eq!(volume.voxels.len(), volume.texel_count() * 2);
        assert!(!volume.mask);

        // every slice is windowed onto the full range on its own
        for slice in volume.voxels.chunks_exact(volume.slice_len()) {
            assert_eq!(slice[0], 0);
            assert_eq!(slice[6], 65535);
            assert!(slice.iter().skip(1).step_by(2).all(|&aux| aux == 0xFFFF));
        }

        // slice at location 10 came from img2.dcm: ramp 20, 21, 22, 120
        let first = &volume.voxels[..volume.slice_len()];
        assert_eq!(first[2], 655);
    }

    #[test]
    fn test_physical_size_in_meters() {
        let dir = tempfile::tempdir().unwrap();
        write_stack(dir.path(), &[0.0, 2.0, 4.0]);

        let volume = VolumeLoader::new(1).load_folder(dir.path()).unwrap();
        // spacing 0.5 x 0.25 mm, thickness 2 mm
        assert!((volume.size.x - 0.001).abs() < 1e-7);
        assert!((volume.size.y - 0.0005).abs() < 1e-7);
        assert!((volume.size.z - 0.006).abs() < 1e-7);
    }

    #[test]
    fn test_more_workers_than_slices() {
        let dir = tempfile::tempdir().unwrap();
        write_stack(dir.path(), &[1.0, 2.0]);
        let volume = VolumeLoader::new(16).load_folder(dir.path()).unwrap();
        assert_eq!(volume.depth, 2);
    }

    #[test]
    fn test_empty_folder_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"not a slice").unwrap();
        let err = VolumeLoader::new(1).load_folder(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Empty(_)));
    }

    #[test]
    fn test_missing_folder_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = VolumeLoader::new(1)
            .load_folder(&dir.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_dimension_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        write_stack(dir.path(), &[0.0]);
        write_slice(
            &dir.path().join("wide.dcm"),
            &TestSlice::new(2, 3, 5.0, vec![0; 6]),
        );
        let err = VolumeLoader::new(1).load_folder(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::DimensionMismatch {
                expected: (2, 2),
                actual: (3, 2),
                ..
            }
        ));
    }

    #[test]
    fn test_scan_skips_hidden_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.DCM"), b"").unwrap();
        fs::write(dir.path().join("a.dcm"), b"").unwrap();
        fs::write(dir.path().join(".hidden.dcm"), b"").unwrap();
        fs::write(dir.path().join("c.png"), b"").unwrap();
        fs::create_dir(dir.path().join("d.dcm")).unwrap();

        let files = scan_folder(dir.path(), &["dcm"]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.dcm", "b.DCM"]);
    }
}
