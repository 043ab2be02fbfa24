//! Background volume and mask loading
//!
//! Loads run on their own named thread and report back over a channel
//! drained once per frame, so the viewer keeps rendering while a folder
//! is decoded.

use std::path::PathBuf;
use std::thread;

use cdvis_dicom::{load_mask, LoadError, VolumeData, VolumeLoader};
use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::Result;

/// A finished load
#[derive(Debug)]
pub enum LoadEvent {
    Volume {
        folder: PathBuf,
        result: std::result::Result<VolumeData, LoadError>,
    },
    /// `result` holds a copy of the volume with the mask merged in
    Mask {
        folder: PathBuf,
        result: std::result::Result<VolumeData, LoadError>,
    },
}

pub struct BackgroundLoader {
    loader: VolumeLoader,
    tx: Sender<LoadEvent>,
    rx: Receiver<LoadEvent>,
    pending: usize,
}

impl BackgroundLoader {
    pub fn new(workers: usize) -> Self {
        let (tx, rx) = unbounded();
        Self {
            loader: VolumeLoader::new(workers),
            tx,
            rx,
            pending: 0,
        }
    }

    /// Whether a load is still running
    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }

    pub fn load_volume(&mut self, folder: PathBuf) -> Result<()> {
        let loader = self.loader.clone();
        let tx = self.tx.clone();
        thread::Builder::new()
            .name("volume-loader".to_string())
            .spawn(move || {
                let result = loader.load_folder(&folder);
                let _ = tx.send(LoadEvent::Volume { folder, result });
            })?;
        self.pending += 1;
        Ok(())
    }

    /// Merge the mask in `folder` into a copy of `volume`
    pub fn load_mask(&mut self, folder: PathBuf, volume: VolumeData) -> Result<()> {
        let tx = self.tx.clone();
        thread::Builder::new()
            .name("mask-loader".to_string())
            .spawn(move || {
                let mut volume = volume;
                let result = load_mask(&folder, &mut volume).map(|()| volume);
                let _ = tx.send(LoadEvent::Mask { folder, result });
            })?;
        self.pending += 1;
        Ok(())
    }

    /// Every load finished since the last poll
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let events: Vec<LoadEvent> = self.rx.try_iter().collect();
        self.pending = self.pending.saturating_sub(events.len());
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdvis_math::Vec3;
    use std::time::{Duration, Instant};

    fn wait(loader: &mut BackgroundLoader) -> LoadEvent {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(event) = loader.poll().pop() {
                return event;
            }
            assert!(Instant::now() < deadline, "load did not finish");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_empty_folder_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = BackgroundLoader::new(1);
        loader.load_volume(dir.path().to_path_buf()).unwrap();
        assert!(loader.is_busy());

        match wait(&mut loader) {
            LoadEvent::Volume { folder, result } => {
                assert_eq!(folder, dir.path());
                assert!(matches!(result, Err(LoadError::Empty(_))));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(!loader.is_busy());
    }

    #[test]
    fn test_mask_slice_count_error_comes_back() {
        let dir = tempfile::tempdir().unwrap();
        let volume = VolumeData {
            width: 1,
            height: 1,
            depth: 2,
            voxels: vec![0, u16::MAX, 0, u16::MAX],
            size: Vec3::ONE,
            mask: false,
        };
        let mut loader = BackgroundLoader::new(1);
        loader.load_mask(dir.path().to_path_buf(), volume).unwrap();

        match wait(&mut loader) {
            LoadEvent::Mask { result, .. } => {
                assert!(matches!(
                    result,
                    Err(LoadError::MaskSliceCount { expected: 2, actual: 0 })
                ));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
