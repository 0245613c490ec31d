//! Snapshot storage.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context;

use crate::image::Image;

/// A picture taken by the frame loop.
#[derive(Debug, Clone, Copy)]
pub struct CaptureEvent<'a> {
    /// The camera frame, without any overlays.
    pub frame: &'a Image,
    pub taken_at: SystemTime,
}

impl CaptureEvent<'_> {
    /// Returns the file name for this snapshot, `snapshot_<unix seconds>.png`.
    pub fn file_name(&self) -> String {
        let secs = self
            .taken_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        format!("snapshot_{secs}.png")
    }
}

/// Persists captured snapshots.
pub trait SnapshotStore {
    /// Stores the snapshot and returns where it went.
    fn store(&mut self, event: &CaptureEvent<'_>) -> anyhow::Result<PathBuf>;
}

/// Writes snapshots as PNG files into a directory.
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    /// Creates the store, creating `dir` and its parents if needed.
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create output directory '{}'", dir.display()))?;
        log::info!("saving snapshots to '{}'", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SnapshotStore for DiskStore {
    fn store(&mut self, event: &CaptureEvent<'_>) -> anyhow::Result<PathBuf> {
        let path = self.dir.join(event.file_name());
        event
            .frame
            .save(&path)
            .with_context(|| format!("failed to save snapshot to '{}'", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::image::Color;

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "thumbsnap-{name}-{}-{}",
            std::process::id(),
            fastrand::u32(..),
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn file_name_uses_unix_seconds() {
        let frame = Image::new(1, 1);
        let event = CaptureEvent {
            frame: &frame,
            taken_at: UNIX_EPOCH + Duration::from_millis(1_700_000_000_999),
        };
        assert_eq!(event.file_name(), "snapshot_1700000000.png");
    }

    #[test]
    fn stores_png() {
        let dir = scratch_dir("store");
        let mut store = DiskStore::new(dir.join("nested")).unwrap();
        assert!(store.dir().is_dir());

        let mut frame = Image::new(3, 2);
        frame.clear(Color::BLUE);
        let event = CaptureEvent {
            frame: &frame,
            taken_at: UNIX_EPOCH + Duration::from_secs(42),
        };
        let path = store.store(&event).unwrap();
        assert_eq!(path, dir.join("nested").join("snapshot_42.png"));

        let saved = ::image::open(&path).unwrap().to_rgba8();
        assert_eq!(saved.dimensions(), (3, 2));
        assert_eq!(saved.get_pixel(2, 1).0, [0, 0, 255, 255]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unwritable_dir_fails() {
        let dir = scratch_dir("unwritable");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("not-a-dir");
        fs::write(&file, b"").unwrap();

        assert!(DiskStore::new(&file).is_err());

        fs::remove_dir_all(&dir).unwrap();
    }
}
