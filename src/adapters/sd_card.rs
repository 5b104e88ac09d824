//! File-backed storage.
//!
//! Each record lives at `<root>/<namespace>/<key>.cfg`.  On the device
//! `root` is the FAT mount point of the SD card (e.g. `/sdcard`); on the
//! host any directory works.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use log::{debug, warn};

use crate::app::ports::{StorageError, StoragePort};

pub struct SdCardStorage {
    root: PathBuf,
}

impl SdCardStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, namespace: &str, key: &str) -> PathBuf {
        self.root.join(namespace).join(format!("{key}.cfg"))
    }
}

fn map_io(e: std::io::Error) -> StorageError {
    match e.kind() {
        ErrorKind::NotFound => StorageError::NotFound,
        _ => {
            warn!("SD: {}", e);
            StorageError::IoError
        }
    }
}

impl StoragePort for SdCardStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = fs::read(self.path(namespace, key)).map_err(map_io)?;
        let dst = buf.get_mut(..data.len()).ok_or(StorageError::BufferTooSmall)?;
        dst.copy_from_slice(&data);
        Ok(data.len())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.path(namespace, key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(map_io)?;
        }
        fs::write(&path, data).map_err(map_io)?;
        debug!("SD: wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(namespace, key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_io(e)),
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.path(namespace, key).is_file()
    }
}
