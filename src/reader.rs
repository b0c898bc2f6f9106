//! Thread-safe raw byte access for resource files.
//!
//! Worker threads read resource bytes concurrently. Storage layers that are
//! not safe for concurrent use are serialized behind a mutex; packaged
//! archives get a dedicated handle per read and only fall back to the
//! serialized path when the archive is unavailable or a read comes up short.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

use zip::ZipArchive;

use crate::constants::ARCHIVE_ASSET_PREFIX;
use crate::error::{PreloadError, Result};
use crate::resolver::{FsProbe, SearchPathProbe};
use crate::sync::lock;

/// Reads the complete contents of a resource file.
pub trait RawDataReader: Send + Sync {
    fn read_all(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Reader backed by the local filesystem.
#[derive(Debug, Default)]
pub struct FileReader {
    /// Held for the duration of every read when set
    serial: Option<Mutex<()>>,
}

impl FileReader {
    /// Reader that lets workers read concurrently.
    pub fn new() -> Self {
        Self { serial: None }
    }

    /// Reader that serializes every read through one mutex.
    pub fn serialized() -> Self {
        Self {
            serial: Some(Mutex::new(())),
        }
    }

    pub fn is_serialized(&self) -> bool {
        self.serial.is_some()
    }
}

impl RawDataReader for FileReader {
    fn read_all(&self, path: &Path) -> Result<Vec<u8>> {
        let _guard = self.serial.as_ref().map(lock);

        let data = std::fs::read(path).map_err(|e| PreloadError::read(path, e.to_string()))?;
        if data.is_empty() {
            return Err(PreloadError::read(path, "file is empty"));
        }
        Ok(data)
    }
}

type SharedArchive = ZipArchive<Cursor<Arc<[u8]>>>;

/// Reader for resources packaged in a zip archive (e.g. an APK's `assets/`).
///
/// The archive index is parsed once and cloned for every read, so workers
/// never contend on a shared handle.
pub struct ArchiveReader {
    archive: Option<SharedArchive>,
    prefix: String,
    fallback: FileReader,
    missing_logged: Once,
}

impl ArchiveReader {
    /// Open the archive at `path`. A missing or corrupt archive is logged and
    /// every read goes through the fallback reader.
    pub fn open(path: &Path) -> Self {
        log::info!("Opening resource archive: {:?}", path);

        let archive = std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| Self::parse(bytes).map_err(|e| e.to_string()));

        match archive {
            Ok(archive) => Self::with_archive(Some(archive)),
            Err(e) => {
                log::error!("Failed to open resource archive {:?}: {}", path, e);
                Self::with_archive(None)
            }
        }
    }

    /// Use an in-memory archive.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let archive = Self::parse(bytes).map_err(|e| PreloadError::read("<archive>", e.to_string()))?;
        Ok(Self::with_archive(Some(archive)))
    }

    /// Reader without an archive; every read uses the serialized fallback.
    pub fn unavailable() -> Self {
        Self::with_archive(None)
    }

    fn with_archive(archive: Option<SharedArchive>) -> Self {
        if let Some(archive) = &archive {
            log::debug!("Resource archive contains {} entries", archive.len());
        }
        Self {
            archive,
            prefix: ARCHIVE_ASSET_PREFIX.to_string(),
            fallback: FileReader::serialized(),
            missing_logged: Once::new(),
        }
    }

    fn parse(bytes: Vec<u8>) -> zip::result::ZipResult<SharedArchive> {
        let data: Arc<[u8]> = Arc::from(bytes);
        ZipArchive::new(Cursor::new(data))
    }

    pub fn is_available(&self) -> bool {
        self.archive.is_some()
    }

    /// Archive entry name for a resolved path.
    fn entry_name(&self, path: &Path) -> String {
        let text = path.to_string_lossy().replace('\\', "/");
        match text.strip_prefix(&self.prefix) {
            Some(stripped) => stripped.to_string(),
            None => text,
        }
    }

    fn read_entry(mut archive: SharedArchive, name: &str) -> std::result::Result<Vec<u8>, String> {
        let mut file = archive
            .by_name(name)
            .map_err(|e| format!("failed to open asset: {}", e))?;

        let size = file.size() as usize;
        let mut buffer = Vec::with_capacity(size);
        let read = file.read_to_end(&mut buffer).map_err(|e| e.to_string())?;

        if read != size || size == 0 {
            return Err(format!("size {} != {}", read, size));
        }
        Ok(buffer)
    }
}

impl RawDataReader for ArchiveReader {
    fn read_all(&self, path: &Path) -> Result<Vec<u8>> {
        let Some(archive) = &self.archive else {
            self.missing_logged.call_once(|| {
                log::error!("No resource archive available, reading files through the serialized fallback instead.");
            });
            return self.fallback.read_all(path);
        };

        let name = self.entry_name(path);
        match Self::read_entry(archive.clone(), &name) {
            Ok(data) => Ok(data),
            Err(e) => {
                log::error!("Failed to read asset ({}), falling back, path: {}", e, name);
                self.fallback.read_all(path)
            }
        }
    }
}

impl SearchPathProbe for ArchiveReader {
    fn path_for_filename(&self, filename: &str, root: &Path) -> Option<PathBuf> {
        let is_archive_root = root.to_string_lossy() == self.prefix.as_str();
        match &self.archive {
            Some(archive) if is_archive_root => archive
                .index_for_name(filename)
                .map(|_| PathBuf::from(format!("{}{}", self.prefix, filename))),
            _ => FsProbe.path_for_filename(filename, root),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_file, zip_bytes};
    use tempfile::tempdir;

    #[test]
    fn test_file_reader_reads_bytes() {
        let tmp = tempdir().expect("temp dir");
        let path = write_file(tmp.path(), "a.png", b"hello");

        assert_eq!(FileReader::new().read_all(&path).ok(), Some(b"hello".to_vec()));
        assert_eq!(
            FileReader::serialized().read_all(&path).ok(),
            Some(b"hello".to_vec())
        );
    }

    #[test]
    fn test_file_reader_rejects_missing_and_empty() {
        let tmp = tempdir().expect("temp dir");
        let empty = write_file(tmp.path(), "empty.png", b"");

        assert!(matches!(
            FileReader::new().read_all(&empty),
            Err(PreloadError::Read { .. })
        ));
        assert!(matches!(
            FileReader::new().read_all(&tmp.path().join("nope.png")),
            Err(PreloadError::Read { .. })
        ));
    }

    #[test]
    fn test_archive_reader_strips_asset_prefix() {
        let bytes = zip_bytes(&[("icons/player_01.png", b"sheet".as_slice())]);
        let reader = ArchiveReader::from_bytes(bytes).expect("valid archive");

        assert!(reader.is_available());
        let data = reader
            .read_all(Path::new("assets/icons/player_01.png"))
            .expect("entry exists");
        assert_eq!(data, b"sheet");
    }

    #[test]
    fn test_archive_reader_falls_back_to_filesystem() {
        let tmp = tempdir().expect("temp dir");
        let on_disk = write_file(tmp.path(), "loose.png", b"loose");
        let bytes = zip_bytes(&[("other.png", b"x".as_slice())]);
        let reader = ArchiveReader::from_bytes(bytes).expect("valid archive");

        assert_eq!(reader.read_all(&on_disk).ok(), Some(b"loose".to_vec()));
        assert!(reader.read_all(Path::new("assets/absent.png")).is_err());
    }

    #[test]
    fn test_unavailable_archive_uses_fallback() {
        let tmp = tempdir().expect("temp dir");
        let on_disk = write_file(tmp.path(), "a.plist", b"<plist/>");
        let reader = ArchiveReader::open(&tmp.path().join("missing.zip"));

        assert!(!reader.is_available());
        assert_eq!(reader.read_all(&on_disk).ok(), Some(b"<plist/>".to_vec()));
    }

    #[test]
    fn test_archive_probe() {
        let bytes = zip_bytes(&[("icons/a-hd.png", b"x".as_slice())]);
        let reader = ArchiveReader::from_bytes(bytes).expect("valid archive");

        assert_eq!(
            reader.path_for_filename("icons/a-hd.png", Path::new("assets/")),
            Some(PathBuf::from("assets/icons/a-hd.png"))
        );
        assert_eq!(
            reader.path_for_filename("icons/b-hd.png", Path::new("assets/")),
            None
        );
    }
}
