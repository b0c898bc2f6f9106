//! Fixtures shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::error::{PreloadError, Result};
use crate::reader::RawDataReader;
use crate::resolver::SearchPathProbe;

/// Write `data` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, data: &[u8]) -> PathBuf {
    let file = root.join(rel);
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(&file, data).expect("write file");
    file
}

pub fn make_dir(root: &Path, rel: &str) -> PathBuf {
    let dir = root.join(rel);
    std::fs::create_dir_all(&dir).expect("create dir");
    dir
}

/// Encode a solid-color PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 90, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}

/// Build an uncompressed zip archive in memory.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in entries {
        writer.start_file(*name, options).expect("start entry");
        writer.write_all(data).expect("write entry");
    }
    writer.finish().expect("finish archive").into_inner()
}

/// Format 3 sprite sheet plist with one frame per name.
pub fn frames_plist(texture: &str, frames: &[&str]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>frames</key>
    <dict>
"#,
    );
    for name in frames {
        xml.push_str(&format!(
            r#"        <key>{}</key>
        <dict>
            <key>aliases</key><array/>
            <key>spriteOffset</key><string>{{0.5,-1}}</string>
            <key>spriteSize</key><string>{{60,58}}</string>
            <key>spriteSourceSize</key><string>{{62,60}}</string>
            <key>textureRect</key><string>{{{{2,4}},{{60,58}}}}</string>
            <key>textureRotated</key><true/>
        </dict>
"#,
            name
        ));
    }
    xml.push_str(&format!(
        r#"    </dict>
    <key>metadata</key>
    <dict>
        <key>format</key><integer>3</integer>
        <key>textureFileName</key><string>{}</string>
    </dict>
</dict>
</plist>
"#,
        texture
    ));
    xml
}

/// Probe over a fixed set of `root/filename` paths that counts every probe.
pub struct CountingProbe {
    files: HashSet<PathBuf>,
    probes: AtomicUsize,
}

impl CountingProbe {
    pub fn with_files(files: &[&str]) -> Self {
        Self {
            files: files.iter().map(PathBuf::from).collect(),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl SearchPathProbe for CountingProbe {
    fn path_for_filename(&self, filename: &str, root: &Path) -> Option<PathBuf> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let candidate = root.join(filename);
        self.files.contains(&candidate).then_some(candidate)
    }
}

/// In-memory resource tree acting as both probe and reader.
///
/// Reads can be made to fail per path or to sleep before returning.
#[derive(Default)]
pub struct MemoryAssets {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    failing: Mutex<HashSet<PathBuf>>,
    delay: Option<Duration>,
    reads: AtomicUsize,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn insert(&self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.files.lock().expect("files").insert(path.into(), data);
    }

    /// Add `root/{name}.png` and `root/{name}.plist` for a sprite sheet.
    pub fn insert_sheet(&self, root: &str, name: &str) {
        let png = format!("{}/{}.png", root, name);
        let plist = format!("{}/{}.plist", root, name);
        let stem = Path::new(name)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let frame = format!("{}_001.png", stem);
        self.insert(png, png_bytes(2, 2));
        self.insert(
            plist,
            frames_plist(&format!("{}.png", stem), &[frame.as_str()]).into_bytes(),
        );
    }

    pub fn fail_reads_of(&self, path: impl Into<PathBuf>) {
        self.failing.lock().expect("failing").insert(path.into());
    }

    pub fn allow_reads_of(&self, path: impl AsRef<Path>) {
        self.failing.lock().expect("failing").remove(path.as_ref());
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SearchPathProbe for MemoryAssets {
    fn path_for_filename(&self, filename: &str, root: &Path) -> Option<PathBuf> {
        let candidate = root.join(filename);
        self.files
            .lock()
            .expect("files")
            .contains_key(&candidate)
            .then_some(candidate)
    }
}

impl RawDataReader for MemoryAssets {
    fn read_all(&self, path: &Path) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.failing.lock().expect("failing").contains(path) {
            return Err(PreloadError::read(path, "injected failure"));
        }
        self.files
            .lock()
            .expect("files")
            .get(path)
            .cloned()
            .ok_or_else(|| PreloadError::read(path, "no such file"))
    }
}
