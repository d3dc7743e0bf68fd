#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use fieldpack::images::ImageStore;
use fieldpack::store::MemoryStore;
use serde_json::{json, Value};
use tempfile::TempDir;

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// One job entry for an intake manifest.
pub fn intake_job(job_id: &str, image_file: Option<&str>) -> Value {
    let mut job = json!({
        "jobId": job_id,
        "clientName": format!("Client {job_id}"),
        "address": {"line1": "1 Main St", "city": "Largo", "state": "FL", "zip": "33770"},
        "notes": "gate code 1234"
    });
    if let Some(image) = image_file {
        job["overhead"] = json!({
            "imageFile": image,
            "source": {"name": "county-gis", "url": "https://gis.example/e1", "fetchedAt": 1758895210},
            "scalePixelsPerFoot": 10.0
        });
    }
    job
}

/// Writes `jobs.json` for `jobs` into `dir`.
pub fn write_manifest(dir: &Path, jobs: Vec<Value>) {
    fs::create_dir_all(dir).expect("create package dir");
    let manifest = json!({
        "version": "1.0",
        "createdAt": "2025-09-26T14:00:10Z",
        "preparedBy": "dispatch-desk",
        "jobs": jobs
    });
    fs::write(
        dir.join("jobs.json"),
        serde_json::to_vec_pretty(&manifest).expect("encode manifest"),
    )
    .expect("write manifest");
}

/// A package folder with job E1 and its 400x300 overhead image.
pub fn write_e1_package(dir: &Path) {
    write_bmp(&dir.join("overhead/E1.bmp"), 400, 300);
    write_manifest(dir, vec![intake_job("E1", Some("overhead/E1.bmp"))]);
}

/// Scratch workspace: a data directory with an in-memory store and an
/// image root.
pub struct Workspace {
    pub dir: TempDir,
    pub store: MemoryStore,
    pub images: ImageStore,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let images = ImageStore::open(dir.path().join("images")).expect("open image store");
        Self {
            dir,
            store: MemoryStore::new(),
            images,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Files in the image root, ignoring staging directories.
    pub fn image_files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.images.root())
            .expect("read image root")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
