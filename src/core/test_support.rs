// Shared fixtures for tests that need an HTTP endpoint or a prepared archive.

use std::io::Write;
use std::path::Path;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct TestServer {
    base_url: String,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serve `router` on an ephemeral localhost port.
pub async fn serve(router: Router) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    TestServer {
        base_url: format!("http://{addr}"),
        handle,
    }
}

/// URL on a localhost port with nothing listening.
pub async fn unreachable_url(path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}{path}")
}

/// Build a zip archive in memory from `(name, contents)` pairs.
/// Names ending in `/` become directory entries.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default();
        for (name, contents) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(contents).unwrap();
            }
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    std::fs::write(path, zip_bytes(entries)).unwrap();
}

/// Write a 7z archive from `(name, contents)` pairs, one block per file.
/// Names ending in `/` become directory entries.
pub fn write_7z(path: &Path, entries: &[(&str, &[u8])]) {
    let mut writer = sevenz_rust::SevenZWriter::create(path).unwrap();
    for (name, contents) in entries {
        let mut entry = sevenz_rust::SevenZArchiveEntry::new();
        if let Some(dir) = name.strip_suffix('/') {
            entry.name = dir.to_string();
            entry.is_directory = true;
            writer.push_archive_entry(entry, None::<&[u8]>).unwrap();
        } else {
            entry.name = name.to_string();
            entry.has_stream = true;
            writer.push_archive_entry(entry, Some(*contents)).unwrap();
        }
    }
    writer.finish().unwrap();
}
