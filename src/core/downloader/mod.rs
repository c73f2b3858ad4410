pub mod client;
pub mod progress;

pub use client::Downloader;
pub use progress::{format_bytes, format_eta, format_speed, DownloadProgress, DownloadTask};
