//! Extractor catalog and the external download collaborator.

pub mod downloader;
pub mod registry;

pub use downloader::{
    resolve_redirect, DownloadError, DownloadOptions, DownloadResult, DownloadedFile,
    MediaDownloader, YtDlpDownloader,
};
pub use registry::{Capability, ExtractorDescriptor};
