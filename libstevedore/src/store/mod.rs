//! Local content-addressable image storage.
//!
//! The command layer reaches the repository through [`LocalImageStore`],
//! whose methods report plain success values. [`FsImageStore`] is the
//! on-disk implementation and also offers `Result`-returning variants for
//! callers that want the error detail.

use crate::reference::ImageReference;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

mod archive;
mod fs;
pub use fs::FsImageStore;


/// Operations the command layer needs from the local image repository.
pub trait LocalImageStore {
    /// Initializes a repository rooted at `path`. Returns true on success.
    fn create_repo(&mut self, path: &Path) -> bool;

    /// Loads a docker-save archive, returning the `repository:tag` names of
    /// the images that were stored. An empty list means nothing was loaded.
    fn load(&mut self, archive: &Path) -> Vec<String>;

    /// Imports an archive as the image named by the request.
    fn import_toimage(&mut self, request: &ImportExportRequest) -> bool;

    /// Writes the image named by the request to an archive, returning the
    /// path that was written.
    fn export_image(&mut self, request: &ImportExportRequest) -> Option<PathBuf>;

    /// Creates `target` as a copy of `source`, sharing its layers.
    fn clone_image(&mut self, source: &ImageReference, target: &ImageReference) -> bool;

    /// Lists the images currently stored.
    fn list_images(&self) -> Vec<ImageSummary>;
}

/// Everything an import or export needs, built in one piece from the
/// command options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportExportRequest {
    /// Archive to read (import) or write (export)
    pub source_path: PathBuf,
    /// Image the archive is imported as, or exported from
    pub target_reference: ImageReference,
    /// Remove the source archive after a successful import
    pub move_flag: bool,
    /// Plain tar layout when true; native clone layout when false
    pub tar_format_flag: bool,
}

impl ImportExportRequest {
    /// Creates a request using the plain tar layout and no move.
    pub fn new(source_path: impl Into<PathBuf>, target_reference: ImageReference) -> Self {
        Self {
            source_path: source_path.into(),
            target_reference,
            move_flag: false,
            tar_format_flag: true,
        }
    }

    /// Sets whether the source archive is removed after import.
    pub fn with_move(mut self, move_flag: bool) -> Self {
        self.move_flag = move_flag;
        self
    }

    /// Sets the archive layout.
    pub fn with_tar_format(mut self, tar_format_flag: bool) -> Self {
        self.tar_format_flag = tar_format_flag;
        self
    }
}

/// Summary of one stored image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    pub reference: ImageReference,
    pub layers: usize,
    pub size: u64,
    pub created: DateTime<Utc>,
}
