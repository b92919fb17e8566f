//! On-disk image repository.
//!
//! Layout under the repository root:
//!
//! ```text
//! repos/<repository>/_tags/<tag>.json   image manifests
//! layers/<hex>                          layer blobs, named by sha256
//! ```

use super::archive::{
    self, CLONE_LAYER_PREFIX, CLONE_MANIFEST, DOCKER_CONFIG, DOCKER_MANIFEST, SavedImage,
};
use super::{ImageSummary, ImportExportRequest, LocalImageStore};
use crate::digest::{Digest, HashingWriter};
use crate::error::{Result, StevedoreError};
use crate::reference::ImageReference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tar::Builder;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const REPOS_DIR: &str = "repos";
const LAYERS_DIR: &str = "layers";
const TAGS_DIR: &str = "_tags";
const PARTIAL_LAYER: &str = ".partial";

/// Stored description of one tagged image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ImageManifest {
    pub(crate) reference: ImageReference,
    pub(crate) created: DateTime<Utc>,
    /// Layer digests, bottom layer first
    pub(crate) layers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) config: Option<Value>,
}

/// Filesystem-backed [`LocalImageStore`].
///
/// # Examples
///
/// ```
/// use libstevedore::store::{FsImageStore, LocalImageStore};
///
/// let dir = tempfile::tempdir().unwrap();
/// let mut store = FsImageStore::new(dir.path().join("repo"));
/// assert!(!store.is_initialized());
///
/// let root = store.root().to_path_buf();
/// assert!(store.create_repo(&root));
/// assert!(store.is_initialized());
/// assert!(store.list_images().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    /// Creates a store rooted at `root`. Nothing is touched on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns true when the repository layout exists under the root.
    pub fn is_initialized(&self) -> bool {
        self.repos_dir().is_dir() && self.layers_dir().is_dir()
    }

    /// Creates the repository layout at `path` and makes it the store root.
    pub fn initialize(&mut self, path: &Path) -> Result<()> {
        for dir in [path.join(REPOS_DIR), path.join(LAYERS_DIR)] {
            fs::create_dir_all(&dir).map_err(|e| {
                StevedoreError::storage_with_source("Failed to create repository directory", &dir, e)
            })?;
        }
        self.root = path.to_path_buf();
        info!(root = %path.display(), "repository initialized");
        Ok(())
    }

    /// Stores every tagged image of a docker-save archive.
    ///
    /// Returns the references that were written. Untagged images are skipped.
    pub fn load_archive(&mut self, source: &Path) -> Result<Vec<ImageReference>> {
        self.ensure_layout()?;

        let manifest_bytes = archive::read_member(source, DOCKER_MANIFEST)?.ok_or_else(|| {
            StevedoreError::validation(format!(
                "{} is not a docker-save archive: {} missing",
                source.display(),
                DOCKER_MANIFEST
            ))
        })?;
        let saved: Vec<SavedImage> = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| StevedoreError::validation_with_source("Malformed archive manifest", e))?;

        let links = archive::links(source)?;
        let wanted_layers: HashSet<&str> = saved
            .iter()
            .flat_map(|image| image.layers.iter())
            .map(|member| archive::resolve_link(&links, member))
            .collect();
        let wanted_configs: HashSet<&str> = saved.iter().map(|image| image.config.as_str()).collect();

        let mut layer_digests: HashMap<String, Digest> = HashMap::new();
        let mut configs: HashMap<String, Value> = HashMap::new();
        archive::for_each_member(source, |name, reader| {
            if wanted_layers.contains(name) {
                let digest = self.store_layer(reader)?;
                layer_digests.insert(name.to_string(), digest);
            } else if wanted_configs.contains(name) {
                let bytes = archive::read_all(source, reader)?;
                match serde_json::from_slice(&bytes) {
                    Ok(config) => {
                        configs.insert(name.to_string(), config);
                    }
                    Err(e) => warn!(member = name, error = %e, "ignoring unreadable image config"),
                }
            }
            Ok(())
        })?;

        // every image is resolved before any tag is written
        let mut pending = Vec::new();
        for image in &saved {
            let layers = image
                .layers
                .iter()
                .map(|member| {
                    layer_digests
                        .get(archive::resolve_link(&links, member))
                        .map(ToString::to_string)
                        .ok_or_else(|| StevedoreError::not_found("layer", member.as_str()))
                })
                .collect::<Result<Vec<_>>>()?;

            let tags = image.repo_tags.as_deref().unwrap_or_default();
            if tags.is_empty() {
                warn!(config = %image.config, "skipping untagged image");
                continue;
            }

            for tag in tags {
                let Some(reference) = ImageReference::parse(tag) else {
                    warn!(tag = %tag, "skipping unparseable image tag");
                    continue;
                };
                self.manifest_path(&reference)?;
                pending.push(ImageManifest {
                    reference,
                    created: Utc::now(),
                    layers: layers.clone(),
                    config: configs.get(&image.config).cloned(),
                });
            }
        }

        let mut loaded = Vec::with_capacity(pending.len());
        for manifest in pending {
            self.write_manifest(&manifest)?;
            loaded.push(manifest.reference);
        }

        info!(archive = %source.display(), images = loaded.len(), "archive loaded");
        Ok(loaded)
    }

    /// Imports an archive as a new image.
    ///
    /// # Errors
    ///
    /// Fails when the target image already exists or the archive cannot be
    /// read in the requested layout.
    pub fn import_archive(&mut self, request: &ImportExportRequest) -> Result<ImageReference> {
        self.ensure_layout()?;

        let reference = &request.target_reference;
        if self.manifest_path(reference)?.exists() {
            return Err(StevedoreError::validation(format!(
                "Image {} already exists",
                reference
            )));
        }

        let source = &request.source_path;
        let manifest = if request.tar_format_flag {
            let mut file = File::open(source).map_err(|e| {
                StevedoreError::storage_with_source("Failed to open archive", source, e)
            })?;
            let digest = self.store_layer(&mut file)?;
            ImageManifest {
                reference: reference.clone(),
                created: Utc::now(),
                layers: vec![digest.to_string()],
                config: None,
            }
        } else {
            self.import_clone(source, reference)?
        };
        self.write_manifest(&manifest)?;

        if request.move_flag {
            if let Err(e) = fs::remove_file(source) {
                warn!(archive = %source.display(), error = %e, "image imported but archive not removed");
            }
        }

        info!(image = %reference, archive = %source.display(), "archive imported");
        Ok(reference.clone())
    }

    fn import_clone(&self, source: &Path, reference: &ImageReference) -> Result<ImageManifest> {
        let mut original: Option<ImageManifest> = None;
        let mut stored: HashSet<String> = HashSet::new();

        archive::for_each_member(source, |name, reader| {
            if name == CLONE_MANIFEST {
                let bytes = archive::read_all(source, reader)?;
                let manifest = serde_json::from_slice(&bytes).map_err(|e| {
                    StevedoreError::validation_with_source("Malformed image manifest in archive", e)
                })?;
                original = Some(manifest);
            } else if let Some(hex) = name.strip_prefix(CLONE_LAYER_PREFIX) {
                let digest = self.store_layer(reader)?;
                if digest.hex() != hex {
                    return Err(StevedoreError::validation(format!(
                        "Layer {} does not match its content digest",
                        name
                    )));
                }
                stored.insert(digest.to_string());
            }
            Ok(())
        })?;

        let original = original.ok_or_else(|| {
            StevedoreError::validation(format!(
                "{} is not a clone archive: {} missing",
                source.display(),
                CLONE_MANIFEST
            ))
        })?;

        for layer in &original.layers {
            if !stored.contains(layer) && !self.layer_path(layer)?.exists() {
                return Err(StevedoreError::not_found("layer", layer.as_str()));
            }
        }

        Ok(ImageManifest {
            reference: reference.clone(),
            ..original
        })
    }

    /// Writes an image to the archive path named by the request.
    pub fn export_archive(&self, request: &ImportExportRequest) -> Result<PathBuf> {
        let manifest = self.read_manifest(&request.target_reference)?;
        let output = &request.source_path;

        let file = File::create(output)
            .map_err(|e| StevedoreError::storage_with_source("Failed to create archive", output, e))?;
        let mut builder = Builder::new(BufWriter::new(file));

        if request.tar_format_flag {
            self.write_docker_save(&mut builder, &manifest)?;
        } else {
            self.write_clone(&mut builder, &manifest)?;
        }

        let mut writer = builder
            .into_inner()
            .map_err(|e| StevedoreError::storage_with_source("Failed to finish archive", output, e))?;
        writer
            .flush()
            .map_err(|e| StevedoreError::storage_with_source("Failed to finish archive", output, e))?;

        info!(image = %manifest.reference, archive = %output.display(), "image exported");
        Ok(output.clone())
    }

    fn write_docker_save<W: Write>(&self, builder: &mut Builder<W>, manifest: &ImageManifest) -> Result<()> {
        let mut members = Vec::with_capacity(manifest.layers.len());
        for layer in &manifest.layers {
            let path = self.layer_path(layer)?;
            let member = format!("{}/layer.tar", Digest::from_str(layer)?.hex());
            builder
                .append_path_with_name(&path, &member)
                .map_err(|e| StevedoreError::storage_with_source("Failed to archive layer", &path, e))?;
            members.push(member);
        }

        let config = manifest
            .config
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default()));
        archive::append_json(builder, DOCKER_CONFIG, &config)?;

        let saved = vec![SavedImage {
            config: DOCKER_CONFIG.to_string(),
            repo_tags: Some(vec![manifest.reference.to_string()]),
            layers: members,
        }];
        archive::append_json(builder, DOCKER_MANIFEST, &saved)
    }

    fn write_clone<W: Write>(&self, builder: &mut Builder<W>, manifest: &ImageManifest) -> Result<()> {
        archive::append_json(builder, CLONE_MANIFEST, manifest)?;
        for layer in &manifest.layers {
            let path = self.layer_path(layer)?;
            let member = format!("{}{}", CLONE_LAYER_PREFIX, Digest::from_str(layer)?.hex());
            builder
                .append_path_with_name(&path, &member)
                .map_err(|e| StevedoreError::storage_with_source("Failed to archive layer", &path, e))?;
        }
        Ok(())
    }

    /// Tags `source` as `target`. Layers are shared, not copied.
    pub fn clone_reference(&mut self, source: &ImageReference, target: &ImageReference) -> Result<()> {
        let mut manifest = self.read_manifest(source)?;
        if self.manifest_path(target)?.exists() {
            return Err(StevedoreError::validation(format!(
                "Image {} already exists",
                target
            )));
        }

        manifest.reference = target.clone();
        manifest.created = Utc::now();
        self.write_manifest(&manifest)?;
        info!(source = %source, target = %target, "image cloned");
        Ok(())
    }

    /// Lists stored images sorted by reference.
    pub fn images(&self) -> Result<Vec<ImageSummary>> {
        let repos = self.repos_dir();
        if !repos.is_dir() {
            return Ok(Vec::new());
        }

        let mut images = Vec::new();
        for entry in WalkDir::new(&repos).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            let in_tags_dir = path
                .parent()
                .and_then(Path::file_name)
                .is_some_and(|name| name == TAGS_DIR);
            if !entry.file_type().is_file()
                || !in_tags_dir
                || path.extension().is_none_or(|ext| ext != "json")
            {
                continue;
            }

            let manifest = match read_manifest_file(path) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable manifest");
                    continue;
                }
            };

            let size = manifest
                .layers
                .iter()
                .filter_map(|layer| self.layer_path(layer).ok())
                .filter_map(|layer_path| fs::metadata(layer_path).ok())
                .map(|meta| meta.len())
                .sum();

            images.push(ImageSummary {
                layers: manifest.layers.len(),
                reference: manifest.reference,
                size,
                created: manifest.created,
            });
        }

        images.sort_by(|a, b| a.reference.cmp(&b.reference));
        Ok(images)
    }

    fn repos_dir(&self) -> PathBuf {
        self.root.join(REPOS_DIR)
    }

    fn layers_dir(&self) -> PathBuf {
        self.root.join(LAYERS_DIR)
    }

    fn ensure_layout(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(StevedoreError::storage(
                "Repository is not initialized",
                &self.root,
            ))
        }
    }

    fn manifest_path(&self, reference: &ImageReference) -> Result<PathBuf> {
        let mut path = self.repos_dir();
        for component in reference.repository().split('/') {
            if !is_safe_component(component) || component.starts_with('_') {
                return Err(StevedoreError::validation(format!(
                    "Repository name '{}' cannot be stored",
                    reference.repository()
                )));
            }
            path.push(component);
        }

        let tag = reference.tag();
        if !is_safe_component(tag) || tag.contains('/') {
            return Err(StevedoreError::validation(format!(
                "Tag '{}' cannot be stored",
                tag
            )));
        }

        Ok(path.join(TAGS_DIR).join(format!("{}.json", tag)))
    }

    fn layer_path(&self, digest: &str) -> Result<PathBuf> {
        Ok(self.layers_dir().join(Digest::from_str(digest)?.hex()))
    }

    fn read_manifest(&self, reference: &ImageReference) -> Result<ImageManifest> {
        let path = self.manifest_path(reference)?;
        if !path.exists() {
            return Err(StevedoreError::not_found("image", reference.to_string()));
        }
        read_manifest_file(&path)
    }

    fn write_manifest(&self, manifest: &ImageManifest) -> Result<()> {
        let path = self.manifest_path(&manifest.reference)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StevedoreError::storage_with_source("Failed to create tag directory", parent, e)
            })?;
        }

        let data = serde_json::to_vec_pretty(manifest)
            .map_err(|e| StevedoreError::validation_with_source("Failed to encode manifest", e))?;
        fs::write(&path, data)
            .map_err(|e| StevedoreError::storage_with_source("Failed to write manifest", &path, e))?;
        debug!(image = %manifest.reference, path = %path.display(), "manifest written");
        Ok(())
    }

    /// Copies a layer into the repository, naming it by its sha256.
    fn store_layer(&self, reader: &mut dyn Read) -> Result<Digest> {
        let layers = self.layers_dir();
        let partial = layers.join(PARTIAL_LAYER);

        let file = File::create(&partial)
            .map_err(|e| StevedoreError::storage_with_source("Failed to create layer", &partial, e))?;
        let mut writer = HashingWriter::new(BufWriter::new(file));
        io::copy(reader, &mut writer)
            .map_err(|e| StevedoreError::storage_with_source("Failed to write layer", &partial, e))?;
        writer
            .flush()
            .map_err(|e| StevedoreError::storage_with_source("Failed to write layer", &partial, e))?;
        let (_, digest, size) = writer.finish()?;

        let target = layers.join(digest.hex());
        let placed = if target.exists() {
            fs::remove_file(&partial)
        } else {
            fs::rename(&partial, &target)
        };
        placed.map_err(|e| StevedoreError::storage_with_source("Failed to store layer", &target, e))?;

        debug!(digest = %digest, size, "layer stored");
        Ok(digest)
    }
}

fn is_safe_component(component: &str) -> bool {
    !component.is_empty() && component != "." && component != ".." && !component.contains('\\')
}

fn read_manifest_file(path: &Path) -> Result<ImageManifest> {
    let data = fs::read(path)
        .map_err(|e| StevedoreError::storage_with_source("Failed to read manifest", path, e))?;
    serde_json::from_slice(&data)
        .map_err(|e| StevedoreError::validation_with_source("Malformed image manifest", e))
}

fn report<T>(action: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "{} failed", action);
            None
        }
    }
}

impl LocalImageStore for FsImageStore {
    fn create_repo(&mut self, path: &Path) -> bool {
        report("repository creation", self.initialize(path)).is_some()
    }

    fn load(&mut self, archive: &Path) -> Vec<String> {
        report("load", self.load_archive(archive))
            .unwrap_or_default()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn import_toimage(&mut self, request: &ImportExportRequest) -> bool {
        report("import", self.import_archive(request)).is_some()
    }

    fn export_image(&mut self, request: &ImportExportRequest) -> Option<PathBuf> {
        report("export", self.export_archive(request))
    }

    fn clone_image(&mut self, source: &ImageReference, target: &ImageReference) -> bool {
        report("clone", self.clone_reference(source, target)).is_some()
    }

    fn list_images(&self) -> Vec<ImageSummary> {
        report("image listing", self.images()).unwrap_or_default()
    }
}
