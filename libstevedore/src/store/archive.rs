//! Tar archive layouts understood by the filesystem store.
//!
//! Two layouts exist. The docker-save layout has a `manifest.json` listing
//! config and layer members. The clone layout has an `image.json` holding the
//! store's own manifest and one `layers/<hex>` member per layer.

use crate::error::{Result, StevedoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, Builder, Entry, Header};

pub(super) const DOCKER_MANIFEST: &str = "manifest.json";
pub(super) const DOCKER_CONFIG: &str = "config.json";
pub(super) const CLONE_MANIFEST: &str = "image.json";
pub(super) const CLONE_LAYER_PREFIX: &str = "layers/";

/// One image entry of a docker-save `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub(super) struct SavedImage {
    pub(super) config: String,
    #[serde(default)]
    pub(super) repo_tags: Option<Vec<String>>,
    pub(super) layers: Vec<String>,
}

fn open(path: &Path) -> Result<Archive<File>> {
    let file = File::open(path)
        .map_err(|e| StevedoreError::storage_with_source("Failed to open archive", path, e))?;
    Ok(Archive::new(file))
}

/// Calls `visit` for every regular file in the archive, in archive order.
pub(super) fn for_each_member<F>(path: &Path, mut visit: F) -> Result<()>
where
    F: FnMut(&str, &mut dyn Read) -> Result<()>,
{
    let mut archive = open(path)?;
    let entries = archive
        .entries()
        .map_err(|e| StevedoreError::storage_with_source("Failed to read archive", path, e))?;

    for entry in entries {
        let mut entry = entry
            .map_err(|e| StevedoreError::storage_with_source("Corrupt archive entry", path, e))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let name = member_name(path, &entry)?;
        visit(&name, &mut entry)?;
    }

    Ok(())
}

/// Maps every symlink and hard link member to the member name it points at.
///
/// Symlink targets are taken relative to the link's directory, hard link
/// targets relative to the archive root. Targets escaping the archive are
/// dropped.
pub(super) fn links(path: &Path) -> Result<HashMap<String, String>> {
    let mut archive = open(path)?;
    let entries = archive
        .entries()
        .map_err(|e| StevedoreError::storage_with_source("Failed to read archive", path, e))?;

    let mut links = HashMap::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| StevedoreError::storage_with_source("Corrupt archive entry", path, e))?;
        let kind = entry.header().entry_type();
        if !kind.is_symlink() && !kind.is_hard_link() {
            continue;
        }

        let name = member_name(path, &entry)?;
        let Some(target) = entry
            .link_name()
            .map_err(|e| StevedoreError::storage_with_source("Invalid archive link target", path, e))?
        else {
            continue;
        };

        let target: PathBuf = match Path::new(&name).parent() {
            Some(dir) if kind.is_symlink() => dir.join(&target),
            _ => target.into_owned(),
        };
        if let Some(resolved) = normalize_member(&target) {
            links.insert(name, resolved);
        }
    }

    Ok(links)
}

/// Follows `name` through `links` to the member holding the data.
pub(super) fn resolve_link<'a>(links: &'a HashMap<String, String>, name: &'a str) -> &'a str {
    let mut current = name;
    // a chain never needs more hops than there are links; stop on cycles
    for _ in 0..links.len() {
        match links.get(current) {
            Some(target) => current = target,
            None => break,
        }
    }
    current
}

fn member_name<R: Read>(path: &Path, entry: &Entry<'_, R>) -> Result<String> {
    Ok(entry
        .path()
        .map_err(|e| StevedoreError::storage_with_source("Invalid archive member name", path, e))?
        .to_string_lossy()
        .trim_start_matches("./")
        .to_string())
}

fn normalize_member(path: &Path) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Returns the contents of the member called `name`, if present.
pub(super) fn read_member(path: &Path, name: &str) -> Result<Option<Vec<u8>>> {
    let mut found = None;
    for_each_member(path, |member, reader| {
        if found.is_none() && member == name {
            found = Some(read_all(path, reader)?);
        }
        Ok(())
    })?;
    Ok(found)
}

pub(super) fn read_all(path: &Path, reader: &mut dyn Read) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    reader
        .read_to_end(&mut buffer)
        .map_err(|e| StevedoreError::storage_with_source("Failed to read archive member", path, e))?;
    Ok(buffer)
}

/// Appends `value` as a JSON member called `name`.
pub(super) fn append_json<W, T>(builder: &mut Builder<W>, name: &str, value: &T) -> Result<()>
where
    W: Write,
    T: Serialize,
{
    let data = serde_json::to_vec_pretty(value)
        .map_err(|e| StevedoreError::validation_with_source("Failed to encode archive metadata", e))?;

    let mut header = Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(chrono::Utc::now().timestamp().max(0) as u64);

    builder
        .append_data(&mut header, name, data.as_slice())
        .map_err(|e| StevedoreError::storage_with_source("Failed to write archive member", Path::new(name), e))
}
