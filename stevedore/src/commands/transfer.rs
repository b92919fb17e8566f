//! `load`, `import`, `export` and `clone`.
//!
//! Each run walks `Validating -> ResolvingReference -> Delegating -> Done`.
//! Any state may jump straight to `Done` with a failure status; the store is
//! called at most once, and only from `Delegating`.

use super::{Dispatcher, STATUS_ERROR, STATUS_OK};
use crate::options::CommandOptions;
use libstevedore::reference::ImageReference;
use libstevedore::store::ImportExportRequest;
use std::path::PathBuf;
use tracing::debug;

/// Which transfer a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Load,
    Import,
    Export,
    Clone,
}

impl TransferKind {
    /// Options that must be present before anything else happens.
    pub fn required_options(self) -> &'static [&'static str] {
        match self {
            TransferKind::Load => &["input"],
            TransferKind::Import => &["file", "image"],
            TransferKind::Export => &["output", "image"],
            TransferKind::Clone => &["source", "target"],
        }
    }
}

/// The single store call a run ends up making.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Job {
    Load(PathBuf),
    Import(ImportExportRequest),
    Export(ImportExportRequest),
    Clone {
        source: ImageReference,
        target: ImageReference,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TransferState {
    Validating,
    ResolvingReference,
    Delegating(Job),
    Done(i32),
}

impl TransferState {
    fn name(&self) -> &'static str {
        match self {
            TransferState::Validating => "validating",
            TransferState::ResolvingReference => "resolving-reference",
            TransferState::Delegating(_) => "delegating",
            TransferState::Done(_) => "done",
        }
    }
}

impl Dispatcher {
    pub(super) fn transfer(&mut self, kind: TransferKind, options: &CommandOptions) -> i32 {
        let mut state = TransferState::Validating;
        loop {
            debug!(?kind, state = state.name(), "transfer step");
            state = match state {
                TransferState::Validating => self.validate_transfer(kind, options),
                TransferState::ResolvingReference => self.resolve_transfer(kind, options),
                TransferState::Delegating(job) => TransferState::Done(self.delegate(job)),
                TransferState::Done(status) => return status,
            };
        }
    }

    fn validate_transfer(&self, kind: TransferKind, options: &CommandOptions) -> TransferState {
        if !self.require(options, kind.required_options()) {
            return TransferState::Done(STATUS_ERROR);
        }

        match kind {
            TransferKind::Load => {
                let input = options.get("input").unwrap_or_default().trim();
                TransferState::Delegating(Job::Load(PathBuf::from(input)))
            }
            _ => TransferState::ResolvingReference,
        }
    }

    fn resolve_transfer(&self, kind: TransferKind, options: &CommandOptions) -> TransferState {
        let resolve = |name: &str| self.resolve_reference(options.get(name).unwrap_or_default());
        let tar_format = !options.flag("clone");

        let job = match kind {
            TransferKind::Load => {
                return TransferState::Done(STATUS_ERROR);
            }
            TransferKind::Import => {
                let Some(reference) = resolve("image") else {
                    return TransferState::Done(STATUS_ERROR);
                };
                let file = options.get("file").unwrap_or_default().trim();
                Job::Import(
                    ImportExportRequest::new(file, reference)
                        .with_move(options.flag("move"))
                        .with_tar_format(tar_format),
                )
            }
            TransferKind::Export => {
                let Some(reference) = resolve("image") else {
                    return TransferState::Done(STATUS_ERROR);
                };
                let output = options.get("output").unwrap_or_default().trim();
                Job::Export(ImportExportRequest::new(output, reference).with_tar_format(tar_format))
            }
            TransferKind::Clone => {
                let (Some(source), Some(target)) = (resolve("source"), resolve("target")) else {
                    return TransferState::Done(STATUS_ERROR);
                };
                Job::Clone { source, target }
            }
        };

        TransferState::Delegating(job)
    }

    fn delegate(&mut self, job: Job) -> i32 {
        match job {
            Job::Load(path) => {
                let loaded = self.store.load(&path);
                if loaded.is_empty() {
                    self.sink
                        .error(&format!("No images loaded from {}", path.display()));
                    return STATUS_ERROR;
                }
                for name in &loaded {
                    self.sink.info(&format!("Loaded {}", name));
                }
                STATUS_OK
            }
            Job::Import(request) => {
                if self.store.import_toimage(&request) {
                    self.sink.info(&format!(
                        "Imported {} as {}",
                        request.source_path.display(),
                        request.target_reference
                    ));
                    STATUS_OK
                } else {
                    self.sink.error(&format!(
                        "Failed to import {} as {}",
                        request.source_path.display(),
                        request.target_reference
                    ));
                    STATUS_ERROR
                }
            }
            Job::Export(request) => match self.store.export_image(&request) {
                Some(written) if !written.as_os_str().is_empty() => {
                    self.sink.info(&format!(
                        "Exported {} to {}",
                        request.target_reference,
                        written.display()
                    ));
                    STATUS_OK
                }
                _ => {
                    self.sink
                        .error(&format!("Failed to export {}", request.target_reference));
                    STATUS_ERROR
                }
            },
            Job::Clone { source, target } => {
                if self.store.clone_image(&source, &target) {
                    self.sink
                        .info(&format!("Cloned {} to {}", source, target));
                    STATUS_OK
                } else {
                    self.sink
                        .error(&format!("Failed to clone {} to {}", source, target));
                    STATUS_ERROR
                }
            }
        }
    }
}
