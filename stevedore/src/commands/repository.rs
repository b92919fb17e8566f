use super::{Dispatcher, STATUS_ERROR, STATUS_OK};
use crate::options::CommandOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

impl Dispatcher {
    /// `create-repository [location]`
    ///
    /// An explicit location must not exist yet. Without one, the configured
    /// repository is (re)initialized in place.
    pub(super) fn create_repository(&mut self, options: &CommandOptions) -> i32 {
        let location = options
            .get("location")
            .map(str::trim)
            .filter(|location| !location.is_empty());

        let path = match location {
            Some(location) => {
                let path = PathBuf::from(location);
                if path.exists() {
                    self.sink.error(&format!(
                        "Repository location already exists: {}",
                        path.display()
                    ));
                    return STATUS_ERROR;
                }
                path
            }
            None => self.ctx.settings.repository.clone(),
        };

        self.create_repo_at(&path)
    }

    fn create_repo_at(&mut self, path: &Path) -> i32 {
        debug!(path = %path.display(), "creating repository");
        if self.store.create_repo(path) {
            self.sink
                .info(&format!("Repository created at {}", path.display()));
            STATUS_OK
        } else {
            self.sink.error(&format!(
                "Failed to create repository at {}",
                path.display()
            ));
            STATUS_ERROR
        }
    }
}
