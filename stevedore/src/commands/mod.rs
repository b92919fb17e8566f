//! Command dispatch.
//!
//! [`Dispatcher`] owns the collaborators for one invocation and turns a
//! command name plus its [`CommandOptions`] into collaborator calls and an
//! exit status. Handlers never panic or return errors: every outcome becomes
//! [`STATUS_OK`] or [`STATUS_ERROR`] plus messages on the sink.

use crate::context::AppContext;
use crate::options::CommandOptions;
use crate::output::MessageSink;
use crate::terminal::Terminal;
use libstevedore::auth::CredentialStore;
use libstevedore::reference::ImageReference;
use libstevedore::registry::RegistryClient;
use libstevedore::store::LocalImageStore;
use tracing::debug;

mod images;
mod info;
mod login;
mod repository;
pub mod search;
pub mod transfer;
pub mod version;

#[cfg(test)]
mod fakes;


pub const STATUS_OK: i32 = 0;
pub const STATUS_ERROR: i32 = 1;

/// Command names the dispatcher understands.
pub const COMMANDS: &[&str] = &[
    "create-repository",
    "mkrepo",
    "load",
    "import",
    "export",
    "clone",
    "login",
    "logout",
    "search",
    "images",
    "info",
    "version",
];

/// Everything a command may talk to.
pub struct Collaborators {
    pub registry: Box<dyn RegistryClient>,
    pub store: Box<dyn LocalImageStore>,
    pub credentials: Box<dyn CredentialStore>,
    pub terminal: Box<dyn Terminal>,
    pub sink: Box<dyn MessageSink>,
}

pub struct Dispatcher {
    registry: Box<dyn RegistryClient>,
    store: Box<dyn LocalImageStore>,
    credentials: Box<dyn CredentialStore>,
    terminal: Box<dyn Terminal>,
    sink: Box<dyn MessageSink>,
    ctx: AppContext,
}

impl Dispatcher {
    pub fn new(ctx: AppContext, collaborators: Collaborators) -> Self {
        let Collaborators {
            registry,
            store,
            credentials,
            terminal,
            sink,
        } = collaborators;

        Self {
            registry,
            store,
            credentials,
            terminal,
            sink,
            ctx,
        }
    }

    /// Runs `name` with `options` and returns the exit status.
    pub fn dispatch(&mut self, name: &str, options: &CommandOptions) -> i32 {
        debug!(command = name, ?options, "dispatching");

        let status = match name {
            "create-repository" | "mkrepo" => self.create_repository(options),
            "load" => self.transfer(transfer::TransferKind::Load, options),
            "import" => self.transfer(transfer::TransferKind::Import, options),
            "export" => self.transfer(transfer::TransferKind::Export, options),
            "clone" => self.transfer(transfer::TransferKind::Clone, options),
            "login" => self.login(options),
            "logout" => self.logout(options),
            "search" => self.search(options),
            "images" => self.images(options),
            "info" => self.info(options),
            "version" => self.version(),
            _ => {
                self.sink.error(&format!("Unknown command: {}", name));
                STATUS_ERROR
            }
        };

        debug!(command = name, status, "command finished");
        status
    }

    /// Reports missing required options. Returns true when all are present.
    fn require(&self, options: &CommandOptions, required: &[&str]) -> bool {
        let missing = options.missing(required);
        if missing.is_empty() {
            return true;
        }

        let names: Vec<String> = missing.iter().map(|name| format!("<{}>", name)).collect();
        self.sink
            .error(&format!("Missing required option(s): {}", names.join(", ")));
        false
    }

    /// Resolves user input to an image reference using the registry's
    /// naming policy.
    fn resolve_reference(&self, raw: &str) -> Option<ImageReference> {
        let registry = self.registry.as_ref();
        let resolved = ImageReference::resolve(raw, |name| registry.is_repo_name(name));
        if resolved.is_none() {
            self.sink
                .error(&format!("Invalid image reference: {}", raw.trim()));
        }
        resolved
    }
}
