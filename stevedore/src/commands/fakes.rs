//! Scripted collaborators for dispatcher tests.
//!
//! Every fake appends a line to a shared [`CallLog`], so tests can assert on
//! which collaborator calls happened and in what order.

use super::{Collaborators, Dispatcher};
use crate::context::AppContext;
use crate::options::CommandOptions;
use crate::output::MemorySink;
use crate::terminal::Terminal;
use libstevedore::HostInfo;
use libstevedore::auth::{CredentialRecord, CredentialStore};
use libstevedore::config::Settings;
use libstevedore::error::{Result, StevedoreError};
use libstevedore::reference::ImageReference;
use libstevedore::registry::{RegistryClient, SearchPage};
use libstevedore::store::{ImageSummary, ImportExportRequest, LocalImageStore};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub type CallLog = Rc<RefCell<Vec<String>>>;

fn record(log: &CallLog, call: impl Into<String>) {
    log.borrow_mut().push(call.into());
}

#[derive(Clone)]
pub struct FakeRegistry {
    log: CallLog,
    pub pages: Vec<Option<SearchPage>>,
    served: Rc<RefCell<usize>>,
}

impl RegistryClient for FakeRegistry {
    fn search_get_page(&mut self, term: &str, page_idx: usize) -> Option<SearchPage> {
        record(&self.log, format!("registry.search_get_page {} {}", term, page_idx));
        *self.served.borrow_mut() = page_idx + 1;
        self.pages.get(page_idx).cloned().flatten()
    }

    fn search_ended(&self) -> bool {
        *self.served.borrow() >= self.pages.len()
    }

    fn is_repo_name(&self, name: &str) -> bool {
        !name.contains(char::is_whitespace) && !name.chars().any(char::is_uppercase)
    }
}

#[derive(Clone)]
pub struct FakeStore {
    log: CallLog,
    pub create_result: bool,
    pub load_result: Vec<String>,
    pub import_result: bool,
    pub export_result: Option<PathBuf>,
    pub clone_result: bool,
    pub images: Vec<ImageSummary>,
    pub requests: Rc<RefCell<Vec<ImportExportRequest>>>,
}

impl LocalImageStore for FakeStore {
    fn create_repo(&mut self, path: &Path) -> bool {
        record(&self.log, format!("store.create_repo {}", path.display()));
        self.create_result
    }

    fn load(&mut self, archive: &Path) -> Vec<String> {
        record(&self.log, format!("store.load {}", archive.display()));
        self.load_result.clone()
    }

    fn import_toimage(&mut self, request: &ImportExportRequest) -> bool {
        record(&self.log, format!("store.import_toimage {}", request.target_reference));
        self.requests.borrow_mut().push(request.clone());
        self.import_result
    }

    fn export_image(&mut self, request: &ImportExportRequest) -> Option<PathBuf> {
        record(&self.log, format!("store.export_image {}", request.target_reference));
        self.requests.borrow_mut().push(request.clone());
        self.export_result.clone()
    }

    fn clone_image(&mut self, source: &ImageReference, target: &ImageReference) -> bool {
        record(&self.log, format!("store.clone_image {} {}", source, target));
        self.clone_result
    }

    fn list_images(&self) -> Vec<ImageSummary> {
        record(&self.log, "store.list_images");
        self.images.clone()
    }
}

#[derive(Clone)]
pub struct FakeCredentials {
    log: CallLog,
    pub fail: bool,
}

impl FakeCredentials {
    fn outcome(&self) -> Result<()> {
        if self.fail {
            Err(StevedoreError::storage(
                "Keystore is not writable",
                Path::new("/keystore.toml"),
            ))
        } else {
            Ok(())
        }
    }
}

impl CredentialStore for FakeCredentials {
    fn put(&mut self, host: &str, username: &str, secret: &str) -> Result<()> {
        record(&self.log, format!("credentials.put {} {} {}", host, username, secret));
        self.outcome()
    }

    fn get(&self, host: &str) -> Result<Option<CredentialRecord>> {
        record(&self.log, format!("credentials.get {}", host));
        Ok(None)
    }

    fn delete(&mut self, host: &str) -> Result<()> {
        record(&self.log, format!("credentials.delete {}", host));
        self.outcome()
    }

    fn erase(&mut self) -> Result<()> {
        record(&self.log, "credentials.erase");
        self.outcome()
    }

    fn list(&self) -> Result<Vec<String>> {
        record(&self.log, "credentials.list");
        Ok(Vec::new())
    }
}

#[derive(Clone)]
pub struct FakeTerminal {
    log: CallLog,
    pub line: String,
    pub secret: String,
    pub answers: Rc<RefCell<VecDeque<bool>>>,
    pub fail_reads: bool,
}

impl Terminal for FakeTerminal {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        record(&self.log, format!("terminal.read_line {}", prompt.trim()));
        if self.fail_reads {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "closed"));
        }
        Ok(self.line.clone())
    }

    fn read_secret(&mut self, prompt: &str) -> io::Result<String> {
        record(&self.log, format!("terminal.read_secret {}", prompt.trim()));
        if self.fail_reads {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "closed"));
        }
        Ok(self.secret.clone())
    }

    fn confirm(&mut self, _prompt: &str) -> bool {
        record(&self.log, "terminal.confirm");
        self.answers.borrow_mut().pop_front().unwrap_or(false)
    }
}

/// A configurable set of fakes plus the sink they report to.
pub struct Fixture {
    pub log: CallLog,
    pub sink: MemorySink,
    pub registry: FakeRegistry,
    pub store: FakeStore,
    pub credentials: FakeCredentials,
    pub terminal: FakeTerminal,
    pub settings: Settings,
}

impl Fixture {
    pub fn new() -> Self {
        let log: CallLog = Rc::default();
        Self {
            sink: MemorySink::new(),
            registry: FakeRegistry {
                log: log.clone(),
                pages: Vec::new(),
                served: Rc::default(),
            },
            store: FakeStore {
                log: log.clone(),
                create_result: true,
                load_result: Vec::new(),
                import_result: true,
                export_result: None,
                clone_result: true,
                images: Vec::new(),
                requests: Rc::default(),
            },
            credentials: FakeCredentials {
                log: log.clone(),
                fail: false,
            },
            terminal: FakeTerminal {
                log: log.clone(),
                line: String::new(),
                secret: String::new(),
                answers: Rc::default(),
                fail_reads: false,
            },
            settings: Settings {
                repository: PathBuf::from("/nonexistent/stevedore-default"),
                ..Settings::default()
            },
            log,
        }
    }

    pub fn host() -> HostInfo {
        HostInfo {
            uid: 1000,
            gid: 1000,
            username: "builder".to_string(),
            arch: "amd64".to_string(),
            os: "Linux".to_string(),
            kernel: "6.1.0".to_string(),
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            AppContext::new(self.settings.clone(), Self::host()),
            Collaborators {
                registry: Box::new(self.registry.clone()),
                store: Box::new(self.store.clone()),
                credentials: Box::new(self.credentials.clone()),
                terminal: Box::new(self.terminal.clone()),
                sink: Box::new(self.sink.clone()),
            },
        )
    }

    pub fn run(&self, command: &str, options: &CommandOptions) -> i32 {
        self.dispatcher().dispatch(command, options)
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// Calls whose log line starts with `prefix`.
    pub fn calls_to(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }

    pub fn requests(&self) -> Vec<ImportExportRequest> {
        self.store.requests.borrow().clone()
    }
}
