use super::{Dispatcher, STATUS_OK};

/// Get the version string for stevedore and libstevedore
pub fn get_version_string() -> String {
    format!(
        "stevedore {}\nlibstevedore {}",
        env!("CARGO_PKG_VERSION"),
        libstevedore::version()
    )
}

impl Dispatcher {
    pub(super) fn version(&mut self) -> i32 {
        self.sink.info(&get_version_string());
        STATUS_OK
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
