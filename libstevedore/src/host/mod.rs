//! Facts about the host, gathered once at start-up.

use nix::sys::utsname::uname;
use nix::unistd::{User, getgid, getuid};
use serde::Serialize;
use tracing::warn;


/// Identity and platform of the machine the tool runs on.
///
/// Built once by [`HostInfo::detect`] and then handed around read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostInfo {
    pub uid: u32,
    pub gid: u32,
    pub username: String,
    /// Container architecture name, empty when the machine is not recognized
    pub arch: String,
    pub os: String,
    pub kernel: String,
}

impl HostInfo {
    /// Reads the current user and `uname` information.
    ///
    /// Lookups that fail leave the corresponding field empty.
    pub fn detect() -> Self {
        let uid = getuid();
        let username = match User::from_uid(uid) {
            Ok(Some(user)) => user.name,
            Ok(None) => String::new(),
            Err(e) => {
                warn!(uid = uid.as_raw(), error = %e, "user lookup failed");
                String::new()
            }
        };

        let (os, kernel, machine) = match uname() {
            Ok(info) => (
                info.sysname().to_string_lossy().into_owned(),
                info.release().to_string_lossy().into_owned(),
                info.machine().to_string_lossy().into_owned(),
            ),
            Err(e) => {
                warn!(error = %e, "uname failed");
                (String::new(), String::new(), String::new())
            }
        };

        Self {
            uid: uid.as_raw(),
            gid: getgid().as_raw(),
            username,
            arch: normalize_arch(&machine, usize::BITS).to_string(),
            os,
            kernel,
        }
    }

    /// Returns true when the kernel release is at least `version`.
    ///
    /// Both sides are compared as `major.minor.patch`; missing parts count
    /// as zero and anything after a `-` is ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use libstevedore::host::HostInfo;
    ///
    /// let mut host = HostInfo::detect();
    /// host.kernel = "5.15.0-91-generic".to_string();
    /// assert!(host.kernel_at_least("5.4"));
    /// assert!(!host.kernel_at_least("6.1.0"));
    /// ```
    pub fn kernel_at_least(&self, version: &str) -> bool {
        kernel_triple(&self.kernel) >= kernel_triple(version)
    }
}

/// Maps a `uname -m` machine name to a container architecture name.
///
/// `pointer_bits` distinguishes a 32-bit userland on a 64-bit kernel.
pub fn normalize_arch(machine: &str, pointer_bits: u32) -> &'static str {
    let machine = machine.trim().to_lowercase();
    match machine.as_str() {
        "x86_64" | "amd64" if pointer_bits == 32 => "i386",
        "x86_64" | "amd64" => "amd64",
        "i386" | "i486" | "i586" | "i686" | "x86" => "i386",
        m if m.starts_with("aarch64") || m.starts_with("arm64") => {
            if pointer_bits == 32 { "arm" } else { "arm64" }
        }
        m if m.starts_with("arm") => "arm",
        _ => "",
    }
}

fn kernel_triple(release: &str) -> (u64, u64, u64) {
    let numeric = release.split('-').next().unwrap_or_default();
    let mut parts = numeric.split('.').map(|part| {
        let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
        digits.parse::<u64>().unwrap_or(0)
    });
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}
