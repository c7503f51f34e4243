//! Process and platform checks

use std::path::Path;

use crate::constants::paths;

/// Whether the process runs with effective uid 0
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// Whether the systemd journal socket is present
pub fn journald_available() -> bool {
    Path::new(paths::JOURNALD_SOCKET).exists()
}

/// Kernel release string, for the startup banner
pub fn kernel_version() -> String {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
