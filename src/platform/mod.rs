//! Platform-specific helpers.
//! Hides Unix/Windows differences for log files, the config template, free-space probes
//! and Linux file leases, so the sweep code stays platform-agnostic.

#[cfg(unix)]
mod common_unix;
mod temp;
#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

#[cfg(unix)]
pub use unix::{
    available_space, open_log_file_secure_append, release_write_lease, set_dir_mode_0700,
    take_write_lease, write_config_secure_new_0600, write_lease_intact, Lease,
};

#[cfg(not(unix))]
pub use windows::{
    available_space, open_log_file_secure_append, set_dir_mode_0700, write_config_secure_new_0600,
};
