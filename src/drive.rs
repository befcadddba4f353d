use anyhow::Context;
use std::path::{Path, PathBuf};
use sysinfo::Disks;

/// A 1.44 MB diskette holds 1440 KiB, its filesystem reports a bit less than that
pub const FLOPPY_MIN_KIB: u64 = 1350;
pub const FLOPPY_MAX_KIB: u64 = 1500;

/// A mounted filesystem which might be a diskette
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiskCandidate {
    pub mount_point: PathBuf,
    pub total_space: u64,
    pub removable: bool,
}

impl DiskCandidate {
    pub fn is_floppy(&self) -> bool {
        is_floppy_sized(self.total_space)
    }
}

pub fn is_floppy_sized(total_bytes: u64) -> bool {
    let kib = total_bytes / 1024;
    kib > FLOPPY_MIN_KIB && kib < FLOPPY_MAX_KIB
}

/// Lists the mounted filesystems of the system
pub fn mounted_disks() -> Vec<DiskCandidate> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .map(|disk| DiskCandidate {
            mount_point: disk.mount_point().to_path_buf(),
            total_space: disk.total_space(),
            removable: disk.is_removable(),
        })
        .collect()
}

/// Returns the mount point of the first diskette sized filesystem
pub fn select_floppy(candidates: &[DiskCandidate]) -> Option<PathBuf> {
    for candidate in candidates {
        if candidate.is_floppy() {
            log::info!("Floppy Drive Found: {}", candidate.mount_point.display());
            return Some(candidate.mount_point.clone());
        }
        log::debug!(
            "{} is not a Floppy Drive ({} KiB)",
            candidate.mount_point.display(),
            candidate.total_space / 1024
        );
    }
    None
}

pub fn find_floppy_drive() -> Option<PathBuf> {
    log::info!("Attempting to find the Floppy Drive Automatically");
    select_floppy(&mounted_disks())
}

/// Checks a drive given on the command line and makes its path absolute
pub fn check_drive(path: &Path) -> anyhow::Result<PathBuf> {
    if !path.is_dir() {
        anyhow::bail!("{} is not a directory", path.display());
    }
    std::path::absolute(path).with_context(|| format!("can't resolve {}", path.display()))
}
