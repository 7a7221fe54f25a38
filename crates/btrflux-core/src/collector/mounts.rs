//! btrfs mount discovery from the kernel mounts table.

use std::collections::HashSet;

const DEVICE_IDX: usize = 0;
const MOUNT_IDX: usize = 1;
const FSTYPE_IDX: usize = 2;

/// Extracts btrfs mount points from `/proc/self/mounts` content.
///
/// A multi-subvolume filesystem appears once per subvolume under the
/// same backing device; only the first mount per device is kept so each
/// filesystem is collected exactly once. Malformed lines are skipped.
pub fn parse_btrfs_mounts(content: &str) -> Vec<String> {
    let mut seen_devices = HashSet::new();
    let mut mounts = Vec::new();

    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let (Some(&device), Some(&mount), Some(&fstype)) = (
            fields.get(DEVICE_IDX),
            fields.get(MOUNT_IDX),
            fields.get(FSTYPE_IDX),
        ) else {
            continue;
        };
        if fstype != "btrfs" {
            continue;
        }
        if seen_devices.insert(device.to_string()) {
            mounts.push(mount.to_string());
        }
    }

    mounts
}
