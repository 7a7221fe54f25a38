//! Canned host scenarios shared across collector tests.

use super::{MockFs, MockRunner};

pub const MOUNTS: &str = "\
sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0
/dev/sda1 / ext4 rw,relatime 0 0
/dev/sdb /data btrfs rw,relatime,space_cache,subvolid=5,subvol=/ 0 0
/dev/sdb /data/snapshots btrfs rw,relatime,subvolid=256,subvol=/snapshots 0 0
";

pub const DEVICE_STATS: &str = "\
[/dev/sdb].write_io_errs    0
[/dev/sdb].read_io_errs     0
[/dev/sdb].flush_io_errs    0
[/dev/sdb].corruption_errs  0
[/dev/sdb].generation_errs  0
";

pub const FILESYSTEM_USAGE: &str = "\
Overall:
    Device size:\t\t  10737418240
    Device allocated:\t\t   2155872256
    Device unallocated:\t\t   8581545984
    Device missing:\t\t\t  0
    Used:\t\t       196608
    Free (estimated):\t\t   8589934592\t(min: 8589934592)
    Data ratio:\t\t\t         1.00
    Metadata ratio:\t\t         2.00
    Global reserve:\t\t      3407872\t(used: 0)

Data,single: Size:1073741824, Used:0 (0.00%)
   /dev/sdb\t   1073741824

Metadata,DUP: Size:536870912, Used:114688 (0.02%)
   /dev/sdb\t   1073741824

System,DUP: Size:8388608, Used:16384 (0.00%)
   /dev/sdb\t     16777216

Unallocated:
   /dev/sdb\t   8581545984
";

pub const SCRUB_STATUS: &str = "\
UUID:             12345678-1234-1234-1234-123456789abc

scrub device /dev/sdb (id 1) history
Scrub started:    Sat Jan  2 15:04:05 2021
Status:           finished
Duration:         0:05:00
Total to scrub:   2.21MiB
Rate:             452.38KiB/s
Error summary:    csum=5
  Corrected:      5
  Uncorrectable:  0
  Unverified:     0
";

/// One btrfs filesystem mounted at /data, clean device counters, one
/// finished scrub with checksum errors.
pub fn single_device_host() -> (MockFs, MockRunner) {
    let fs = MockFs::new().add_file("/proc/self/mounts", MOUNTS);
    let runner = MockRunner::new()
        .add_command("btrfs", &["device", "stats", "/data"], DEVICE_STATS)
        .add_command("btrfs", &["filesystem", "usage", "--raw", "/data"], FILESYSTEM_USAGE)
        .add_command("btrfs", &["scrub", "status", "-d", "/data"], SCRUB_STATUS);
    (fs, runner)
}
