// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Linux filesystem usage, from `/proc/mounts` plus `statvfs(2)` per mount
//! point. Recycles itself (via the `reload` capability) whenever the set of
//! mount points changes between ticks, since that reshuffles which metric
//! cells exist.

use std::collections::{HashMap, HashSet};
use std::ffi::CString;
use std::fs;
use std::mem::MaybeUninit;

use scope::{CollectError, ConfigError, MetricHandle, ReloadLatch, Sampler, TagSet};

const PROC_MOUNTS: &str = "/proc/mounts";

const SKIP_FSTYPE: &[&str] = &[
    "cgroup", "devpts", "sysfs", "proc", "devtmpfs", "mqueue", "autofs",
];

#[derive(Clone, Debug)]
struct Mount {
    device: String,
    mountpoint: String,
}

#[derive(Clone, Copy, Debug, Default)]
struct DiskUsage {
    total: f64,
    free: f64,
    avail: f64,
    rest: f64,
}

fn read_mounts() -> Result<Vec<Mount>, String> {
    let text = fs::read_to_string(PROC_MOUNTS)
        .map_err(|e| format!("reading {PROC_MOUNTS}: {e}"))?;
    let mut mounts = Vec::new();

    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(format!("{PROC_MOUNTS}: expected 6 fields per line"));
        }

        let (device, mountpoint, fstype) = (fields[0], fields[1], fields[2]);

        if device == fstype {
            continue;
        }
        if SKIP_FSTYPE.contains(&fstype) {
            continue;
        }

        mounts.push(Mount {
            device: device.to_string(),
            mountpoint: mountpoint.to_string(),
        });
    }

    Ok(mounts)
}

fn read_usage(mountpoint: &str) -> Result<DiskUsage, String> {
    let c_path = CString::new(mountpoint)
        .map_err(|_| format!("invalid mount point path '{mountpoint}'"))?;
    let mut buf = MaybeUninit::<libc::statvfs>::uninit();

    let rc = unsafe { libc::statvfs(c_path.as_ptr(), buf.as_mut_ptr()) };
    if rc != 0 {
        return Err(format!(
            "statvfs({mountpoint}) failed: {}",
            std::io::Error::last_os_error()
        ));
    }

    let s = unsafe { buf.assume_init() };
    let frsize = s.f_frsize as f64;
    let total = frsize * s.f_blocks as f64;
    let free = frsize * s.f_bfree as f64;
    let avail = frsize * s.f_bavail as f64;
    let rest = free - avail;

    Ok(DiskUsage {
        total,
        free,
        avail,
        rest,
    })
}

fn read_disks(mounts: &[Mount]) -> HashMap<String, (String, DiskUsage)> {
    let mut out = HashMap::new();
    for m in mounts {
        match read_usage(&m.mountpoint) {
            Ok(usage) if usage.total > 0.0 => {
                out.insert(m.mountpoint.clone(), (m.device.clone(), usage));
            }
            Ok(_) => {}
            Err(e) => log::warn!("disk: skipping {}: {e}", m.mountpoint),
        }
    }
    out
}

struct DiskHandles {
    total: Box<dyn MetricHandle>,
    free: Box<dyn MetricHandle>,
    avail: Box<dyn MetricHandle>,
    rest: Box<dyn MetricHandle>,
    free_perc: Box<dyn MetricHandle>,
    avail_perc: Box<dyn MetricHandle>,
    rest_perc: Box<dyn MetricHandle>,
}

impl DiskHandles {
    fn new(registry: &dyn scope::MetricSink, device: &str, mountpoint: &str) -> DiskHandles {
        fn metric(
            registry: &dyn scope::MetricSink,
            device: &str,
            mountpoint: &str,
            what: &str,
            unit: &str,
        ) -> Box<dyn MetricHandle> {
            let mut tags = TagSet::from_pairs([("mountpoint", mountpoint), ("device", device)]);
            tags.insert("what", what);
            tags.insert("unit", unit);
            registry.metric(tags)
        }

        DiskHandles {
            total: metric(registry, device, mountpoint, "disk-total", "B"),
            free: metric(registry, device, mountpoint, "disk-free", "B"),
            avail: metric(registry, device, mountpoint, "disk-avail", "B"),
            rest: metric(registry, device, mountpoint, "disk-rest", "B"),
            free_perc: metric(registry, device, mountpoint, "disk-free-percentage", "%"),
            avail_perc: metric(registry, device, mountpoint, "disk-avail-percentage", "%"),
            rest_perc: metric(registry, device, mountpoint, "disk-rest-percentage", "%"),
        }
    }

    fn update(&self, usage: &DiskUsage) {
        self.total.update(usage.total);
        self.free.update(usage.free);
        self.avail.update(usage.avail);
        self.rest.update(usage.rest);
        self.free_perc.update(round2(usage.free / usage.total));
        self.avail_perc.update(round2(usage.avail / usage.total));
        self.rest_perc.update(round2(usage.rest / usage.total));
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub struct LinuxDisk {
    disks: HashMap<String, DiskHandles>,
    last_seen: HashSet<String>,
    reload: ReloadLatch,
}

impl LinuxDisk {
    fn new(
        registry: &dyn scope::MetricSink,
        reload: ReloadLatch,
        disks: HashMap<String, (String, DiskUsage)>,
    ) -> LinuxDisk {
        let last_seen = disks.keys().cloned().collect();
        let mut handles = HashMap::new();

        // Cells must be allocated in a fixed order: the supervisor's
        // validation `setup()` and the worker's replay `setup()` run in
        // separate processes with independent hash seeds, so iterating
        // `&disks` directly would hand out each process' ids in a different
        // order.
        let mut mountpoints: Vec<&String> = disks.keys().collect();
        mountpoints.sort();

        for mountpoint in mountpoints {
            let (device, usage) = &disks[mountpoint];
            let h = DiskHandles::new(registry, device, mountpoint);
            h.update(usage);
            handles.insert(mountpoint.clone(), h);
        }

        LinuxDisk {
            disks: handles,
            last_seen,
            reload,
        }
    }
}

impl Sampler for LinuxDisk {
    fn sample(&mut self) -> Result<(), CollectError> {
        let mounts = read_mounts().map_err(CollectError::new)?;
        let disks = read_disks(&mounts);

        let seen: HashSet<String> = disks.keys().cloned().collect();
        if seen != self.last_seen {
            self.reload.set();
        }
        self.last_seen = seen;

        for (mountpoint, (_, usage)) in &disks {
            if let Some(h) = self.disks.get(mountpoint) {
                h.update(usage);
            }
        }

        Ok(())
    }
}

pub fn setup(root: &scope::Scope) -> Result<Box<dyn Sampler>, ConfigError> {
    let platform = root.require(scope::Capability::PLATFORM)?;
    let platform = platform.as_platform().expect("platform capability has the wrong variant");

    if !platform.is_linux() {
        return Err(ConfigError::new("disk collector requires Linux"));
    }

    let reload = root.require(scope::Capability::RELOAD)?;
    let reload = reload.as_reload().expect("reload capability has the wrong variant").clone();

    let registry = root.require(scope::Capability::REGISTRY)?;
    let registry = registry.as_registry().expect("registry capability has the wrong variant");

    let mounts = read_mounts().map_err(ConfigError::new)?;
    let disks = read_disks(&mounts);
    Ok(Box::new(LinuxDisk::new(registry.as_ref(), reload, disks)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_rounds_ratios_to_two_decimal_places() {
        assert_eq!(round2(0.6667), 0.67);
        assert_eq!(round2(1.0), 1.0);
    }

    #[test]
    fn parses_well_formed_proc_mounts_text_and_skips_pseudo_filesystems() {
        let text = "\
cgroup /sys/fs/cgroup cgroup rw 0 0
tmpfs /tmp tmpfs rw 0 0
/dev/sda1 / ext4 rw 0 0
";
        let mounts: Vec<Mount> = text
            .lines()
            .filter_map(|line| {
                let f: Vec<&str> = line.split_whitespace().collect();
                if f.len() != 6 {
                    return None;
                }
                if f[0] == f[2] || SKIP_FSTYPE.contains(&f[2]) {
                    return None;
                }
                Some(Mount {
                    device: f[0].to_string(),
                    mountpoint: f[1].to_string(),
                })
            })
            .collect();

        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].mountpoint, "/");
    }

    struct RecordingHandle;
    impl MetricHandle for RecordingHandle {
        fn update(&self, _value: f64) {}
        fn unset(&self) {}
    }

    struct RecordingSink {
        mountpoints: parking_lot::Mutex<Vec<String>>,
    }

    impl scope::MetricSink for RecordingSink {
        fn metric(&self, tags: TagSet) -> Box<dyn MetricHandle> {
            self.mountpoints
                .lock()
                .push(tags.get("mountpoint").unwrap().to_string());
            Box::new(RecordingHandle)
        }
        fn state(&self, _tags: TagSet) -> Box<dyn scope::StateHandle> {
            unimplemented!("not exercised by this test")
        }
        fn scoped(&self, _tags: TagSet) -> std::sync::Arc<dyn scope::MetricSink> {
            unimplemented!("not exercised by this test")
        }
    }

    /// The cell allocation order must be a pure function of the mount set,
    /// not of `HashMap` iteration order, since the supervisor's validation
    /// `setup()` and the worker's replay `setup()` run in separate processes
    /// with independent hash seeds.
    #[test]
    fn cells_are_allocated_in_sorted_mountpoint_order() {
        let mut disks = HashMap::new();
        disks.insert("/var".to_string(), ("/dev/sdb1".to_string(), DiskUsage::default()));
        disks.insert("/".to_string(), ("/dev/sda1".to_string(), DiskUsage::default()));
        disks.insert("/home".to_string(), ("/dev/sdc1".to_string(), DiskUsage::default()));

        let sink = std::sync::Arc::new(RecordingSink {
            mountpoints: parking_lot::Mutex::new(Vec::new()),
        });
        let _ = LinuxDisk::new(sink.as_ref(), ReloadLatch::new(), disks);

        let recorded = sink.mountpoints.lock();
        let mut expected = recorded.clone();
        expected.sort();
        assert_eq!(*recorded, expected);
        assert_eq!(recorded.first().unwrap(), "/");
    }
}
