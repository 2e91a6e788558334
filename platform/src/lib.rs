// Copyright 2026 the agent authors.
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Read-only operating-system probe, injected into every collector's [`Scope`]
//! under the `"platform"` capability name.
//!
//! [`Scope`]: ../scope/struct.Scope.html

/// A cheap, stateless probe of the host operating system.
///
/// `Platform` has no per-child factory and no release hook: every [`Scope`]
/// in a tree can share the same `Platform` instance.
///
/// [`Scope`]: ../scope/struct.Scope.html
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Platform {
    os: Os,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Os {
    Linux,
    Darwin,
    Other,
}

impl Platform {
    /// Probes the current process' operating system.
    pub fn probe() -> Platform {
        let os = match std::env::consts::OS {
            "linux" => Os::Linux,
            "macos" => Os::Darwin,
            _ => Os::Other,
        };
        Platform { os }
    }

    pub fn is_linux(&self) -> bool {
        self.os == Os::Linux
    }

    pub fn is_darwin(&self) -> bool {
        self.os == Os::Darwin
    }
}

impl scope::PlatformProbe for Platform {
    fn is_linux(&self) -> bool {
        Platform::is_linux(self)
    }

    fn is_darwin(&self) -> bool {
        Platform::is_darwin(self)
    }
}
