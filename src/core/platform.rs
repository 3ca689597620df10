// ─── Platform ───
// Platform family and architecture used for rule evaluation and natives.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Platform classification used by library rules and native classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Windows,
    Linux,
    Osx,
}

impl Family {
    pub const ALL: [Family; 3] = [Family::Windows, Family::Linux, Family::Osx];

    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Windows => "windows",
            Family::Linux => "linux",
            Family::Osx => "osx",
        }
    }

    /// The family of the running machine. Anything that is neither Windows
    /// nor macOS is treated as Linux.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Family::Windows
        } else if cfg!(target_os = "macos") {
            Family::Osx
        } else {
            Family::Linux
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "windows" => Ok(Family::Windows),
            "linux" => Ok(Family::Linux),
            "osx" => Ok(Family::Osx),
            other => Err(format!("unknown platform family: {other}")),
        }
    }
}

/// Pointer width substituted for `${arch}` in native classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arch {
    #[serde(rename = "32")]
    X32,
    #[serde(rename = "64")]
    X64,
}

impl Arch {
    pub const ALL: [Arch; 2] = [Arch::X32, Arch::X64];

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X32 => "32",
            Arch::X64 => "64",
        }
    }

    pub fn current() -> Self {
        if cfg!(target_pointer_width = "64") {
            Arch::X64
        } else {
            Arch::X32
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub family: Family,
    pub arch: Arch,
}

impl Platform {
    pub fn new(family: Family, arch: Arch) -> Self {
        Self { family, arch }
    }

    pub fn detect() -> Self {
        Self::new(Family::current(), Arch::current())
    }

    /// Java classpath separator for this family.
    pub fn path_separator(&self) -> &'static str {
        match self.family {
            Family::Windows => ";",
            _ => ":",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::detect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_parses_manifest_names() {
        for family in Family::ALL {
            assert_eq!(family.as_str().parse::<Family>().unwrap(), family);
        }
        assert!("solaris".parse::<Family>().is_err());
    }

    #[test]
    fn windows_uses_semicolon_separator() {
        assert_eq!(Platform::new(Family::Windows, Arch::X64).path_separator(), ";");
        assert_eq!(Platform::new(Family::Osx, Arch::X64).path_separator(), ":");
    }
}
