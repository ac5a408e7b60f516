use crate::Triplet;

/// The CMake system name of a hosted target.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TargetSystem {
    Linux,
    Windows,
}

impl TargetSystem {
    #[must_use]
    pub fn of(target: &Triplet) -> Self {
        if target.os() == "linux" {
            TargetSystem::Linux
        } else {
            TargetSystem::Windows
        }
    }

    /// Directory name compiler-rt installs its libraries under.
    #[must_use]
    pub fn runtime_dir_name(self) -> &'static str {
        match self {
            TargetSystem::Linux => "linux",
            TargetSystem::Windows => "windows",
        }
    }
}

impl core::fmt::Display for TargetSystem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sys = match self {
            TargetSystem::Linux => "Linux",
            TargetSystem::Windows => "Windows",
        };
        write!(f, "{sys}")
    }
}
