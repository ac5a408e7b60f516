use snafu::prelude::*;

use crate::{ToolchainType, Triplet};

pub use self::{architecture::KernelArch, system::TargetSystem};

mod architecture;
mod system;

/// Hosts a GCC toolchain can be built to run on.
pub const HOST_LIST: [&str; 2] = ["x86_64-linux-gnu", "x86_64-w64-mingw32"];

/// Targets a GCC toolchain can be built for.
pub const TARGET_LIST: [&str; 11] = [
    "x86_64-linux-gnu",
    "i686-linux-gnu",
    "aarch64-linux-gnu",
    "arm-linux-gnueabi",
    "arm-linux-gnueabihf",
    "loongarch64-linux-gnu",
    "riscv64-linux-gnu",
    "x86_64-w64-mingw32",
    "i686-w64-mingw32",
    "arm-none-eabi",
    "x86_64-elf",
];

/// Architectures treated as 32-bit, matched as triplet prefixes.
pub const ARCH_32_BIT_LIST: [&str; 6] = ["arm", "armeb", "i486", "i686", "risc32", "risc32be"];

#[derive(Debug, Snafu)]
pub enum Error {
    UnsupportedPlatform { role: PlatformRole, triplet: String },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlatformRole {
    Host,
    Target,
}

impl core::fmt::Display for PlatformRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let role = match self {
            PlatformRole::Host => "host",
            PlatformRole::Target => "target",
        };
        write!(f, "{role}")
    }
}

#[must_use]
pub fn is_32_bit(triplet: &Triplet) -> bool {
    ARCH_32_BIT_LIST
        .iter()
        .any(|arch| triplet.as_str().starts_with(arch))
}

/// Accepts `triplet` when it matches a supported entry up to the vendor field.
#[cfg_attr(feature = "tracing", tracing::instrument)]
pub fn check_supported(triplet: &Triplet, role: PlatformRole) -> Result<(), self::Error> {
    let list: &[&str] = match role {
        PlatformRole::Host => &HOST_LIST,
        PlatformRole::Target => &TARGET_LIST,
    };
    let supported = list
        .iter()
        .filter_map(|supported| Triplet::parse(supported).ok())
        .any(|supported| supported.weak_eq(triplet));
    ensure!(
        supported,
        UnsupportedPlatformSnafu {
            role,
            triplet: triplet.to_string()
        }
    );
    Ok(())
}

/// Supported targets with a hosted OS, paired with the system they run.
#[must_use]
pub fn hosted_targets() -> Vec<(Triplet, TargetSystem)> {
    let phony = Triplet::parse("phony-phony-phony").ok();
    TARGET_LIST
        .iter()
        .filter_map(|target| Triplet::parse(target).ok())
        .filter(|target| {
            phony.as_ref().map_or(true, |phony| {
                !ToolchainType::classify(phony, phony, target).is_freestanding()
            })
        })
        .map(|target| {
            let system = TargetSystem::of(&target);
            (target, system)
        })
        .collect()
}
