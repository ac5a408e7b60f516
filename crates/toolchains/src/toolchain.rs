use camino::Utf8Path;
use human_repr::HumanCount;

use crate::{Shell, Triplet};

pub mod gcc;
pub mod ldscript;
pub mod llvm;
pub mod modifier;
pub mod platform;

pub const GCC_VERSION: &str = "15.0.1";
pub const LLVM_VERSION: &str = "21.0.0";

#[must_use]
pub fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

bitflags::bitflags! {
    /// Topology of a (build, host, target) triple together with whether the
    /// target runs a hosted OS. Exactly one topology flag and one of
    /// `HOSTED`/`FREESTANDING` are set by [`ToolchainType::classify`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ToolchainType: u8 {
        const NATIVE = 1 << 0;
        const CROSS = 1 << 1;
        const CANADIAN = 1 << 2;
        const CANADIAN_CROSS = 1 << 3;
        const HOSTED = 1 << 4;
        const FREESTANDING = 1 << 5;

        /// host == target
        const NATIVE_OR_CANADIAN = Self::NATIVE.bits() | Self::CANADIAN.bits();
        /// Topologies that bootstrap their own C library.
        const FULL_BUILD = Self::NATIVE.bits() | Self::CROSS.bits();
        const CROSS_COMPILER = Self::CROSS.bits() | Self::CANADIAN_CROSS.bits();
    }
}

impl ToolchainType {
    /// Topology follows the literal triplet strings since every name and prefix
    /// is derived from them.
    #[must_use]
    #[cfg_attr(feature = "tracing", tracing::instrument)]
    pub fn classify(build: &Triplet, host: &Triplet, target: &Triplet) -> Self {
        let (build, host, target_str) = (build.as_str(), host.as_str(), target.as_str());
        let topology =
            if build == host && host == target_str {
                ToolchainType::NATIVE
            } else if build == host {
                ToolchainType::CROSS
            } else if host == target_str {
                ToolchainType::CANADIAN
            } else {
                ToolchainType::CANADIAN_CROSS
            };
        let environment =
            if matches!(target.abi(), "elf" | "eabi") {
                ToolchainType::FREESTANDING
            } else {
                ToolchainType::HOSTED
            };
        topology | environment
    }

    #[must_use]
    pub fn is_freestanding(self) -> bool {
        self.contains(ToolchainType::FREESTANDING)
    }

    #[must_use]
    pub fn full_build(self) -> bool {
        self.intersects(ToolchainType::FULL_BUILD)
    }
}

impl core::fmt::Display for ToolchainType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let environment = if self.is_freestanding() { "freestanding" } else { "hosted" };
        let topology =
            if self.contains(ToolchainType::NATIVE) {
                "native"
            } else if self.contains(ToolchainType::CROSS) {
                "cross"
            } else if self.contains(ToolchainType::CANADIAN) {
                "canadian"
            } else {
                "canadian cross"
            };
        write!(f, "{environment} {topology} toolchain")
    }
}

/// Packs `prefix_dir/name` into `name.tar.zst` next to it.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(shell)))]
pub(crate) fn compress(
    shell: &Shell,
    prefix_dir: &Utf8Path,
    name: &str,
    compress_level: u8,
    jobs: usize,
) -> Result<(), crate::shell::Error> {
    let _dir = shell.enter(prefix_dir)?;
    shell.run(&format!("tar -cf {name}.tar {name}"))?;
    shell.run(&format!("zstd --ultra --rm -{compress_level} -T{jobs} -f {name}.tar"))?;
    let archive = prefix_dir.join(format!("{name}.tar.zst"));
    if let Ok(metadata) = archive.metadata() {
        let size = metadata.len().human_count_bytes();
        shell.success(&format!("package: {archive} [{size}]"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(build: &str, host: &str, target: &str) -> ToolchainType {
        ToolchainType::classify(
            &Triplet::parse(build).unwrap(),
            &Triplet::parse(host).unwrap(),
            &Triplet::parse(target).unwrap(),
        )
    }

    const TOPOLOGY: [ToolchainType; 4] = [
        ToolchainType::NATIVE,
        ToolchainType::CROSS,
        ToolchainType::CANADIAN,
        ToolchainType::CANADIAN_CROSS,
    ];

    #[test]
    fn classification_sets_one_flag_of_each_group() {
        let triplets = ["x86_64-linux-gnu", "x86_64-w64-mingw32", "arm-none-eabi", "x86_64-elf"];
        for build in triplets {
            for host in triplets {
                for target in triplets {
                    let flags = classify(build, host, target);
                    assert_eq!(flags, classify(build, host, target));
                    assert_eq!(TOPOLOGY.iter().filter(|flag| flags.contains(**flag)).count(), 1);
                    assert_ne!(
                        flags.contains(ToolchainType::HOSTED),
                        flags.contains(ToolchainType::FREESTANDING)
                    );
                }
            }
        }
    }

    #[test]
    fn classification_of_known_topologies() {
        let gnu = "x86_64-linux-gnu";
        let mingw = "x86_64-w64-mingw32";
        assert_eq!(classify(gnu, gnu, gnu), ToolchainType::NATIVE | ToolchainType::HOSTED);
        assert_eq!(
            classify(gnu, gnu, "arm-none-eabi"),
            ToolchainType::CROSS | ToolchainType::FREESTANDING
        );
        assert_eq!(classify(gnu, mingw, mingw), ToolchainType::CANADIAN | ToolchainType::HOSTED);
        assert_eq!(
            classify(gnu, mingw, "aarch64-linux-gnu"),
            ToolchainType::CANADIAN_CROSS | ToolchainType::HOSTED
        );
        assert!(classify(gnu, gnu, "x86_64-elf").is_freestanding());
        assert!(classify(gnu, gnu, mingw).full_build());
        assert!(!classify(gnu, mingw, mingw).full_build());
    }

    #[test]
    fn display_names_environment_and_topology() {
        let gnu = "x86_64-linux-gnu";
        assert_eq!(classify(gnu, gnu, gnu).to_string(), "hosted native toolchain");
        assert_eq!(
            classify(gnu, "x86_64-w64-mingw32", "arm-none-eabi").to_string(),
            "freestanding canadian cross toolchain"
        );
    }

    #[test]
    fn major_version_is_first_component() {
        assert_eq!(major_version(GCC_VERSION), "15");
        assert_eq!(major_version(LLVM_VERSION), "21");
    }
}
