use camino::{Utf8Path, Utf8PathBuf};

use crate::{
    toolchain::{major_version, platform, GCC_VERSION},
    Shell,
    ToolchainType,
    Triplet,
};

/// Names and install paths of one GCC toolchain. Computing it touches nothing on
/// disk, so the layouts of sibling toolchains can be derived freely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GccLayout {
    pub build: Triplet,
    pub host: Triplet,
    pub target: Triplet,
    pub toolchain_type: ToolchainType,
    pub name: String,
    pub prefix_dir: Utf8PathBuf,
    pub prefix: Utf8PathBuf,
    /// Where target libraries and headers are installed. Canadian toolchains use
    /// the prefix itself since host and target coincide.
    pub lib_prefix: Utf8PathBuf,
    pub share_dir: Utf8PathBuf,
    pub gdbinit_path: Utf8PathBuf,
    pub bin_dir: Utf8PathBuf,
    pub rpath_dir: Utf8PathBuf,
    pub rpath_option: String,
    pub host_32_bit: bool,
    pub target_32_bit: bool,
    pub tool_prefix: String,
}

impl GccLayout {
    #[must_use]
    #[cfg_attr(feature = "tracing", tracing::instrument)]
    pub fn new(build: &Triplet, host: &Triplet, target: &Triplet, prefix_dir: &Utf8Path) -> Self {
        let toolchain_type = ToolchainType::classify(build, host, target);
        let cross_compiler = toolchain_type.intersects(ToolchainType::CROSS_COMPILER);
        let major = major_version(GCC_VERSION);
        let name =
            if cross_compiler {
                format!("{host}-host-{target}-target-gcc{major}")
            } else {
                format!("{host}-native-gcc{major}")
            };
        let prefix = prefix_dir.join(&name);
        let lib_prefix =
            if toolchain_type.contains(ToolchainType::CANADIAN) {
                prefix.clone()
            } else {
                prefix.join(target.as_str())
            };
        let share_dir = prefix.join("share");
        let gdbinit_path = share_dir.join(".gdbinit");
        let bin_dir = prefix.join("bin");
        let host_32_bit = platform::is_32_bit(host);
        let target_32_bit = platform::is_32_bit(target);
        let lib_name = if host_32_bit { "lib32" } else { "lib64" };
        let rpath_dir = prefix.join(lib_name);
        let rpath_option = format!("-Wl,-rpath='$ORIGIN'/../{lib_name}");
        let tool_prefix = if cross_compiler { format!("{target}-") } else { String::new() };
        Self {
            build: build.clone(),
            host: host.clone(),
            target: target.clone(),
            toolchain_type,
            name,
            prefix_dir: prefix_dir.to_path_buf(),
            prefix,
            lib_prefix,
            share_dir,
            gdbinit_path,
            bin_dir,
            rpath_dir,
            rpath_option,
            host_32_bit,
            target_32_bit,
            tool_prefix,
        }
    }

    /// The toolchain built on the same build machine for another host and target.
    #[must_use]
    pub fn sibling(&self, host: &Triplet, target: &Triplet) -> Self {
        Self::new(&self.build, host, target, &self.prefix_dir)
    }

    /// The cross (or native) toolchain running on the build machine for `target`.
    #[must_use]
    pub fn build_hosted(&self, target: &Triplet) -> Self {
        self.sibling(&self.build, target)
    }

    #[must_use]
    pub fn native(&self) -> Self {
        self.build_hosted(&self.build)
    }

    /// `prefix/lib/gcc/{target}/{version}`, holding libgcc and its headers.
    #[must_use]
    pub fn libgcc_dir(&self) -> Utf8PathBuf {
        self.prefix
            .join("lib")
            .join("gcc")
            .join(self.target.as_str())
            .join(GCC_VERSION)
    }

    pub fn register_in_env(&self, shell: &Shell) {
        shell.prepend_path(&self.bin_dir);
    }

    /// Toolchains whose `bin` must be on `PATH` for this one to build, least
    /// specific first and ending with this toolchain.
    #[must_use]
    pub fn chain(&self) -> Vec<Self> {
        let mut chain = Vec::new();
        if self
            .toolchain_type
            .intersects(ToolchainType::CROSS | ToolchainType::CANADIAN | ToolchainType::CANADIAN_CROSS)
        {
            chain.push(self.native());
        }
        if self.toolchain_type.intersects(ToolchainType::CANADIAN | ToolchainType::CANADIAN_CROSS) {
            chain.push(self.build_hosted(&self.host));
        }
        if self.toolchain_type.contains(ToolchainType::CANADIAN_CROSS) {
            chain.push(self.build_hosted(&self.target));
        }
        chain.push(self.clone());
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(build: &str, host: &str, target: &str) -> GccLayout {
        GccLayout::new(
            &Triplet::parse(build).unwrap(),
            &Triplet::parse(host).unwrap(),
            &Triplet::parse(target).unwrap(),
            Utf8Path::new("/opt"),
        )
    }

    const GNU: &str = "x86_64-linux-gnu";
    const MINGW: &str = "x86_64-w64-mingw32";

    #[test]
    fn native_layout() {
        let native = layout(GNU, GNU, GNU);
        assert_eq!(native.name, "x86_64-linux-gnu-native-gcc15");
        assert_eq!(native.prefix, "/opt/x86_64-linux-gnu-native-gcc15");
        assert_eq!(native.lib_prefix, "/opt/x86_64-linux-gnu-native-gcc15/x86_64-linux-gnu");
        assert_eq!(native.gdbinit_path, "/opt/x86_64-linux-gnu-native-gcc15/share/.gdbinit");
        assert_eq!(native.rpath_dir, "/opt/x86_64-linux-gnu-native-gcc15/lib64");
        assert_eq!(native.rpath_option, "-Wl,-rpath='$ORIGIN'/../lib64");
        assert_eq!(native.tool_prefix, "");
    }

    #[test]
    fn cross_layout_is_target_prefixed() {
        let cross = layout(GNU, GNU, "i686-linux-gnu");
        assert_eq!(cross.name, "x86_64-linux-gnu-host-i686-linux-gnu-target-gcc15");
        assert_eq!(cross.tool_prefix, "i686-linux-gnu-");
        assert!(cross.target_32_bit && !cross.host_32_bit);
    }

    #[test]
    fn canadian_installs_target_content_into_prefix() {
        let canadian = layout(GNU, MINGW, MINGW);
        assert_eq!(canadian.name, "x86_64-w64-mingw32-native-gcc15");
        assert_eq!(canadian.lib_prefix, canadian.prefix);
        assert_eq!(canadian.tool_prefix, "");
    }

    #[test]
    fn chain_registers_most_specific_toolchain_last() {
        let names = |layout: GccLayout| layout.chain().into_iter().map(|layout| layout.name).collect::<Vec<_>>();
        assert_eq!(names(layout(GNU, GNU, GNU)), ["x86_64-linux-gnu-native-gcc15"]);
        assert_eq!(
            names(layout(GNU, MINGW, "arm-none-eabi")),
            [
                "x86_64-linux-gnu-native-gcc15",
                "x86_64-linux-gnu-host-x86_64-w64-mingw32-target-gcc15",
                "x86_64-linux-gnu-host-arm-none-eabi-target-gcc15",
                "x86_64-w64-mingw32-host-arm-none-eabi-target-gcc15",
            ]
        );
    }
}
