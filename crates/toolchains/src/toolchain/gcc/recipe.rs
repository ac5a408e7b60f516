use camino::Utf8PathBuf;
use snafu::prelude::*;

use super::{
    GccLayout,
    GdbserverForFreestandingSnafu,
    Library,
    UnsupportedHostOsSnafu,
    UnsupportedKernelArchSnafu,
    UnsupportedTargetOsSnafu,
};
use crate::{
    toolchain::{modifier::Modifier, platform::KernelArch},
    Directories,
    ToolchainType,
};

/// Features requested for a GCC toolchain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildFlags {
    pub gdb: bool,
    pub gdbserver: bool,
    pub newlib: bool,
    pub nls: bool,
}

impl Default for BuildFlags {
    fn default() -> Self {
        Self {
            gdb: true,
            gdbserver: true,
            newlib: true,
            nls: false,
        }
    }
}

/// Disabled features of a freestanding gcc built against newlib.
const DISABLE_HOSTED_OPTION: [&str; 9] = [
    "--disable-threads",
    "--disable-libstdcxx-verbose",
    "--disable-shared",
    "--with-headers",
    "--disable-libsanitizer",
    "--disable-libssp",
    "--disable-libquadmath",
    "--disable-libgomp",
    "--with-newlib",
];

/// Disabled features of a freestanding gcc without any C library.
const DISABLE_HOSTED_OPTION_PURE: [&str; 10] = [
    "--disable-threads",
    "--disable-hosted-libstdcxx",
    "--disable-libstdcxx-verbose",
    "--disable-shared",
    "--without-headers",
    "--disable-libvtv",
    "--disable-libsanitizer",
    "--disable-libssp",
    "--disable-libquadmath",
    "--disable-libgomp",
];

const W64_GDBSUPPORT_OPTION: &str = "CXXFLAGS=\"-O3 -D_WIN32_WINNT=0x0600\"";

/// Static prefixes of the libraries gdb links against on mingw hosts.
#[must_use]
pub fn mingw_helper_prefixes(directories: &Directories) -> [(Library, Utf8PathBuf); 3] {
    [Library::Gmp, Library::Expat, Library::Mpfr]
        .map(|library| (library, directories.helper_install_dir(library.name())))
}

fn owned(options: &[&str]) -> Vec<String> {
    options.iter().map(|option| (*option).to_owned()).collect()
}

/// Configure options of every library, computed once per toolchain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecipeOptions {
    pub basic: Vec<String>,
    pub libc: Vec<String>,
    pub gcc: Vec<String>,
    pub gdb: Vec<String>,
    /// `make` arguments installing the kernel headers, empty for non-Linux targets.
    pub linux: Vec<String>,
    pub gdbserver: Vec<String>,
}

impl RecipeOptions {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(directories)))]
    pub fn new(layout: &GccLayout, directories: &Directories, flags: BuildFlags) -> Result<Self, super::Error> {
        ensure!(
            !(layout.toolchain_type.is_freestanding() && flags.gdbserver),
            GdbserverForFreestandingSnafu {
                target: layout.target.to_string()
            }
        );
        let target = layout.target.normalize();
        let host = layout.host.normalize();
        let (host_os, target_os) = (host.os(), target.os());

        let basic = vec![
            "--disable-werror".to_owned(),
            if flags.nls { "--enable-nls" } else { "--disable-nls" }.to_owned(),
            format!("--build={}", layout.build),
            format!("--target={}", layout.target),
            format!("--prefix={}", layout.prefix),
            format!("--host={}", layout.host),
            "CFLAGS=-O3".to_owned(),
            "CXXFLAGS=-O3".to_owned(),
        ];

        let libc = match target_os {
            "linux" => vec![
                format!("--prefix={}", layout.lib_prefix),
                format!("--host={}", layout.target),
                format!("--build={}", layout.build),
                "--disable-werror".to_owned(),
            ],
            "w64" => vec![
                format!("--host={}", layout.target),
                format!("--prefix={}", layout.lib_prefix),
                "--with-default-msvcrt=ucrt".to_owned(),
                "--disable-werror".to_owned(),
            ],
            // newlib picks the target subdirectory itself
            "unknown" => vec![
                format!("--prefix={}", layout.prefix),
                format!("--target={}", layout.target),
                format!("--build={}", layout.build),
                "--disable-werror".to_owned(),
            ],
            os => {
                return UnsupportedTargetOsSnafu {
                    target: layout.target.to_string(),
                    os,
                }
                .fail()
            },
        };

        let mut gcc = match target_os {
            "linux" => owned(&["--disable-bootstrap"]),
            "w64" => owned(&["--disable-sjlj-exceptions", "--enable-threads=win32"]),
            _ if flags.newlib => owned(&DISABLE_HOSTED_OPTION),
            _ => owned(&DISABLE_HOSTED_OPTION_PURE),
        };
        gcc.extend(owned(&["--enable-languages=c,c++", "--disable-multilib"]));

        let gdbserver_with_gdb = flags.gdbserver && layout.toolchain_type.intersects(ToolchainType::NATIVE_OR_CANADIAN);
        let gdbserver_option = if gdbserver_with_gdb { "--enable-gdbserver" } else { "--disable-gdbserver" };
        let gdb =
            if flags.gdb {
                let mut gdb = match host_os {
                    "linux" => vec![
                        format!("LDFLAGS=\"{}\"", layout.rpath_option),
                        "--with-python=/usr/bin/python3".to_owned(),
                    ],
                    "w64" => {
                        let [(_, gmp), (_, expat), (_, mpfr)] = mingw_helper_prefixes(directories);
                        vec![
                            format!("--with-python={}", directories.script_dir().join("python_config.sh")),
                            W64_GDBSUPPORT_OPTION.to_owned(),
                            "--with-expat".to_owned(),
                            format!("--with-gmp={gmp}"),
                            format!("--with-mpfr={mpfr}"),
                            format!("--with-libexpat-prefix={expat}"),
                        ]
                    },
                    os => {
                        return UnsupportedHostOsSnafu {
                            host: layout.host.to_string(),
                            os,
                        }
                        .fail()
                    },
                };
                gdb.extend([
                    format!("--with-system-gdbinit={}", layout.gdbinit_path),
                    gdbserver_option.to_owned(),
                    "--enable-gdb".to_owned(),
                    "--disable-unit-tests".to_owned(),
                ]);
                gdb
            } else {
                owned(&[gdbserver_option, "--disable-gdb"])
            };

        let linux =
            if target_os == "linux" {
                let arch = KernelArch::from_target_arch(target.arch()).context(UnsupportedKernelArchSnafu {
                    arch: target.arch(),
                })?;
                vec![
                    format!("ARCH={arch}"),
                    format!("INSTALL_HDR_PATH={}", layout.lib_prefix),
                    "headers_install".to_owned(),
                ]
            } else {
                Vec::new()
            };

        let mut gdbserver = vec![
            "--disable-gdb".to_owned(),
            format!("--host={}", layout.target),
            "--enable-gdbserver".to_owned(),
            "--disable-binutils".to_owned(),
        ];
        if target_os == "w64" {
            gdbserver.push(W64_GDBSUPPORT_OPTION.to_owned());
        }

        Ok(Self {
            basic,
            libc,
            gcc,
            gdb,
            linux,
            gdbserver,
        })
    }

    /// Appends the per-target quirks of `modifier`.
    pub fn apply(&mut self, modifier: &Modifier) {
        self.libc.extend(owned(modifier.libc_options));
        self.gcc.extend(owned(modifier.gcc_options));
    }
}

/// One of the mutually exclusive ways of building a GCC toolchain.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Recipe {
    NativeLinux,
    FullBuildLinux,
    FullBuildMingw,
    FullBuildFreestanding,
    PartialBuild,
}

impl Recipe {
    #[cfg_attr(feature = "tracing", tracing::instrument)]
    pub fn select(layout: &GccLayout) -> Result<Self, super::Error> {
        let target_os = layout.target.normalize().os().to_owned();
        let toolchain_type = layout.toolchain_type;
        if !toolchain_type.full_build() {
            return Ok(Recipe::PartialBuild);
        }
        let recipe = match (toolchain_type.contains(ToolchainType::NATIVE), target_os.as_str()) {
            (true, "linux") => Recipe::NativeLinux,
            (false, "linux") => Recipe::FullBuildLinux,
            (false, "w64") => Recipe::FullBuildMingw,
            (false, "unknown") => Recipe::FullBuildFreestanding,
            (_, os) => {
                return UnsupportedTargetOsSnafu {
                    target: layout.target.to_string(),
                    os,
                }
                .fail()
            },
        };
        Ok(recipe)
    }

    /// Source trees that must exist before this recipe runs.
    #[must_use]
    pub fn libraries(self, layout: &GccLayout, flags: BuildFlags) -> Vec<Library> {
        let mut libraries = match self {
            Recipe::NativeLinux | Recipe::FullBuildLinux => {
                vec![Library::Binutils, Library::Gcc, Library::Linux, Library::Glibc]
            },
            Recipe::FullBuildMingw => vec![Library::Binutils, Library::Gcc, Library::Mingw, Library::Pexports],
            Recipe::FullBuildFreestanding if flags.newlib => vec![Library::Binutils, Library::Gcc, Library::Newlib],
            Recipe::FullBuildFreestanding => vec![Library::Binutils, Library::Gcc],
            Recipe::PartialBuild if layout.target.normalize().os() == "w64" => {
                vec![Library::Binutils, Library::Gcc, Library::Pexports]
            },
            Recipe::PartialBuild => vec![Library::Binutils, Library::Gcc],
        };
        if flags.gdb && layout.host.os() == "w64" {
            libraries.extend([Library::Gmp, Library::Expat, Library::Mpfr, Library::PythonEmbed]);
        }
        libraries
    }
}

impl core::fmt::Display for Recipe {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let recipe = match self {
            Recipe::NativeLinux => "native-linux",
            Recipe::FullBuildLinux => "full-build-linux",
            Recipe::FullBuildMingw => "full-build-mingw",
            Recipe::FullBuildFreestanding => "full-build-freestanding",
            Recipe::PartialBuild => "partial-build",
        };
        write!(f, "{recipe}")
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;

    use super::*;
    use crate::Triplet;

    fn layout(host: &str, target: &str) -> GccLayout {
        GccLayout::new(
            &Triplet::parse("x86_64-linux-gnu").unwrap(),
            &Triplet::parse(host).unwrap(),
            &Triplet::parse(target).unwrap(),
            Utf8Path::new("/opt"),
        )
    }

    fn directories() -> Directories {
        Directories::new(Utf8Path::new("/src"), Utf8Path::new("/opt"), None)
    }

    #[test]
    fn recipes_follow_topology_and_target_os() {
        let gnu = "x86_64-linux-gnu";
        let mingw = "x86_64-w64-mingw32";
        assert_eq!(Recipe::select(&layout(gnu, gnu)).unwrap(), Recipe::NativeLinux);
        assert_eq!(Recipe::select(&layout(gnu, "aarch64-linux-gnu")).unwrap(), Recipe::FullBuildLinux);
        assert_eq!(Recipe::select(&layout(gnu, mingw)).unwrap(), Recipe::FullBuildMingw);
        assert_eq!(Recipe::select(&layout(gnu, "arm-none-eabi")).unwrap(), Recipe::FullBuildFreestanding);
        assert_eq!(Recipe::select(&layout(gnu, "x86_64-elf")).unwrap(), Recipe::FullBuildFreestanding);
        assert_eq!(Recipe::select(&layout(mingw, mingw)).unwrap(), Recipe::PartialBuild);
        assert_eq!(Recipe::select(&layout(mingw, "arm-none-eabi")).unwrap(), Recipe::PartialBuild);
    }

    #[test]
    fn basic_options_are_shared() {
        let options = RecipeOptions::new(
            &layout("x86_64-linux-gnu", "aarch64-linux-gnu"),
            &directories(),
            BuildFlags::default(),
        )
        .unwrap();
        assert_eq!(
            options.basic,
            [
                "--disable-werror",
                "--disable-nls",
                "--build=x86_64-linux-gnu",
                "--target=aarch64-linux-gnu",
                "--prefix=/opt/x86_64-linux-gnu-host-aarch64-linux-gnu-target-gcc15",
                "--host=x86_64-linux-gnu",
                "CFLAGS=-O3",
                "CXXFLAGS=-O3",
            ]
        );
        assert_eq!(
            options.linux,
            [
                "ARCH=arm64",
                "INSTALL_HDR_PATH=/opt/x86_64-linux-gnu-host-aarch64-linux-gnu-target-gcc15/aarch64-linux-gnu",
                "headers_install",
            ]
        );
        assert!(options.gdb.contains(&"--disable-gdbserver".to_owned()));
    }

    #[test]
    fn disabled_gdb_still_passes_explicit_flags() {
        let flags = BuildFlags {
            gdb: false,
            ..BuildFlags::default()
        };
        let options =
            RecipeOptions::new(&layout("x86_64-linux-gnu", "x86_64-linux-gnu"), &directories(), flags).unwrap();
        assert_eq!(options.gdb, ["--enable-gdbserver", "--disable-gdb"]);
    }

    #[test]
    fn freestanding_options_depend_on_newlib() {
        let target = layout("x86_64-linux-gnu", "arm-none-eabi");
        let flags = BuildFlags {
            gdbserver: false,
            ..BuildFlags::default()
        };
        let with_newlib = RecipeOptions::new(&target, &directories(), flags).unwrap();
        assert!(with_newlib.gcc.contains(&"--with-newlib".to_owned()));
        assert!(with_newlib.linux.is_empty());
        let pure = RecipeOptions::new(&target, &directories(), BuildFlags {
            newlib: false,
            ..flags
        })
        .unwrap();
        assert!(pure.gcc.contains(&"--disable-hosted-libstdcxx".to_owned()));
        assert_eq!(pure.libc[0], "--prefix=/opt/x86_64-linux-gnu-host-arm-none-eabi-target-gcc15");
    }

    #[test]
    fn freestanding_targets_reject_gdbserver() {
        for target in ["arm-none-eabi", "x86_64-elf"] {
            let error = RecipeOptions::new(&layout("x86_64-linux-gnu", target), &directories(), BuildFlags::default())
                .unwrap_err();
            assert!(matches!(
                error,
                super::super::Error::GdbserverForFreestanding { target: ref rejected } if rejected == target
            ));
        }
        let hosted = RecipeOptions::new(
            &layout("x86_64-linux-gnu", "aarch64-linux-gnu"),
            &directories(),
            BuildFlags::default(),
        );
        assert!(hosted.is_ok());
    }

    #[test]
    fn mingw_host_gdb_uses_static_helpers() {
        let options = RecipeOptions::new(
            &layout("x86_64-w64-mingw32", "x86_64-w64-mingw32"),
            &directories(),
            BuildFlags::default(),
        )
        .unwrap();
        assert!(options.gdb.contains(&"--with-python=/src/script/python_config.sh".to_owned()));
        assert!(options.gdb.contains(&"--with-libexpat-prefix=/src/expat/install".to_owned()));
        assert!(options.gdbserver.contains(&W64_GDBSUPPORT_OPTION.to_owned()));
    }

    #[test]
    fn modifiers_extend_options() {
        let target = layout("x86_64-linux-gnu", "x86_64-w64-mingw32");
        let mut options = RecipeOptions::new(&target, &directories(), BuildFlags::default()).unwrap();
        options.apply(crate::toolchain::modifier::lookup(&target.target).unwrap());
        assert!(options.libc.ends_with(&["--disable-lib32".to_owned(), "--enable-lib64".to_owned()]));
    }

    #[test]
    fn recipe_libraries_include_gdb_helpers_for_mingw_hosts() {
        let canadian = layout("x86_64-w64-mingw32", "x86_64-w64-mingw32");
        let libraries = Recipe::PartialBuild.libraries(&canadian, BuildFlags::default());
        assert!(libraries.contains(&Library::Pexports));
        assert!(libraries.contains(&Library::PythonEmbed));
        let native = layout("x86_64-linux-gnu", "x86_64-linux-gnu");
        assert!(!Recipe::NativeLinux.libraries(&native, BuildFlags::default()).contains(&Library::Gmp));
    }
}
