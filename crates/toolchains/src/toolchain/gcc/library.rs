use camino::{Utf8Path, Utf8PathBuf};

/// A source tree the GCC recipes configure, build or copy from.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Library {
    Expat,
    Gcc,
    Binutils,
    Gmp,
    Mpfr,
    Linux,
    Mingw,
    Pexports,
    PythonEmbed,
    Glibc,
    Newlib,
}

impl Library {
    pub const ALL: [Library; 11] = [
        Library::Expat,
        Library::Gcc,
        Library::Binutils,
        Library::Gmp,
        Library::Mpfr,
        Library::Linux,
        Library::Mingw,
        Library::Pexports,
        Library::PythonEmbed,
        Library::Glibc,
        Library::Newlib,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Library::Expat => "expat",
            Library::Gcc => "gcc",
            Library::Binutils => "binutils",
            Library::Gmp => "gmp",
            Library::Mpfr => "mpfr",
            Library::Linux => "linux",
            Library::Mingw => "mingw",
            Library::Pexports => "pexports",
            Library::PythonEmbed => "python-embed",
            Library::Glibc => "glibc",
            Library::Newlib => "newlib",
        }
    }

    /// Libraries a vendor may ship patched sources for, found in `home/{lib}-{vendor}`.
    #[must_use]
    pub fn vendor_specific(self) -> bool {
        matches!(self, Library::Glibc | Library::Linux)
    }

    /// The out-of-tree build directory, or `None` for trees built in place.
    #[must_use]
    pub fn build_dir(self, source_dir: &Utf8Path) -> Option<Utf8PathBuf> {
        match self {
            Library::PythonEmbed | Library::Linux => None,
            Library::Expat => Some(source_dir.join("expat").join("build")),
            _ => Some(source_dir.join("build")),
        }
    }
}

impl core::fmt::Display for Library {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_dirs_follow_tree_layout() {
        let source = Utf8Path::new("/src/expat");
        assert_eq!(Library::Expat.build_dir(source).unwrap(), "/src/expat/expat/build");
        assert_eq!(Library::Gcc.build_dir(Utf8Path::new("/src/gcc")).unwrap(), "/src/gcc/build");
        assert!(Library::Linux.build_dir(Utf8Path::new("/src/linux")).is_none());
        assert!(Library::PythonEmbed.build_dir(Utf8Path::new("/src/python-embed")).is_none());
    }

    #[test]
    fn only_libc_and_kernel_are_vendor_specific() {
        let vendor_specific = Library::ALL
            .iter()
            .filter(|library| library.vendor_specific())
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        assert_eq!(vendor_specific, ["linux", "glibc"]);
    }
}
