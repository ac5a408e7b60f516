use camino::Utf8Path;
use indexmap::IndexMap;
use itertools::Itertools;

/// Ordered `-DKEY=VALUE` cache entries. Values are passed to the shell as
/// written, so list values carry their own quotes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CMakeOptions(IndexMap<String, String>);

impl CMakeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                .collect(),
        )
    }

    /// Sets `key`, keeping the position of an existing entry.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.shift_remove(key)
    }

    /// `self` overridden by every entry of `other`.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (key, value) in &other.0 {
            merged.set(key, value.clone());
        }
        merged
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        self.0.iter().map(|(key, value)| format!("-D{key}={value}")).collect()
    }
}

impl core::fmt::Display for CMakeOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.to_args().iter().join(" "))
    }
}

const BASE_OPTIONS: [(&str, &str); 23] = [
    ("CMAKE_BUILD_TYPE", "Release"),
    ("LLVM_BUILD_DOCS", "OFF"),
    ("LLVM_BUILD_EXAMPLES", "OFF"),
    ("LLVM_INCLUDE_BENCHMARKS", "OFF"),
    ("LLVM_INCLUDE_EXAMPLES", "OFF"),
    ("LLVM_INCLUDE_TESTS", "OFF"),
    ("LLVM_TARGETS_TO_BUILD", "\"X86;AArch64;RISCV;ARM;LoongArch;Mips\""),
    ("LLVM_ENABLE_PROJECTS", "\"clang;lld\""),
    ("LLVM_ENABLE_RUNTIMES", "\"libcxx;libcxxabi;libunwind;compiler-rt\""),
    ("LLVM_ENABLE_WARNINGS", "OFF"),
    ("CLANG_INCLUDE_TESTS", "OFF"),
    ("BENCHMARK_INSTALL_DOCS", "OFF"),
    ("CLANG_DEFAULT_LINKER", "lld"),
    ("LLVM_ENABLE_LLD", "ON"),
    ("CMAKE_BUILD_WITH_INSTALL_RPATH", "ON"),
    ("LIBCXX_INCLUDE_BENCHMARKS", "OFF"),
    ("LIBCXX_USE_COMPILER_RT", "ON"),
    ("LIBCXX_CXX_ABI", "libcxxabi"),
    ("LIBCXXABI_USE_LLVM_UNWINDER", "ON"),
    ("LIBCXXABI_USE_COMPILER_RT", "ON"),
    ("COMPILER_RT_DEFAULT_TARGET_ONLY", "ON"),
    ("COMPILER_RT_USE_LIBCXX", "ON"),
    ("LLVM_PARALLEL_LINK_JOBS", "1"),
];

const WIN32_RUNTIME_OPTIONS: [(&str, &str); 3] = [
    ("LIBCXXABI_HAS_WIN32_THREAD_API", "ON"),
    ("LIBCXXABI_ENABLE_SHARED", "OFF"),
    ("LIBCXX_ENABLE_STATIC_ABI_LIBRARY", "ON"),
];

const SELF_HOSTED_OPTIONS: [(&str, &str); 5] = [
    ("LLVM_ENABLE_PROJECTS", "\"clang;clang-tools-extra;lld\""),
    ("LLVM_ENABLE_LTO", "Thin"),
    ("CLANG_DEFAULT_CXX_STDLIB", "libc++"),
    ("CLANG_DEFAULT_RTLIB", "compiler-rt"),
    ("CLANG_DEFAULT_UNWINDLIB", "libunwind"),
];

const DYLIB_OPTIONS: [(&str, &str); 3] = [
    ("LLVM_LINK_LLVM_DYLIB", "ON"),
    ("LLVM_BUILD_LLVM_DYLIB", "ON"),
    ("CLANG_LINK_CLANG_DYLIB", "ON"),
];

const LIB_OPTIONS: [(&str, &str); 9] = [
    ("BUILD_SHARED_LIBS", "ON"),
    ("LIBXML2_WITH_ICONV", "OFF"),
    ("LIBXML2_WITH_LZMA", "OFF"),
    ("LIBXML2_WITH_PYTHON", "OFF"),
    ("LIBXML2_WITH_ZLIB", "OFF"),
    ("LIBXML2_WITH_THREADS", "OFF"),
    ("LIBXML2_WITH_CATALOG", "OFF"),
    ("CMAKE_RC_COMPILER", "llvm-windres"),
    ("CMAKE_BUILD_WITH_INSTALL_RPATH", "ON"),
];

/// Install prefixes the cross build takes zlib, libxml2 and the native tools from.
#[derive(Clone, Copy, Debug)]
pub struct CrossPrefixes<'a> {
    pub zlib: &'a Utf8Path,
    pub libxml2: &'a Utf8Path,
    pub native_bin: &'a Utf8Path,
}

/// CMake options of every stage of an LLVM build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageOptions {
    /// Stage 1 compiler, built with the compiler found on `PATH`.
    pub stage_1: CMakeOptions,
    /// Stage 1 runtimes for Windows targets.
    pub w32_1: CMakeOptions,
    /// Stage 2 compiler, rebuilt by stage 1 without runtimes.
    pub stage_2: CMakeOptions,
    /// Stage 3 runtimes, rebuilt by stage 2.
    pub stage_3: CMakeOptions,
    pub w32_3: CMakeOptions,
    pub dylib: CMakeOptions,
    /// zlib and libxml2.
    pub lib: CMakeOptions,
    /// Extra options of a compiler built for another host, empty for native builds.
    pub cross: CMakeOptions,
}

impl StageOptions {
    #[must_use]
    pub fn new(jobs: usize, bootstrap: bool, cross: Option<CrossPrefixes<'_>>) -> Self {
        let mut base = CMakeOptions::from_pairs(&BASE_OPTIONS);
        base.set("LLVM_PARALLEL_LINK_JOBS", (jobs / 5).max(1).to_string());
        let self_hosted = CMakeOptions::from_pairs(&SELF_HOSTED_OPTIONS);
        let win32 = CMakeOptions::from_pairs(&WIN32_RUNTIME_OPTIONS);

        let mut stage_1 = base.clone();
        if !bootstrap {
            // without a second stage the extra tools and LTO come with the first one
            stage_1
                .set("LLVM_ENABLE_PROJECTS", "\"clang;clang-tools-extra;lld\"")
                .set("LLVM_ENABLE_LTO", "Thin");
        }
        let w32_1 = base.merged(&win32);
        let mut stage_2 = base.merged(&self_hosted);
        stage_2.remove("LLVM_ENABLE_RUNTIMES");
        let mut stage_3 = base.merged(&self_hosted);
        stage_3.set("LIBUNWIND_USE_COMPILER_RT", "ON");
        let w32_3 = stage_3.merged(&win32);

        let cross = match cross {
            Some(prefixes) => {
                // runtimes come from the native build
                stage_1.remove("LLVM_ENABLE_RUNTIMES");
                let zlib = format!("\"{}\"", prefixes.zlib.join("lib").join("libzlibstatic.a"));
                let mut cross = CMakeOptions::new();
                cross
                    .set(
                        "LIBXML2_INCLUDE_DIR",
                        format!("\"{}\"", prefixes.libxml2.join("include").join("libxml2")),
                    )
                    .set(
                        "LIBXML2_LIBRARY",
                        format!("\"{}\"", prefixes.libxml2.join("lib").join("libxml2.dll.a")),
                    )
                    .set("CLANG_ENABLE_LIBXML2", "ON")
                    .set("ZLIB_INCLUDE_DIR", format!("\"{}\"", prefixes.zlib.join("include")))
                    .set("ZLIB_LIBRARY", zlib.clone())
                    .set("ZLIB_LIBRARY_RELEASE", zlib)
                    .set("LLVM_NATIVE_TOOL_DIR", format!("\"{}\"", prefixes.native_bin));
                cross
            },
            None => CMakeOptions::new(),
        };

        Self {
            stage_1,
            w32_1,
            stage_2,
            stage_3,
            w32_3,
            dylib: CMakeOptions::from_pairs(&DYLIB_OPTIONS),
            lib: CMakeOptions::from_pairs(&LIB_OPTIONS),
            cross,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_render_in_insertion_order() {
        let mut options = CMakeOptions::from_pairs(&[("A", "1"), ("B", "\"x;y\"")]);
        options.set("A", "2").set("C", "ON");
        assert_eq!(options.to_string(), "-DA=2 -DB=\"x;y\" -DC=ON");
        assert_eq!(options.remove("B").as_deref(), Some("\"x;y\""));
        assert_eq!(options.to_args(), ["-DA=2", "-DC=ON"]);
    }

    #[test]
    fn single_stage_build_enables_tools_and_lto() {
        let options = StageOptions::new(20, false, None);
        assert_eq!(options.stage_1.get("LLVM_ENABLE_PROJECTS"), Some("\"clang;clang-tools-extra;lld\""));
        assert_eq!(options.stage_1.get("LLVM_ENABLE_LTO"), Some("Thin"));
        assert_eq!(options.stage_1.get("LLVM_PARALLEL_LINK_JOBS"), Some("4"));
        assert!(options.cross.is_empty());
    }

    #[test]
    fn bootstrap_stages_split_compiler_and_runtimes() {
        let options = StageOptions::new(8, true, None);
        assert_eq!(options.stage_1.get("LLVM_ENABLE_PROJECTS"), Some("\"clang;lld\""));
        assert_eq!(options.stage_1.get("LLVM_ENABLE_LTO"), None);
        assert_eq!(options.stage_2.get("LLVM_ENABLE_RUNTIMES"), None);
        assert_eq!(options.stage_2.get("CLANG_DEFAULT_RTLIB"), Some("compiler-rt"));
        assert_eq!(options.stage_3.get("LIBUNWIND_USE_COMPILER_RT"), Some("ON"));
        assert_eq!(options.w32_3.get("LIBCXXABI_ENABLE_SHARED"), Some("OFF"));
        assert_eq!(options.w32_1.get("LIBCXX_ENABLE_STATIC_ABI_LIBRARY"), Some("ON"));
    }

    #[test]
    fn cross_build_uses_prebuilt_dependencies() {
        let options = StageOptions::new(8, false, Some(CrossPrefixes {
            zlib: Utf8Path::new("/src/zlib/install"),
            libxml2: Utf8Path::new("/src/libxml2/install"),
            native_bin: Utf8Path::new("/opt/x86_64-linux-gnu-clang21/bin"),
        }));
        assert_eq!(options.stage_1.get("LLVM_ENABLE_RUNTIMES"), None);
        assert_eq!(
            options.cross.get("ZLIB_LIBRARY"),
            Some("\"/src/zlib/install/lib/libzlibstatic.a\"")
        );
        assert_eq!(
            options.cross.get("LIBXML2_INCLUDE_DIR"),
            Some("\"/src/libxml2/install/include/libxml2\"")
        );
        assert_eq!(
            options.cross.get("LLVM_NATIVE_TOOL_DIR"),
            Some("\"/opt/x86_64-linux-gnu-clang21/bin\"")
        );
    }
}
