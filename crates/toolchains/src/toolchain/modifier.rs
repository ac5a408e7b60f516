use crate::Triplet;

/// Per-target adjustments applied on top of the derived recipe options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifier {
    /// Architecture key used to pick glibc linker scripts.
    pub glibc_arch: Option<&'static str>,
    pub libc_options: &'static [&'static str],
    pub gcc_options: &'static [&'static str],
}

static MODIFIERS: [(&str, Modifier); 5] = [
    ("arm-linux-gnueabi", Modifier {
        glibc_arch: Some("arm-sf"),
        libc_options: &[],
        gcc_options: &[],
    }),
    ("arm-linux-gnueabihf", Modifier {
        glibc_arch: Some("arm-hf"),
        libc_options: &[],
        gcc_options: &[],
    }),
    ("loongarch64-loongnix-linux-gnu", Modifier {
        glibc_arch: Some("loongarch64-loongnix"),
        libc_options: &["--enable-obsolete-rpc"],
        gcc_options: &["--disable-libsanitizer"],
    }),
    ("x86_64-w64-mingw32", Modifier {
        glibc_arch: None,
        libc_options: &["--disable-lib32", "--enable-lib64"],
        gcc_options: &[],
    }),
    ("i686-w64-mingw32", Modifier {
        glibc_arch: None,
        libc_options: &["--disable-lib64", "--enable-lib32"],
        gcc_options: &[],
    }),
];

/// Looks up the quirks of `target`. Targets without an entry need none.
#[must_use]
pub fn lookup(target: &Triplet) -> Option<&'static Modifier> {
    let key = target.as_str().replace("x86-64", "x86_64");
    MODIFIERS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, modifier)| modifier)
}
