use camino::Utf8Path;

use crate::{shell, Shell};

/// `OUTPUT_FORMAT` of the generated `libm.a` linker script, keyed by glibc arch.
static LIBM_OUTPUT_FORMATS: [(&str, &str); 2] = [("x86_64", "elf64-x86-64"), ("aarch64", "elf64-littleaarch64")];

#[must_use]
pub fn libm_output_format(arch: &str) -> Option<&'static str> {
    LIBM_OUTPUT_FORMATS
        .iter()
        .find(|(key, _)| *key == arch)
        .map(|(_, format)| *format)
}

#[must_use]
pub fn render_libm(output_format: &str, libm: &str) -> String {
    format!("OUTPUT_FORMAT({output_format})\nGROUP({libm} libmvec.a)\n")
}

/// Replaces the glibc linker scripts in `lib_dir` that carry absolute paths.
///
/// Files named `{arch}-lib*` in the script directory, python helpers aside, are
/// copied without the arch prefix, then the `libm.a` script is generated for architectures that need one.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(shell)))]
pub fn install(shell: &Shell, script_dir: &Utf8Path, arch: &str, lib_dir: &Utf8Path) -> Result<(), shell::Error> {
    let prefix = format!("{arch}-");
    if shell.exists(script_dir) {
        for file in shell.read_dir(script_dir)? {
            let Some(name) = file.file_name() else { continue };
            let stripped = name
                .strip_prefix(&prefix)
                .filter(|rest| rest.starts_with("lib") && !rest.ends_with(".py"));
            if let Some(stripped) = stripped {
                shell.copy(&file, &lib_dir.join(stripped))?;
            }
        }
    } else {
        shell.warning(&format!("Cannot find script directory \"{script_dir}\", skip copying ldscripts."))?;
    }

    let Some(output_format) = libm_output_format(arch) else {
        return Ok(());
    };
    let libm = shell
        .read_dir(lib_dir)?
        .into_iter()
        .filter_map(|path| path.file_name().map(str::to_owned))
        .find(|name| name.starts_with("libm-"));
    let ldscript = lib_dir.join("libm.a");
    match libm {
        Some(libm) => {
            shell.info(&format!("Create ldscript \"{ldscript}\"."))?;
            shell.write_file(&ldscript, &render_libm(output_format, &libm))?;
        },
        None if shell.dry_run() => shell.note(&format!("Skip creating ldscript \"{ldscript}\" for dry run."))?,
        None => shell.warning(&format!("Cannot find libm-*.a in \"{lib_dir}\", skip creating ldscript."))?,
    }
    Ok(())
}
