/// Value of the kernel's `ARCH=` variable when installing Linux headers.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KernelArch {
    Arm,
    Arm64,
    LoongArch,
    Mips,
    RiscV,
    X86,
}

impl KernelArch {
    #[must_use]
    pub fn from_target_arch(arch: &str) -> Option<Self> {
        match arch {
            "i686" | "x86_64" => Some(KernelArch::X86),
            "arm" => Some(KernelArch::Arm),
            "aarch64" => Some(KernelArch::Arm64),
            "loongarch64" => Some(KernelArch::LoongArch),
            "riscv64" => Some(KernelArch::RiscV),
            "mips64el" => Some(KernelArch::Mips),
            _ => None,
        }
    }
}

impl core::fmt::Display for KernelArch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let arch = match self {
            KernelArch::Arm => "arm",
            KernelArch::Arm64 => "arm64",
            KernelArch::LoongArch => "loongarch",
            KernelArch::Mips => "mips",
            KernelArch::RiscV => "riscv",
            KernelArch::X86 => "x86",
        };
        write!(f, "{arch}")
    }
}
