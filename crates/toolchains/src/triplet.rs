use snafu::prelude::*;

/// Operating system names that may occupy the second field of a 3-field triplet.
pub const OS_NAMES: [&str; 3] = ["linux", "w64", "none"];

const UNKNOWN: &str = "unknown";

#[derive(Debug, Snafu)]
pub enum Error {
    IllegalTriplet { triplet: String },
}

impl From<self::Error> for crate::Error {
    fn from(source: self::Error) -> Self {
        crate::Error::ToolchainsTriplet { source }
    }
}

/// A platform triplet split into its four semantic fields.
///
/// Equality compares the fields only, so `x86_64-linux-gnu` and
/// `x86_64-unknown-linux-gnu` are equal while the rendered string is kept as written.
#[derive(Clone, Debug, Eq)]
pub struct Triplet {
    raw: String,
    arch: String,
    vendor: String,
    os: String,
    abi: String,
}

impl Triplet {
    #[cfg_attr(feature = "tracing", tracing::instrument)]
    pub fn parse(triplet: &str) -> Result<Self, self::Error> {
        let fields = triplet.split('-').collect::<Vec<_>>();
        let (arch, vendor, os, abi) = match fields.as_slice() {
            [arch, abi] => (*arch, UNKNOWN, UNKNOWN, *abi),
            [arch, second, abi] if OS_NAMES.contains(second) => (*arch, UNKNOWN, *second, *abi),
            [arch, vendor, abi] => (*arch, *vendor, UNKNOWN, *abi),
            [arch, vendor, os, abi] => (*arch, *vendor, *os, *abi),
            _ => return IllegalTripletSnafu { triplet }.fail(),
        };
        ensure!(
            [arch, vendor, os, abi].iter().all(|field| !field.is_empty()),
            IllegalTripletSnafu { triplet }
        );
        Ok(Self {
            raw: triplet.to_owned(),
            arch: arch.to_owned(),
            vendor: vendor.to_owned(),
            os: os.to_owned(),
            abi: abi.to_owned(),
        })
    }

    #[must_use]
    pub fn check(triplet: &str) -> bool {
        Self::parse(triplet).is_ok()
    }

    /// Maps the freestanding os name `none` to `unknown` so lookups agree with
    /// 2-field freestanding triplets like `x86_64-elf`.
    #[must_use]
    pub fn normalize(&self) -> Self {
        let mut normalized = self.clone();
        if normalized.os == "none" {
            UNKNOWN.clone_into(&mut normalized.os);
        }
        normalized
    }

    #[must_use]
    pub fn weak_eq(&self, other: &Self) -> bool {
        self.arch == other.arch && self.os == other.os && self.abi == other.abi
    }

    #[must_use]
    pub fn drop_vendor(&self) -> String {
        format!("{}-{}-{}", self.arch, self.os, self.abi)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    #[must_use]
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    #[must_use]
    pub fn os(&self) -> &str {
        &self.os
    }

    #[must_use]
    pub fn abi(&self) -> &str {
        &self.abi
    }
}

impl PartialEq for Triplet {
    fn eq(&self, other: &Self) -> bool {
        self.arch == other.arch && self.vendor == other.vendor && self.os == other.os && self.abi == other.abi
    }
}

impl core::hash::Hash for Triplet {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.arch.hash(state);
        self.vendor.hash(state);
        self.os.hash(state);
        self.abi.hash(state);
    }
}

impl core::str::FromStr for Triplet {
    type Err = self::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl core::fmt::Display for Triplet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Best-effort parse of an incomplete triplet. Unresolved fields are empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartialTriplet {
    pub arch: String,
    pub vendor: String,
    pub os: String,
    pub abi: String,
    pub num: usize,
}

impl PartialTriplet {
    #[must_use]
    pub fn parse(triplet: &str) -> Self {
        let fields = triplet.split('-').collect::<Vec<_>>();
        let mut result = Self {
            arch: fields.first().copied().unwrap_or_default().to_owned(),
            num: fields.len(),
            ..Self::default()
        };
        if let Some(second) = fields.get(1) {
            if fields.len() >= 4 {
                (*second).clone_into(&mut result.vendor);
                fields[2].clone_into(&mut result.os);
                fields[3].clone_into(&mut result.abi);
                return result;
            }
            if OS_NAMES.iter().any(|os| os.starts_with(second)) {
                (*second).clone_into(&mut result.os);
            } else {
                (*second).clone_into(&mut result.vendor);
            }
            if let Some(third) = fields.get(2) {
                if result.os.is_empty() {
                    (*third).clone_into(&mut result.os);
                } else {
                    (*third).clone_into(&mut result.abi);
                }
            }
        }
        result
    }
}

/// Shell completion over a fixed candidate list.
#[derive(Clone, Debug)]
pub struct TripletCompleter {
    candidates: Vec<Triplet>,
    options: Vec<String>,
}

struct CompletionFilter<'a> {
    arch: &'a str,
    os: &'a str,
    abi: &'a str,
}

impl CompletionFilter<'_> {
    fn accepts(&self, triplet: &Triplet) -> bool {
        let arch = if self.os.is_empty() {
            triplet.arch.starts_with(self.arch)
        } else {
            triplet.arch == self.arch
        };
        let os = match (self.os.is_empty(), self.abi.is_empty()) {
            (false, true) => triplet.os.starts_with(self.os),
            (false, false) => triplet.os == self.os,
            (true, _) => true,
        };
        let abi = self.abi.is_empty() || triplet.abi.starts_with(self.abi);
        arch && os && abi
    }
}

impl TripletCompleter {
    pub fn new<'a>(
        candidates: impl IntoIterator<Item = &'a str>,
        options: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, self::Error> {
        let candidates = candidates
            .into_iter()
            .map(Triplet::parse)
            .collect::<Result<Vec<_>, _>>()?;
        let options = options.into_iter().map(str::to_owned).collect();
        Ok(Self { candidates, options })
    }

    fn matching<'s>(&'s self, arch: &'s str, os: &'s str, abi: &'s str) -> impl Iterator<Item = &'s Triplet> + 's {
        let filter = CompletionFilter { arch, os, abi };
        self.candidates.iter().filter(move |triplet| filter.accepts(triplet))
    }

    #[must_use]
    #[cfg_attr(feature = "tracing", tracing::instrument)]
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        let parsed = PartialTriplet::parse(prefix);
        let PartialTriplet {
            arch, vendor, os, abi, ..
        } = &parsed;
        let mut result = match prefix.matches('-').count() {
            0 if prefix.is_empty() => self.candidates.iter().map(ToString::to_string).collect(),
            0 => self.matching(arch, "", "").map(ToString::to_string).collect(),
            1 => self.matching(arch, os, "").map(ToString::to_string).collect(),
            2 if !abi.is_empty() => self.matching(arch, os, abi).map(ToString::to_string).collect(),
            2 => self
                .matching(arch, os, "")
                .map(|triplet| format!("{arch}-{vendor}-{}-{}", triplet.os, triplet.abi))
                .collect(),
            3 => self
                .matching(arch, os, abi)
                .map(|triplet| format!("{arch}-{vendor}-{os}-{}", triplet.abi))
                .collect(),
            _ => Vec::new(),
        };
        result.extend(self.options.iter().filter(|option| option.starts_with(prefix)).cloned());
        result
    }
}

/// Inserts the `unknown` vendor LLVM expects into a 3-field GNU triplet.
#[must_use]
pub fn gnu_to_llvm(triplet: &str) -> String {
    if triplet.matches('-').count() == 2 {
        if let Some((arch, rest)) = triplet.split_once('-') {
            return format!("{arch}-unknown-{rest}");
        }
    }
    triplet.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(triplet: &Triplet) -> (&str, &str, &str, &str) {
        (triplet.arch(), triplet.vendor(), triplet.os(), triplet.abi())
    }

    #[test]
    fn parse_two_fields_defaults_vendor_and_os() {
        let triplet = Triplet::parse("x86_64-elf").unwrap();
        assert_eq!(fields(&triplet), ("x86_64", "unknown", "unknown", "elf"));
    }

    #[test]
    fn parse_three_fields_disambiguates_os_and_vendor() {
        let linux = Triplet::parse("x86_64-linux-gnu").unwrap();
        assert_eq!(fields(&linux), ("x86_64", "unknown", "linux", "gnu"));
        let mingw = Triplet::parse("x86_64-w64-mingw32").unwrap();
        assert_eq!(fields(&mingw), ("x86_64", "unknown", "w64", "mingw32"));
        let vendor = Triplet::parse("arm-pc-eabi").unwrap();
        assert_eq!(fields(&vendor), ("arm", "pc", "unknown", "eabi"));
    }

    #[test]
    fn parse_four_fields_is_positional() {
        let triplet = Triplet::parse("loongarch64-loongnix-linux-gnu").unwrap();
        assert_eq!(fields(&triplet), ("loongarch64", "loongnix", "linux", "gnu"));
        assert_eq!(triplet.to_string(), "loongarch64-loongnix-linux-gnu");
    }

    #[test]
    fn parse_rejects_bad_field_counts_and_empty_fields() {
        for triplet in ["", "x86_64", "a-b-c-d-e", "x86_64--gnu", "-linux-gnu", "x86_64-linux-"] {
            assert!(Triplet::parse(triplet).is_err(), "{triplet:?} should not parse");
            assert!(!Triplet::check(triplet));
        }
        assert!(Triplet::check("aarch64-linux-gnu"));
    }

    #[test]
    fn weak_equality_ignores_vendor() {
        let plain = Triplet::parse("x86_64-linux-gnu").unwrap();
        let pc = Triplet::parse("x86_64-pc-linux-gnu").unwrap();
        let musl = Triplet::parse("x86_64-linux-musl").unwrap();
        assert!(plain.weak_eq(&pc));
        assert!(!plain.weak_eq(&musl));
        assert_ne!(plain, pc);
    }

    #[test]
    fn drop_vendor_renders_three_fields() {
        let triplet = Triplet::parse("x86_64-pc-linux-gnu").unwrap();
        assert_eq!(triplet.drop_vendor(), "x86_64-linux-gnu");
    }

    #[test]
    fn normalize_maps_none_to_unknown() {
        let triplet = Triplet::parse("arm-none-eabi").unwrap();
        assert_eq!(triplet.os(), "none");
        let normalized = triplet.normalize();
        assert_eq!(normalized.os(), "unknown");
        assert_eq!(normalized.to_string(), "arm-none-eabi");
    }

    #[test]
    fn try_parse_never_fails() {
        assert_eq!(PartialTriplet::parse("").num, 1);
        let partial = PartialTriplet::parse("x86_64-li");
        assert_eq!((partial.arch.as_str(), partial.os.as_str()), ("x86_64", "li"));
        let partial = PartialTriplet::parse("x86_64-pc-linux");
        assert_eq!(
            (partial.vendor.as_str(), partial.os.as_str(), partial.abi.as_str()),
            ("pc", "linux", "")
        );
        let partial = PartialTriplet::parse("x86_64-w64-ming");
        assert_eq!((partial.os.as_str(), partial.abi.as_str()), ("w64", "ming"));
        let partial = PartialTriplet::parse("a-b-c-d-e");
        assert_eq!(partial.num, 5);
        assert_eq!(partial.abi, "d");
    }

    #[test]
    fn completer_filters_by_prefix() {
        let completer = TripletCompleter::new(
            ["x86_64-linux-gnu", "x86_64-w64-mingw32", "arm-none-eabi", "aarch64-linux-gnu"],
            ["all"],
        )
        .unwrap();
        assert_eq!(completer.complete("").len(), 5);
        assert_eq!(completer.complete("a"), ["arm-none-eabi", "aarch64-linux-gnu", "all"]);
        assert_eq!(completer.complete("x86_64-w"), ["x86_64-w64-mingw32"]);
        assert_eq!(completer.complete("x86_64-linux-g"), ["x86_64-linux-gnu"]);
        assert_eq!(completer.complete("x86_64-pc-l"), ["x86_64-pc-linux-gnu"]);
        assert!(completer.complete("x86_64-a-b-c-d").is_empty());
    }

    #[test]
    fn gnu_to_llvm_inserts_vendor() {
        assert_eq!(gnu_to_llvm("x86_64-linux-gnu"), "x86_64-unknown-linux-gnu");
        assert_eq!(gnu_to_llvm("x86_64-pc-linux-gnu"), "x86_64-pc-linux-gnu");
        assert_eq!(gnu_to_llvm("x86_64-elf"), "x86_64-elf");
    }
}
