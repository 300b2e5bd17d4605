use ahash::AHashMap;
use once_cell::sync::Lazy;

pub const RESIDENTIAL: &str = "住家用";
pub const OFFICE: &str = "辦公用";

static USAGE_ALIASES: Lazy<AHashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("住宅", RESIDENTIAL),
        ("住家", RESIDENTIAL),
        ("住家用", RESIDENTIAL),
        ("辦公", OFFICE),
        ("商辦", OFFICE),
        ("辦公用", OFFICE),
        ("办公", OFFICE),
        ("商办", OFFICE),
        ("办公用", OFFICE),
    ]
    .into_iter()
    .collect()
});

/// Canonical usage category for a cleaned usage string. Unknown categories are kept as is.
pub fn canonical_usage(usage: &str) -> Option<&'static str> {
    USAGE_ALIASES.get(usage).copied()
}
