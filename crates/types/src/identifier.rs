//! Hierarchical step identifiers.
//!
//! A resolved step identifier is the concatenation of its ancestor section
//! identifiers and its own authored identifier, joined with `.`. Authors write
//! local identifiers (for example a skip target of `consent` inside the `intro`
//! section); the helpers here map those back onto qualified identifiers.

/// Separator placed between ancestor section identifiers.
pub const IDENTIFIER_SEPARATOR: char = '.';

/// Prefixes `identifier` with `prefix`.
///
/// Local identifiers may themselves contain the separator, so an identifier
/// that happens to start with the prefix is still prefixed.
///
/// ```rust
/// use taskflow_types::identifier::qualify;
///
/// assert_eq!(qualify("intro.", "welcome"), "intro.welcome");
/// assert_eq!(qualify("intro.", "intro.video"), "intro.intro.video");
/// assert_eq!(qualify("", "done"), "done");
/// ```
pub fn qualify(prefix: &str, identifier: &str) -> String {
    format!("{prefix}{identifier}")
}

/// Inverse of [`qualify`]: the local identifier of `identifier` under `prefix`.
///
/// Identifiers outside the prefix are returned unchanged.
pub fn localize<'a>(prefix: &str, identifier: &'a str) -> &'a str {
    identifier.strip_prefix(prefix).unwrap_or(identifier)
}

/// Prefix applied to the children of the section with the given qualified identifier.
pub fn child_prefix(section_identifier: &str) -> String {
    format!("{section_identifier}{IDENTIFIER_SEPARATOR}")
}

/// Prefixes of every enclosing section of a qualified identifier, innermost first.
///
/// The task root (empty prefix) is always the last entry.
pub fn ancestor_prefixes(identifier: &str) -> Vec<&str> {
    let mut prefixes: Vec<&str> = identifier
        .match_indices(IDENTIFIER_SEPARATOR)
        .map(|(index, _)| &identifier[..=index])
        .collect();
    prefixes.reverse();
    prefixes.push("");
    prefixes
}

/// Qualified identifiers a `local` reference written at `anchor` may denote.
///
/// Siblings of the anchor are tried first, then each enclosing scope outwards,
/// ending with `local` taken as written.
pub fn qualified_candidates(anchor: &str, local: &str) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    for prefix in ancestor_prefixes(anchor) {
        let candidate = qualify(prefix, local);
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}
