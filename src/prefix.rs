//! Shortest unique prefixes for menu items.
//!
//! Each named item gets the shortest prefix that no other item's name
//! shares, so the chooser can accept abbreviated input and the printer can
//! highlight how much of a name the user has to type.

/// Check whether `prefix` may be offered as a selection shortcut.
///
/// Rejected prefixes would collide with the chooser's token parser: a
/// leading digit means numeric selection, a leading `-` is reserved for
/// deselection, whitespace and commas are token separators, and a lone
/// `*` or `?` is a reserved token.
fn is_valid_prefix(prefix: &[u8]) -> bool {
    let Some(&first) = prefix.first() else {
        return false;
    };
    if first.is_ascii_digit() || first == b'-' {
        return false;
    }
    if prefix
        .iter()
        .any(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b','))
    {
        return false;
    }
    !(prefix.len() == 1 && (first == b'*' || first == b'?'))
}

/// Compute the shortest unique, valid prefix length for every name.
///
/// For each name, the result is the smallest length in `min..=max` whose
/// prefix is valid and is not a prefix of any other name, or 0 when no
/// such length exists.
pub fn find_unique_prefixes(names: &[&str], min: usize, max: usize) -> Vec<usize> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let bytes = name.as_bytes();
            let upper = max.min(bytes.len());
            (min..=upper)
                .find(|&len| {
                    let prefix = &bytes[..len];
                    is_valid_prefix(prefix)
                        && names
                            .iter()
                            .enumerate()
                            .all(|(j, other)| j == i || !other.as_bytes().starts_with(prefix))
                })
                .unwrap_or(0)
        })
        .collect()
}
