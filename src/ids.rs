/// Canonical form of an event or user identifier.
///
/// Whitespace and control characters are dropped; everything else is kept
/// verbatim, since catalog ids are case-sensitive. Applying it twice is a no-op.
pub fn normalize_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect()
}
