//! Cache key generation

use std::fmt::Display;

/// Separator between the namespace and each key part
pub const KEY_SEPARATOR: char = ':';

/// Builds a deterministic cache key from a namespace and an ordered list of parts.
///
/// The key has the form `namespace:part1:part2:...`. Separators and backslashes
/// occurring inside the namespace or a part are escaped with a backslash, so
/// `build_key("ns", &["a:b", "c"])` and `build_key("ns", &["a", "b:c"])` never
/// collide. Argument order is significant. The output depends only on the
/// inputs and is stable across process restarts.
pub fn build_key<P: Display>(namespace: &str, parts: &[P]) -> String {
    let mut key = escape_part(namespace);

    for part in parts {
        key.push(KEY_SEPARATOR);
        key.push_str(&escape_part(&part.to_string()));
    }

    key
}

fn escape_part(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());

    for c in raw.chars() {
        if c == '\\' || c == KEY_SEPARATOR {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}
