//! testgen/naming.rs
//!
//! Case conversions matching the host framework's string helpers, so that
//! generated test names line up with what its developers expect.

pub fn snake_case(value: &str) -> String {
    delimit(value, '_')
}

pub fn kebab_case(value: &str) -> String {
    delimit(value, '-')
}

/// `user_roles` / `user-roles` / `user roles` → `UserRoles`.
pub fn studly_case(value: &str) -> String {
    value
        .split(|c: char| c == '-' || c == '_' || c == ' ')
        .map(upper_first)
        .collect()
}

/// Upper-case the first letter of each whitespace-separated word, drop the
/// whitespace, put `delimiter` before every ASCII capital that follows
/// another character, then lower-case everything.
fn delimit(value: &str, delimiter: char) -> String {
    let words: String = value.split_whitespace().map(upper_first).collect();

    let mut out = String::with_capacity(words.len() + 8);
    for (i, c) in words.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push(delimiter);
        }
        out.push(c);
    }

    out.to_lowercase()
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
