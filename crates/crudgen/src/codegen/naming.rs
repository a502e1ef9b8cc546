//! Identifier casing for generated TypeScript.

/// Converts a table name to PascalCase, treating any non-alphanumeric
/// character (`_`, `-`, `/`, `.`) as a word boundary.
pub fn to_pascal_case(s: &str) -> String {
    s.split(|c: char| !c.is_ascii_alphanumeric())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

/// Converts a table name to camelCase.
pub fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

/// Name of a table's api constructor in the api bundle, e.g. `orderItemsApi`.
pub fn api_const_name(basename: &str) -> String {
    let name = format!("{}Api", to_camel_case(basename));
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", name)
    } else {
        name
    }
}
