use std::path::{Component, Path};

/// Turn an untrusted display name into a single path component.
///
/// Characters invalid in file names on any platform are dropped, so the
/// result can never contain a separator, a drive prefix or a root. Names
/// that still are not one plain component (`.`, `..`, empty) become
/// `fallback`.
pub fn sanitize_file_name(name: &str, fallback: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control())
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();
    let cleaned = cleaned.trim().trim_end_matches('.').trim_end();

    let mut components = Path::new(cleaned).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => cleaned.to_string(),
        _ => fallback.to_string(),
    }
}
