//! Heading anchor generation
//!
//! The renderer and the TOC extractor both go through [`anchor`], so heading
//! ids and outline links always agree.
//!
//! Identical headings produce identical anchors; no disambiguation suffix is
//! added.

/// Generate a URL-safe anchor from heading text.
///
/// Lowercases, drops everything that is not a word character, whitespace or
/// hyphen, turns whitespace runs into hyphens, collapses hyphen runs and trims
/// hyphens from both ends.
///
/// ```
/// use inkdraft::preview::anchor;
///
/// assert_eq!(anchor("Hello, World!"), "hello-world");
/// assert_eq!(anchor("  Multiple   Spaces  "), "multiple-spaces");
/// ```
pub fn anchor(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());

    for c in text.to_lowercase().chars() {
        if c.is_whitespace() || c == '-' {
            if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        } else if c.is_alphanumeric() || c == '_' {
            slug.push(c);
        }
    }

    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}
