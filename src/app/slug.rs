//! Slug derivation for post titles.
//!
//! `slugify` maps a title onto `[a-z0-9-]`: ASCII letters are lowercased, every
//! run of other characters becomes a single hyphen, and leading or trailing
//! hyphens are dropped. `unique_slug` then appends `-1`, `-2`, ... until the
//! caller's `exists` predicate reports a free candidate.

/// Column width of `posts.slug`.
pub const MAX_SLUG_LEN: usize = 250;

/// Room kept after the base for a `-N` suffix.
const SUFFIX_RESERVE: usize = 10;

/// Base used when a title has no ASCII alphanumerics at all.
pub const FALLBACK_BASE: &str = "post";

pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// The slug tried first for `title`; never empty.
pub fn base_slug(title: &str) -> String {
    let mut base = slugify(title);
    if base.is_empty() {
        base.push_str(FALLBACK_BASE);
    }
    if base.len() > MAX_SLUG_LEN - SUFFIX_RESERVE {
        // slugify output is ASCII, so any byte index is a char boundary
        base.truncate(MAX_SLUG_LEN - SUFFIX_RESERVE);
        while base.ends_with('-') {
            base.pop();
        }
    }
    base
}

/// First candidate in `base, base-1, base-2, ...` for which `exists` is false.
pub fn unique_slug<F>(title: &str, mut exists: F) -> String
where
    F: FnMut(&str) -> bool,
{
    let base = base_slug(title);
    if !exists(&base) {
        return base;
    }

    let mut suffix: u64 = 1;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !exists(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
