use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
  static ref ALPHANUMERIC_RE: Regex = Regex::new(r"[\p{L}\p{N}]").unwrap();
  static ref SLUG_SEPARATOR_RE: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
  static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// Whether the text has at least one letter or digit, accented or not.
#[must_use]
pub fn has_alphanumeric(text: &str) -> bool {
  ALPHANUMERIC_RE.is_match(text)
}

#[must_use]
pub fn is_email(text: &str) -> bool {
  EMAIL_RE.is_match(text)
}

/// Case-insensitive substring match.
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
  haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Lowercase ASCII slug, e.g. `"Café Pão de Açúcar"` becomes `"cafe-pao-de-acucar"`.
#[must_use]
pub fn slugify(text: &str) -> String {
  let folded = deunicode::deunicode(text).to_lowercase();
  SLUG_SEPARATOR_RE
    .replace_all(&folded, "-")
    .trim_matches('-')
    .to_string()
}

/// The slug of `text`, suffixed with `-1`, `-2`, ... until `taken` no longer reports it.
///
/// `fallback` is used instead when nothing of `text` survives ASCII folding.
#[must_use]
pub fn unique_slug(text: &str, fallback: &str, taken: impl Fn(&str) -> bool) -> String {
  let slug = match slugify(text) {
    slug if slug.is_empty() => fallback.to_string(),
    slug => slug,
  };
  let mut candidate = slug.clone();
  let mut attempt = 0;
  while taken(&candidate) {
    attempt += 1;
    candidate = format!("{slug}-{attempt}");
  }
  candidate
}
