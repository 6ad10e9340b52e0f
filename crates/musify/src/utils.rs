use std::sync::LazyLock;

use regex::Regex;

/// Characters the site allows in track names but filesystems do not.
static HOSTILE_CHARS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[/*?<>"]"#).unwrap());

const FILENAME_PLACEHOLDER: &str = "-";

/// Replace filesystem-hostile characters in a suggested track filename.
///
/// ```
/// use musify_parser::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("AC/DC - T.N.T.mp3"), "AC-DC - T.N.T.mp3");
/// assert_eq!(sanitize_filename("Why?.mp3"), "Why-.mp3");
/// ```
pub fn sanitize_filename(input: &str) -> String {
    HOSTILE_CHARS_REGEX
        .replace_all(input, FILENAME_PLACEHOLDER)
        .into_owned()
}

/// Title-case a string: the first letter of every run of letters is
/// upper-cased and the rest are lower-cased.
///
/// Search results carry titles in this form, so both sides of a comparison
/// go through it.
pub fn title_case(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut previous_is_letter = false;

    for c in input.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }

    result
}
