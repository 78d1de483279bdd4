//! Greek/Latin text normalization helpers.
//!
//! These replace the ICU transliterators of the original data source with
//! fixed tables: the input alphabet is known (modern Greek plus basic Latin),
//! and a fixed table keeps the output deterministic across environments.

use parldata_shared::{ParldataError, Result};

/// Strip diacritics and downcase.
///
/// Handles the composed Greek accented vowels and the common Latin accents;
/// anything else passes through lowercased. Final sigma is preserved.
pub fn unaccent_lower(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'ά' => 'α',
            'έ' => 'ε',
            'ή' => 'η',
            'ί' | 'ϊ' | 'ΐ' => 'ι',
            'ό' => 'ο',
            'ύ' | 'ϋ' | 'ΰ' => 'υ',
            'ώ' => 'ω',
            'à' | 'á' | 'â' | 'ä' | 'ã' => 'a',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'ò' | 'ó' | 'ô' | 'ö' | 'õ' => 'o',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// Romanize one unaccented, lowercased Greek character.
fn greek_to_latin(c: char) -> Option<&'static str> {
    Some(match c {
        'α' => "a",
        'β' => "v",
        'γ' => "g",
        'δ' => "d",
        'ε' => "e",
        'ζ' => "z",
        'η' => "i",
        'θ' => "th",
        'ι' => "i",
        'κ' => "k",
        'λ' => "l",
        'μ' => "m",
        'ν' => "n",
        'ξ' => "x",
        'ο' => "o",
        'π' => "p",
        'ρ' => "r",
        'σ' | 'ς' => "s",
        'τ' => "t",
        'υ' => "y",
        'φ' => "f",
        'χ' => "ch",
        'ψ' => "ps",
        'ω' => "o",
        _ => return None,
    })
}

/// Create filenames and URL slugs from Greek (or any) text: romanize Greek,
/// drop everything that is not ASCII-alphanumeric or whitespace, downcase,
/// and replace whitespace runs with a hyphen.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for c in unaccent_lower(text).chars() {
        let mapped: String = match greek_to_latin(c) {
            Some(latin) => latin.into(),
            None if c.is_ascii_alphanumeric() => c.to_string(),
            None if c.is_whitespace() => {
                pending_hyphen = !out.is_empty();
                continue;
            }
            None => continue,
        };
        if pending_hyphen {
            out.push('-');
            pending_hyphen = false;
        }
        out.push_str(&mapped);
    }
    out
}

/// Tidy up whitespace in strings.
///
/// With `medial_newlines`, all whitespace (newlines included) collapses to
/// single spaces; otherwise only space runs collapse and newlines survive.
pub fn clean_spaces(text: &str, medial_newlines: bool) -> String {
    if medial_newlines {
        return text.split_whitespace().collect::<Vec<_>>().join(" ");
    }
    text.trim()
        .split(|c| c == ' ' || c == '\u{a0}')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replace Latin characters with their Greek lookalikes.
///
/// Document headings come out of the source with Greek capitals garbled
/// into Latin homoglyphs; this indiscriminately maps them back.
pub fn ungarble(text: &str) -> String {
    const LATIN: &str = "’ABEZHIKMNOPTYXvo";
    const GREEK: &str = "ΆΑΒΕΖΗΙΚΜΝΟΡΤΥΧνο";
    text.chars()
        .map(|c| {
            LATIN
                .chars()
                .position(|l| l == c)
                .and_then(|i| GREEK.chars().nth(i))
                .unwrap_or(c)
        })
        .collect()
}

/// Truncate a slug to `max_length` characters, keeping whole words intact.
pub fn truncate_slug(slug: &str, max_length: usize) -> Result<String> {
    let mut truncated = slug.to_string();
    while truncated.chars().count() > max_length {
        match truncated.rfind('-') {
            Some(i) => truncated.truncate(i),
            None => truncated.clear(),
        }
    }
    if truncated.is_empty() {
        return Err(ParldataError::validation(format!(
            "initial component of slug {slug:?} is longer than max_length {max_length}"
        )));
    }
    Ok(truncated)
}
