//! Canonicalization of member names.
//!
//! Names arrive in two broken shapes: declined (genitive or accusative
//! case, surname last) and garbled (Latin homoglyphs substituted for Greek
//! by a lossy text extraction). Both matchers run against a directory of
//! canonical nominative names built once at task startup from the store
//! and passed by reference to whatever needs it.

use std::collections::{BTreeMap, HashMap};

use parldata_shared::{ParldataError, Result};

use crate::normalize::unaccent_lower;

/// One directory entry: a canonical nominative name plus every recorded
/// alternate Greek-script spelling of it.
#[derive(Debug, Clone)]
pub struct NameEntry {
    pub canonical: String,
    pub alternates: Vec<String>,
}

impl NameEntry {
    pub fn new(canonical: impl Into<String>) -> Self {
        Self {
            canonical: canonical.into(),
            alternates: Vec::new(),
        }
    }

    pub fn with_alternates<I, S>(canonical: impl Into<String>, alternates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            canonical: canonical.into(),
            alternates: alternates.into_iter().map(Into::into).collect(),
        }
    }
}

/// Case transforms applied when permuting a declined name back to the
/// nominative: identity, append final sigma, -ου → -ος, strip final sigma.
/// The first token gets all four; the surname part gets the first three,
/// with a three-token name's middle and last tokens declining together
/// under one transform.
type CaseTransform = fn(&str) -> String;

const FORE_TRANSFORMS: [CaseTransform; 4] = [
    |token| token.to_string(),
    |token| format!("{token}ς"),
    |token| replace_suffix(token, "ου", "ος"),
    |token| token.strip_suffix('ς').unwrap_or(token).to_string(),
];

const AFT_TRANSFORMS: [CaseTransform; 3] = [
    |token| token.to_string(),
    |token| format!("{token}ς"),
    |token| replace_suffix(token, "ου", "ος"),
];

fn replace_suffix(token: &str, suffix: &str, replacement: &str) -> String {
    match token.strip_suffix(suffix) {
        Some(stem) => format!("{stem}{replacement}"),
        None => token.to_string(),
    }
}

/// Characters assumed to survive homoglyph corruption unchanged: the
/// composed accented Greek vowels and spaces.
fn is_marker(c: char) -> bool {
    matches!(
        c,
        'ά' | 'έ' | 'ή' | 'ί' | 'ό' | 'ύ' | 'ώ' | 'ΐ' | 'ΰ'
            | 'Ά' | 'Έ' | 'Ή' | 'Ί' | 'Ό' | 'Ύ' | 'Ώ' | ' '
    )
}

/// Position-wise mismatch count between two equal-length char sequences.
fn hamming(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).filter(|(x, y)| x != y).count()
}

// ---------------------------------------------------------------------------
// NameDirectory
// ---------------------------------------------------------------------------

/// An immutable lookup table of canonical member names.
pub struct NameDirectory {
    /// Normalized "surname forename" → canonical name.
    normalized: BTreeMap<String, String>,
    /// Raw (accented) spellings grouped by char length, for the garbled
    /// matcher; each maps back to its canonical name.
    by_len: HashMap<usize, Vec<(Vec<char>, String)>>,
}

impl NameDirectory {
    /// Build the directory. Fails if two entries normalize to the same key —
    /// a conflict that must be resolved in the source data, not guessed at.
    pub fn build<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = NameEntry>,
    {
        let mut normalized = BTreeMap::new();
        let mut by_len: HashMap<usize, Vec<(Vec<char>, String)>> = HashMap::new();

        for entry in entries {
            for spelling in
                std::iter::once(&entry.canonical).chain(entry.alternates.iter())
            {
                let key = unaccent_lower(spelling);
                if let Some(previous) = normalized.insert(key.clone(), entry.canonical.clone()) {
                    if previous != entry.canonical {
                        return Err(ParldataError::validation(format!(
                            "name key {key:?} maps to both {previous:?} and {:?}",
                            entry.canonical
                        )));
                    }
                }
                let chars: Vec<char> = spelling.chars().collect();
                by_len
                    .entry(chars.len())
                    .or_default()
                    .push((chars, entry.canonical.clone()));
            }
        }
        tracing::debug!(spellings = normalized.len(), "name directory built");
        Ok(Self { normalized, by_len })
    }

    /// Number of normalized spellings in the directory.
    pub fn len(&self) -> usize {
        self.normalized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }

    /// Pair a declined (genitive/accusative) name with a canonical name.
    ///
    /// Returns `Ok(None)` when nothing matches — a valid outcome, not an
    /// error. A name with fewer than two or more than three tokens is an
    /// input-shape error; more than one match is an ambiguity error.
    pub fn match_declined(&self, name: &str) -> Result<Option<String>> {
        let cleaned: String = name.chars().filter(|c| !c.is_ascii_digit()).collect();
        let tokens: Vec<String> = unaccent_lower(&cleaned)
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if !(2..=3).contains(&tokens.len()) {
            return Err(ParldataError::IncompatibleName { name: name.into() });
        }

        let mut matches: Vec<&String> = Vec::new();
        for candidate in Self::permute(&tokens) {
            if let Some(canonical) = self.normalized.get(&candidate) {
                if !matches.contains(&canonical) {
                    matches.push(canonical);
                }
            }
        }
        match matches.len() {
            0 => Ok(None),
            1 => Ok(Some(matches[0].clone())),
            _ => Err(ParldataError::AmbiguousName { name: name.into() }),
        }
    }

    /// Every transform combination, reverse-concatenated to surname-first.
    fn permute(tokens: &[String]) -> Vec<String> {
        let (first, rest) = tokens.split_first().expect("token count checked");
        let mut out = Vec::new();
        for fore_transform in FORE_TRANSFORMS {
            let fore = fore_transform(first);
            for aft in AFT_TRANSFORMS {
                match rest {
                    [last] => out.push(format!("{} {fore}", aft(last))),
                    [middle, last] => {
                        out.push(format!("{} {} {fore}", aft(last), aft(middle)));
                    }
                    _ => unreachable!("token count checked"),
                }
            }
        }
        out
    }

    /// Pair a garbled (homoglyph-corrupted) name with a canonical name.
    ///
    /// Directory spellings of identical length whose characters at the
    /// input's marker positions match exactly are shortlisted; the
    /// shortlist entry at minimum Hamming distance wins. An empty
    /// shortlist is a no-match.
    pub fn match_garbled(&self, name: &str) -> Option<String> {
        let input: Vec<char> = name.chars().collect();
        if input.is_empty() {
            return None;
        }
        let markers: Vec<(usize, char)> = input
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, c)| is_marker(*c))
            .collect();

        self.by_len
            .get(&input.len())?
            .iter()
            .filter(|(chars, _)| markers.iter().all(|(i, c)| chars[*i] == *c))
            .map(|(chars, canonical)| (hamming(&input, chars), canonical))
            .min_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(b.1)))
            .map(|(_, canonical)| canonical.clone())
    }
}
