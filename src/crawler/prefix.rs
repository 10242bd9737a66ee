//! Search prefix enumeration
//!
//! The registry's "begins with" search is queried once per prefix, so the set
//! of prefixes is the Cartesian product of the lowercase alphabet with itself
//! `level` times.

use crate::ConfigError;

const ALPHABET: std::ops::RangeInclusive<char> = 'a'..='z';

/// Generates every lowercase prefix of length `level`, in lexicographic order
///
/// # Errors
///
/// Returns [`ConfigError::InvalidDetailLevel`] when `level` is zero.
///
/// # Example
///
/// ```
/// use aphia_harvest::crawler::generate_prefixes;
///
/// let prefixes = generate_prefixes(2).unwrap();
/// assert_eq!(prefixes.len(), 676);
/// assert_eq!(prefixes[0], "aa");
/// assert_eq!(prefixes[675], "zz");
/// ```
pub fn generate_prefixes(level: u32) -> Result<Vec<String>, ConfigError> {
    if level < 1 {
        return Err(ConfigError::InvalidDetailLevel(level));
    }

    let mut prefixes = vec![String::new()];
    for _ in 0..level {
        prefixes = prefixes
            .iter()
            .flat_map(|stem| {
                ALPHABET.map(move |letter| {
                    let mut prefix = String::with_capacity(stem.len() + 1);
                    prefix.push_str(stem);
                    prefix.push(letter);
                    prefix
                })
            })
            .collect();
    }

    Ok(prefixes)
}
