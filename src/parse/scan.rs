//! Line-oriented scanning of free-text engine output.
//!
//! Nothing here assumes fixed line positions: every lookup returns an
//! `Option` and callers decide what a miss means.

use std::sync::LazyLock;

use regex::Regex;

/// Decimal numbers with a mandatory fractional part. Integers (parameter and
/// component indices, bin counts) are deliberately not matched.
static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?\b\d+\.\d+(?:[eE][-+]?\d+)?\b").expect("valid regex"));

/// Any number, fractional part optional.
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?\b\d+(?:\.\d+)?(?:[eE][-+]?\d+)?\b").expect("valid regex"));

/// Lines of one log section, with lookups by content.
#[derive(Debug, Clone)]
pub struct LineScanner<'a> {
    lines: Vec<&'a str>,
}

impl<'a> LineScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
        }
    }

    /// First line where `token` appears as a whitespace-delimited word.
    pub fn first_with_token(&self, token: &str) -> Option<&'a str> {
        self.lines
            .iter()
            .copied()
            .find(|line| line.split_whitespace().any(|word| word == token))
    }

    /// Last line containing `needle`, ignoring ASCII case.
    pub fn last_containing(&self, needle: &str) -> Option<&'a str> {
        self.last_index_containing(needle).map(|(_, line)| line)
    }

    pub fn last_index_containing(&self, needle: &str) -> Option<(usize, &'a str)> {
        let needle = needle.to_ascii_lowercase();
        self.lines
            .iter()
            .enumerate()
            .rev()
            .find(|(_, line)| line.to_ascii_lowercase().contains(&needle))
            .map(|(idx, line)| (idx, *line))
    }

    /// First line after `index` containing `needle`, ignoring ASCII case.
    pub fn first_containing_after(&self, index: usize, needle: &str) -> Option<&'a str> {
        let needle = needle.to_ascii_lowercase();
        self.lines
            .iter()
            .skip(index + 1)
            .copied()
            .find(|line| line.to_ascii_lowercase().contains(&needle))
    }
}

/// Decimal numbers on `line`, in order.
pub fn decimals(line: &str) -> Vec<f64> {
    parse_all(&DECIMAL, line)
}

/// All numbers on `line`, in order.
pub fn numbers(line: &str) -> Vec<f64> {
    parse_all(&NUMBER, line)
}

/// Last whitespace token that is an unsigned integer (trailing punctuation
/// tolerated).
pub fn last_integer_token(line: &str) -> Option<u64> {
    line.split_whitespace()
        .rev()
        .map(|token| token.trim_end_matches(['.', ',', ';', ')']))
        .find_map(|token| token.parse::<u64>().ok())
}

fn parse_all(re: &Regex, line: &str) -> Vec<f64> {
    re.find_iter(line)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimals_skip_indices_and_keep_exponents() {
        let line = "   2    2   logpar     alpha               1.23450      +/-  4.56000E-02";
        assert_eq!(decimals(line), vec![1.2345, 0.0456]);
    }

    #[test]
    fn decimals_ignore_unit_exponents() {
        let line = "   1    1   TBabs      nH         10^22    1.31000E-02  frozen";
        assert_eq!(decimals(line), vec![0.0131]);
    }

    #[test]
    fn numbers_include_integers() {
        assert_eq!(
            numbers("Test statistic : Chi-Squared 112.34 using 104 bins."),
            vec![112.34, 104.0]
        );
    }

    #[test]
    fn negative_values_keep_their_sign() {
        assert_eq!(decimals("alpha -0.25000 +/- 1.0E-02"), vec![-0.25, 0.01]);
    }

    #[test]
    fn token_lookup_is_word_based() {
        let scanner = LineScanner::new("normalization follows\n  5  2  powerlaw  norm  1.0E-02 +/- 1.0E-03");
        let line = scanner.first_with_token("norm").unwrap();
        assert!(line.contains("powerlaw"));
    }

    #[test]
    fn last_integer_token_handles_punctuation() {
        assert_eq!(last_integer_token("with 97 degrees of freedom 12."), Some(12));
        assert_eq!(last_integer_token("no integers here"), None);
    }
}
