//! Levenshtein edit distance.

/// Calculate Levenshtein edit distance between two strings.
///
/// Works on Unicode scalar values, so `"Kraków"` and `"Krakow"` are one edit
/// apart. Uses two rows sized by the shorter input.
pub fn distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let (short, long) = if a_chars.len() <= b_chars.len() {
        (a_chars, b_chars)
    } else {
        (b_chars, a_chars)
    };

    if short.is_empty() {
        return long.len();
    }

    let mut previous: Vec<usize> = (0..=short.len()).collect();
    let mut current = vec![0usize; short.len() + 1];

    for (i, long_ch) in long.iter().enumerate() {
        current[0] = i + 1;
        for (j, short_ch) in short.iter().enumerate() {
            let cost = if long_ch == short_ch { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[short.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "", 0)]
    #[case("abc", "", 3)]
    #[case("", "abc", 3)]
    #[case("abc", "abc", 0)]
    #[case("abc", "abd", 1)]
    #[case("kitten", "sitting", 3)]
    #[case("kraków", "krakow", 1)]
    #[case("zordon", "zordona", 1)]
    #[case("flaw", "lawn", 2)]
    fn test_levenshtein_distance(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(distance(a, b), expected);
        assert_eq!(distance(b, a), expected);
    }
}
