use std::collections::HashMap;

/// Minimum similarity a stored question must exceed to count as a hit.
pub const SIMILARITY_THRESHOLD: f64 = 0.85;

/// Sequences at least this long drop "popular" characters from the index.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Character-level similarity in `0.0..=1.0`, computed as `2·M / T` where `M`
/// is the number of characters in Ratcliff/Obershelp matching blocks and `T`
/// the combined length. Two empty strings score `1.0`.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = Matcher::new(&a, &b).matched_chars();
    2.0 * matched as f64 / total as f64
}

/// Picks the candidate most similar to `query`, if any beats the threshold.
///
/// Ties keep the earliest candidate. An empty query never matches.
pub fn best_match<'a>(query: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    if query.is_empty() {
        return None;
    }

    let mut best: Option<&'a str> = None;
    let mut best_ratio = SIMILARITY_THRESHOLD;
    for candidate in candidates {
        let ratio = similarity_ratio(query, candidate);
        if ratio > best_ratio {
            best_ratio = ratio;
            best = Some(candidate);
        }
    }
    best
}

/// Longest-common-block matcher over two character sequences.
struct Matcher<'s> {
    a: &'s [char],
    b: &'s [char],
    /// Positions of each character in `b`, ascending.
    b_index: HashMap<char, Vec<usize>>,
}

impl<'s> Matcher<'s> {
    fn new(a: &'s [char], b: &'s [char]) -> Self {
        let mut b_index: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &ch) in b.iter().enumerate() {
            b_index.entry(ch).or_default().push(j);
        }

        // Characters making up more than 1% of a long `b` are not indexed;
        // they can still join a block by extension.
        if b.len() >= AUTOJUNK_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b_index.retain(|_, positions| positions.len() <= limit);
        }

        Self { a, b, b_index }
    }

    /// Total size of the matching blocks found by recursive splitting
    /// around the longest match.
    fn matched_chars(&self) -> usize {
        let mut matched = 0;
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
            let (i, j, size) = self.longest_match(a_lo, a_hi, b_lo, b_hi);
            if size == 0 {
                continue;
            }
            matched += size;
            if a_lo < i && b_lo < j {
                pending.push((a_lo, i, b_lo, j));
            }
            if i + size < a_hi && j + size < b_hi {
                pending.push((i + size, a_hi, j + size, b_hi));
            }
        }
        matched
    }

    /// Longest block `a[i..i+size] == b[j..j+size]` within the given ranges.
    /// Among equally long blocks the one starting earliest in `a` wins.
    fn longest_match(&self, a_lo: usize, a_hi: usize, b_lo: usize, b_hi: usize) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (a_lo, b_lo, 0);
        let mut run_ending_at: HashMap<usize, usize> = HashMap::new();

        for i in a_lo..a_hi {
            let mut next_runs = HashMap::new();
            if let Some(positions) = self.b_index.get(&self.a[i]) {
                for &j in positions {
                    if j < b_lo {
                        continue;
                    }
                    if j >= b_hi {
                        break;
                    }
                    let run = j
                        .checked_sub(1)
                        .and_then(|prev| run_ending_at.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_runs.insert(j, run);
                    if run > best_size {
                        best_i = i + 1 - run;
                        best_j = j + 1 - run;
                        best_size = run;
                    }
                }
            }
            run_ending_at = next_runs;
        }

        while best_i > a_lo && best_j > b_lo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < a_hi
            && best_j + best_size < b_hi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }
}
