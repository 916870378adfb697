//! Longest increasing subsequence, used to keep the largest set of children
//! in place during a keyed move.

/// Indices into `seq` of one longest strictly increasing subsequence.
///
/// Zero entries mean "newly mounted" in the keyed diff and are skipped.
/// Runs in O(n log n): `tails[k]` holds the index of the smallest tail of
/// any increasing run of length `k + 1`, and `prev` links each element to
/// its predecessor in the run it extended.
pub fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    let mut prev = vec![usize::MAX; seq.len()];
    let mut tails: Vec<usize> = Vec::with_capacity(seq.len());

    for (i, &value) in seq.iter().enumerate() {
        if value == 0 {
            continue;
        }
        // First tail whose value is >= value.
        let pos = tails.partition_point(|&t| seq[t] < value);
        if pos > 0 {
            prev[i] = tails[pos - 1];
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }

    let mut result = vec![0; tails.len()];
    let Some(&last) = tails.last() else {
        return result;
    };
    let mut cursor = last;
    for slot in result.iter_mut().rev() {
        *slot = cursor;
        cursor = prev[cursor];
    }
    result
}
