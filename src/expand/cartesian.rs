// src/expand/cartesian.rs

/// Cartesian product of the given value lists.
///
/// Emission order is lexicographic in list order: the leftmost list varies
/// slowest. `cartesian(&[])` yields a single empty combination; a product
/// with any empty axis yields nothing.
///
/// Implemented as an iterative counter over per-list indices, incremented
/// right to left.
pub fn cartesian<T: Clone>(lists: &[Vec<T>]) -> Vec<Vec<T>> {
    if lists.iter().any(|l| l.is_empty()) {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut idx = vec![0usize; lists.len()];

    loop {
        out.push(
            idx.iter()
                .zip(lists)
                .map(|(&i, list)| list[i].clone())
                .collect(),
        );

        let mut pos = lists.len();
        loop {
            if pos == 0 {
                return out;
            }
            pos -= 1;
            idx[pos] += 1;
            if idx[pos] < lists[pos].len() {
                break;
            }
            idx[pos] = 0;
        }
    }
}
