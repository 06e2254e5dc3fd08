//! Myers' diff over arbitrary comparable sequences.
//!
//! Computes a minimal edit script using the greedy O((N+M)·D) forward search
//! from Myers' "An O(ND) Difference Algorithm and Its Variations", then
//! recovers the script by backtracking through the per-depth furthest-point
//! snapshots. When several minimal scripts exist, the furthest-point rule
//! matches the earliest common elements, keeping output stable across runs.
//!
//! Lines are compared as produced by [`split_lines`]: each line keeps its
//! terminating newline, and a trailing unterminated line is its own element,
//! so `"a\n"` and `"a"` diff as different lines.

use derive_new::new;

/// One element of an edit script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit<T> {
    Delete { value: T },
    Insert { value: T },
    Equal { value: T },
}

impl<T> Edit<T> {
    pub fn value(&self) -> &T {
        match self {
            Edit::Delete { value } | Edit::Insert { value } | Edit::Equal { value } => value,
        }
    }

    pub fn is_equal(&self) -> bool {
        matches!(self, Edit::Equal { .. })
    }
}

/// Split text into newline-delimited lines, each keeping its terminator.
///
/// A trailing line without a newline is returned as its own element; empty
/// input yields no lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Diff two texts line by line.
pub fn diff_lines(a: &str, b: &str) -> Vec<Edit<String>> {
    let a_lines = split_lines(a);
    let b_lines = split_lines(b);

    MyersDiff::new(&a_lines, &b_lines)
        .diff()
        .into_iter()
        .map(|edit| match edit {
            Edit::Delete { value } => Edit::Delete {
                value: value.to_string(),
            },
            Edit::Insert { value } => Edit::Insert {
                value: value.to_string(),
            },
            Edit::Equal { value } => Edit::Equal {
                value: value.to_string(),
            },
        })
        .collect()
}

#[derive(Debug, Clone, new)]
pub struct MyersDiff<'d, T> {
    a: &'d [T],
    b: &'d [T],
}

impl<T: Eq + Clone> MyersDiff<'_, T> {
    /// Furthest-reaching x per diagonal, snapshotted once per edit depth.
    ///
    /// `trace[d]` holds the state before depth `d` is processed; the search
    /// stops as soon as some path reaches `(n, m)`.
    fn shortest_edit_trace(&self) -> Vec<Vec<isize>> {
        let (n, m) = (self.a.len() as isize, self.b.len() as isize);
        let offset = (n + m) as usize;

        let mut v = vec![0isize; 2 * offset + 1];
        let mut trace = Vec::new();

        for d in 0..=(n + m) {
            trace.push(v.clone());

            for k in (-d..=d).step_by(2) {
                let idx = (offset as isize + k) as usize;

                let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                    v[idx + 1] // came from k+1: an insertion
                } else {
                    v[idx - 1] + 1 // came from k-1: a deletion
                };
                let mut y = x - k;

                // follow the diagonal while elements match
                while x < n && y < m && self.a[x as usize] == self.b[y as usize] {
                    x += 1;
                    y += 1;
                }

                v[idx] = x;

                if x >= n && y >= m {
                    return trace;
                }
            }
        }

        trace
    }

    /// Minimal edit script from `a` to `b`, in order.
    pub fn diff(&self) -> Vec<Edit<T>> {
        let (n, m) = (self.a.len() as isize, self.b.len() as isize);
        if n == 0 && m == 0 {
            return Vec::new();
        }

        let offset = (n + m) as usize;
        let trace = self.shortest_edit_trace();

        let mut edits = Vec::new();
        let (mut x, mut y) = (n, m);

        for (d, v) in trace.iter().enumerate().rev() {
            let d = d as isize;
            let k = x - y;

            let prev_k = if k == -d || (k != d && v[(offset as isize + k - 1) as usize] < v[(offset as isize + k + 1) as usize])
            {
                k + 1
            } else {
                k - 1
            };
            let prev_x = v[(offset as isize + prev_k) as usize];
            let prev_y = prev_x - prev_k;

            // walk back through the trailing diagonal of matching elements
            while x > prev_x && y > prev_y {
                edits.push(Edit::Equal {
                    value: self.a[(x - 1) as usize].clone(),
                });
                x -= 1;
                y -= 1;
            }

            if d > 0 {
                if x == prev_x {
                    edits.push(Edit::Insert {
                        value: self.b[prev_y as usize].clone(),
                    });
                } else {
                    edits.push(Edit::Delete {
                        value: self.a[prev_x as usize].clone(),
                    });
                }
            }

            (x, y) = (prev_x, prev_y);
        }

        edits.reverse();
        edits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn classic_character_example() {
        let a: Vec<char> = "abcabba".chars().collect();
        let b: Vec<char> = "cbabac".chars().collect();
        let edits = MyersDiff::new(&a, &b).diff();

        // minimal script: 5 non-equal edits for this pair
        let changed = edits.iter().filter(|edit| !edit.is_equal()).count();
        assert_eq!(changed, 5);

        // replaying the script must reconstruct both sides
        let mut from = String::new();
        let mut to = String::new();
        for edit in &edits {
            match edit {
                Edit::Delete { value } => from.push(*value),
                Edit::Insert { value } => to.push(*value),
                Edit::Equal { value } => {
                    from.push(*value);
                    to.push(*value);
                }
            }
        }
        assert_eq!(from, "abcabba");
        assert_eq!(to, "cbabac");
    }

    #[test]
    fn modified_line_is_a_delete_then_insert() {
        let a = vec!["line1", "line2", "line3", "line4"];
        let b = vec!["line2", "line3_modified", "line4", "line5"];
        let edits = MyersDiff::new(&a, &b).diff();

        let expected = vec![
            Edit::Delete { value: "line1" },
            Edit::Equal { value: "line2" },
            Edit::Delete { value: "line3" },
            Edit::Insert {
                value: "line3_modified",
            },
            Edit::Equal { value: "line4" },
            Edit::Insert { value: "line5" },
        ];
        assert_eq!(edits, expected);
    }

    #[test]
    fn empty_inputs_produce_no_edits() {
        let edits = MyersDiff::<&str>::new(&[], &[]).diff();
        assert!(edits.is_empty());
    }

    #[rstest]
    #[case("", vec![])]
    #[case("one\n", vec!["one\n"])]
    #[case("one\ntwo", vec!["one\n", "two"])]
    #[case("\n\n", vec!["\n", "\n"])]
    fn line_splitting_keeps_terminators(#[case] text: &str, #[case] expected: Vec<&str>) {
        assert_eq!(split_lines(text), expected);
    }

    #[test]
    fn trailing_newline_difference_is_visible() {
        let edits = diff_lines("a\n", "a");
        assert!(edits.iter().any(|edit| !edit.is_equal()));
    }

    proptest! {
        #[test]
        fn identical_inputs_yield_only_equal_edits(text in "[a-c\n]{0,40}") {
            let edits = diff_lines(&text, &text);
            prop_assert!(edits.iter().all(Edit::is_equal));
        }

        #[test]
        fn swapping_sides_swaps_inserts_and_deletes(
            a in "[a-c\n]{0,40}",
            b in "[a-c\n]{0,40}"
        ) {
            let forward = diff_lines(&a, &b);
            let backward = diff_lines(&b, &a);

            let mut forward_deleted: Vec<_> = forward
                .iter()
                .filter_map(|edit| match edit {
                    Edit::Delete { value } => Some(value.clone()),
                    _ => None,
                })
                .collect();
            let mut backward_inserted: Vec<_> = backward
                .iter()
                .filter_map(|edit| match edit {
                    Edit::Insert { value } => Some(value.clone()),
                    _ => None,
                })
                .collect();

            forward_deleted.sort();
            backward_inserted.sort();
            prop_assert_eq!(forward_deleted, backward_inserted);
        }

        #[test]
        fn script_replays_to_both_sides(
            a in "[a-c\n]{0,40}",
            b in "[a-c\n]{0,40}"
        ) {
            let edits = diff_lines(&a, &b);

            let mut from = String::new();
            let mut to = String::new();
            for edit in &edits {
                match edit {
                    Edit::Delete { value } => from.push_str(value),
                    Edit::Insert { value } => to.push_str(value),
                    Edit::Equal { value } => {
                        from.push_str(value);
                        to.push_str(value);
                    }
                }
            }
            prop_assert_eq!(from, a);
            prop_assert_eq!(to, b);
        }
    }
}
