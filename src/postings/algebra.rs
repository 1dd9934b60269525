//! Set operations over postings lists.
//!
//! Every function here is a linear merge-join over inputs sorted by
//! ascending document ID with no duplicate IDs, and produces output with the
//! same guarantee. The merger uses [`union_merge`] to combine the postings of
//! a term found in two segments; the searcher uses all three families.

use std::cmp::Ordering;

use crate::postings::{Posting, PostingsList};

/// Documents present in both lists.
///
/// The output posting for a shared document is the one from `a`, so its
/// offsets are the left-hand term's offsets.
pub fn intersection(a: &PostingsList, b: &PostingsList) -> PostingsList {
    let (a, b) = (a.postings(), b.postings());
    let mut result = PostingsList::new();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        match a[i].doc_id.cmp(&b[j].doc_id) {
            Ordering::Equal => {
                result.push(a[i].clone());
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }

    result
}

/// Documents present in every list. An empty input yields an empty list.
pub fn intersect_all(lists: &[&PostingsList]) -> PostingsList {
    let Some((first, rest)) = lists.split_first() else {
        return PostingsList::new();
    };

    // Shortest lists first.
    let mut order: Vec<&PostingsList> = rest.to_vec();
    order.sort_by_key(|list| list.len());

    let mut result = (*first).clone();
    for list in order {
        if result.is_empty() {
            break;
        }
        result = intersection(&result, list);
    }
    result
}

/// Documents present in either list; shared documents get the union of both
/// offset sets.
pub fn union_merge(a: &PostingsList, b: &PostingsList) -> PostingsList {
    let (a, b) = (a.postings(), b.postings());
    let mut result = PostingsList::new();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        match a[i].doc_id.cmp(&b[j].doc_id) {
            Ordering::Equal => {
                let offsets = union_offsets(a[i].offsets(), b[j].offsets());
                result.push(Posting::from_sorted_offsets(a[i].doc_id, offsets));
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                result.push(a[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                result.push(b[j].clone());
                j += 1;
            }
        }
    }

    for posting in &a[i..] {
        result.push(posting.clone());
    }
    for posting in &b[j..] {
        result.push(posting.clone());
    }

    result
}

/// Union of any number of lists.
pub fn union_all(lists: &[&PostingsList]) -> PostingsList {
    lists
        .iter()
        .fold(PostingsList::new(), |acc, list| union_merge(&acc, list))
}

/// Positional join of two adjacent phrase terms.
///
/// For every document in both lists, keeps the offsets `o1` of `frontier`
/// for which `next` has an offset `o1 + delta`. Documents with no surviving
/// offset are dropped. The surviving offsets are the phrase start positions,
/// ready to be joined with the following term at `delta + 1`.
pub fn phrase_join(frontier: &PostingsList, next: &PostingsList, delta: u32) -> PostingsList {
    let (a, b) = (frontier.postings(), next.postings());
    let mut result = PostingsList::new();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        match a[i].doc_id.cmp(&b[j].doc_id) {
            Ordering::Equal => {
                let survivors = shifted_matches(a[i].offsets(), b[j].offsets(), delta);
                if !survivors.is_empty() {
                    result.push(Posting::from_sorted_offsets(a[i].doc_id, survivors));
                }
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }

    result
}

/// Documents containing the terms of `lists` at consecutive offsets.
///
/// The `i`-th list is joined at distance `i` from the first term. Each
/// returned posting carries the offsets where a full match starts.
pub fn phrase(lists: &[&PostingsList]) -> PostingsList {
    let Some((first, rest)) = lists.split_first() else {
        return PostingsList::new();
    };

    let mut frontier = (*first).clone();
    for (step, list) in rest.iter().enumerate() {
        if frontier.is_empty() {
            break;
        }
        frontier = phrase_join(&frontier, list, step as u32 + 1);
    }
    frontier
}

/// Sorted, duplicate-free union of two sorted offset sets.
pub(crate) fn union_offsets(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
        }
    }

    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Offsets `o1` of `first` such that `o1 + delta` is in `second`.
fn shifted_matches(first: &[u32], second: &[u32], delta: u32) -> Vec<u32> {
    let mut out = Vec::new();
    let mut j = 0;

    for &o1 in first {
        let Some(target) = o1.checked_add(delta) else {
            break;
        };
        while j < second.len() && second[j] < target {
            j += 1;
        }
        if j == second.len() {
            break;
        }
        if second[j] == target {
            out.push(o1);
        }
    }

    out
}
