//! Ordering of tagged elements by their `copy` marker.

use std::cmp::Ordering;

use crate::domain::model::{COPY_ATTRIBUTE, Marker};
use crate::domain::tree::ContentTree;

/// Parsed marker of a tagged element. Elements without a value are unordered.
pub fn marker_of<T: ContentTree>(tree: &T, element: T::NodeId) -> Marker {
    tree.attribute(element, COPY_ATTRIBUTE)
        .map(Marker::parse)
        .unwrap_or(Marker::Unordered)
}

/// Numeric markers compare ascending; any pair involving an unordered marker is equal.
///
/// This is not a total order: with `[3, x, 1]` the pairs `3~x` and `x~1` are equal while
/// `3 > 1`. [`order`] copes with that.
pub fn compare_markers(a: Marker, b: Marker) -> Ordering {
    match (a, b) {
        (Marker::Ordered(a), Marker::Ordered(b)) => a.cmp(&b),
        _ => Ordering::Equal,
    }
}

/// Sort tagged elements into copy order.
///
/// Stable insertion sort: an element only moves left past predecessors that compare strictly
/// greater, so encounter order is kept for every equal pair.
pub fn order<T: ContentTree>(tree: &T, elements: &[T::NodeId]) -> Vec<T::NodeId> {
    let mut keyed: Vec<(Marker, T::NodeId)> = elements
        .iter()
        .map(|element| (marker_of(tree, *element), *element))
        .collect();

    for index in 1..keyed.len() {
        let mut cursor = index;
        while cursor > 0 && compare_markers(keyed[cursor - 1].0, keyed[cursor].0) == Ordering::Greater {
            keyed.swap(cursor - 1, cursor);
            cursor -= 1;
        }
    }

    keyed.into_iter().map(|(_, element)| element).collect()
}
