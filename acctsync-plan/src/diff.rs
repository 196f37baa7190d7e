//! Generic set-difference helpers used throughout the planner.
//!
//! Grounded on `original_source/iamy/awsdiff.go`'s
//! `inlinePolicySetDifference`/`stringSetDifference` (both built on
//! `reflect.DeepEqual`-based O(n·m) scans). The Rust port keeps the
//! O(n·m) shape for inline policies (no natural total order to sort by)
//! but narrows the element bound to plain `PartialEq`; string-valued
//! sets use `BTreeSet` directly at the call site instead of a bespoke
//! helper.

/// The elements of `a` that are not present (by `PartialEq`) in `b`.
pub fn set_difference<'a, T: PartialEq>(a: &'a [T], b: &[T]) -> Vec<&'a T> {
    a.iter().filter(|item| !b.contains(item)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_elements_only_in_first_slice() {
        let a = vec![1, 2, 3];
        let b = vec![2, 3, 4];
        assert_eq!(set_difference(&a, &b), vec![&1]);
    }

    #[test]
    fn empty_when_subset() {
        let a = vec![1, 2];
        let b = vec![1, 2, 3];
        assert!(set_difference(&a, &b).is_empty());
    }

    #[test]
    fn full_slice_when_other_is_empty() {
        let a = vec![1, 2];
        let b: Vec<i32> = Vec::new();
        assert_eq!(set_difference(&a, &b), vec![&1, &2]);
    }
}
