// Sorted-merge intersection

/// Elements present in both `a` and `b`, in ascending order.
///
/// Both inputs must already be sorted ascending; this is not checked.
pub fn intersect_sorted<T: Ord + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let mut ai = 0;
    let mut bi = 0;
    let mut result = Vec::new();

    while ai < a.len() && bi < b.len() {
        match a[ai].cmp(&b[bi]) {
            std::cmp::Ordering::Less => ai += 1,
            std::cmp::Ordering::Greater => bi += 1,
            std::cmp::Ordering::Equal => {
                result.push(a[ai].clone());
                ai += 1;
                bi += 1;
            }
        }
    }

    result
}
