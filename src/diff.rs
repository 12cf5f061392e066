//! Set difference between a desired record set and an observed one.

use std::collections::HashSet;

use crate::records::Record;
use crate::store::RecordOp;

/// Partition `desired \ observed` as additions and `observed \ desired` as
/// removals, by record value-equality. Both lists come back sorted so the
/// resulting operations are reproducible. Equal sets yield two empty lists.
pub fn diff(desired: &HashSet<Record>, observed: &HashSet<Record>) -> (Vec<Record>, Vec<Record>) {
    let mut to_add: Vec<Record> = desired.difference(observed).cloned().collect();
    let mut to_remove: Vec<Record> = observed.difference(desired).cloned().collect();
    to_add.sort();
    to_remove.sort();
    (to_add, to_remove)
}

/// Diff two sets and express the result as replicated-set operations,
/// removals first. Nothing is emitted for an empty side.
pub fn diff_ops(desired: &HashSet<Record>, observed: &HashSet<Record>) -> Vec<RecordOp> {
    let (to_add, to_remove) = diff(desired, observed);
    let mut ops = Vec::with_capacity(2);
    if !to_remove.is_empty() {
        ops.push(RecordOp::RemoveAll(to_remove));
    }
    if !to_add.is_empty() {
        ops.push(RecordOp::AddAll(to_add));
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str) -> Record {
        Record::address(name, 60, "10.0.0.1".parse().unwrap())
    }

    fn set(names: &[&str]) -> HashSet<Record> {
        names.iter().map(|n| rec(n)).collect()
    }

    #[test]
    fn test_equal_sets_yield_nothing() {
        let a = set(&["x.d", "y.d"]);
        let (add, remove) = diff(&a, &a.clone());
        assert!(add.is_empty());
        assert!(remove.is_empty());
        assert!(diff_ops(&a, &a.clone()).is_empty());
    }

    #[test]
    fn test_added_record() {
        let desired = set(&["x.d", "y.d"]);
        let observed = set(&["x.d"]);
        let (add, remove) = diff(&desired, &observed);
        assert_eq!(add, vec![rec("y.d")]);
        assert!(remove.is_empty());
    }

    #[test]
    fn test_removed_record() {
        let desired = set(&["x.d"]);
        let observed = set(&["x.d", "y.d"]);
        let (add, remove) = diff(&desired, &observed);
        assert!(add.is_empty());
        assert_eq!(remove, vec![rec("y.d")]);
    }

    #[test]
    fn test_ops_put_removals_first() {
        let desired = set(&["x.d"]);
        let observed = set(&["y.d"]);
        let ops = diff_ops(&desired, &observed);
        assert_eq!(
            ops,
            vec![
                RecordOp::RemoveAll(vec![rec("y.d")]),
                RecordOp::AddAll(vec![rec("x.d")]),
            ]
        );
    }

    #[test]
    fn test_ttl_is_part_of_identity() {
        let mut changed = rec("x.d");
        changed.ttl = 5;
        let desired: HashSet<Record> = [changed.clone()].into_iter().collect();
        let observed = set(&["x.d"]);
        let (add, remove) = diff(&desired, &observed);
        assert_eq!(add, vec![changed]);
        assert_eq!(remove, vec![rec("x.d")]);
    }
}
