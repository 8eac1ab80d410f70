use super::{HierarchyError, HierarchyNode};
use log::warn;
use std::collections::{HashSet, VecDeque};

/// Walks parent pointers upward from `node_id` and returns the chain root-first.
///
/// `lookup` is the storage collaborator; it returns `Ok(None)` for unknown ids.
/// A parent id that does not resolve stops the walk and the partial chain is
/// returned.
///
/// # Errors
/// - [`HierarchyError::NodeNotFound`] when `node_id` itself does not resolve.
/// - [`HierarchyError::CycleDetected`] when a parent id is visited twice.
/// - Any error produced by `lookup`.
pub fn resolve_ancestry<T, E, F>(node_id: T::Id, mut lookup: F) -> Result<Vec<T>, E>
where
    T: HierarchyNode,
    F: FnMut(T::Id) -> Result<Option<T>, E>,
    E: From<HierarchyError<T::Id>>,
{
    let start = lookup(node_id)?.ok_or(HierarchyError::NodeNotFound(node_id))?;

    let mut visited = HashSet::from([start.node_id()]);
    let mut cursor = start.parent_id();
    let mut chain = VecDeque::from([start]);

    while let Some(parent_id) = cursor {
        if !visited.insert(parent_id) {
            return Err(HierarchyError::CycleDetected(parent_id).into());
        }
        match lookup(parent_id)? {
            Some(parent) => {
                cursor = parent.parent_id();
                chain.push_front(parent);
            }
            None => {
                warn!(
                    "event=ancestry_walk module=hierarchy status=dangling node_id={} parent_id={}",
                    node_id, parent_id
                );
                break;
            }
        }
    }

    Ok(chain.into())
}

#[cfg(test)]
mod tests {
    use super::resolve_ancestry;
    use crate::hierarchy::{HierarchyError, HierarchyNode};
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Unit {
        id: char,
        parent: Option<char>,
    }

    impl HierarchyNode for Unit {
        type Id = char;

        fn node_id(&self) -> char {
            self.id
        }

        fn parent_id(&self) -> Option<char> {
            self.parent
        }
    }

    fn table(rows: &[(char, Option<char>)]) -> HashMap<char, Unit> {
        rows.iter()
            .map(|(id, parent)| {
                (
                    *id,
                    Unit {
                        id: *id,
                        parent: *parent,
                    },
                )
            })
            .collect()
    }

    fn walk(
        rows: &HashMap<char, Unit>,
        start: char,
    ) -> Result<Vec<char>, HierarchyError<char>> {
        let chain = resolve_ancestry(start, |id| {
            Ok::<_, HierarchyError<char>>(rows.get(&id).cloned())
        })?;
        Ok(chain.into_iter().map(|unit| unit.id).collect())
    }

    #[test]
    fn three_level_chain_is_root_first() {
        let rows = table(&[('A', None), ('B', Some('A')), ('C', Some('B'))]);
        assert_eq!(walk(&rows, 'C').unwrap(), vec!['A', 'B', 'C']);
    }

    #[test]
    fn root_resolves_to_itself() {
        let rows = table(&[('A', None)]);
        assert_eq!(walk(&rows, 'A').unwrap(), vec!['A']);
    }

    #[test]
    fn missing_start_node_is_not_found() {
        let rows = table(&[('A', None)]);
        assert_eq!(walk(&rows, 'Z'), Err(HierarchyError::NodeNotFound('Z')));
    }

    #[test]
    fn dangling_parent_returns_partial_chain() {
        let rows = table(&[('B', Some('X')), ('C', Some('B'))]);
        assert_eq!(walk(&rows, 'C').unwrap(), vec!['B', 'C']);
    }

    #[test]
    fn cycle_fails_instead_of_looping() {
        let rows = table(&[('A', Some('C')), ('B', Some('A')), ('C', Some('B'))]);
        assert_eq!(walk(&rows, 'C'), Err(HierarchyError::CycleDetected('C')));
    }

    #[test]
    fn lookup_errors_propagate() {
        let result: Result<Vec<Unit>, HierarchyError<char>> =
            resolve_ancestry('A', |_| Err(HierarchyError::DuplicateNode('A')));
        assert_eq!(result, Err(HierarchyError::DuplicateNode('A')));
    }
}
