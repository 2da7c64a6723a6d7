use crate::domain::model::{HierarchyAssertion, OWL_THING, SUBPROPERTY_OF, SUBCLASS_OF};
use crate::domain::ports::OntologyStore;
use crate::utils::error::{ExtractError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

/// A term reached by a closure walk. `path` starts at the origin and ends at `term`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureEntry {
    pub term: String,
    pub depth: usize,
    pub path: Vec<String>,
}

pub type Closure = Arc<Vec<ClosureEntry>>;

static EMPTY: BTreeSet<String> = BTreeSet::new();

/// Adjacency index over subsumption edges.
///
/// Closures are breadth-first, ordered by depth and then by IRI, and memoized per
/// `(term, direction)` for the lifetime of the index.
#[derive(Debug, Default)]
pub struct GraphIndex {
    terms: BTreeSet<String>,
    parents: HashMap<String, BTreeSet<String>>,
    children: HashMap<String, BTreeSet<String>>,
    properties: HashSet<String>,
    cache: Mutex<HashMap<(String, Direction), Closure>>,
}

impl GraphIndex {
    /// Builds the index. Edges pointing at `owl:Thing` are dropped so that its children
    /// become roots.
    pub fn build<A, T>(assertions: A, terms: T) -> Self
    where
        A: IntoIterator<Item = HierarchyAssertion>,
        T: IntoIterator<Item = String>,
    {
        let mut index = Self {
            terms: terms.into_iter().filter(|t| t != OWL_THING).collect(),
            ..Self::default()
        };

        for a in assertions {
            index.terms.insert(a.child.clone());
            if a.predicate == SUBPROPERTY_OF {
                index.properties.insert(a.child.clone());
            }
            if a.parent == OWL_THING {
                continue;
            }
            index.terms.insert(a.parent.clone());
            index
                .parents
                .entry(a.child.clone())
                .or_default()
                .insert(a.parent.clone());
            index.children.entry(a.parent).or_default().insert(a.child);
        }

        tracing::debug!(
            "Indexed {} terms with {} child->parent links",
            index.terms.len(),
            index.parents.values().map(BTreeSet::len).sum::<usize>()
        );
        index
    }

    pub fn from_store<S: OntologyStore + ?Sized>(
        store: &S,
        predicates: Option<&BTreeSet<String>>,
    ) -> Self {
        Self::build(store.get_edges(predicates), store.get_terms())
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains(term)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn direct_parents_of(&self, term: &str) -> &BTreeSet<String> {
        self.parents.get(term).unwrap_or(&EMPTY)
    }

    pub fn direct_children_of(&self, term: &str) -> &BTreeSet<String> {
        self.children.get(term).unwrap_or(&EMPTY)
    }

    /// A term with no parent, i.e. directly under `owl:Thing`.
    pub fn is_root(&self, term: &str) -> bool {
        self.direct_parents_of(term).is_empty()
    }

    pub fn is_leaf(&self, term: &str) -> bool {
        self.direct_children_of(term).is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.terms
            .iter()
            .filter(|t| self.is_root(t))
            .map(String::as_str)
    }

    /// Predicate to assert a parent edge for `term` with.
    pub fn hierarchy_predicate(&self, term: &str) -> &'static str {
        if self.properties.contains(term) {
            SUBPROPERTY_OF
        } else {
            SUBCLASS_OF
        }
    }

    pub fn ancestors_of(&self, term: &str) -> Result<Closure> {
        self.closure(term, Direction::Up)
    }

    pub fn descendants_of(&self, term: &str) -> Result<Closure> {
        self.closure(term, Direction::Down)
    }

    fn neighbours(&self, term: &str, direction: Direction) -> &BTreeSet<String> {
        match direction {
            Direction::Up => self.direct_parents_of(term),
            Direction::Down => self.direct_children_of(term),
        }
    }

    fn closure(&self, term: &str, direction: Direction) -> Result<Closure> {
        if !self.contains(term) {
            return Err(ExtractError::TermNotFound {
                term: term.to_string(),
            });
        }

        let key = (term.to_string(), direction);
        if let Some(hit) = self.lock_cache().get(&key) {
            return Ok(Arc::clone(hit));
        }

        let closure = Arc::new(self.traverse(term, direction)?);
        self.lock_cache().insert(key, Arc::clone(&closure));
        Ok(closure)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<(String, Direction), Closure>> {
        // The cache only holds finished closures, so a poisoned lock is still consistent.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Depth-first walk over everything reachable from `origin`. A node met again while
    /// still on the current path closes a cycle, whichever sibling route led there.
    fn check_acyclic(&self, origin: &str, direction: Direction) -> Result<()> {
        let mut finished: HashSet<&str> = HashSet::new();
        let mut path: Vec<&str> = vec![origin];
        let mut on_path: HashSet<&str> = HashSet::from([origin]);
        let mut pending = vec![self.neighbours(origin, direction).iter()];

        loop {
            let next = match pending.last_mut() {
                Some(neighbours) => neighbours.next(),
                None => break,
            };
            match next {
                Some(n) if on_path.contains(n.as_str()) => {
                    let mut cycle: Vec<String> = path.iter().map(|p| p.to_string()).collect();
                    cycle.push(n.clone());
                    return Err(ExtractError::CyclicHierarchy {
                        term: n.clone(),
                        path: cycle,
                    });
                }
                Some(n) if finished.contains(n.as_str()) => {}
                Some(n) => {
                    path.push(n);
                    on_path.insert(n);
                    pending.push(self.neighbours(n, direction).iter());
                }
                None => {
                    pending.pop();
                    if let Some(done) = path.pop() {
                        on_path.remove(done);
                        finished.insert(done);
                    }
                }
            }
        }

        Ok(())
    }

    fn traverse(&self, origin: &str, direction: Direction) -> Result<Vec<ClosureEntry>> {
        self.check_acyclic(origin, direction)?;

        let mut visited: HashSet<&str> = HashSet::from([origin]);
        let mut level: Vec<(&str, Vec<String>)> = vec![(origin, vec![origin.to_string()])];
        let mut entries = Vec::new();
        let mut depth = 0;

        while !level.is_empty() {
            depth += 1;
            // BTreeMap keeps the next level in IRI order; the first path found wins.
            let mut next: BTreeMap<&str, Vec<String>> = BTreeMap::new();

            for (node, path) in &level {
                for n in self.neighbours(node, direction) {
                    if visited.contains(n.as_str()) {
                        continue;
                    }
                    next.entry(n.as_str()).or_insert_with(|| {
                        let mut p = path.clone();
                        p.push(n.clone());
                        p
                    });
                }
            }

            level = Vec::with_capacity(next.len());
            for (n, path) in next {
                visited.insert(n);
                entries.push(ClosureEntry {
                    term: n.to_string(),
                    depth,
                    path: path.clone(),
                });
                level.push((n, path));
            }
        }

        Ok(entries)
    }
}

/// One [`GraphIndex`] per distinct hierarchy allow-list in a plan.
///
/// Slot 0 is built with the default list and serves untagged specs and sources without
/// their own entry. Sources sharing a list share an index.
#[derive(Debug)]
pub struct IndexSet {
    indexes: Vec<GraphIndex>,
    by_source: BTreeMap<String, usize>,
}

impl IndexSet {
    pub fn single(index: GraphIndex) -> Self {
        Self {
            indexes: vec![index],
            by_source: BTreeMap::new(),
        }
    }

    pub fn from_store<S, I>(store: &S, default: Option<BTreeSet<String>>, sources: I) -> Self
    where
        S: OntologyStore + ?Sized,
        I: IntoIterator<Item = (String, Option<BTreeSet<String>>)>,
    {
        let mut lists = vec![default];
        let mut by_source = BTreeMap::new();
        for (source, list) in sources {
            let slot = match lists.iter().position(|l| *l == list) {
                Some(slot) => slot,
                None => {
                    lists.push(list);
                    lists.len() - 1
                }
            };
            by_source.insert(source, slot);
        }

        let indexes: Vec<GraphIndex> = lists
            .iter()
            .map(|list| GraphIndex::from_store(store, list.as_ref()))
            .collect();
        tracing::debug!(
            "Built {} hierarchy indexes for {} sources",
            indexes.len(),
            by_source.len()
        );
        Self { indexes, by_source }
    }

    fn slot(&self, source: Option<&str>) -> usize {
        source
            .and_then(|s| self.by_source.get(s).copied())
            .unwrap_or(0)
    }

    pub fn for_source(&self, source: Option<&str>) -> &GraphIndex {
        &self.indexes[self.slot(source)]
    }

    /// Distinct indexes serving any of `sources`.
    pub fn for_sources<'s>(
        &self,
        sources: impl IntoIterator<Item = Option<&'s str>>,
    ) -> Vec<&GraphIndex> {
        let slots: BTreeSet<usize> = sources.into_iter().map(|s| self.slot(s)).collect();
        slots.into_iter().map(|slot| &self.indexes[slot]).collect()
    }

    /// Upper bound on the number of distinct indexed terms.
    pub fn term_count(&self) -> usize {
        self.indexes.iter().map(GraphIndex::len).sum()
    }

    /// `rdfs:subPropertyOf` if any index saw `term` as a sub-property.
    pub fn hierarchy_predicate(&self, term: &str) -> &'static str {
        self.indexes
            .iter()
            .map(|index| index.hierarchy_predicate(term))
            .find(|p| *p != SUBCLASS_OF)
            .unwrap_or(SUBCLASS_OF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(&str, &str)]) -> Vec<HierarchyAssertion> {
        pairs
            .iter()
            .map(|(c, p)| HierarchyAssertion {
                child: c.to_string(),
                predicate: SUBCLASS_OF.to_string(),
                parent: p.to_string(),
            })
            .collect()
    }

    fn terms_of(closure: &Closure) -> Vec<(&str, usize)> {
        closure.iter().map(|e| (e.term.as_str(), e.depth)).collect()
    }

    #[test]
    fn test_ancestors_are_breadth_first_and_sorted() {
        // A has parents C and B; both lead to R.
        let index = GraphIndex::build(
            edges(&[("A", "C"), ("A", "B"), ("B", "R"), ("C", "R"), ("R", OWL_THING)]),
            vec![],
        );

        let up = index.ancestors_of("A").unwrap();
        assert_eq!(terms_of(&up), vec![("B", 1), ("C", 1), ("R", 2)]);
        // R was first reached through B.
        assert_eq!(up[2].path, vec!["A", "B", "R"]);

        assert!(index.is_root("R"));
        assert!(!index.contains(OWL_THING));
        assert_eq!(index.roots().collect::<Vec<_>>(), vec!["R"]);
    }

    #[test]
    fn test_descendants_mirror_ancestors() {
        let index = GraphIndex::build(edges(&[("A", "B"), ("B", "C"), ("D", "C")]), vec![]);

        let down = index.descendants_of("C").unwrap();
        assert_eq!(terms_of(&down), vec![("B", 1), ("D", 1), ("A", 2)]);
        assert!(index.is_leaf("A"));
        assert!(index.is_leaf("D"));
        assert!(!index.is_leaf("B"));
    }

    #[test]
    fn test_direct_projections() {
        let index = GraphIndex::build(edges(&[("A", "B"), ("A", "C")]), vec!["Z".to_string()]);

        let parents: Vec<&str> = index.direct_parents_of("A").iter().map(String::as_str).collect();
        assert_eq!(parents, vec!["B", "C"]);
        assert!(index.direct_children_of("Z").is_empty());
        assert!(index.contains("Z"));
        assert!(index.ancestors_of("Z").unwrap().is_empty());
    }

    #[test]
    fn test_reconverging_paths_visit_once() {
        let index = GraphIndex::build(
            edges(&[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D"), ("D", "E")]),
            vec![],
        );
        let up = index.ancestors_of("A").unwrap();
        assert_eq!(up.iter().filter(|e| e.term == "D").count(), 1);
        assert_eq!(up.len(), 4);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let index = GraphIndex::build(edges(&[("A", "B"), ("B", "A")]), vec![]);
        match index.ancestors_of("A") {
            Err(ExtractError::CyclicHierarchy { term, path }) => {
                assert_eq!(term, "A");
                assert_eq!(path, vec!["A", "B", "A"]);
            }
            other => panic!("expected a cycle error, got {:?}", other),
        }
        assert!(index.descendants_of("B").is_err());
    }

    #[test]
    fn test_cycle_above_origin_is_rejected() {
        let index = GraphIndex::build(edges(&[("S", "X"), ("X", "Y"), ("Y", "X")]), vec![]);
        assert!(matches!(
            index.ancestors_of("S"),
            Err(ExtractError::CyclicHierarchy { .. })
        ));
    }

    #[test]
    fn test_cycle_behind_sibling_paths_is_rejected() {
        // B and C are both parents of A and of each other.
        let index = GraphIndex::build(
            edges(&[("A", "B"), ("A", "C"), ("B", "C"), ("C", "B")]),
            vec![],
        );
        match index.ancestors_of("A") {
            Err(ExtractError::CyclicHierarchy { term, path }) => {
                assert_eq!(term, "B");
                assert_eq!(path, vec!["A", "B", "C", "B"]);
            }
            other => panic!("expected a cycle error, got {:?}", other),
        }
        assert!(index.descendants_of("B").is_err());
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let index = GraphIndex::build(
            edges(&[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")]),
            vec![],
        );
        assert_eq!(index.ancestors_of("A").unwrap().len(), 3);
        assert_eq!(index.descendants_of("D").unwrap().len(), 3);
    }

    #[test]
    fn test_unknown_term() {
        let index = GraphIndex::build(edges(&[("A", "B")]), vec![]);
        assert!(matches!(
            index.ancestors_of("Q"),
            Err(ExtractError::TermNotFound { term }) if term == "Q"
        ));
    }

    #[test]
    fn test_closures_are_memoized() {
        let index = GraphIndex::build(edges(&[("A", "B")]), vec![]);
        let first = index.ancestors_of("A").unwrap();
        let second = index.ancestors_of("A").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_index_set_keeps_lists_per_source() {
        let assertions = vec![
            HierarchyAssertion {
                child: "G1".to_string(),
                predicate: SUBCLASS_OF.to_string(),
                parent: "G2".to_string(),
            },
            HierarchyAssertion {
                child: "p1".to_string(),
                predicate: SUBPROPERTY_OF.to_string(),
                parent: "p2".to_string(),
            },
        ];
        let properties: BTreeSet<String> = [SUBPROPERTY_OF.to_string()].into();
        let set = IndexSet {
            indexes: vec![
                GraphIndex::build(assertions.clone(), vec![]),
                GraphIndex::build(
                    assertions.into_iter().filter(|a| properties.contains(&a.predicate)),
                    vec![],
                ),
            ],
            by_source: [("obi".to_string(), 1)].into(),
        };

        assert!(set.for_source(Some("obi")).is_root("G1"));
        assert!(!set.for_source(Some("go")).is_root("G1"));
        assert!(!set.for_source(None).is_root("G1"));
        assert_eq!(set.for_sources([Some("go"), None]).len(), 1);
        assert_eq!(set.for_sources([Some("go"), Some("obi")]).len(), 2);
        assert_eq!(set.hierarchy_predicate("p1"), SUBPROPERTY_OF);
        assert_eq!(set.hierarchy_predicate("G1"), SUBCLASS_OF);
    }

    #[test]
    fn test_subproperty_predicate() {
        let index = GraphIndex::build(
            vec![HierarchyAssertion {
                child: "ex:p".to_string(),
                predicate: SUBPROPERTY_OF.to_string(),
                parent: "ex:q".to_string(),
            }],
            vec![],
        );
        assert_eq!(index.hierarchy_predicate("ex:p"), SUBPROPERTY_OF);
        assert_eq!(index.hierarchy_predicate("ex:q"), SUBCLASS_OF);
    }
}
