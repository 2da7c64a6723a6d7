use crate::core::graph::GraphIndex;
use crate::domain::model::{Edge, Intermediates, Relation};
use crate::utils::error::Result;
use std::collections::{BTreeSet, HashSet};

/// A concrete traversal to run for one seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Directive {
    /// Every ancestor up to the roots.
    AllAncestors,
    /// The first accepted ancestor on each path, or the root that path ends at.
    BoundaryAncestors,
    /// Every descendant down to the leaves.
    AllDescendants,
    /// Only the leaves below the seed.
    LeafDescendants,
    DirectParents,
    DirectChildren,
}

impl Directive {
    /// Whether the result changes as the accepted-term set grows.
    pub fn depends_on_accepted(&self) -> bool {
        matches!(self, Self::BoundaryAncestors)
    }
}

/// Terms proposed by one directive, plus the direct edges it names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub terms: BTreeSet<String>,
    pub edges: BTreeSet<Edge>,
}

pub struct PolicyResolver<'a> {
    index: &'a GraphIndex,
}

impl<'a> PolicyResolver<'a> {
    pub fn new(index: &'a GraphIndex) -> Self {
        Self { index }
    }

    /// Row-level mode wins over source-level, which wins over the global default.
    pub fn effective_mode(
        row: Option<Intermediates>,
        source: Option<Intermediates>,
        default: Intermediates,
    ) -> Intermediates {
        row.or(source).unwrap_or(default)
    }

    pub fn directives(related: &BTreeSet<Relation>, mode: Intermediates) -> Vec<Directive> {
        related
            .iter()
            .map(|relation| match (relation, mode) {
                (Relation::Ancestors, Intermediates::All) => Directive::AllAncestors,
                (Relation::Ancestors, Intermediates::None) => Directive::BoundaryAncestors,
                (Relation::Descendants, Intermediates::All) => Directive::AllDescendants,
                (Relation::Descendants, Intermediates::None) => Directive::LeafDescendants,
                (Relation::Parents, _) => Directive::DirectParents,
                (Relation::Children, _) => Directive::DirectChildren,
            })
            .collect()
    }

    pub fn resolve(
        &self,
        seed: &str,
        directive: Directive,
        accepted: &BTreeSet<String>,
    ) -> Result<Resolution> {
        let mut resolution = Resolution::default();

        match directive {
            Directive::AllAncestors => {
                let closure = self.index.ancestors_of(seed)?;
                resolution.terms = closure.iter().map(|e| e.term.clone()).collect();
            }
            Directive::BoundaryAncestors => {
                resolution.terms = self.boundary_ancestors(seed, accepted)?;
            }
            Directive::AllDescendants => {
                let closure = self.index.descendants_of(seed)?;
                resolution.terms = closure.iter().map(|e| e.term.clone()).collect();
            }
            Directive::LeafDescendants => {
                let closure = self.index.descendants_of(seed)?;
                resolution.terms = closure
                    .iter()
                    .filter(|e| self.index.is_leaf(&e.term))
                    .map(|e| e.term.clone())
                    .collect();
            }
            Directive::DirectParents => {
                for parent in self.index.direct_parents_of(seed) {
                    resolution.terms.insert(parent.clone());
                    resolution.edges.insert(Edge::new(seed, parent.as_str()));
                }
            }
            Directive::DirectChildren => {
                for child in self.index.direct_children_of(seed) {
                    resolution.terms.insert(child.clone());
                    resolution.edges.insert(Edge::new(child.as_str(), seed));
                }
            }
        }

        tracing::debug!(
            "Resolved {:?} for {}: {} terms",
            directive,
            seed,
            resolution.terms.len()
        );
        Ok(resolution)
    }

    fn boundary_ancestors(
        &self,
        seed: &str,
        accepted: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>> {
        // Walking the full closure first rejects cycles before the bounded walk below.
        self.index.ancestors_of(seed)?;

        let mut found = BTreeSet::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = self
            .index
            .direct_parents_of(seed)
            .iter()
            .rev()
            .map(String::as_str)
            .collect();

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            if accepted.contains(node) || self.index.is_root(node) {
                found.insert(node.to_string());
                continue;
            }
            stack.extend(
                self.index
                    .direct_parents_of(node)
                    .iter()
                    .rev()
                    .map(String::as_str),
            );
        }

        Ok(found)
    }
}
