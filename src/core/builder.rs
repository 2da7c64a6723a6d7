use crate::core::graph::{GraphIndex, IndexSet};
use crate::core::merger::ExtractionPlan;
use crate::core::policy::{Directive, PolicyResolver, Resolution};
use crate::domain::model::{Edge, ImportSpec, ModuleEdge};
use crate::utils::error::{ExtractError, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// The accepted-term set and what is known about how each term got there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleDraft {
    pub terms: BTreeSet<String>,
    pub seeds: BTreeSet<String>,
    /// Direct edges named by `parents`/`children` relations.
    pub direct_edges: BTreeSet<Edge>,
    /// Source tags of the specs that pulled each term in. `None` is the untagged default.
    pub origins: BTreeMap<String, BTreeSet<Option<String>>>,
}

impl ModuleDraft {
    fn accept(&mut self, term: &str, source: Option<&String>) -> bool {
        self.origins
            .entry(term.to_string())
            .or_default()
            .insert(source.cloned());
        self.terms.insert(term.to_string())
    }

    /// Returns the number of terms that were not accepted before.
    fn merge(&mut self, resolution: Resolution, source: Option<&String>) -> usize {
        let mut added = 0;
        for term in &resolution.terms {
            if self.accept(term, source) {
                added += 1;
            }
        }
        self.direct_edges.extend(resolution.edges);
        added
    }

    /// Source tags that pulled `term` in.
    pub fn origins_of(&self, term: &str) -> impl Iterator<Item = Option<&str>> {
        self.origins
            .get(term)
            .into_iter()
            .flatten()
            .map(|o| o.as_deref())
    }
}

pub struct ModuleBuilder<'a> {
    indexes: &'a IndexSet,
    plan: &'a ExtractionPlan,
}

impl<'a> ModuleBuilder<'a> {
    pub fn new(indexes: &'a IndexSet, plan: &'a ExtractionPlan) -> Self {
        Self { indexes, plan }
    }

    fn index_for(&self, spec: &ImportSpec) -> &'a GraphIndex {
        let indexes: &'a IndexSet = self.indexes;
        indexes.for_source(spec.source.as_deref())
    }

    /// Computes the accepted-term set for every spec in the plan.
    ///
    /// Directives that do not look at the accepted set run once. Boundary ancestor
    /// directives then re-run against a snapshot of the accepted set until a round adds
    /// nothing, so the result does not depend on spec order. Each spec walks the index
    /// built for its source's predicate allow-list.
    pub fn build(&self) -> Result<ModuleDraft> {
        let mut draft = ModuleDraft::default();

        for spec in &self.plan.specs {
            if !self.index_for(spec).contains(&spec.id) {
                return Err(ExtractError::TermNotFound {
                    term: spec.id.clone(),
                });
            }
            draft.seeds.insert(spec.id.clone());
            draft.accept(&spec.id, spec.source.as_ref());
        }

        let (dependent, independent): (Vec<_>, Vec<_>) = self
            .jobs()
            .into_iter()
            .partition(|(_, directive)| directive.depends_on_accepted());

        for (spec, directive) in independent {
            let resolver = PolicyResolver::new(self.index_for(spec));
            let resolution = resolver.resolve(&spec.id, directive, &draft.terms)?;
            draft.merge(resolution, spec.source.as_ref());
        }

        // Each productive round accepts at least one more indexed term.
        let max_rounds = self.indexes.term_count() + 1;
        let mut round = 0;
        while !dependent.is_empty() {
            round += 1;
            if round > max_rounds {
                return Err(ExtractError::config(format!(
                    "ancestor resolution did not converge after {} rounds",
                    max_rounds
                )));
            }

            let snapshot = draft.terms.clone();
            let mut added = 0;
            for (spec, directive) in &dependent {
                let resolver = PolicyResolver::new(self.index_for(spec));
                let resolution = resolver.resolve(&spec.id, *directive, &snapshot)?;
                added += draft.merge(resolution, spec.source.as_ref());
            }
            tracing::debug!("Fixed-point round {}: {} new terms", round, added);
            if added == 0 {
                break;
            }
        }

        tracing::info!(
            "Accepted {} terms from {} seeds ({} fixed-point rounds)",
            draft.terms.len(),
            draft.seeds.len(),
            round
        );
        Ok(draft)
    }

    fn jobs(&self) -> Vec<(&'a ImportSpec, Directive)> {
        let plan: &'a ExtractionPlan = self.plan;
        let mut jobs = Vec::new();
        for spec in &plan.specs {
            let mode = plan.intermediates_for(spec);
            for directive in PolicyResolver::directives(&spec.related, mode) {
                jobs.push((spec, directive));
            }
        }
        jobs
    }

    /// Derives the parent edges of the finished term set.
    ///
    /// An explicit parent override always wins. Otherwise each term is linked to the first
    /// accepted ancestor on each of its ancestor paths, walking the index of every source
    /// that pulled the term in; a term with none becomes a root of the module.
    pub fn derive_edges(&self, draft: &ModuleDraft) -> Result<Vec<ModuleEdge>> {
        let mut overrides: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for spec in &self.plan.specs {
            if let Some(parent) = &spec.parent_id {
                if !draft.terms.contains(parent) {
                    return Err(ExtractError::DanglingParentOverride {
                        term: spec.id.clone(),
                        parent: parent.clone(),
                    });
                }
                overrides.entry(&spec.id).or_default().insert(parent);
            }
        }

        let mut edges: BTreeSet<Edge> = overrides
            .iter()
            .flat_map(|(child, parents)| parents.iter().map(move |p| Edge::new(*child, *p)))
            .collect();

        if !self.plan.no_hierarchy {
            for term in &draft.terms {
                if overrides.contains_key(term.as_str()) {
                    continue;
                }
                for index in self.indexes.for_sources(draft.origins_of(term)) {
                    if !index.contains(term) {
                        continue;
                    }
                    for parent in Self::nearest_accepted_ancestors(index, term, &draft.terms)? {
                        edges.insert(Edge::new(term.as_str(), parent));
                    }
                }
            }
            let direct = draft.direct_edges.iter().filter(|e| {
                !overrides.contains_key(e.child.as_str())
                    && draft.terms.contains(&e.child)
                    && draft.terms.contains(&e.parent)
            });
            edges.extend(direct.cloned());
        }

        tracing::info!("Derived {} parent edges", edges.len());
        Ok(edges
            .into_iter()
            .map(|edge| ModuleEdge {
                predicate: self.indexes.hierarchy_predicate(&edge.child).to_string(),
                edge,
            })
            .collect())
    }

    fn nearest_accepted_ancestors<'i>(
        index: &'i GraphIndex,
        term: &str,
        accepted: &BTreeSet<String>,
    ) -> Result<BTreeSet<&'i str>> {
        index.ancestors_of(term)?;

        let mut found = BTreeSet::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&'i str> = index
            .direct_parents_of(term)
            .iter()
            .rev()
            .map(String::as_str)
            .collect();

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            if accepted.contains(node) {
                found.insert(node);
                continue;
            }
            stack.extend(index.direct_parents_of(node).iter().rev().map(String::as_str));
        }
        Ok(found)
    }
}
