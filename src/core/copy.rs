use crate::core::builder::ModuleDraft;
use crate::core::merger::ExtractionPlan;
use crate::domain::model::{
    ModuleEdge, StatementRow, DECLARATION_TYPES, HIERARCHY_PREDICATES, OWL_ANNOTATION_PROPERTY,
    OWL_CLASS, OWL_NAMED_INDIVIDUAL, PROPERTY_TYPES, RDF_TYPE, SUBCLASS_OF, SUBPROPERTY_OF,
};
use crate::domain::ports::OntologyStore;
use std::collections::{BTreeSet, HashMap};

/// How a term is declared in the source ontology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Class,
    Property,
    Individual,
    Undeclared,
}

impl EntityKind {
    /// Reads the `rdf:type` statements among `rows`. A property declaration wins over a
    /// class one, and a class over an individual.
    pub fn of(rows: &[StatementRow]) -> Self {
        let mut kind = Self::Undeclared;
        for row in rows.iter().filter(|r| r.predicate == RDF_TYPE) {
            let object = row.object.as_str();
            if PROPERTY_TYPES.contains(&object) {
                return Self::Property;
            }
            if object == OWL_CLASS {
                kind = Self::Class;
            } else if kind == Self::Undeclared
                && (object == OWL_NAMED_INDIVIDUAL || is_named_class(row))
            {
                kind = Self::Individual;
            }
        }
        kind
    }

    /// Predicate linking a term of this kind to its module parent. Undeclared terms keep
    /// whatever the hierarchy index chose.
    pub fn parent_predicate(self) -> Option<&'static str> {
        match self {
            Self::Class => Some(SUBCLASS_OF),
            Self::Property => Some(SUBPROPERTY_OF),
            Self::Individual => Some(RDF_TYPE),
            Self::Undeclared => None,
        }
    }
}

/// `rdf:type` pointing at a user class rather than a vocabulary term or an expression.
fn is_named_class(row: &StatementRow) -> bool {
    let object = row.object.as_str();
    !object.is_empty()
        && row.datatype != "_JSON"
        && !object.starts_with("_:")
        && !["owl:", "rdf:", "rdfs:"].iter().any(|ns| object.starts_with(ns))
}

/// Copies what the source ontology says about module terms into the module.
///
/// Kept per term, when the predicate passes the allow-list of a source that pulled the
/// term in: literal values, relationships whose object is a module term, and IRI values
/// of declared annotation properties. Entity declarations are always kept. Hierarchy
/// statements never are, since the builder derives them. Copy pairs re-emit every
/// statement of their `from` predicate under `to` regardless of the allow-list.
pub struct StatementCopier<'a, S: OntologyStore + ?Sized> {
    store: &'a S,
    plan: &'a ExtractionPlan,
}

impl<'a, S: OntologyStore + ?Sized> StatementCopier<'a, S> {
    pub fn new(store: &'a S, plan: &'a ExtractionPlan) -> Self {
        Self { store, plan }
    }

    /// Union of the allow-lists of every source that pulled `term` in. `None` when any of
    /// them allows everything.
    fn allowed_predicates(&self, draft: &ModuleDraft, term: &str) -> Option<BTreeSet<String>> {
        let mut allowed = BTreeSet::new();
        let mut any = false;
        for origin in draft.origins_of(term) {
            any = true;
            let predicates = self.plan.predicates_for(origin);
            if predicates.is_empty() {
                return None;
            }
            allowed.extend(predicates);
        }
        if any {
            Some(allowed)
        } else {
            Some(self.plan.predicates_for(None)).filter(|p| !p.is_empty())
        }
    }

    fn is_annotation_property(&self, predicate: &str) -> bool {
        self.store
            .statements_about(predicate)
            .iter()
            .any(|row| row.predicate == RDF_TYPE && row.object == OWL_ANNOTATION_PROPERTY)
    }

    pub fn copy(&self, draft: &ModuleDraft) -> Vec<StatementRow> {
        let mut copied = BTreeSet::new();
        let mut annotation_properties: HashMap<String, bool> = HashMap::new();

        for term in &draft.terms {
            let allowed = self.allowed_predicates(draft, term);
            for row in self.store.statements_about(term) {
                for (from, to) in &self.plan.copy_predicates {
                    if row.predicate == *from {
                        copied.insert(StatementRow {
                            predicate: to.clone(),
                            ..row.clone()
                        });
                    }
                }

                if row.predicate == RDF_TYPE {
                    if DECLARATION_TYPES.contains(&row.object.as_str()) {
                        copied.insert(row);
                    }
                    continue;
                }
                if HIERARCHY_PREDICATES.contains(&row.predicate.as_str()) || row.object.is_empty() {
                    continue;
                }
                if !allowed.as_ref().map_or(true, |a| a.contains(&row.predicate)) {
                    continue;
                }

                let keep = if row.datatype != "_IRI" && row.datatype != "_JSON" {
                    true
                } else if draft.terms.contains(&row.object) {
                    true
                } else if row.datatype == "_IRI" {
                    *annotation_properties
                        .entry(row.predicate.clone())
                        .or_insert_with(|| self.is_annotation_property(&row.predicate))
                } else {
                    false
                };
                if keep {
                    copied.insert(row);
                }
            }
        }

        tracing::debug!("Copied {} statements about module terms", copied.len());
        copied.into_iter().collect()
    }

    /// Re-asserts parent edges with the predicate matching each child's declaration.
    pub fn retype_edges(&self, edges: Vec<ModuleEdge>) -> Vec<ModuleEdge> {
        edges
            .into_iter()
            .map(|mut edge| {
                let kind = EntityKind::of(&self.store.statements_about(&edge.edge.child));
                if let Some(predicate) = kind.parent_predicate() {
                    edge.predicate = predicate.to_string();
                }
                edge
            })
            .collect()
    }
}
