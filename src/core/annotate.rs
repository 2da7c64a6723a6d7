use crate::core::builder::ModuleDraft;
use crate::core::merger::ExtractionPlan;
use crate::domain::model::Annotation;
use std::collections::{BTreeMap, BTreeSet};

/// Adds "imported from" provenance statements to extracted terms.
pub struct AnnotationInjector {
    predicate: String,
    default_iri: Option<String>,
    source_iris: BTreeMap<String, String>,
    annotate_seeds: bool,
}

impl AnnotationInjector {
    pub fn new(predicate: impl Into<String>, default_iri: Option<String>) -> Self {
        Self {
            predicate: predicate.into(),
            default_iri,
            source_iris: BTreeMap::new(),
            annotate_seeds: false,
        }
    }

    pub fn from_plan(plan: &ExtractionPlan) -> Self {
        let mut injector = Self::new(
            plan.imported_from_property.clone(),
            plan.imported_from.clone(),
        )
        .with_seeds(plan.annotate_seeds);
        for (source, config) in &plan.sources {
            if let Some(iri) = &config.iri {
                injector.source_iris.insert(source.clone(), iri.clone());
            }
        }
        injector
    }

    pub fn with_seeds(mut self, annotate_seeds: bool) -> Self {
        self.annotate_seeds = annotate_seeds;
        self
    }

    pub fn with_source_iri(mut self, source: impl Into<String>, iri: impl Into<String>) -> Self {
        self.source_iris.insert(source.into(), iri.into());
        self
    }

    fn iri_for(&self, origin: Option<&str>) -> Option<&str> {
        origin
            .and_then(|s| self.source_iris.get(s))
            .or(self.default_iri.as_ref())
            .map(String::as_str)
    }

    /// One statement per term and distinct provenance IRI. Seeds are skipped unless
    /// seed annotation was requested.
    pub fn annotate(&self, draft: &ModuleDraft) -> Vec<Annotation> {
        let mut annotations = BTreeSet::new();
        for (term, origins) in &draft.origins {
            if !self.annotate_seeds && draft.seeds.contains(term) {
                continue;
            }
            for origin in origins {
                if let Some(iri) = self.iri_for(origin.as_deref()) {
                    annotations.insert(Annotation {
                        term: term.clone(),
                        predicate: self.predicate.clone(),
                        value: iri.to_string(),
                    });
                }
            }
        }

        if !annotations.is_empty() {
            tracing::debug!("Added {} provenance annotations", annotations.len());
        }
        annotations.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::IMPORTED_FROM;

    fn draft() -> ModuleDraft {
        let mut draft = ModuleDraft::default();
        for (term, origin) in [("A", Some("obi")), ("B", Some("obi")), ("C", None), ("B", Some("go"))] {
            draft.terms.insert(term.to_string());
            draft
                .origins
                .entry(term.to_string())
                .or_default()
                .insert(origin.map(str::to_string));
        }
        draft.seeds.insert("A".to_string());
        draft
    }

    #[test]
    fn test_no_iri_means_no_annotations() {
        let injector = AnnotationInjector::new(IMPORTED_FROM, None);
        assert!(injector.annotate(&draft()).is_empty());
    }

    #[test]
    fn test_default_iri_skips_seeds() {
        let injector = AnnotationInjector::new(IMPORTED_FROM, Some("http://x.org/x.owl".to_string()));
        let terms: Vec<String> = injector
            .annotate(&draft())
            .into_iter()
            .map(|a| a.term)
            .collect();
        assert_eq!(terms, vec!["B", "C"]);
    }

    #[test]
    fn test_source_iris_and_seed_option() {
        let injector = AnnotationInjector::new("ex:source", Some("http://x.org/x.owl".to_string()))
            .with_source_iri("obi", "http://purl.obolibrary.org/obo/obi.owl")
            .with_seeds(true);
        let annotations = injector.annotate(&draft());

        let pairs: Vec<(&str, &str)> = annotations
            .iter()
            .map(|a| (a.term.as_str(), a.value.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("A", "http://purl.obolibrary.org/obo/obi.owl"),
                // "go" has no IRI of its own and falls back to the default.
                ("B", "http://purl.obolibrary.org/obo/obi.owl"),
                ("B", "http://x.org/x.owl"),
                ("C", "http://x.org/x.owl"),
            ]
        );
        assert!(annotations.iter().all(|a| a.predicate == "ex:source"));
    }
}
