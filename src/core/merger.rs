use crate::domain::model::{
    ImportRow, ImportSpec, Intermediates, Relation, SourceConfig, SourceConfigRow,
    HIERARCHY_PREDICATES, IMPORTED_FROM,
};
use crate::domain::ports::OntologyStore;
use crate::utils::error::{ExtractError, Result};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Command-level settings that rows and source configuration refine.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub source: Option<String>,
    pub intermediates: Intermediates,
    pub terms: Vec<String>,
    pub predicates: Vec<String>,
    pub imported_from: Option<String>,
    pub imported_from_property: String,
    pub no_hierarchy: bool,
    pub annotate_seeds: bool,
    /// `(from, to)` pairs: statements using `from` are re-emitted with `to`.
    pub copy_predicates: Vec<(String, String)>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            source: None,
            intermediates: Intermediates::All,
            terms: Vec::new(),
            predicates: Vec::new(),
            imported_from: None,
            imported_from_property: IMPORTED_FROM.to_string(),
            no_hierarchy: false,
            annotate_seeds: false,
            copy_predicates: Vec::new(),
        }
    }
}

/// Fully resolved input for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPlan {
    pub specs: Vec<ImportSpec>,
    pub sources: BTreeMap<String, SourceConfig>,
    pub intermediates: Intermediates,
    /// Command-line allow-list. Source configs carry their own in `sources`.
    pub predicates: BTreeSet<String>,
    pub imported_from: Option<String>,
    pub imported_from_property: String,
    pub no_hierarchy: bool,
    pub annotate_seeds: bool,
    pub copy_predicates: Vec<(String, String)>,
}

impl ExtractionPlan {
    pub fn new(specs: Vec<ImportSpec>) -> Self {
        Self {
            specs,
            sources: BTreeMap::new(),
            intermediates: Intermediates::All,
            predicates: BTreeSet::new(),
            imported_from: None,
            imported_from_property: IMPORTED_FROM.to_string(),
            no_hierarchy: false,
            annotate_seeds: false,
            copy_predicates: Vec::new(),
        }
    }

    pub fn source_config(&self, source: Option<&str>) -> Option<&SourceConfig> {
        source.and_then(|s| self.sources.get(s))
    }

    /// Mode for one spec: row, then source, then the run default.
    pub fn intermediates_for(&self, spec: &ImportSpec) -> Intermediates {
        crate::core::policy::PolicyResolver::effective_mode(
            spec.intermediates,
            self.source_config(spec.source.as_deref())
                .and_then(|c| c.intermediates),
            self.intermediates,
        )
    }

    /// Allow-list for specs tagged `source`: the command-line list plus that source's
    /// configured predicates. Empty means every predicate.
    pub fn predicates_for(&self, source: Option<&str>) -> BTreeSet<String> {
        let mut predicates = self.predicates.clone();
        if let Some(config) = self.source_config(source) {
            predicates.extend(config.predicates.iter().cloned());
        }
        predicates
    }

    /// Hierarchy predicates named by the allow-list of `source`, or `None` to index both.
    pub fn hierarchy_predicates_for(&self, source: Option<&str>) -> Option<BTreeSet<String>> {
        let selected: BTreeSet<String> = self
            .predicates_for(source)
            .into_iter()
            .filter(|p| HIERARCHY_PREDICATES.contains(&p.as_str()))
            .collect();
        if selected.is_empty() {
            None
        } else {
            Some(selected)
        }
    }

    /// Hierarchy allow-list of every configured source.
    pub fn source_hierarchy_predicates(
        &self,
    ) -> impl Iterator<Item = (String, Option<BTreeSet<String>>)> + '_ {
        self.sources
            .keys()
            .map(|source| (source.clone(), self.hierarchy_predicates_for(Some(source))))
    }

    pub fn seeds(&self) -> BTreeSet<&str> {
        self.specs.iter().map(|s| s.id.as_str()).collect()
    }
}

/// Tab-delimited unless the file name ends in `.csv`.
pub fn delimiter_for(path: &str) -> u8 {
    let is_csv = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if is_csv {
        b','
    } else {
        b'\t'
    }
}

fn read_table<T: DeserializeOwned>(data: &[u8], delimiter: u8) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

pub fn read_import_rows(data: &[u8], delimiter: u8) -> Result<Vec<ImportRow>> {
    read_table(data, delimiter)
}

pub fn read_source_rows(data: &[u8], delimiter: u8) -> Result<Vec<SourceConfigRow>> {
    read_table(data, delimiter)
}

/// One term per line. Blank lines and `#` comments are skipped.
pub fn read_term_list(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| match line.find(" #").or_else(|| line.find("\t#")) {
            Some(pos) => &line[..pos],
            None => line,
        })
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub struct ImportSpecMerger<'a, S: OntologyStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: OntologyStore + ?Sized> ImportSpecMerger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn merge(
        &self,
        rows: &[ImportRow],
        source_rows: &[SourceConfigRow],
        options: &MergeOptions,
    ) -> Result<ExtractionPlan> {
        let mut sources = Self::parse_sources(source_rows)?;
        let filter = options.source.as_deref();

        if let Some(source) = filter {
            if source_rows.is_empty() {
                tracing::warn!(
                    "No source configuration given for '{}'; using command-line settings",
                    source
                );
            } else if !sources.contains_key(source) {
                return Err(ExtractError::MissingSourceConfig {
                    source_tag: source.to_string(),
                });
            }
        }

        let mut specs = Vec::new();
        for row in rows {
            if let Some(spec) = self.spec_from_row(row, filter, &sources)? {
                specs.push(spec);
            }
        }

        let related: BTreeSet<Relation> = if options.no_hierarchy {
            BTreeSet::new()
        } else {
            [Relation::Ancestors].into()
        };
        for term in &options.terms {
            let mut spec = ImportSpec::new(self.store.resolve_term_ref(term)?)
                .with_related(related.iter().copied());
            spec.source = filter.map(str::to_string);
            specs.push(spec);
        }

        if specs.is_empty() {
            return Err(ExtractError::config(
                "One or more term(s) must be specified with --term, --terms, or --imports",
            ));
        }

        let mut predicates = BTreeSet::new();
        for predicate in &options.predicates {
            predicates.insert(self.resolve_predicate(predicate)?);
        }
        for config in sources.values_mut() {
            config.predicates = config
                .predicates
                .iter()
                .map(|p| self.resolve_predicate(p))
                .collect::<Result<_>>()?;
        }
        let mut copy_predicates = Vec::new();
        for (from, to) in &options.copy_predicates {
            copy_predicates.push((self.resolve_predicate(from)?, self.resolve_predicate(to)?));
        }

        // A source IRI replaces the command-level one for the filtered source.
        let imported_from = filter
            .and_then(|f| sources.get(f))
            .and_then(|c| c.iri.clone())
            .or_else(|| options.imported_from.clone());

        tracing::info!(
            "Merged {} import specs from {} rows and {} terms ({} sources configured)",
            specs.len(),
            rows.len(),
            options.terms.len(),
            sources.len()
        );

        Ok(ExtractionPlan {
            specs,
            sources,
            intermediates: options.intermediates,
            predicates,
            imported_from,
            imported_from_property: options.imported_from_property.clone(),
            no_hierarchy: options.no_hierarchy,
            annotate_seeds: options.annotate_seeds,
            copy_predicates,
        })
    }

    fn parse_sources(rows: &[SourceConfigRow]) -> Result<BTreeMap<String, SourceConfig>> {
        let mut sources = BTreeMap::new();
        for row in rows {
            let name = row.source.trim();
            if name.is_empty() || sources.contains_key(name) {
                continue;
            }
            let intermediates = non_empty(&row.intermediates)
                .map(str::parse::<Intermediates>)
                .transpose()?;
            let predicates = non_empty(&row.predicates)
                .map(|p| p.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();
            sources.insert(
                name.to_string(),
                SourceConfig {
                    source: name.to_string(),
                    iri: non_empty(&row.iri).map(str::to_string),
                    intermediates,
                    predicates,
                },
            );
        }
        Ok(sources)
    }

    fn spec_from_row(
        &self,
        row: &ImportRow,
        filter: Option<&str>,
        sources: &BTreeMap<String, SourceConfig>,
    ) -> Result<Option<ImportSpec>> {
        let Some(reference) = non_empty(&row.id).or_else(|| non_empty(&row.label)) else {
            return Ok(None);
        };
        let tag = non_empty(&row.source);

        let source = match (filter, tag) {
            (Some(f), Some(t)) if f != t => return Ok(None),
            (Some(f), _) => Some(f.to_string()),
            (None, Some(t)) => {
                if !sources.is_empty() && !sources.contains_key(t) {
                    return Err(ExtractError::UnknownSourceTag {
                        term: reference.to_string(),
                        source_tag: t.to_string(),
                    });
                }
                Some(t.to_string())
            }
            (None, None) => None,
        };

        let id = self.store.resolve_term_ref(reference)?;
        let parent_id = match non_empty(&row.parent_id).or_else(|| non_empty(&row.parent_label)) {
            Some(parent) => Some(self.store.resolve_term_ref(parent)?),
            None => None,
        };
        let related = match non_empty(&row.related) {
            Some(related) => Relation::parse_list(&id, related)?,
            None => BTreeSet::new(),
        };
        let intermediates = non_empty(&row.intermediates)
            .map(str::parse::<Intermediates>)
            .transpose()?;

        Ok(Some(ImportSpec {
            label: non_empty(&row.label).map(str::to_string),
            id,
            parent_id,
            related,
            intermediates,
            source,
        }))
    }

    fn resolve_predicate(&self, predicate: &str) -> Result<String> {
        match self.store.resolve_term_ref(predicate) {
            Ok(id) => Ok(id),
            // Predicates such as rdfs:subClassOf are rarely declared as subjects.
            Err(ExtractError::TermNotFound { .. }) => {
                tracing::debug!("Predicate '{}' is not a known term, keeping it as given", predicate);
                Ok(predicate.to_string())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::MemoryStore;
    use crate::domain::model::{RDFS_LABEL, SUBCLASS_OF, SUBPROPERTY_OF};

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_statement("OBI:1", SUBCLASS_OF, "OBI:2", "_IRI");
        store.add_statement("OBI:2", SUBCLASS_OF, "BFO:1", "_IRI");
        store.add_statement("OBI:1", RDFS_LABEL, "assay", "xsd:string");
        store.add_statement("OBI:2", RDFS_LABEL, "planned process", "xsd:string");
        store.add_statement("GO:1", RDFS_LABEL, "process", "xsd:string");
        store.add_statement("GO:2", RDFS_LABEL, "process", "xsd:string");
        store
    }

    fn row(id: &str, related: &str, source: &str) -> ImportRow {
        ImportRow {
            id: Some(id.to_string()),
            related: Some(related.to_string()).filter(|r| !r.is_empty()),
            source: Some(source.to_string()).filter(|s| !s.is_empty()),
            ..ImportRow::default()
        }
    }

    fn source_row(source: &str, iri: &str, intermediates: &str) -> SourceConfigRow {
        SourceConfigRow {
            source: source.to_string(),
            iri: Some(iri.to_string()),
            intermediates: Some(intermediates.to_string()),
            predicates: Some("rdfs:label rdfs:subClassOf".to_string()),
        }
    }

    #[test]
    fn test_read_import_rows_tsv() {
        let tsv = "ID\tLabel\tParent ID\tParent Label\tRelated\tSource\n\
                   OBI:1\tassay\t\t\tancestors children\tobi\n\
                   \t\t\t\t\t\n";
        let rows = read_import_rows(tsv.as_bytes(), b'\t').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id.as_deref(), Some("OBI:1"));
        assert_eq!(rows[0].related.as_deref(), Some("ancestors children"));
        assert_eq!(rows[0].parent_id, None);
        assert_eq!(rows[1].id, None);
    }

    #[test]
    fn test_read_source_rows_csv() {
        let csv = "Source,IRI,Intermediates,Predicates\nobi,http://purl.obolibrary.org/obo/obi.owl,none,rdfs:label\n";
        let rows = read_source_rows(csv.as_bytes(), delimiter_for("config.csv")).unwrap();
        assert_eq!(rows[0].source, "obi");
        assert_eq!(rows[0].intermediates.as_deref(), Some("none"));
    }

    #[test]
    fn test_read_term_list() {
        let text = "# header\nOBI:1\n\nOBI:2 # planned process\n  BFO:1  \n";
        assert_eq!(read_term_list(text), vec!["OBI:1", "OBI:2", "BFO:1"]);
    }

    #[test]
    fn test_delimiter_for() {
        assert_eq!(delimiter_for("imports.csv"), b',');
        assert_eq!(delimiter_for("imports.tsv"), b'\t');
        assert_eq!(delimiter_for("imports"), b'\t');
    }

    #[test]
    fn test_merge_resolves_labels_and_overrides() {
        let store = store();
        let rows = vec![ImportRow {
            label: Some("assay".to_string()),
            parent_label: Some("planned process".to_string()),
            related: Some("ancestors".to_string()),
            ..ImportRow::default()
        }];
        let plan = ImportSpecMerger::new(&store)
            .merge(&rows, &[], &MergeOptions::default())
            .unwrap();

        assert_eq!(plan.specs.len(), 1);
        assert_eq!(plan.specs[0].id, "OBI:1");
        assert_eq!(plan.specs[0].parent_id.as_deref(), Some("OBI:2"));
        assert!(plan.specs[0].related.contains(&Relation::Ancestors));
    }

    #[test]
    fn test_merge_source_filter_uses_source_config() {
        let store = store();
        let rows = vec![row("OBI:1", "ancestors", "obi"), row("GO:1", "", "go"), row("OBI:2", "", "")];
        let sources = vec![
            source_row("obi", "http://purl.obolibrary.org/obo/obi.owl", "none"),
            source_row("go", "http://purl.obolibrary.org/obo/go.owl", "all"),
        ];
        let options = MergeOptions {
            source: Some("obi".to_string()),
            imported_from: Some("http://example.org/ignored.owl".to_string()),
            ..MergeOptions::default()
        };
        let plan = ImportSpecMerger::new(&store)
            .merge(&rows, &sources, &options)
            .unwrap();

        let ids: Vec<&str> = plan.specs.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["OBI:1", "OBI:2"]);
        assert!(plan.specs.iter().all(|s| s.source.as_deref() == Some("obi")));
        assert_eq!(plan.intermediates_for(&plan.specs[0]), Intermediates::None);
        assert_eq!(
            plan.imported_from.as_deref(),
            Some("http://purl.obolibrary.org/obo/obi.owl")
        );
        assert_eq!(
            plan.hierarchy_predicates_for(Some("obi")),
            Some([SUBCLASS_OF.to_string()].into())
        );
        assert!(plan.predicates.is_empty());
    }

    #[test]
    fn test_merge_keeps_predicates_per_source() {
        let store = store();
        let rows = vec![row("OBI:1", "ancestors", "obi"), row("GO:1", "", "go")];
        let mut obi = source_row("obi", "http://purl.obolibrary.org/obo/obi.owl", "all");
        obi.predicates = Some("rdfs:subPropertyOf".to_string());
        let mut go = source_row("go", "http://purl.obolibrary.org/obo/go.owl", "all");
        go.predicates = None;
        let options = MergeOptions {
            predicates: vec!["rdfs:comment".to_string()],
            copy_predicates: vec![("rdfs:label".to_string(), "skos:prefLabel".to_string())],
            ..MergeOptions::default()
        };
        let plan = ImportSpecMerger::new(&store)
            .merge(&rows, &[obi, go], &options)
            .unwrap();

        assert_eq!(plan.predicates_for(Some("go")), ["rdfs:comment".to_string()].into());
        assert_eq!(
            plan.predicates_for(Some("obi")),
            ["rdfs:comment".to_string(), SUBPROPERTY_OF.to_string()].into()
        );
        assert_eq!(
            plan.hierarchy_predicates_for(Some("obi")),
            Some([SUBPROPERTY_OF.to_string()].into())
        );
        assert_eq!(plan.hierarchy_predicates_for(Some("go")), None);
        assert_eq!(plan.hierarchy_predicates_for(None), None);
        assert_eq!(plan.source_hierarchy_predicates().count(), 2);
        assert_eq!(
            plan.copy_predicates,
            vec![("rdfs:label".to_string(), "skos:prefLabel".to_string())]
        );
    }

    #[test]
    fn test_merge_row_intermediates_override_source() {
        let store = store();
        let mut r = row("OBI:1", "ancestors", "obi");
        r.intermediates = Some("all".to_string());
        let sources = vec![source_row("obi", "http://example.org/obi.owl", "none")];
        let plan = ImportSpecMerger::new(&store)
            .merge(&[r], &sources, &MergeOptions::default())
            .unwrap();
        assert_eq!(plan.intermediates_for(&plan.specs[0]), Intermediates::All);
    }

    #[test]
    fn test_merge_missing_source_config() {
        let store = store();
        let sources = vec![source_row("go", "http://example.org/go.owl", "all")];
        let options = MergeOptions {
            source: Some("obi".to_string()),
            ..MergeOptions::default()
        };
        let result = ImportSpecMerger::new(&store).merge(
            &[row("OBI:1", "", "obi")],
            &sources,
            &options,
        );
        assert!(matches!(
            result,
            Err(ExtractError::MissingSourceConfig { source_tag }) if source_tag == "obi"
        ));
    }

    #[test]
    fn test_merge_unknown_source_tag() {
        let store = store();
        let sources = vec![source_row("go", "http://example.org/go.owl", "all")];
        let result = ImportSpecMerger::new(&store).merge(
            &[row("OBI:1", "", "obi")],
            &sources,
            &MergeOptions::default(),
        );
        assert!(matches!(result, Err(ExtractError::UnknownSourceTag { .. })));
    }

    #[test]
    fn test_merge_rejects_bad_related_token() {
        let store = store();
        let result = ImportSpecMerger::new(&store).merge(
            &[row("OBI:1", "ancestors cousins", "")],
            &[],
            &MergeOptions::default(),
        );
        assert!(matches!(
            result,
            Err(ExtractError::InvalidRelationToken { token, .. }) if token == "cousins"
        ));
    }

    #[test]
    fn test_merge_ambiguous_label() {
        let store = store();
        let options = MergeOptions {
            terms: vec!["process".to_string()],
            ..MergeOptions::default()
        };
        let result = ImportSpecMerger::new(&store).merge(&[], &[], &options);
        assert!(matches!(result, Err(ExtractError::AmbiguousLabel { .. })));
    }

    #[test]
    fn test_merge_plain_terms() {
        let store = store();
        let options = MergeOptions {
            terms: vec!["OBI:1".to_string()],
            no_hierarchy: true,
            ..MergeOptions::default()
        };
        let plan = ImportSpecMerger::new(&store).merge(&[], &[], &options).unwrap();
        assert!(plan.specs[0].related.is_empty());

        let options = MergeOptions {
            terms: vec!["OBI:1".to_string()],
            ..MergeOptions::default()
        };
        let plan = ImportSpecMerger::new(&store).merge(&[], &[], &options).unwrap();
        assert_eq!(plan.specs[0].related, [Relation::Ancestors].into());
    }

    #[test]
    fn test_merge_requires_terms() {
        let store = store();
        let result = ImportSpecMerger::new(&store).merge(&[], &[], &MergeOptions::default());
        assert!(matches!(result, Err(ExtractError::ConfigError { .. })));
    }
}
