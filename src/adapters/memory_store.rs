use crate::domain::model::{HierarchyAssertion, StatementRow, HIERARCHY_PREDICATES, RDFS_LABEL};
use crate::domain::ports::OntologyStore;
use crate::utils::error::{ExtractError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Columns of an LDTab-style statement table. Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct StatementRecord {
    subject: String,
    predicate: String,
    #[serde(default)]
    object: Option<String>,
    #[serde(default)]
    datatype: Option<String>,
}

/// An `OntologyStore` over statements held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    statements: Vec<StatementRow>,
    terms: BTreeSet<String>,
    labels: BTreeMap<String, String>,
    by_label: BTreeMap<String, BTreeSet<String>>,
    by_subject: HashMap<String, Vec<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a statement table with at least `subject`, `predicate` and `object` columns.
    pub fn from_reader(data: &[u8], delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .quoting(delimiter != b'\t')
            .from_reader(data);

        let mut store = Self::new();
        for record in reader.deserialize::<StatementRecord>() {
            let record = record?;
            let Some(object) = record.object else {
                continue;
            };
            let datatype = record.datatype.unwrap_or_default();
            store.add_statement(&record.subject, &record.predicate, &object, &datatype);
        }

        tracing::info!(
            "Loaded {} statements about {} terms",
            store.statements.len(),
            store.terms.len()
        );
        Ok(store)
    }

    pub fn add_statement(&mut self, subject: &str, predicate: &str, object: &str, datatype: &str) {
        self.terms.insert(subject.to_string());

        if predicate == RDFS_LABEL {
            // The first label asserted for a term is the one reported.
            self.labels
                .entry(subject.to_string())
                .or_insert_with(|| object.to_string());
            self.by_label
                .entry(object.to_string())
                .or_default()
                .insert(subject.to_string());
        }

        let row = StatementRow {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: object.to_string(),
            datatype: datatype.to_string(),
        };
        if is_hierarchy(&row) {
            self.terms.insert(object.to_string());
        }
        self.by_subject
            .entry(subject.to_string())
            .or_default()
            .push(self.statements.len());
        self.statements.push(row);
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Subsumption statement whose object is a named term.
fn is_hierarchy(row: &StatementRow) -> bool {
    if !HIERARCHY_PREDICATES.contains(&row.predicate.as_str())
        || row.object.is_empty()
        || row.object.starts_with("_:")
    {
        return false;
    }
    if !row.datatype.is_empty() {
        return row.datatype == "_IRI";
    }
    !row.object.starts_with('{')
}

impl OntologyStore for MemoryStore {
    fn get_edges(&self, predicates: Option<&BTreeSet<String>>) -> Vec<HierarchyAssertion> {
        self.statements
            .iter()
            .filter(|row| is_hierarchy(row))
            .filter(|row| predicates.map_or(true, |p| p.contains(&row.predicate)))
            .map(|row| HierarchyAssertion {
                child: row.subject.clone(),
                predicate: row.predicate.clone(),
                parent: row.object.clone(),
            })
            .collect()
    }

    fn get_label(&self, term: &str) -> Option<String> {
        self.labels.get(term).cloned()
    }

    fn resolve_term_ref(&self, curie_or_label: &str) -> Result<String> {
        let reference = curie_or_label.trim();
        if self.terms.contains(reference) {
            return Ok(reference.to_string());
        }
        match self.by_label.get(reference) {
            Some(ids) if ids.len() == 1 => Ok(ids.iter().next().cloned().unwrap_or_default()),
            Some(ids) => Err(ExtractError::AmbiguousLabel {
                label: reference.to_string(),
                candidates: ids.iter().cloned().collect(),
            }),
            None => Err(ExtractError::TermNotFound {
                term: reference.to_string(),
            }),
        }
    }

    fn get_terms(&self) -> BTreeSet<String> {
        self.terms.clone()
    }

    fn statements_about(&self, subject: &str) -> Vec<StatementRow> {
        self.by_subject
            .get(subject)
            .into_iter()
            .flatten()
            .filter_map(|i| self.statements.get(*i).cloned())
            .collect()
    }
}
