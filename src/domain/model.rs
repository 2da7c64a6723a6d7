use crate::utils::error::{ExtractError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub const SUBCLASS_OF: &str = "rdfs:subClassOf";
pub const SUBPROPERTY_OF: &str = "rdfs:subPropertyOf";
pub const RDFS_LABEL: &str = "rdfs:label";
pub const OWL_THING: &str = "owl:Thing";
pub const IMPORTED_FROM: &str = "IAO:0000412";
pub const RDF_TYPE: &str = "rdf:type";
pub const OWL_CLASS: &str = "owl:Class";
pub const OWL_ANNOTATION_PROPERTY: &str = "owl:AnnotationProperty";
pub const OWL_DATA_PROPERTY: &str = "owl:DataProperty";
pub const OWL_DATATYPE_PROPERTY: &str = "owl:DatatypeProperty";
pub const OWL_OBJECT_PROPERTY: &str = "owl:ObjectProperty";
pub const OWL_NAMED_INDIVIDUAL: &str = "owl:NamedIndividual";

/// `rdf:type` objects that declare an OWL entity.
pub const DECLARATION_TYPES: [&str; 6] = [
    OWL_CLASS,
    OWL_ANNOTATION_PROPERTY,
    OWL_DATA_PROPERTY,
    OWL_DATATYPE_PROPERTY,
    OWL_OBJECT_PROPERTY,
    OWL_NAMED_INDIVIDUAL,
];

/// Declaration types whose members take `rdfs:subPropertyOf` parents.
pub const PROPERTY_TYPES: [&str; 4] = [
    OWL_ANNOTATION_PROPERTY,
    OWL_DATA_PROPERTY,
    OWL_DATATYPE_PROPERTY,
    OWL_OBJECT_PROPERTY,
];

/// Predicates that make up the subsumption hierarchy.
pub const HIERARCHY_PREDICATES: [&str; 2] = [SUBCLASS_OF, SUBPROPERTY_OF];

/// An ontology term. Equality and ordering use the IRI only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Term {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Term {}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

/// `child` is directly subsumed by `parent`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub child: String,
    pub parent: String,
}

impl Edge {
    pub fn new(child: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            child: child.into(),
            parent: parent.into(),
        }
    }
}

/// A subsumption assertion as read from the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HierarchyAssertion {
    pub child: String,
    pub predicate: String,
    pub parent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Ancestors,
    Descendants,
    Parents,
    Children,
}

impl Relation {
    /// Parses a space-separated `Related` cell. `term` is only used for error reporting.
    pub fn parse_list(term: &str, related: &str) -> Result<BTreeSet<Relation>> {
        related
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<Relation>()
                    .map_err(|_| ExtractError::InvalidRelationToken {
                        term: term.to_string(),
                        token: token.to_string(),
                    })
            })
            .collect()
    }
}

impl FromStr for Relation {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ancestors" => Ok(Self::Ancestors),
            "descendants" => Ok(Self::Descendants),
            "parents" => Ok(Self::Parents),
            "children" => Ok(Self::Children),
            other => Err(ExtractError::InvalidRelationToken {
                term: String::new(),
                token: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ancestors => "ancestors",
            Self::Descendants => "descendants",
            Self::Parents => "parents",
            Self::Children => "children",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intermediates {
    #[default]
    All,
    None,
}

impl FromStr for Intermediates {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "none" => Ok(Self::None),
            other => Err(ExtractError::InvalidConfigValueError {
                field: "intermediates".to_string(),
                value: other.to_string(),
                reason: "Unknown 'intermediates' option, expected 'all' or 'none'".to_string(),
            }),
        }
    }
}

impl fmt::Display for Intermediates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::None => f.write_str("none"),
        }
    }
}

/// One requested term, after ID/label resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub id: String,
    pub label: Option<String>,
    pub parent_id: Option<String>,
    pub related: BTreeSet<Relation>,
    pub intermediates: Option<Intermediates>,
    pub source: Option<String>,
}

impl ImportSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            parent_id: None,
            related: BTreeSet::new(),
            intermediates: None,
            source: None,
        }
    }

    pub fn with_related(mut self, related: impl IntoIterator<Item = Relation>) -> Self {
        self.related.extend(related);
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_intermediates(mut self, intermediates: Intermediates) -> Self {
        self.intermediates = Some(intermediates);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A row of the import specification table, before term resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(rename = "Label", default)]
    pub label: Option<String>,
    #[serde(rename = "Parent ID", default)]
    pub parent_id: Option<String>,
    #[serde(rename = "Parent Label", default)]
    pub parent_label: Option<String>,
    #[serde(rename = "Related", default)]
    pub related: Option<String>,
    #[serde(rename = "Intermediates", default)]
    pub intermediates: Option<String>,
    #[serde(rename = "Source", default)]
    pub source: Option<String>,
}

/// A row of the source configuration table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfigRow {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "IRI", default)]
    pub iri: Option<String>,
    #[serde(rename = "Intermediates", default)]
    pub intermediates: Option<String>,
    #[serde(rename = "Predicates", default)]
    pub predicates: Option<String>,
}

/// Per-source settings from the source configuration table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceConfig {
    pub source: String,
    pub iri: Option<String>,
    pub intermediates: Option<Intermediates>,
    pub predicates: Vec<String>,
}

/// `(term, predicate, value)` provenance statement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Annotation {
    pub term: String,
    pub predicate: String,
    pub value: String,
}

/// A statement-table-shaped output row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatementRow {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub datatype: String,
}

/// Output edge together with the predicate used to assert it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleEdge {
    #[serde(flatten)]
    pub edge: Edge,
    pub predicate: String,
}

/// The closed result of an extraction. Built once, then only read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedModule {
    terms: Vec<Term>,
    edges: Vec<ModuleEdge>,
    annotations: Vec<Annotation>,
    /// Statements copied from the source ontology about module terms.
    #[serde(default)]
    statements: Vec<StatementRow>,
}

impl ExtractedModule {
    /// Sorts and deduplicates its inputs and checks that every edge stays inside the term set.
    pub fn new(
        mut terms: Vec<Term>,
        mut edges: Vec<ModuleEdge>,
        mut annotations: Vec<Annotation>,
    ) -> Result<Self> {
        terms.sort();
        terms.dedup();
        edges.sort();
        edges.dedup();
        annotations.sort();
        annotations.dedup();

        let ids: BTreeSet<&str> = terms.iter().map(|t| t.id.as_str()).collect();
        for e in &edges {
            if !ids.contains(e.edge.parent.as_str()) {
                return Err(ExtractError::DanglingParentOverride {
                    term: e.edge.child.clone(),
                    parent: e.edge.parent.clone(),
                });
            }
            if !ids.contains(e.edge.child.as_str()) {
                return Err(ExtractError::TermNotFound {
                    term: e.edge.child.clone(),
                });
            }
        }

        Ok(Self {
            terms,
            edges,
            annotations,
            statements: Vec::new(),
        })
    }

    /// Attaches copied statements. Every subject must be a module term.
    pub fn with_statements(mut self, mut statements: Vec<StatementRow>) -> Result<Self> {
        statements.sort();
        statements.dedup();
        if let Some(row) = statements.iter().find(|row| !self.contains(&row.subject)) {
            return Err(ExtractError::TermNotFound {
                term: row.subject.clone(),
            });
        }
        self.statements = statements;
        Ok(self)
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn edges(&self) -> &[ModuleEdge] {
        &self.edges
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn statements(&self) -> &[StatementRow] {
        &self.statements
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms
            .binary_search_by(|t| t.id.as_str().cmp(term))
            .is_ok()
    }

    pub fn parents_of(&self, term: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.edge.child == term)
            .map(|e| e.edge.parent.as_str())
            .collect()
    }

    /// Flattens the module into subject/predicate/object/datatype rows. A copied label
    /// statement replaces the generated one for its subject.
    pub fn to_statement_rows(&self) -> Vec<StatementRow> {
        let copied_labels: BTreeSet<&str> = self
            .statements
            .iter()
            .filter(|row| row.predicate == RDFS_LABEL)
            .map(|row| row.subject.as_str())
            .collect();

        let mut rows = self.statements.clone();
        for term in &self.terms {
            if copied_labels.contains(term.id.as_str()) {
                continue;
            }
            if let Some(label) = &term.label {
                rows.push(StatementRow {
                    subject: term.id.clone(),
                    predicate: RDFS_LABEL.to_string(),
                    object: label.clone(),
                    datatype: "xsd:string".to_string(),
                });
            }
        }
        for e in &self.edges {
            rows.push(StatementRow {
                subject: e.edge.child.clone(),
                predicate: e.predicate.clone(),
                object: e.edge.parent.clone(),
                datatype: "_IRI".to_string(),
            });
        }
        for a in &self.annotations {
            rows.push(StatementRow {
                subject: a.term.clone(),
                predicate: a.predicate.clone(),
                object: format!("<{}>", a.value),
                datatype: "_IRI".to_string(),
            });
        }
        rows.sort();
        rows.dedup();
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_related_tokens() {
        let related = Relation::parse_list("OBI:1", " ancestors  Children ").unwrap();
        assert_eq!(
            related.into_iter().collect::<Vec<_>>(),
            vec![Relation::Ancestors, Relation::Children]
        );

        match Relation::parse_list("OBI:1", "ancestors siblings") {
            Err(ExtractError::InvalidRelationToken { term, token }) => {
                assert_eq!(term, "OBI:1");
                assert_eq!(token, "siblings");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_intermediates() {
        assert_eq!("ALL".parse::<Intermediates>().unwrap(), Intermediates::All);
        assert_eq!("none".parse::<Intermediates>().unwrap(), Intermediates::None);
        assert!("some".parse::<Intermediates>().is_err());
    }

    #[test]
    fn test_module_rejects_edge_outside_term_set() {
        let terms = vec![Term::new("A")];
        let edges = vec![ModuleEdge {
            edge: Edge::new("A", "B"),
            predicate: SUBCLASS_OF.to_string(),
        }];
        assert!(matches!(
            ExtractedModule::new(terms, edges, vec![]),
            Err(ExtractError::DanglingParentOverride { .. })
        ));
    }

    #[test]
    fn test_statement_rows_are_sorted() {
        let terms = vec![
            Term::new("B").with_label(Some("bee".to_string())),
            Term::new("A"),
        ];
        let edges = vec![ModuleEdge {
            edge: Edge::new("A", "B"),
            predicate: SUBCLASS_OF.to_string(),
        }];
        let annotations = vec![Annotation {
            term: "A".to_string(),
            predicate: IMPORTED_FROM.to_string(),
            value: "http://example.org/src.owl".to_string(),
        }];
        let module = ExtractedModule::new(terms, edges, annotations).unwrap();
        let rows = module.to_statement_rows();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].subject, "A");
        assert_eq!(rows[0].predicate, IMPORTED_FROM);
        assert_eq!(rows[0].object, "<http://example.org/src.owl>");
        assert_eq!(rows[1].predicate, SUBCLASS_OF);
        assert_eq!(rows[2].object, "bee");
        assert!(module.contains("B"));
        assert!(!module.contains("C"));
    }

    fn row(subject: &str, predicate: &str, object: &str, datatype: &str) -> StatementRow {
        StatementRow {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: object.to_string(),
            datatype: datatype.to_string(),
        }
    }

    #[test]
    fn test_copied_statements_join_the_rows() {
        let terms = vec![
            Term::new("A").with_label(Some("alpha".to_string())),
            Term::new("B").with_label(Some("bee".to_string())),
        ];
        let module = ExtractedModule::new(terms, vec![], vec![])
            .unwrap()
            .with_statements(vec![
                row("A", RDFS_LABEL, "alpha", "@en"),
                row("A", RDF_TYPE, OWL_CLASS, "_IRI"),
                row("A", RDF_TYPE, OWL_CLASS, "_IRI"),
            ])
            .unwrap();
        assert_eq!(module.statements().len(), 2);

        let rows = module.to_statement_rows();
        assert_eq!(
            rows,
            vec![
                row("A", RDF_TYPE, OWL_CLASS, "_IRI"),
                row("A", RDFS_LABEL, "alpha", "@en"),
                row("B", RDFS_LABEL, "bee", "xsd:string"),
            ]
        );
    }

    #[test]
    fn test_copied_statement_outside_term_set() {
        let module = ExtractedModule::new(vec![Term::new("A")], vec![], vec![]).unwrap();
        assert!(matches!(
            module.with_statements(vec![row("Z", RDFS_LABEL, "zed", "xsd:string")]),
            Err(ExtractError::TermNotFound { term }) if term == "Z"
        ));
    }
}
