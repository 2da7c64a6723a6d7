use crate::core::annotate::AnnotationInjector;
use crate::core::builder::ModuleBuilder;
use crate::core::copy::StatementCopier;
use crate::core::graph::IndexSet;
use crate::core::merger::ExtractionPlan;
use crate::domain::model::{ExtractedModule, Term};
use crate::domain::ports::OntologyStore;
use crate::utils::error::Result;

/// Builds one hierarchy index per distinct allow-list among the plan's sources.
pub fn build_indexes<S: OntologyStore + ?Sized>(store: &S, plan: &ExtractionPlan) -> IndexSet {
    IndexSet::from_store(
        store,
        plan.hierarchy_predicates_for(None),
        plan.source_hierarchy_predicates(),
    )
}

/// Runs a whole extraction against `store`. Either the closed module is returned or
/// nothing is.
pub fn extract_module<S: OntologyStore + ?Sized>(
    store: &S,
    plan: &ExtractionPlan,
) -> Result<ExtractedModule> {
    let indexes = build_indexes(store, plan);
    extract_with_indexes(store, &indexes, plan)
}

/// Same as [`extract_module`] with prebuilt indexes, for callers running several plans
/// over one ontology.
pub fn extract_with_indexes<S: OntologyStore + ?Sized>(
    store: &S,
    indexes: &IndexSet,
    plan: &ExtractionPlan,
) -> Result<ExtractedModule> {
    let builder = ModuleBuilder::new(indexes, plan);
    let draft = builder.build()?;
    let copier = StatementCopier::new(store, plan);
    let edges = copier.retype_edges(builder.derive_edges(&draft)?);
    let annotations = AnnotationInjector::from_plan(plan).annotate(&draft);

    let terms = draft
        .terms
        .iter()
        .map(|id| Term::new(id.as_str()).with_label(store.get_label(id)))
        .collect();

    let module =
        ExtractedModule::new(terms, edges, annotations)?.with_statements(copier.copy(&draft))?;
    tracing::info!(
        "Extracted module: {} terms, {} edges, {} annotations, {} copied statements",
        module.terms().len(),
        module.edges().len(),
        module.annotations().len(),
        module.statements().len()
    );
    Ok(module)
}
