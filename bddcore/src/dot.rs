//! Graphviz debug dumps. A thin convenience layer over [`crate::factory::FactoryInner`]'s
//! internal `Dot` implementation; not used on any hot path.

use crate::handle::Bdd;

/// Renders a single BDD as a `dot` graph string.
pub fn dot_string(bdd: &Bdd) -> String {
    bdd.dot_string()
}

/// Renders several BDDs sharing one factory as a single `dot` graph, so shared sub-DAGs show up
/// only once.
pub fn dot_string_forest(roots: &[Bdd]) -> String {
    if roots.is_empty() {
        return "digraph { layout=dot; overlap=false; splines=true; node [fontsize=10];\n}\n".to_string();
    }
    let factory = roots[0].factory();
    let indices: Vec<_> = roots.iter().map(|b| b.node_index()).collect();
    factory.dot_string_multi(&indices)
}
