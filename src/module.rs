//! The module tree: scoping and aggregation of options before they reach the container.
//!
//! A [`Module`] is a named bundle of options (`Provide`, `Invoke`, `Decorate`, `Supply`,
//! nested modules, ...). Options apply in two phases — every `Provide`/`Decorate`/`Supply`
//! across the whole tree commits before any `Invoke` runs, so an invoke never races a
//! provider registered by a sibling module (§3, §4). The tree is stored as an arena
//! (`HashMap<ModuleId, ModuleNode>`) rather than recursively owned: privacy checks need a
//! parent pointer from the registering module up to the root, and the container keeps its
//! own copy of the same parent map for `is_visible` checks independent of `Module`'s
//! lifetime.

use crate::container::Container;
use crate::error::{Error, Result};
use crate::event::EventSink;
use crate::option::OptionKind;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque identifier for a module in the tree. Stable for the lifetime of one `App`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

impl ModuleId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) fn for_test(n: u64) -> Self {
        Self(n)
    }
}

pub(crate) struct ModuleNode {
    pub parent: Option<ModuleId>,
    #[allow(dead_code)]
    pub name: String,
}

/// A named collection of options, optionally nesting child modules.
///
/// `name` is purely diagnostic (events and errors reference it); it need not be unique.
pub struct Module {
    name: String,
    options: Vec<Box<dyn crate::option::OptionValue>>,
    children: Vec<Module>,
}

impl Module {
    pub fn new(name: impl Into<String>, options: Vec<Box<dyn crate::option::OptionValue>>) -> Self {
        Self {
            name: name.into(),
            options,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: Module) -> Self {
        self.children.push(child);
        self
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn top_level_options(&self) -> &[Box<dyn crate::option::OptionValue>] {
        &self.options
    }
}

/// Resolved tree: every module has an id and a parent pointer, ready for the container's
/// `is_visible` walk.
pub(crate) struct ModuleTree {
    nodes: HashMap<ModuleId, ModuleNode>,
    root: ModuleId,
}

impl ModuleTree {
    pub(crate) fn root(&self) -> ModuleId {
        self.root
    }

    pub(crate) fn is_root(&self, id: ModuleId) -> bool {
        id == self.root
    }
}

/// Assign ids depth-first and flatten the tree into `(id, &Module, is_root)` triples in the
/// same pass, so the id a node receives here is the same one later code looks options up
/// under.
fn build_and_flatten(root_module: &Module) -> (ModuleTree, Vec<(ModuleId, &Module, bool)>) {
    let mut nodes = HashMap::new();
    let mut out = Vec::new();
    let root = ModuleId::next();
    nodes.insert(
        root,
        ModuleNode {
            parent: None,
            name: root_module.name.clone(),
        },
    );
    out.push((root, root_module, true));
    walk(root_module, root, &mut nodes, &mut out);
    (ModuleTree { nodes, root }, out)
}

fn walk<'a>(
    module: &'a Module,
    id: ModuleId,
    nodes: &mut HashMap<ModuleId, ModuleNode>,
    out: &mut Vec<(ModuleId, &'a Module, bool)>,
) {
    for child in &module.children {
        let child_id = ModuleId::next();
        nodes.insert(
            child_id,
            ModuleNode {
                parent: Some(id),
                name: child.name.clone(),
            },
        );
        out.push((child_id, child, false));
        walk(child, child_id, nodes, out);
    }
}

/// Apply a module tree's options into `container` in the two-phase order the design
/// requires: register every module id first (so privacy checks see the full parent map),
/// then commit every `Provide`/`Decorate`/`Supply` before running any `Invoke`.
pub(crate) fn apply_tree(root_module: &Module, container: &Container, sink: &EventSink) -> Result<ModuleTree> {
    let (tree, flattened) = build_and_flatten(root_module);
    for (id, node) in tree_nodes(&tree) {
        container.register_module(id, node);
    }

    let mut deferred_loggers = Vec::new();
    let mut deferred_invokes = Vec::new();
    let mut errors = Vec::new();

    for (id, module, is_root) in &flattened {
        for option in &module.options {
            if option.top_level_only() && !is_root {
                errors.push(Error::option_misuse(format!(
                    "{} may only be used on the top-level App, not on module \"{}\"",
                    option.describe(),
                    module.name()
                )));
                continue;
            }
            match option.kind() {
                OptionKind::Invoke => {
                    deferred_invokes.push((*id, option.as_ref()));
                    continue;
                }
                OptionKind::LoggerBootstrap => {
                    deferred_loggers.push((*id, option.as_ref()));
                    continue;
                }
                OptionKind::Normal => {}
            }
            if let Err(e) = option.apply(container, *id, sink) {
                errors.push(e);
            }
        }
    }

    for (id, option) in deferred_loggers {
        if let Err(e) = option.apply(container, id, sink) {
            errors.push(e);
        }
    }

    // A parent's invokes must run after its children's, so deepest modules go first; the sort
    // is stable, which keeps declaration order among invokes at the same depth.
    deferred_invokes.sort_by_key(|(id, _)| std::cmp::Reverse(depth(&tree, *id)));
    for (id, option) in deferred_invokes {
        if let Err(e) = option.apply(container, id, sink) {
            errors.push(e);
        }
    }

    if let Some(combined) = Error::fold(errors) {
        return Err(combined);
    }

    Ok(tree)
}

fn depth(tree: &ModuleTree, id: ModuleId) -> usize {
    let mut d = 0;
    let mut cur = id;
    while let Some(parent) = tree.nodes.get(&cur).and_then(|n| n.parent) {
        d += 1;
        cur = parent;
    }
    d
}

fn tree_nodes(tree: &ModuleTree) -> Vec<(ModuleId, Option<ModuleId>)> {
    tree.nodes.iter().map(|(id, node)| (*id, node.parent)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventSink;
    use crate::option::Provide;

    #[test]
    fn build_and_flatten_assigns_distinct_ids() {
        let leaf = Module::new("leaf", vec![]);
        let root = Module::new("root", vec![]).with_child(leaf);
        let (_tree, flattened) = build_and_flatten(&root);
        assert_eq!(flattened.len(), 2);
        assert_ne!(flattened[0].0, flattened[1].0);
        assert!(flattened[0].2);
        assert!(!flattened[1].2);
    }

    #[test]
    fn apply_tree_rejects_top_level_only_option_on_child() {
        let child = Module::new("child", vec![Box::new(crate::option::Validate::new())]);
        let root = Module::new("root", vec![]).with_child(child);
        let container = Container::new(false, false);
        let sink = EventSink::silent();
        let err = apply_tree(&root, &container, &sink).unwrap_err();
        assert!(matches!(err, Error::OptionMisuse { .. } | Error::Multiple(_)));
    }

    #[test]
    fn apply_tree_commits_provides_before_invokes() {
        struct Greeting(String);
        let order = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let order_invoke = order.clone();
        let root = Module::new(
            "root",
            vec![
                Box::new(Provide::new(|| Greeting("hi".into()))),
                Box::new(crate::option::Invoke::new(move |g: std::sync::Arc<Greeting>| {
                    order_invoke.lock().unwrap().push(g.0.clone());
                })),
            ],
        );
        let container = Container::new(false, false);
        let sink = EventSink::silent();
        apply_tree(&root, &container, &sink).unwrap();
        assert_eq!(order.lock().unwrap().as_slice(), &["hi".to_string()]);
    }

    #[test]
    fn apply_tree_runs_child_invokes_before_the_parent_invoke() {
        let order = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let order_child = order.clone();
        let order_parent = order.clone();
        let child = Module::new(
            "child",
            vec![Box::new(crate::option::Invoke::new(move || {
                order_child.lock().unwrap().push("child");
            }))],
        );
        let root = Module::new(
            "root",
            vec![Box::new(crate::option::Invoke::new(move || {
                order_parent.lock().unwrap().push("root");
            }))],
        )
        .with_child(child);
        let container = Container::new(false, false);
        let sink = EventSink::silent();
        apply_tree(&root, &container, &sink).unwrap();
        assert_eq!(order.lock().unwrap().as_slice(), &["child", "root"]);
    }
}
