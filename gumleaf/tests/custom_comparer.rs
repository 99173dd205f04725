//! A comparer written from scratch over a flat node table, relying on the
//! trait's default traversals.

use facet_testhelpers::test;
use gumleaf::{Edit, EditKind, MatchError, MatchingConfig, TreeComparer, compute_match_with_known, diff_trees};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Block,
    Statement,
    Comment,
}

struct Node {
    kind: Kind,
    text: &'static str,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Default)]
struct Source {
    nodes: Vec<Node>,
}

impl Source {
    fn add(&mut self, parent: Option<usize>, kind: Kind, text: &'static str) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            text,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(id);
        }
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Side {
    Old,
    New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Handle(Side, usize);

struct Syntax<'a> {
    old: &'a Source,
    new: &'a Source,
}

impl Syntax<'_> {
    fn node(&self, handle: Handle) -> &Node {
        match handle.0 {
            Side::Old => &self.old.nodes[handle.1],
            Side::New => &self.new.nodes[handle.1],
        }
    }
}

impl TreeComparer for Syntax<'_> {
    type Node = Handle;

    fn label_count(&self) -> usize {
        2
    }

    fn label(&self, node: Handle) -> Option<usize> {
        match self.node(node).kind {
            Kind::Block => Some(0),
            Kind::Statement => Some(1),
            Kind::Comment => None,
        }
    }

    fn tied_to_ancestor(&self, label: usize) -> usize {
        usize::from(label == 1)
    }

    fn children(&self, node: Handle) -> impl Iterator<Item = Handle> + '_ {
        self.node(node).children.iter().map(move |&c| Handle(node.0, c))
    }

    fn parent(&self, node: Handle) -> Option<Handle> {
        self.node(node).parent.map(|p| Handle(node.0, p))
    }

    fn same_tree(&self, left: Handle, right: Handle) -> bool {
        left.0 == right.0
    }

    fn distance(&self, old: Handle, new: Handle) -> f64 {
        gumleaf::lcs::distance(self.node(old).text.as_bytes(), self.node(new).text.as_bytes())
    }

    fn values_equal(&self, old: Handle, new: Handle) -> bool {
        self.node(old).text == self.node(new).text
    }
}

/// fn main { a(); b(); // note } fn helper { c(); }
fn old_source() -> Source {
    let mut s = Source::default();
    let root = s.add(None, Kind::Block, "file");
    let main = s.add(Some(root), Kind::Block, "fn main");
    s.add(Some(main), Kind::Statement, "a();");
    s.add(Some(main), Kind::Statement, "b();");
    s.add(Some(main), Kind::Comment, "// note");
    let helper = s.add(Some(root), Kind::Block, "fn helper");
    s.add(Some(helper), Kind::Statement, "c();");
    s
}

/// fn main { b(); a(); // other note } fn helper { c(); d(); }
fn new_source() -> Source {
    let mut s = Source::default();
    let root = s.add(None, Kind::Block, "file");
    let main = s.add(Some(root), Kind::Block, "fn main");
    s.add(Some(main), Kind::Statement, "b();");
    s.add(Some(main), Kind::Statement, "a();");
    s.add(Some(main), Kind::Comment, "// other note");
    let helper = s.add(Some(root), Kind::Block, "fn helper");
    s.add(Some(helper), Kind::Statement, "c();");
    s.add(Some(helper), Kind::Statement, "d();");
    s
}

#[test]
fn default_traversals() {
    let old = old_source();
    let syntax = Syntax { old: &old, new: &old };
    let pre: Vec<_> = syntax.descendants(Handle(Side::Old, 0)).map(|h| h.1).collect();
    assert_eq!(pre, vec![0, 1, 2, 3, 4, 5, 6]);
    let post: Vec<_> = syntax.post_order(Handle(Side::Old, 0)).map(|h| h.1).collect();
    assert_eq!(post, vec![2, 3, 4, 1, 6, 5, 0]);
    assert_eq!(syntax.ancestor(Handle(Side::Old, 6), 2), Some(Handle(Side::Old, 0)));
    assert_eq!(syntax.span(Handle(Side::Old, 6)), None);

    // the comment under `fn main` is transparent
    let labeled: Vec<_> = syntax.labeled_children(Handle(Side::Old, 1)).map(|h| h.1).collect();
    assert_eq!(labeled, vec![2, 3]);
    assert_eq!(syntax.labeled_parent(Handle(Side::Old, 3)), Some(Handle(Side::Old, 1)));
    assert_eq!(syntax.labeled_parent(Handle(Side::Old, 0)), None);
}

#[test]
fn statements_reorder_and_insert() {
    let (old, new) = (old_source(), new_source());
    let syntax = Syntax { old: &old, new: &new };
    let script = diff_trees(&syntax, Handle(Side::Old, 0), Handle(Side::New, 0), &MatchingConfig::default()).unwrap();

    // comments are ignored, so only the swap and the new statement show up
    let edits = script.edits();
    assert_eq!(
        edits,
        &[
            Edit::Reorder {
                old: Handle(Side::Old, 3),
                new: Handle(Side::New, 2)
            },
            Edit::Insert {
                new: Handle(Side::New, 7)
            },
        ]
    );
    assert_eq!(edits[0].kind(), EditKind::Reorder);
    assert_eq!(edits[0].display(&syntax).to_string(), "Reorder(old:Handle(Old, 3) -> new:Handle(New, 2))");
}

#[test]
fn known_match_across_trees_is_rejected() {
    let (old, new) = (old_source(), new_source());
    let syntax = Syntax { old: &old, new: &new };
    let err = compute_match_with_known(
        &syntax,
        Handle(Side::Old, 0),
        Handle(Side::New, 0),
        [(Handle(Side::New, 2), Handle(Side::New, 3))],
        &MatchingConfig::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        MatchError::NotInOldTree {
            node: String::from("Handle(New, 2)")
        }
    );
}
