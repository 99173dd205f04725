//! End-to-end diffs over the reference tree.

use facet_testhelpers::test;
use gumleaf::{
    Edit, EditKind, MatchingConfig, NodeData, Tree, TreePair, compute_match, diff_trees, lcs,
};

const ROOT: usize = 0;
const SECTION: usize = 1;
const PARAGRAPH: usize = 2;
const LABELS: usize = 3;

fn count(edits: &[Edit<gumleaf::TreeNode>], kind: EditKind) -> usize {
    edits.iter().filter(|e| e.kind() == kind).count()
}

#[test]
fn identical_single_node_trees() {
    let old = Tree::new(NodeData::new(ROOT, "doc"));
    let new = Tree::new(NodeData::new(ROOT, "doc"));
    let pair = TreePair::new(&old, &new, LABELS);

    let script = diff_trees(&pair, old.root_node(), new.root_node(), &MatchingConfig::default()).unwrap();
    assert_eq!(script.matching().len(), 1);
    assert!(script.matching().contains(old.root_node(), new.root_node()));
    assert!(script.is_empty());
}

#[test]
fn swapped_children_with_distinct_labels() {
    let mut old = Tree::new(NodeData::new(ROOT, "doc"));
    let a = old.add_child(old.root, NodeData::new(SECTION, "intro"));
    let b = old.add_child(old.root, NodeData::new(PARAGRAPH, "body text"));

    let mut new = Tree::new(NodeData::new(ROOT, "doc"));
    let new_b = new.add_child(new.root, NodeData::new(PARAGRAPH, "body text"));
    let new_a = new.add_child(new.root, NodeData::new(SECTION, "intro"));

    let pair = TreePair::new(&old, &new, LABELS);
    let script = diff_trees(&pair, old.root_node(), new.root_node(), &MatchingConfig::default()).unwrap();
    let matching = script.matching();

    assert!(matching.contains(old.node(a), new.node(new_a)));
    assert!(matching.contains(old.node(b), new.node(new_b)));
    assert_eq!(count(script.edits(), EditKind::Reorder), 1);
    assert_eq!(count(script.edits(), EditKind::Insert), 0);
    assert_eq!(count(script.edits(), EditKind::Delete), 0);
    assert_eq!(script.len(), 1);
}

#[test]
fn removed_child_is_a_single_delete() {
    let mut old = Tree::new(NodeData::new(ROOT, "doc"));
    let a = old.add_child(old.root, NodeData::new(SECTION, "first"));
    old.add_child(old.root, NodeData::new(PARAGRAPH, "second"));

    let mut new = Tree::new(NodeData::new(ROOT, "doc"));
    new.add_child(new.root, NodeData::new(PARAGRAPH, "second"));

    let pair = TreePair::new(&old, &new, LABELS);
    let script = diff_trees(&pair, old.root_node(), new.root_node(), &MatchingConfig::default()).unwrap();

    assert_eq!(script.edits(), &[Edit::Delete { old: old.node(a) }]);
    assert_eq!(count(script.edits(), EditKind::Insert), 0);
    assert_eq!(count(script.edits(), EditKind::Update), 0);
}

#[test]
fn classic_myers_example() {
    let old = b"ABCABBA";
    let new = b"CBABAC";

    assert_eq!(lcs::lcs_len(old, new), 4);
    let edits = lcs::edits(old, new);
    let changes = edits.iter().filter(|e| e.kind() != EditKind::Update).count();
    assert_eq!(changes, 7 + 6 - 2 * 4);

    let mut rebuilt = Vec::new();
    for edit in &edits {
        if let Some(j) = edit.new_index() {
            rebuilt.push(new[j]);
        }
        if let (Some(i), Some(j)) = (edit.old_index(), edit.new_index()) {
            assert_eq!(old[i], new[j]);
        }
    }
    assert_eq!(rebuilt, new);
}

#[test]
fn document_rewrite() {
    // old: doc -> [section "Intro" -> [p "hello there", p "general kenobi"],
    //              section "Outro" -> [p "goodbye"]]
    // new: doc -> [section "Outro" -> [p "goodbye", p "general kenobi"],
    //              section "Intro!" -> [p "hello there"], p "footnote"]
    let mut old = Tree::new(NodeData::new(ROOT, "doc"));
    let intro = old.add_child(old.root, NodeData::new(SECTION, "Intro"));
    let hello = old.add_child(intro, NodeData::new(PARAGRAPH, "hello there"));
    let kenobi = old.add_child(intro, NodeData::new(PARAGRAPH, "general kenobi"));
    let outro = old.add_child(old.root, NodeData::new(SECTION, "Outro"));
    let goodbye = old.add_child(outro, NodeData::new(PARAGRAPH, "goodbye"));

    let mut new = Tree::new(NodeData::new(ROOT, "doc"));
    let new_outro = new.add_child(new.root, NodeData::new(SECTION, "Outro"));
    let new_goodbye = new.add_child(new_outro, NodeData::new(PARAGRAPH, "goodbye"));
    let new_kenobi = new.add_child(new_outro, NodeData::new(PARAGRAPH, "general kenobi"));
    let new_intro = new.add_child(new.root, NodeData::new(SECTION, "Intro!"));
    let new_hello = new.add_child(new_intro, NodeData::new(PARAGRAPH, "hello there"));
    let footnote = new.add_child(new.root, NodeData::new(PARAGRAPH, "footnote"));

    let pair = TreePair::new(&old, &new, LABELS);
    let matching = compute_match(&pair, old.root_node(), new.root_node(), &MatchingConfig::default()).unwrap();
    assert!(matching.contains(old.node(intro), new.node(new_intro)));
    assert!(matching.contains(old.node(outro), new.node(new_outro)));
    assert!(matching.contains(old.node(hello), new.node(new_hello)));
    assert!(matching.contains(old.node(kenobi), new.node(new_kenobi)));
    assert!(matching.contains(old.node(goodbye), new.node(new_goodbye)));

    let script = matching.into_edit_script();
    let edits = script.edits();

    assert!(edits.contains(&Edit::Update {
        old: old.node(intro),
        new: new.node(new_intro)
    }));
    assert!(edits.contains(&Edit::Move {
        old: old.node(kenobi),
        new: new.node(new_kenobi)
    }));
    assert!(edits.contains(&Edit::Insert { new: new.node(footnote) }));
    assert_eq!(count(edits, EditKind::Reorder), 1);
    assert_eq!(count(edits, EditKind::Delete), 0);
}

#[test]
fn pool_can_be_supplied_explicitly() {
    let mut old = Tree::new(NodeData::new(ROOT, "doc"));
    for text in ["a", "b", "c", "d"] {
        old.add_child(old.root, NodeData::new(PARAGRAPH, text));
    }
    let mut new = Tree::new(NodeData::new(ROOT, "doc"));
    for text in ["d", "c", "b", "a"] {
        new.add_child(new.root, NodeData::new(PARAGRAPH, text));
    }

    let pool = gumleaf::DiagonalPool::new();
    let pair = TreePair::new(&old, &new, LABELS);
    let matching = compute_match(&pair, old.root_node(), new.root_node(), &MatchingConfig::default()).unwrap();
    let script = gumleaf::EditScript::with_pool(matching, &pool);

    // a reversed list keeps one element in order
    assert_eq!(count(script.edits(), EditKind::Reorder), 3);
    assert_eq!(script.len(), 3);
    assert_eq!(pool.idle_chains(), 1);
}
