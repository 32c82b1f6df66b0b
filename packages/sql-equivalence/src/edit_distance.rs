//! Zhang–Shasha ordered tree edit distance with unit costs.
//!
//! Deleting or inserting a node costs 1. Relabelling costs 0 when key and value both match
//! and 1 otherwise. Indexing is iterative, so deep trees do not grow the call stack.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::log::EDIT_DISTANCE;
use crate::tree::{NodeId, NodeRef, Tree};

/// Post-order view of one tree.
struct Indexed<'a> {
    nodes: Vec<NodeRef<'a>>,
    /// Post-order index of each node's leftmost leaf descendant.
    lmld: Vec<usize>,
    keyroots: Vec<usize>,
}

impl<'a> Indexed<'a> {
    fn new(root: NodeRef<'a>) -> Self {
        let mut nodes = Vec::new();
        let mut lmld = Vec::new();
        let mut position: HashMap<NodeId, usize> = HashMap::new();
        let mut stack = vec![(root, false)];

        while let Some((node, expanded)) = stack.pop() {
            if !expanded {
                stack.push((node, true));
                stack.extend(node.children().rev().map(|child| (child, false)));
                continue;
            }

            let index = nodes.len();
            let leftmost = match node.first_child() {
                Some(child) => lmld[position[&child.id()]],
                None => index,
            };
            position.insert(node.id(), index);
            nodes.push(node);
            lmld.push(leftmost);
        }

        // A keyroot is the highest node of each distinct leftmost leaf
        let mut seen = HashSet::new();
        let mut keyroots: Vec<usize> = (0..nodes.len())
            .rev()
            .filter(|&index| seen.insert(lmld[index]))
            .collect();
        keyroots.reverse();

        Self {
            nodes,
            lmld,
            keyroots,
        }
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}

fn relabel_cost(a: NodeRef<'_>, b: NodeRef<'_>) -> usize {
    if a.key() == b.key() && a.value() == b.value() {
        0
    } else {
        1
    }
}

/// Minimum number of unit edits turning the subtree at `a` into the subtree at `b`.
pub fn tree_edit_distance(a: NodeRef<'_>, b: NodeRef<'_>) -> usize {
    let left = Indexed::new(a);
    let right = Indexed::new(b);

    trace!(
        target: EDIT_DISTANCE,
        msg = "Indexed trees",
        left_nodes = left.len(),
        right_nodes = right.len(),
        left_keyroots = left.keyroots.len(),
        right_keyroots = right.keyroots.len()
    );

    let mut tree_dist = vec![vec![0usize; right.len()]; left.len()];

    for &i in &left.keyroots {
        for &j in &right.keyroots {
            forest_distance(&left, &right, i, j, &mut tree_dist);
        }
    }

    let distance = tree_dist[left.len() - 1][right.len() - 1];
    debug!(target: EDIT_DISTANCE, msg = "Tree edit distance", distance);
    distance
}

fn forest_distance(
    left: &Indexed<'_>,
    right: &Indexed<'_>,
    i: usize,
    j: usize,
    tree_dist: &mut [Vec<usize>],
) {
    let (li, lj) = (left.lmld[i], right.lmld[j]);
    let rows = i - li + 2;
    let cols = j - lj + 2;
    let mut forest = vec![vec![0usize; cols]; rows];

    for p in 1..rows {
        forest[p][0] = forest[p - 1][0] + 1;
    }
    for q in 1..cols {
        forest[0][q] = forest[0][q - 1] + 1;
    }

    for p in 1..rows {
        for q in 1..cols {
            let x = li + p - 1;
            let y = lj + q - 1;
            let delete = forest[p - 1][q] + 1;
            let insert = forest[p][q - 1] + 1;

            if left.lmld[x] == li && right.lmld[y] == lj {
                let relabel = forest[p - 1][q - 1] + relabel_cost(left.nodes[x], right.nodes[y]);
                forest[p][q] = delete.min(insert).min(relabel);
                tree_dist[x][y] = forest[p][q];
            } else {
                let p2 = left.lmld[x] - li;
                let q2 = right.lmld[y] - lj;
                forest[p][q] = delete.min(insert).min(forest[p2][q2] + tree_dist[x][y]);
            }
        }
    }
}

impl Tree {
    pub fn edit_distance(&self, other: &Tree) -> usize {
        tree_edit_distance(self.root(), other.root())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::*;
    use crate::tree::Pruner;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde_json::json;

    /// Builds a tree from `(parent_index, key)` pairs. Index 0 is the root.
    fn tree(root: &str, edges: &[(usize, &str)]) -> Tree {
        let mut tree = Tree::new(root, "");
        let mut ids = vec![tree.root().id()];
        for &(parent, key) in edges {
            let id = tree.add_child(ids[parent], key, "");
            ids.push(id);
        }
        tree
    }

    #[test]
    fn identical_trees_have_zero_distance() {
        let a = tree("f", &[(0, "d"), (1, "a"), (1, "c"), (3, "b"), (0, "e")]);

        assert_eq!(a.edit_distance(&a.clone()), 0);
    }

    #[test]
    fn classic_example() {
        // f(d(a, c(b)), e) -> f(c(d(a, b)), e)
        let a = tree("f", &[(0, "d"), (1, "a"), (1, "c"), (3, "b"), (0, "e")]);
        let b = tree("f", &[(0, "c"), (1, "d"), (2, "a"), (2, "b"), (0, "e")]);

        assert_eq!(a.edit_distance(&b), 2);
        assert_eq!(b.edit_distance(&a), 2);
    }

    #[test]
    fn distance_is_logged_with_tree_sizes() {
        let (writer, _guard) = trace();
        let a = tree("f", &[(0, "d"), (1, "a"), (1, "c"), (3, "b"), (0, "e")]);
        let b = tree("f", &[(0, "c"), (1, "d"), (2, "a"), (2, "b"), (0, "e")]);

        a.edit_distance(&b);

        let log_contents = writer.get_string();
        assert!(log_contents.contains("edit_distance:"));
        assert!(log_contents.contains("left_nodes=6"));
        assert!(log_contents.contains("Tree edit distance"));
        assert!(log_contents.contains("distance=2"));
    }

    #[test]
    fn unit_costs() {
        let base = tree("r", &[(0, "a"), (0, "b")]);
        let relabelled = tree("r", &[(0, "a"), (0, "x")]);
        let inserted = tree("r", &[(0, "a"), (0, "b"), (0, "c")]);
        let removed = tree("r", &[(0, "a")]);

        assert_eq!(base.edit_distance(&relabelled), 1);
        assert_eq!(base.edit_distance(&inserted), 1);
        assert_eq!(base.edit_distance(&removed), 1);
        assert_eq!(tree("r", &[]).edit_distance(&tree("s", &[])), 1);
    }

    #[test]
    fn values_take_part_in_relabelling() {
        let mut a = Tree::new("root", "");
        let mut b = Tree::new("root", "");
        let (ra, rb) = (a.root().id(), b.root().id());
        a.add_child(ra, "relname", "\"t1\"");
        b.add_child(rb, "relname", "\"t2\"");

        assert_eq!(a.edit_distance(&b), 1);
    }

    #[test]
    fn deep_trees_do_not_recurse() {
        let edges: Vec<(usize, &str)> = (0..20_000).map(|i| (i, "n")).collect();
        let chain = tree("r", &edges);

        assert_eq!(chain.edit_distance(&tree("r", &[])), 20_000);
    }

    #[test]
    fn different_select_column_is_one_edit() {
        let query = |column: &str| {
            statement_tree(select(
                vec![res_target(col(&[column]), None)],
                vec![range_var("t", None)],
            ))
        };
        let (reference, candidate) = (query("col1"), query("col2"));

        assert_eq!(reference.edit_distance(&candidate), 1);
        assert_eq!(candidate.edit_distance(&reference), 1);
    }

    #[test]
    fn pruned_labels_do_not_count() {
        let statement = |location: i64| {
            json!({ "SelectStmt": {
                "targetList": [{ "ResTarget": { "val": col(&["a"]), "location": location } }],
                "op": "SETOP_NONE"
            } })
        };
        let a = Tree::from_json(&document(vec![statement(7)]));
        let b = Tree::from_json(&document(vec![statement(42)]));

        assert_eq!(a.edit_distance(&b), 0);

        let unpruned = Pruner::new(Vec::<String>::new());
        let a = Tree::from_json_with(&document(vec![statement(7)]), &unpruned);
        let b = Tree::from_json_with(&document(vec![statement(42)]), &unpruned);
        assert_eq!(a.edit_distance(&b), 1);
    }

    const LABELS: [&str; 3] = ["a", "b", "c"];

    /// Plain nested form of a test tree, for the brute-force recurrence.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Plain {
        label: &'static str,
        children: Vec<Plain>,
    }

    fn plain(root: &'static str, edges: &[(usize, &'static str)]) -> Plain {
        fn build(index: usize, labels: &[&'static str], edges: &[(usize, &'static str)]) -> Plain {
            Plain {
                label: labels[index],
                children: edges
                    .iter()
                    .enumerate()
                    .filter(|(_, edge)| edge.0 == index)
                    .map(|(child, _)| build(child + 1, labels, edges))
                    .collect(),
            }
        }

        let mut labels = vec![root];
        labels.extend(edges.iter().map(|&(_, label)| label));
        build(0, &labels, edges)
    }

    fn size(forest: &[Plain]) -> usize {
        forest.iter().map(|node| 1 + size(&node.children)).sum()
    }

    type Memo = HashMap<(Vec<Plain>, Vec<Plain>), usize>;

    /// Forest distance straight from the recurrence on rightmost roots.
    fn forest_oracle(f: &[Plain], g: &[Plain], memo: &mut Memo) -> usize {
        let (Some(v), Some(w)) = (f.last(), g.last()) else {
            return size(f) + size(g);
        };
        let key = (f.to_vec(), g.to_vec());
        if let Some(&distance) = memo.get(&key) {
            return distance;
        }

        let without_root = |forest: &[Plain], root: &Plain| {
            let mut rest = forest[..forest.len() - 1].to_vec();
            rest.extend(root.children.iter().cloned());
            rest
        };

        let delete = forest_oracle(&without_root(f, v), g, memo) + 1;
        let insert = forest_oracle(f, &without_root(g, w), memo) + 1;
        let relabel = forest_oracle(&f[..f.len() - 1], &g[..g.len() - 1], memo)
            + forest_oracle(&v.children, &w.children, memo)
            + usize::from(v.label != w.label);

        let distance = delete.min(insert).min(relabel);
        memo.insert(key, distance);
        distance
    }

    fn random_tree(rng: &mut StdRng) -> (&'static str, Vec<(usize, &'static str)>) {
        let root = LABELS[rng.random_range(0..LABELS.len())];
        let count = rng.random_range(0..7);
        let edges = (0..count)
            .map(|i| (rng.random_range(0..=i), LABELS[rng.random_range(0..LABELS.len())]))
            .collect();
        (root, edges)
    }

    #[test]
    fn matches_brute_force_on_random_trees() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut memo = Memo::new();

        for _ in 0..300 {
            let (root_a, edges_a) = random_tree(&mut rng);
            let (root_b, edges_b) = random_tree(&mut rng);
            let a = tree(root_a, &edges_a);
            let b = tree(root_b, &edges_b);

            let expected = forest_oracle(
                &[plain(root_a, &edges_a)],
                &[plain(root_b, &edges_b)],
                &mut memo,
            );

            assert_eq!(a.edit_distance(&b), expected, "{a} vs {b}");
            assert_eq!(b.edit_distance(&a), expected, "{b} vs {a}");
        }
    }
}
