//! RFC 5280 §6.1 valid-policy tree.
//!
//! Nodes live in an arena and refer to their parent and children by [`NodeId`]. Deleting a
//! node deletes its subtree; [`PolicyTree::prune`] removes childless nodes above a depth.
//! A tree whose root has been deleted is empty, which is the RFC's "NULL" tree.

use crate::cert::extensions::PolicyQualifier;
use crate::constants::oid::ANY_POLICY;
use std::collections::BTreeSet;
use std::fmt;

pub mod names;

/// Handle of a node inside a [`PolicyTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A node of the valid-policy tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyNode {
    valid_policy: String,
    qualifiers: Vec<PolicyQualifier>,
    expected_policies: BTreeSet<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: usize,
}

impl PolicyNode {
    /// The policy this node asserts.
    pub fn valid_policy(&self) -> &str {
        &self.valid_policy
    }

    /// Qualifiers from the certificate that produced the node.
    pub fn qualifiers(&self) -> &[PolicyQualifier] {
        &self.qualifiers
    }

    /// Policies that satisfy this node in the next certificate.
    pub fn expected_policies(&self) -> &BTreeSet<String> {
        &self.expected_policies
    }

    /// Parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Position in the path; the root is depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn is_any_policy(&self) -> bool {
        self.valid_policy == ANY_POLICY
    }
}

/// The valid-policy tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTree {
    nodes: Vec<Option<PolicyNode>>,
}

impl Default for PolicyTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyTree {
    /// Creates the initial tree: a single `anyPolicy` node at depth 0.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(PolicyNode {
                valid_policy: ANY_POLICY.to_string(),
                qualifiers: Vec::new(),
                expected_policies: BTreeSet::from([ANY_POLICY.to_string()]),
                parent: None,
                children: Vec::new(),
                depth: 0,
            })],
        }
    }

    /// Returns `true` once the root has been deleted.
    pub fn is_empty(&self) -> bool {
        !matches!(self.nodes.first(), Some(Some(_)))
    }

    /// Returns the node for `id`, if it is still in the tree.
    pub fn get(&self, id: NodeId) -> Option<&PolicyNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Iterates over the live nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &PolicyNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, node)| node.as_ref().map(|node| (NodeId(i), node)))
    }

    /// Live nodes at `depth`.
    pub fn at_depth(&self, depth: usize) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, node)| node.depth == depth)
            .map(|(id, _)| id)
            .collect()
    }

    /// The deepest depth that still has nodes.
    pub fn max_depth(&self) -> Option<usize> {
        self.nodes().map(|(_, node)| node.depth).max()
    }

    /// Valid policies of the nodes at `depth`.
    pub fn valid_policies_at(&self, depth: usize) -> BTreeSet<String> {
        self.nodes()
            .filter(|(_, node)| node.depth == depth)
            .map(|(_, node)| node.valid_policy.clone())
            .collect()
    }

    pub(crate) fn add_child(
        &mut self,
        parent: NodeId,
        valid_policy: &str,
        qualifiers: Vec<PolicyQualifier>,
        expected_policies: BTreeSet<String>,
    ) -> Option<NodeId> {
        let depth = self.get(parent)?.depth + 1;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(PolicyNode {
            valid_policy: valid_policy.to_string(),
            qualifiers,
            expected_policies,
            parent: Some(parent),
            children: Vec::new(),
            depth,
        }));
        if let Some(Some(node)) = self.nodes.get_mut(parent.0) {
            node.children.push(id);
        }
        Some(id)
    }

    pub(crate) fn set_expected_policies(&mut self, id: NodeId, expected: BTreeSet<String>) {
        if let Some(Some(node)) = self.nodes.get_mut(id.0) {
            node.expected_policies = expected;
        }
    }

    /// Deletes `id` and its subtree.
    pub(crate) fn remove(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        if let Some(parent) = node.parent {
            if let Some(Some(parent)) = self.nodes.get_mut(parent.0) {
                parent.children.retain(|child| *child != id);
            }
        }
        let mut pending = node.children;
        while let Some(child) = pending.pop() {
            if let Some(child) = self.nodes.get_mut(child.0).and_then(Option::take) {
                pending.extend(child.children);
            }
        }
    }

    /// Deletes childless nodes at depths below `depth`, deepest first.
    pub(crate) fn prune(&mut self, depth: usize) {
        for level in (0..depth).rev() {
            let childless: Vec<NodeId> = self
                .nodes()
                .filter(|(_, node)| node.depth == level && node.children.is_empty())
                .map(|(id, _)| id)
                .collect();
            for id in childless {
                self.remove(id);
            }
        }
    }

    /// Processes a certificate's policies at position `depth` (RFC 5280 §6.1.3 (d)).
    ///
    /// `any_policy_allowed` reflects `inhibit_anyPolicy > 0`, or a self-issued intermediate.
    pub(crate) fn process_certificate_policies(
        &mut self,
        depth: usize,
        policies: &[crate::cert::extensions::PolicyInformation],
        any_policy_allowed: bool,
    ) {
        let parents = self.at_depth(depth - 1);

        for policy in policies.iter().filter(|p| p.policy_id != ANY_POLICY) {
            let matched: Vec<NodeId> = parents
                .iter()
                .copied()
                .filter(|id| {
                    self.get(*id)
                        .is_some_and(|node| node.expected_policies.contains(&policy.policy_id))
                })
                .collect();
            let targets = if matched.is_empty() {
                parents
                    .iter()
                    .copied()
                    .filter(|id| self.get(*id).is_some_and(PolicyNode::is_any_policy))
                    .collect()
            } else {
                matched
            };
            for parent in targets {
                self.add_child(
                    parent,
                    &policy.policy_id,
                    policy.qualifiers.clone(),
                    BTreeSet::from([policy.policy_id.clone()]),
                );
            }
        }

        if any_policy_allowed {
            if let Some(any) = policies.iter().find(|p| p.policy_id == ANY_POLICY) {
                for parent in &parents {
                    let Some(node) = self.get(*parent) else {
                        continue;
                    };
                    let existing: BTreeSet<&str> = node
                        .children
                        .iter()
                        .filter_map(|child| self.get(*child))
                        .map(|child| child.valid_policy.as_str())
                        .collect();
                    let missing: Vec<String> = node
                        .expected_policies
                        .iter()
                        .filter(|policy| !existing.contains(policy.as_str()))
                        .cloned()
                        .collect();
                    for policy in missing {
                        self.add_child(
                            *parent,
                            &policy,
                            any.qualifiers.clone(),
                            BTreeSet::from([policy.clone()]),
                        );
                    }
                }
            }
        }

        self.prune(depth);
    }

    /// Applies policy mappings at `depth` (RFC 5280 §6.1.4 (b)).
    ///
    /// `mapping` pairs each issuer domain policy with the subject domain policies it maps to.
    /// `any_qualifiers` are the qualifiers of the certificate's `anyPolicy`, if it asserted one.
    pub(crate) fn apply_mappings(
        &mut self,
        depth: usize,
        mapping: &[(String, BTreeSet<String>)],
        mapping_allowed: bool,
        any_qualifiers: Option<&[PolicyQualifier]>,
    ) {
        for (issuer_policy, subject_policies) in mapping {
            let nodes: Vec<NodeId> = self
                .at_depth(depth)
                .into_iter()
                .filter(|id| {
                    self.get(*id)
                        .is_some_and(|node| &node.valid_policy == issuer_policy)
                })
                .collect();

            if !mapping_allowed {
                for id in nodes {
                    self.remove(id);
                }
                continue;
            }

            if nodes.is_empty() {
                let any_node = self.at_depth(depth).into_iter().find(|id| {
                    self.get(*id).is_some_and(PolicyNode::is_any_policy)
                });
                let Some((parent, qualifiers)) = any_node.and_then(|id| {
                    let parent = self.get(id)?.parent?;
                    Some((parent, any_qualifiers?.to_vec()))
                }) else {
                    continue;
                };
                self.add_child(parent, issuer_policy, qualifiers, subject_policies.clone());
            } else {
                for id in nodes {
                    self.set_expected_policies(id, subject_policies.clone());
                }
            }
        }

        if !mapping_allowed {
            self.prune(depth);
        }
    }

    /// Intersects the tree with the user initial policy set (RFC 5280 §6.1.5 (g)(iii)).
    pub(crate) fn intersect(&mut self, depth: usize, initial_policies: &BTreeSet<String>) {
        let valid_policy_node_set: Vec<NodeId> = self
            .nodes()
            .filter(|(_, node)| {
                node.parent
                    .and_then(|parent| self.get(parent))
                    .is_some_and(PolicyNode::is_any_policy)
            })
            .map(|(id, _)| id)
            .collect();

        let named: BTreeSet<String> = valid_policy_node_set
            .iter()
            .filter_map(|id| self.get(*id))
            .map(|node| node.valid_policy.clone())
            .collect();

        for id in &valid_policy_node_set {
            let keep = self.get(*id).is_some_and(|node| {
                node.is_any_policy() || initial_policies.contains(&node.valid_policy)
            });
            if !keep {
                self.remove(*id);
            }
        }

        let any_leaf = self
            .at_depth(depth)
            .into_iter()
            .find(|id| self.get(*id).is_some_and(PolicyNode::is_any_policy));
        if let Some(any_leaf) = any_leaf {
            if let Some((parent, qualifiers)) = self
                .get(any_leaf)
                .and_then(|node| Some((node.parent?, node.qualifiers.clone())))
            {
                for policy in initial_policies.iter().filter(|p| !named.contains(*p)) {
                    self.add_child(
                        parent,
                        policy,
                        qualifiers.clone(),
                        BTreeSet::from([policy.clone()]),
                    );
                }
            }
            self.remove(any_leaf);
        }

        self.prune(depth);
    }
}

impl fmt::Display for PolicyTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (_, node) in self.nodes() {
            writeln!(
                f,
                "{:indent$}{} {{{}}}",
                "",
                node.valid_policy,
                node.expected_policies
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                indent = node.depth * 2
            )?;
        }
        Ok(())
    }
}

/// Result of policy processing over a validated path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyOutcome {
    /// The valid-policy tree after intersection; `None` when it became empty.
    pub tree: Option<PolicyTree>,
    /// Valid policies of the leaves of the tree.
    pub valid_policies: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::extensions::PolicyInformation;

    const P1: &str = "2.16.840.1.101.3.2.1.3.6";
    const P2: &str = "2.16.840.1.101.3.2.1.3.7";
    const P3: &str = "2.16.840.1.101.3.2.1.3.13";

    fn info(id: &str) -> PolicyInformation {
        PolicyInformation {
            policy_id: id.to_string(),
            qualifiers: Vec::new(),
        }
    }

    #[test]
    fn test_specific_policies_hang_off_any_policy_root() {
        let mut tree = PolicyTree::new();
        tree.process_certificate_policies(1, &[info(P1), info(P2)], false);

        assert!(!tree.is_empty());
        assert_eq!(
            tree.valid_policies_at(1),
            BTreeSet::from([P1.to_string(), P2.to_string()])
        );
    }

    #[test]
    fn test_unmatched_policy_prunes_to_empty_tree() {
        let mut tree = PolicyTree::new();
        tree.process_certificate_policies(1, &[info(P1)], false);
        tree.process_certificate_policies(2, &[info(P2)], false);

        assert!(tree.is_empty());
    }

    #[test]
    fn test_inhibited_any_policy_is_not_expanded() {
        let mut tree = PolicyTree::new();
        tree.process_certificate_policies(1, &[info(P1)], false);
        tree.process_certificate_policies(2, &[info(ANY_POLICY)], false);
        assert!(tree.is_empty());

        let mut tree = PolicyTree::new();
        tree.process_certificate_policies(1, &[info(P1)], false);
        tree.process_certificate_policies(2, &[info(ANY_POLICY)], true);
        assert_eq!(tree.valid_policies_at(2), BTreeSet::from([P1.to_string()]));
    }

    #[test]
    fn test_mapping_rewrites_expected_policies() {
        let mut tree = PolicyTree::new();
        tree.process_certificate_policies(1, &[info(P1)], false);
        tree.apply_mappings(1, &[(P1.to_string(), BTreeSet::from([P3.to_string()]))], true, None);
        tree.process_certificate_policies(2, &[info(P3)], false);

        assert_eq!(tree.valid_policies_at(2), BTreeSet::from([P3.to_string()]));
    }

    #[test]
    fn test_inhibited_mapping_deletes_mapped_nodes() {
        let mut tree = PolicyTree::new();
        tree.process_certificate_policies(1, &[info(P1)], false);
        tree.apply_mappings(1, &[(P1.to_string(), BTreeSet::from([P3.to_string()]))], false, None);

        assert!(tree.is_empty());
    }

    #[test]
    fn test_intersection_keeps_only_initial_policies() {
        let mut tree = PolicyTree::new();
        tree.process_certificate_policies(1, &[info(P1), info(P2)], false);
        tree.intersect(1, &BTreeSet::from([P2.to_string()]));

        assert_eq!(tree.valid_policies_at(1), BTreeSet::from([P2.to_string()]));
    }

    #[test]
    fn test_intersection_expands_any_policy_leaf() {
        let mut tree = PolicyTree::new();
        tree.process_certificate_policies(1, &[info(ANY_POLICY)], true);
        tree.intersect(1, &BTreeSet::from([P3.to_string()]));

        assert_eq!(tree.valid_policies_at(1), BTreeSet::from([P3.to_string()]));
    }

    #[test]
    fn test_remove_deletes_subtree() {
        let mut tree = PolicyTree::new();
        tree.process_certificate_policies(1, &[info(P1)], false);
        tree.process_certificate_policies(2, &[info(P1)], false);
        let first = tree.at_depth(1)[0];

        tree.remove(first);
        assert!(tree.at_depth(2).is_empty());
        assert_eq!(tree.nodes().count(), 1);
    }
}
