//! Kinematic tree reconstruction
//!
//! Joints name their parent and child links by scoped reference. This pass
//! resolves those references into link/joint back-references and walks
//! child-to-parent from an arbitrary link until it reaches the one link that
//! has no parent joint: the root.

use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

use crate::error::{Result, SdfError};
use crate::model::{qualify, LinkId, ModelId, ModelTree};

/// Which end of a joint a reference belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Parent,
    Child,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Parent => f.write_str("parent"),
            Endpoint::Child => f.write_str("child"),
        }
    }
}

/// A joint endpoint whose link reference did not resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    /// Flat name of the joint
    pub joint: String,
    pub endpoint: Endpoint,
    /// Reference as authored
    pub reference: String,
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "joint '{}' {} link '{}' does not exist",
            self.joint, self.endpoint, self.reference
        )
    }
}

impl ModelTree {
    /// Resolve and record both endpoints of every joint of `model` and,
    /// recursively, of its submodels.
    ///
    /// Resolution starts at the joint's own model, so a joint can only reach
    /// links of that model and its submodels. Unresolved endpoints leave the
    /// back-reference empty and are returned to the caller.
    pub fn link_endpoints(&mut self, model: ModelId) -> Result<Vec<UnresolvedReference>> {
        let mut unresolved = Vec::new();

        for jid in self.model(model).joints().to_vec() {
            let joint = self.joint(jid);
            let parent = self.resolve_link(model, &joint.parent, "");
            let child = self.resolve_link(model, &joint.child, "");

            for (endpoint, resolved, reference) in [
                (Endpoint::Parent, parent, &joint.parent),
                (Endpoint::Child, child, &joint.child),
            ] {
                if resolved.is_none() {
                    let missing = UnresolvedReference {
                        joint: self.joint_flat_name(jid),
                        endpoint,
                        reference: reference.clone(),
                    };
                    warn!(joint = %missing.joint, %endpoint, reference = %missing.reference, "Unresolved link reference");
                    unresolved.push(missing);
                }
            }

            if let Some(child) = child {
                if let Some(existing) = self.link(child).tree_parent_joint {
                    return Err(SdfError::MultipleParentJoints {
                        link: self.link_flat_name(child),
                        first: self.joint_flat_name(existing),
                        second: self.joint_flat_name(jid),
                    });
                }
                self.link_mut(child).tree_parent_joint = Some(jid);
            }
            if let Some(parent) = parent {
                self.link_mut(parent).tree_child_joints.push(jid);
            }

            let joint = self.joint_mut(jid);
            joint.tree_parent_link = parent;
            joint.tree_child_link = child;
        }

        for sub in self.model(model).submodels().to_vec() {
            unresolved.extend(self.link_endpoints(sub)?);
        }
        Ok(unresolved)
    }

    /// Find the parent link of the link named `link_name`.
    ///
    /// `link_name` is scoped relative to the model the search started in and
    /// `prefix` is the path from that model down to `model`. Joints of
    /// `model` are checked first, then its submodels, then, when the search
    /// is still at its starting scope, the parent model. `visited` holds the
    /// models already searched.
    pub fn find_parent(
        &self,
        model: ModelId,
        link_name: &str,
        prefix: &str,
        visited: &mut HashSet<ModelId>,
    ) -> Option<LinkId> {
        if !visited.insert(model) {
            return None;
        }
        let m = self.model(model);

        for &jid in m.joints() {
            let joint = self.joint(jid);
            if qualify(prefix, &joint.child) == link_name {
                return joint.tree_parent_link;
            }
        }

        for &sub in m.submodels() {
            let sub_prefix = qualify(prefix, &self.model(sub).name);
            if let Some(found) = self.find_parent(sub, link_name, &sub_prefix, visited) {
                return Some(found);
            }
        }

        // Descending searches came from the parent, which is already visited
        match m.parent() {
            Some(parent) if prefix.is_empty() => {
                self.find_parent(parent, &qualify(&m.name, link_name), "", visited)
            }
            _ => None,
        }
    }

    /// Walk parent links from the first link of `model` until a link with no
    /// parent is reached. Returns `None` when `model` owns no link itself,
    /// even if its submodels do.
    pub fn find_root(&self, model: ModelId) -> Result<Option<LinkId>> {
        let Some(&start) = self.model(model).links().first() else {
            return Ok(None);
        };

        let mut current = start;
        let mut seen = HashSet::from([start]);
        loop {
            let Some(name) = self.relative_link_name(model, current) else {
                return Ok(Some(current));
            };
            match self.find_parent(model, &name, "", &mut HashSet::new()) {
                Some(parent) => {
                    if !seen.insert(parent) {
                        return Err(SdfError::JointCycle {
                            link: self.link_flat_name(parent),
                        });
                    }
                    current = parent;
                }
                None => return Ok(Some(current)),
            }
        }
    }

    /// Build the kinematic tree of the whole document: resolve every joint's
    /// endpoints and cache the root link on the top-level model.
    pub fn build_tree(&mut self) -> Result<Vec<UnresolvedReference>> {
        let top = self.root();
        let unresolved = self.link_endpoints(top)?;
        let root_link = self.find_root(top)?;
        match root_link {
            Some(link) => info!(model = %self.name(), root = %self.link_flat_name(link), "Found root link"),
            None => warn!(model = %self.name(), "Top-level model has no link of its own, root is undetermined"),
        }
        self.model_mut(top).root_link = root_link;
        Ok(unresolved)
    }
}
