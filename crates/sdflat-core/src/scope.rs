//! Name lookup across nested models.
//!
//! A reference such as `arm::gripper::finger` is resolved relative to the
//! model it is written in: each `::` segment descends one submodel. Bare
//! names only match entities owned directly by the starting model.

use crate::model::{qualify, JointId, LinkId, ModelId, ModelTree};

impl ModelTree {
    /// Resolve `qualified_name` to a link owned by `model` or one of its
    /// submodels. `prefix` is the scope path from the original starting
    /// model down to `model`; callers pass `""`.
    ///
    /// The first match in declaration order wins.
    pub fn resolve_link(&self, model: ModelId, qualified_name: &str, prefix: &str) -> Option<LinkId> {
        let m = self.model(model);
        if let Some(&found) = m
            .links()
            .iter()
            .find(|&&id| qualify(prefix, &self.link(id).name) == qualified_name)
        {
            return Some(found);
        }
        m.submodels().iter().find_map(|&sub| {
            let sub_prefix = qualify(prefix, &self.model(sub).name);
            self.resolve_link(sub, qualified_name, &sub_prefix)
        })
    }

    /// Resolve `qualified_name` to a joint, with the same scoping rules as
    /// [`ModelTree::resolve_link`].
    pub fn resolve_joint(&self, model: ModelId, qualified_name: &str, prefix: &str) -> Option<JointId> {
        let m = self.model(model);
        if let Some(&found) = m
            .joints()
            .iter()
            .find(|&&id| qualify(prefix, &self.joint(id).name) == qualified_name)
        {
            return Some(found);
        }
        m.submodels().iter().find_map(|&sub| {
            let sub_prefix = qualify(prefix, &self.model(sub).name);
            self.resolve_joint(sub, qualified_name, &sub_prefix)
        })
    }
}
