//! World-frame pose propagation

use crate::model::{ModelId, ModelTree};
use crate::pose::Transform;

impl ModelTree {
    /// Compute `pose_world` for every model, link, and joint, starting at
    /// the top-level model with an identity ambient frame.
    pub fn calculate_absolute_pose(&mut self) {
        let top = self.root();
        self.propagate(top, &Transform::identity());
    }

    fn propagate(&mut self, model: ModelId, ambient: &Transform) {
        let model_world = ambient * self.model(model).pose;
        self.model_mut(model).pose_world = Some(model_world);

        for lid in self.model(model).links().to_vec() {
            let link = self.link_mut(lid);
            link.pose_world = Some(model_world * link.pose);
        }

        // Joint poses are authored in the child link's frame. A joint whose
        // child did not resolve is placed in the model frame.
        for jid in self.model(model).joints().to_vec() {
            let child_pose = self
                .joint(jid)
                .tree_child_link()
                .map(|child| self.link(child).pose)
                .unwrap_or_else(Transform::identity);
            let joint = self.joint_mut(jid);
            joint.pose_world = Some(model_world * child_pose * joint.pose);
        }

        for sub in self.model(model).submodels().to_vec() {
            self.propagate(sub, &model_world);
        }
    }
}
