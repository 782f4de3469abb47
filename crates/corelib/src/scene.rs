//! Flat list of model instances drawn each frame.

use crate::transform::Transform;

/// Index of a loaded model in the renderer's model list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModelId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneInstance {
    pub model: ModelId,
    pub transform: Transform,
}

/// Instances in insertion order. Several instances may share one model.
#[derive(Default, Debug)]
pub struct Scene {
    instances: Vec<SceneInstance>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, model: ModelId, transform: Transform) -> usize {
        self.instances.push(SceneInstance { model, transform });
        self.instances.len() - 1
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instances(&self) -> &[SceneInstance] {
        &self.instances
    }
}
