use crate::color::Rgba;
use crate::model::Model;

/// Stable handle to a scene-resident mesh. Ids are never reused; the
/// entry is dropped when its owning subtree is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneModelId(pub(crate) u64);

/// Anything that carries a renderable material the color override can
/// rewrite. The recolor pass visits by capability, not by node type, so
/// alternate renderable representations stay supported.
pub trait Recolorable {
    fn set_base_color(&mut self, color: Rgba);
}

/// Scene-side mesh entry. Removed together with its owning subtree; the
/// renderer drops the GPU counterpart on its next sync.
pub struct SceneModel {
    pub model: Model,
}

impl SceneModel {
    pub fn new(model: Model) -> Self {
        Self { model }
    }
}

impl Recolorable for SceneModel {
    fn set_base_color(&mut self, color: Rgba) {
        self.model.base_color = color;
    }
}
