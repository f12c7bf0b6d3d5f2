use glam::{Mat4, Quat, Vec3};
use std::collections::HashMap;

use crate::color::Rgba;
use crate::model::{Buffers, Model};
use crate::scene_graph::object3d::{Object3D, ObjectId};
use crate::scene_graph::scene_model::{Recolorable, SceneModel, SceneModelId};

/// Id-keyed scene graph. "Attached" means reachable from a root.
/// Removal deletes the subtree and its mesh entries outright, so
/// repeated reloads cannot accumulate stale data. Ids count up and are
/// never reused.
pub struct Scene {
    pub objects: HashMap<ObjectId, Object3D>,
    pub models: HashMap<SceneModelId, SceneModel>,
    roots: Vec<ObjectId>,
    next_object: u64,
    next_model: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            models: HashMap::new(),
            roots: Vec::new(),
            next_object: 0,
            next_model: 0,
        }
    }

    fn alloc_object(&mut self, object: Object3D) -> ObjectId {
        let id = ObjectId(self.next_object);
        self.next_object += 1;
        self.objects.insert(id, object);
        id
    }

    pub fn add_root_object(&mut self, object: Object3D) -> ObjectId {
        let id = self.alloc_object(object);
        self.roots.push(id);
        id
    }

    fn add_child_object(&mut self, mut object: Object3D, parent: ObjectId) -> ObjectId {
        object.parent_id = Some(parent);
        let id = self.alloc_object(object);
        if let Some(parent) = self.objects.get_mut(&parent) {
            parent.child_ids.push(id);
        }
        id
    }

    pub fn add_model(&mut self, model: SceneModel) -> SceneModelId {
        let id = SceneModelId(self.next_model);
        self.next_model += 1;
        self.models.insert(id, model);
        id
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(&id)
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Option<&mut Object3D> {
        self.objects.get_mut(&id)
    }

    /// Ids of every attached object, depth first from the roots.
    pub fn attached_ids(&self) -> Vec<ObjectId> {
        let mut ids = Vec::new();
        let mut stack: Vec<ObjectId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Some(object) = self.objects.get(&id) {
                ids.push(id);
                stack.extend(object.child_ids.iter().rev().copied());
            }
        }
        ids
    }

    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.attached_ids()
            .into_iter()
            .find(|id| self.objects[id].name == name)
    }

    /// Deletes the named subtree, including its mesh entries. Absence is
    /// not an error; returns whether anything was removed.
    pub fn remove_object_by_name(&mut self, name: &str) -> bool {
        let Some(id) = self.get_object_by_name(name) else {
            return false;
        };

        let parent_id = self.objects[&id].parent_id;
        match parent_id {
            Some(parent_id) => {
                if let Some(parent) = self.objects.get_mut(&parent_id) {
                    parent.child_ids.retain(|&child| child != id);
                }
            }
            None => self.roots.retain(|&root| root != id),
        }

        for id in self.subtree_ids(id) {
            if let Some(object) = self.objects.remove(&id) {
                if let Some(model_id) = object.model_id {
                    self.models.remove(&model_id);
                }
            }
        }

        true
    }

    fn subtree_ids(&self, root: ObjectId) -> Vec<ObjectId> {
        let mut ids = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(object) = self.objects.get(&id) {
                ids.push(id);
                stack.extend(object.child_ids.iter().copied());
            }
        }
        ids
    }

    /// Rewrites the base color of every mesh-bearing node under `root`.
    pub fn set_subtree_color(&mut self, root: ObjectId, color: Rgba) {
        for id in self.subtree_ids(root) {
            if let Some(model_id) = self.objects[&id].model_id {
                if let Some(scene_model) = self.models.get_mut(&model_id) {
                    scene_model.set_base_color(color);
                }
            }
        }
    }

    /// Spawns a parsed glTF scene under a fresh root named `root_name`.
    /// Returns the root id and the glTF node index → object id map the
    /// animation clips target.
    pub fn spawn_gltf_scene(
        &mut self,
        buffers: Buffers,
        scene: &gltf::Scene,
        root_name: &str,
    ) -> anyhow::Result<(ObjectId, HashMap<usize, ObjectId>)> {
        let root_id = self.add_root_object(Object3D::named(root_name));
        let mut node_map = HashMap::new();
        let mut mesh_to_model = HashMap::new();

        for node in scene.nodes() {
            self.spawn_gltf_node(buffers, &node, root_id, &mut node_map, &mut mesh_to_model)?;
        }

        Ok((root_id, node_map))
    }

    fn spawn_gltf_node(
        &mut self,
        buffers: Buffers,
        node: &gltf::Node,
        parent: ObjectId,
        node_map: &mut HashMap<usize, ObjectId>,
        mesh_to_model: &mut HashMap<usize, SceneModelId>,
    ) -> anyhow::Result<ObjectId> {
        let node_name = node.name().unwrap_or("Unnamed").to_string();
        let mut object = Object3D::named(node_name.clone());

        let (translation, rotation, scale) = node.transform().decomposed();
        object.transform.set_transform(
            translation.into(),
            Quat::from_array(rotation),
            scale[0], // Assume uniform scale for simplicity
        );

        if let Some(mesh) = node.mesh() {
            let mesh_index = mesh.index();

            let model_id = match mesh_to_model.get(&mesh_index).copied() {
                Some(model_id) => model_id,
                None => {
                    let mesh_name = mesh
                        .name()
                        .map(String::from)
                        .unwrap_or_else(|| format!("{} (Mesh)", node_name));

                    let model = Model::from_gltf(mesh_name, mesh, buffers)?;
                    let model_id = self.add_model(SceneModel::new(model));
                    mesh_to_model.insert(mesh_index, model_id);
                    model_id
                }
            };

            object.model_id = Some(model_id);
        }

        let object_id = self.add_child_object(object, parent);
        node_map.insert(node.index(), object_id);

        for child in node.children() {
            self.spawn_gltf_node(buffers, &child, object_id, node_map, mesh_to_model)?;
        }

        Ok(object_id)
    }

    pub fn set_object_translation(&mut self, object_id: ObjectId, translation: Vec3) {
        if let Some(object) = self.objects.get_mut(&object_id) {
            object.transform.set_translation(translation);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    pub fn set_object_rotation(&mut self, object_id: ObjectId, rotation: Quat) {
        if let Some(object) = self.objects.get_mut(&object_id) {
            object.transform.set_rotation(rotation);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    pub fn set_object_scale(&mut self, object_id: ObjectId, scale: f32) {
        if let Some(object) = self.objects.get_mut(&object_id) {
            object.transform.set_scale(scale);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    fn invalidate_object_hierarchy(&self, object_id: ObjectId) {
        if let Some(object) = self.objects.get(&object_id) {
            object.transform.invalidate_world();

            for &child_id in &object.child_ids {
                self.invalidate_object_hierarchy(child_id);
            }
        }
    }

    /// Recomputes world matrices for every attached object whose cache
    /// went stale since the last frame.
    pub fn update_world_transforms(&self) {
        for &root_id in &self.roots {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY);
        }
    }

    fn update_object_transform_recursive(&self, object_id: ObjectId, parent_world_matrix: Mat4) {
        if let Some(object) = self.objects.get(&object_id) {
            if object.transform.is_world_dirty() {
                let local_matrix = *object.transform.get_local_matrix();
                object
                    .transform
                    .set_world_matrix(parent_world_matrix * local_matrix);
            }

            let world_matrix = *object.transform.get_world_matrix();
            for &child_id in &object.child_ids {
                self.update_object_transform_recursive(child_id, world_matrix);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    fn empty_model(name: &str) -> Model {
        Model {
            name: name.to_string(),
            primitives: Vec::new(),
            base_color: Rgba::WHITE,
        }
    }

    fn spawn_named_model(scene: &mut Scene, name: &str) -> ObjectId {
        let model_id = scene.add_model(SceneModel::new(empty_model(name)));
        let root = scene.add_root_object(Object3D::named(name));
        let mut child = Object3D::named(format!("{} (Mesh)", name));
        child.model_id = Some(model_id);
        scene.add_child_object(child, root);
        root
    }

    fn count_attached_named(scene: &Scene, name: &str) -> usize {
        scene
            .attached_ids()
            .into_iter()
            .filter(|id| scene.objects[id].name == name)
            .count()
    }

    #[test]
    fn remove_then_insert_keeps_one_object_per_name() {
        let mut scene = Scene::new();
        spawn_named_model(&mut scene, "Bugdroid");
        assert_eq!(count_attached_named(&scene, "Bugdroid"), 1);

        assert!(scene.remove_object_by_name("Bugdroid"));
        assert_eq!(count_attached_named(&scene, "Bugdroid"), 0);

        spawn_named_model(&mut scene, "Bugdroid");
        assert_eq!(count_attached_named(&scene, "Bugdroid"), 1);
    }

    #[test]
    fn removing_absent_name_is_not_an_error() {
        let mut scene = Scene::new();
        assert!(!scene.remove_object_by_name("Nothing"));
    }

    #[test]
    fn removal_drops_subtree_objects_and_meshes() {
        let mut scene = Scene::new();
        spawn_named_model(&mut scene, "Bugdroid");
        scene.remove_object_by_name("Bugdroid");

        assert!(scene.objects.is_empty());
        assert!(scene.models.is_empty());
    }

    #[test]
    fn repeated_reloads_do_not_accumulate_entries() {
        let mut scene = Scene::new();
        for _ in 0..100 {
            spawn_named_model(&mut scene, "Bugdroid");
            scene.remove_object_by_name("Bugdroid");
        }
        assert!(scene.objects.is_empty());
        assert!(scene.models.is_empty());
    }

    #[test]
    fn ids_are_not_reused_across_removal() {
        let mut scene = Scene::new();
        let first = spawn_named_model(&mut scene, "Bugdroid");
        scene.remove_object_by_name("Bugdroid");
        let second = spawn_named_model(&mut scene, "Bugdroid");
        assert_ne!(first, second);
    }

    #[test]
    fn subtree_recolor_hits_every_mesh_bearing_node() {
        let mut scene = Scene::new();
        let root = spawn_named_model(&mut scene, "Bugdroid");
        let second_model = scene.add_model(SceneModel::new(empty_model("arm")));
        let mut arm = Object3D::named("arm");
        arm.model_id = Some(second_model);
        scene.add_child_object(arm, root);

        let magenta = Rgba::new(1.0, 0.0, 1.0, 1.0);
        scene.set_subtree_color(root, magenta);

        for scene_model in scene.models.values() {
            assert_eq!(scene_model.model.base_color, magenta);
        }
    }

    #[test]
    fn world_transforms_compose_through_parents() {
        let mut scene = Scene::new();
        let root = scene.add_root_object(Object3D::named("root"));
        let child = scene.add_child_object(Object3D::named("child"), root);

        scene.set_object_translation(root, Vec3::new(0.0, 2.0, 0.0));
        scene.set_object_translation(child, Vec3::new(1.0, 0.0, 0.0));
        scene.update_world_transforms();

        let world = *scene.objects[&child].transform.get_world_matrix();
        let position = world.transform_point3(Vec3::ZERO);
        assert!((position - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-6);
    }
}
