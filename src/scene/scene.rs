use crate::render::{MeshHandle, RenderBackend};

use super::object::{PartKind, SceneObject, WardrobeSide};

/// Ordered collection of scene objects
///
/// An object's position in the sequence is its picking ID. Removing an object
/// shifts every later ID down by one, so every removal bumps [`Scene::revision`]
/// and callers holding indices must drop them.
#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
    retired: Vec<MeshHandle>,
    revision: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an object and returns its picking ID.
    pub fn add_object(&mut self, object: SceneObject) -> usize {
        let id = self.objects.len();
        self.objects.push(object);
        id
    }

    /// Erases the object at `index`, shifting later IDs down.
    ///
    /// The object's mesh is queued for release; the returned object no longer owns it.
    pub fn remove_at(&mut self, index: usize) -> Option<SceneObject> {
        if index >= self.objects.len() {
            return None;
        }

        let mut object = self.objects.remove(index);
        if let Some(mesh) = object.take_mesh() {
            self.retired.push(mesh);
        }
        self.revision += 1;
        Some(object)
    }

    /// Removes `others` from the highest index down, then `last` at its shifted position.
    ///
    /// Returns how many objects were removed.
    pub fn remove_many(&mut self, others: &[usize], last: usize) -> usize {
        let mut sorted: Vec<usize> = others
            .iter()
            .copied()
            .filter(|&i| i != last && i < self.objects.len())
            .collect();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();

        let mut removed = 0;
        for index in &sorted {
            if self.remove_at(*index).is_some() {
                removed += 1;
            }
        }

        let shift = sorted.iter().filter(|&&i| i < last).count();
        if self.remove_at(last - shift).is_some() {
            removed += 1;
        }
        removed
    }

    pub fn clear(&mut self) {
        for mut object in self.objects.drain(..) {
            if let Some(mesh) = object.take_mesh() {
                self.retired.push(mesh);
            }
        }
        self.revision += 1;
    }

    pub fn get(&self, index: usize) -> Option<&SceneObject> {
        self.objects.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut SceneObject> {
        self.objects.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SceneObject> {
        self.objects.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Incremented on every structural mutation that renumbers objects.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_valid_id(&self, id: usize) -> bool {
        id < self.objects.len()
    }

    /// Index of the generated wardrobe side, if present.
    pub fn find_side(&self, side: WardrobeSide) -> Option<usize> {
        self.objects
            .iter()
            .position(|o| o.part().map(|p| p.kind) == Some(PartKind::Edge(side)))
    }

    pub fn object_names(&self) -> Vec<String> {
        self.objects.iter().map(|o| o.name.clone()).collect()
    }

    /// Mesh handles of removed objects that have not been released yet.
    pub fn drain_retired(&mut self) -> Vec<MeshHandle> {
        std::mem::take(&mut self.retired)
    }

    /// Releases retired meshes and uploads meshes for objects that lack one.
    pub fn sync_meshes<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        for mesh in self.drain_retired() {
            backend.release_mesh(mesh);
        }

        for object in self.objects.iter_mut().filter(|o| !o.has_mesh()) {
            let handle = backend.upload_mesh(&object.mesh_data());
            if let Some(stale) = object.attach_mesh(handle) {
                backend.release_mesh(stale);
            }
        }
    }

    /// Commits pending translations, then advances every object's transform.
    pub fn update_transforms(&mut self, dt: f32) {
        for object in self.objects.iter_mut() {
            object.apply_pending_translation();
            object.update_transform(dt);
        }
    }

    pub fn statistics(&self) -> SceneStatistics {
        SceneStatistics {
            object_count: self.objects.len(),
            enabled_count: self.objects.iter().filter(|o| o.flags.enabled).count(),
            wardrobe_parts: self.objects.iter().filter(|o| o.part().is_some()).count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneStatistics {
    pub object_count: usize,
    pub enabled_count: usize,
    pub wardrobe_parts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessBackend;
    use cgmath::Vector3;

    fn ball(name: &str, x: f32) -> SceneObject {
        SceneObject::new_sphere(name, Vector3::new(x, 0.0, 0.0), 1.0)
    }

    fn scene_of(n: usize) -> Scene {
        let mut scene = Scene::new();
        for i in 0..n {
            scene.add_object(ball(&format!("obj{i}"), i as f32));
        }
        scene
    }

    #[test]
    fn test_add_returns_previous_length() {
        let mut scene = Scene::new();
        assert_eq!(scene.add_object(ball("a", 0.0)), 0);
        assert_eq!(scene.add_object(ball("b", 1.0)), 1);
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn test_remove_shifts_later_ids() {
        let n = 6;
        for k in 0..n {
            let mut scene = scene_of(n);
            let before = scene.revision();
            let removed = scene.remove_at(k).unwrap();
            assert_eq!(removed.name, format!("obj{k}"));
            assert_eq!(scene.len(), n - 1);
            assert!(scene.revision() > before);

            for old in (0..n).filter(|&i| i != k) {
                let new = old - usize::from(old > k);
                assert_eq!(scene.get(new).unwrap().name, format!("obj{old}"));
            }
        }
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let mut scene = scene_of(2);
        let rev = scene.revision();
        assert!(scene.remove_at(2).is_none());
        assert_eq!(scene.revision(), rev);
    }

    #[test]
    fn test_remove_many_removes_last_at_shifted_index() {
        let mut scene = scene_of(6);
        let removed = scene.remove_many(&[1, 4, 4], 3);
        assert_eq!(removed, 3);
        assert_eq!(scene.object_names(), vec!["obj0", "obj2", "obj5"]);
    }

    #[test]
    fn test_meshes_released_exactly_once() {
        let mut backend = HeadlessBackend::new(64, 64);
        let mut scene = scene_of(3);

        scene.sync_meshes(&mut backend);
        assert_eq!(backend.live_mesh_count(), 3);

        scene.remove_at(1);
        scene.sync_meshes(&mut backend);
        assert_eq!(backend.live_mesh_count(), 2);
        assert_eq!(backend.released_mesh_count(), 1);

        scene.sync_meshes(&mut backend);
        assert_eq!(backend.released_mesh_count(), 1);

        scene.clear();
        scene.sync_meshes(&mut backend);
        assert_eq!(backend.live_mesh_count(), 0);
        assert_eq!(backend.released_mesh_count(), 3);
    }
}
