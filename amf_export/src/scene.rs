//! Host scene handed to the exporter: a forest of named objects with local
//! transforms, visibility state and optional geometry.

use std::sync::Arc;

use common::config::Selection;
use nalgebra::Matrix4;

use crate::{
    error::{Error, Result},
    geometry::Geometry,
};

/// Index of an object in the [`Scene`] that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

#[derive(Default)]
pub struct Scene {
    pub name: String,
    objects: Vec<SceneObject>,
}

#[derive(Clone)]
pub struct SceneObject {
    pub name: String,
    pub parent: Option<ObjectId>,
    /// Transform relative to the parent, or to the world for root objects.
    pub transform: Matrix4<f64>,
    /// Objects without geometry (empties) only structure the scene.
    pub geometry: Option<Arc<dyn Geometry>>,
    pub visibility: Visibility,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    /// Currently shown in the viewport.
    pub visible: bool,
    /// Not disabled in viewports.
    pub viewable: bool,
    /// Not disabled in renders.
    pub renderable: bool,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
        }
    }

    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Every object in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        (self.objects.iter().enumerate()).map(|(i, x)| (ObjectId(i), x))
    }

    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.objects().find(|(_, x)| x.name == name).map(|(id, _)| id)
    }

    /// Objects without a parent, in insertion order.
    pub fn roots(&self) -> Vec<ObjectId> {
        (self.objects())
            .filter(|(_, x)| x.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Direct children of an object, in insertion order.
    pub fn children(&self, id: ObjectId) -> Vec<ObjectId> {
        (self.objects())
            .filter(|(_, x)| x.parent == Some(id))
            .map(|(id, _)| id)
            .collect()
    }

    /// The object followed by all of its descendants, depth first.
    pub fn subtree(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            // Guards against parent cycles, which would never terminate
            if out.contains(&id) {
                continue;
            }

            out.push(id);
            stack.extend(self.children(id).into_iter().rev());
        }
        out
    }

    /// Objects picked by an export strategy, in insertion order.
    pub fn select(&self, selection: Selection) -> Vec<ObjectId> {
        (self.objects())
            .filter(|(_, x)| match selection {
                Selection::Selected => x.selected,
                Selection::Visible => x.visibility.visible,
                Selection::Viewable => x.visibility.viewable,
                Selection::Renderable => x.visibility.renderable,
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Transform from the local space of an object to world space.
    pub fn world_transform(&self, id: ObjectId) -> Result<Matrix4<f64>> {
        let mut transform = Matrix4::identity();
        let mut current = Some(id);
        let mut depth = 0;

        while let Some(id) = current {
            let object = self.get(id)?;
            transform = object.transform * transform;
            current = object.parent;

            depth += 1;
            if depth > self.objects.len() {
                let name = &self.get(id)?.name;
                return Err(Error::unsupported(name, "parent chain forms a cycle"));
            }
        }

        Ok(transform)
    }

    pub(crate) fn get(&self, id: ObjectId) -> Result<&SceneObject> {
        self.object(id).ok_or_else(|| {
            Error::unsupported(&format!("#{}", id.0), "object is not part of the scene")
        })
    }
}

impl SceneObject {
    /// A visible, unselected root object without geometry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            transform: Matrix4::identity(),
            geometry: None,
            visibility: Visibility::default(),
            selected: false,
        }
    }

    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_transform(mut self, transform: Matrix4<f64>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_geometry(mut self, geometry: Arc<dyn Geometry>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

impl Visibility {
    pub const HIDDEN: Visibility = Visibility {
        visible: false,
        viewable: false,
        renderable: false,
    };
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            visible: true,
            viewable: true,
            renderable: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use super::*;
    use crate::mesh::transform_point;

    /// root
    ///  ├ a
    ///  │ └ b
    ///  └ c
    /// lone
    fn tree() -> (Scene, [ObjectId; 5]) {
        let mut scene = Scene::new("tree");
        let root = scene.add(SceneObject::new("root"));
        let a = scene.add(SceneObject::new("a").with_parent(root).selected(true));
        let lone = scene.add(SceneObject::new("lone").with_visibility(Visibility::HIDDEN));
        let b = scene.add(SceneObject::new("b").with_parent(a).selected(true));
        let c = scene.add(SceneObject::new("c").with_parent(root));
        (scene, [root, a, b, c, lone])
    }

    #[test]
    fn hierarchy() {
        let (scene, [root, a, b, c, lone]) = tree();
        assert_eq!(scene.roots(), vec![root, lone]);
        assert_eq!(scene.children(root), vec![a, c]);
        assert_eq!(scene.subtree(root), vec![root, a, b, c]);
        assert_eq!(scene.find("c"), Some(c));
        assert_eq!(scene.find("nope"), None);
    }

    #[test]
    fn selection_strategies() {
        let (scene, [root, a, b, c, _lone]) = tree();
        assert_eq!(scene.select(Selection::Selected), vec![a, b]);
        assert_eq!(scene.select(Selection::Visible), vec![root, a, b, c]);
    }

    #[test]
    fn world_transform_stacks_parents() {
        let (mut scene, [root, a, b, ..]) = tree();
        let translate = |x| Matrix4::new_translation(&Vector3::new(x, 0.0, 0.0));
        scene.object_mut(root).unwrap().transform = translate(1.0);
        scene.object_mut(a).unwrap().transform = Matrix4::new_scaling(2.0);
        scene.object_mut(b).unwrap().transform = translate(3.0);

        // b is moved by 3 in the space of a, which is scaled by 2
        let world = scene.world_transform(b).unwrap();
        let origin = transform_point(&world, &Vector3::zeros());
        assert_eq!(origin, Vector3::new(7.0, 0.0, 0.0));
    }

    #[test]
    fn parent_cycles_are_rejected() {
        let (mut scene, [root, a, ..]) = tree();
        scene.object_mut(root).unwrap().parent = Some(a);

        assert!(matches!(
            scene.world_transform(a),
            Err(Error::UnsupportedGeometry { .. })
        ));
        assert_eq!(scene.subtree(a).len(), 4);
    }
}
