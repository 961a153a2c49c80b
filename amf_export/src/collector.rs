//! Turns the selected scene objects into world space triangle meshes and
//! bundles them into groups.

use std::collections::{HashMap, HashSet};

use common::config::Grouping;
use nalgebra::Matrix4;
use tracing::debug;

use crate::{
    error::{Error, Result},
    geometry::Geometry,
    mesh::{transform_point, Group, SourceMesh},
    scene::{ObjectId, Scene, SceneObject},
    triangulate::triangulate,
};

/// Collects the geometry of the selected objects. Duplicate ids in the
/// selection are ignored and objects without geometry are skipped, groups
/// left without any mesh are not returned.
pub fn collect(scene: &Scene, selection: &[ObjectId], grouping: Grouping) -> Result<Vec<Group>> {
    if selection.is_empty() {
        return Err(Error::EmptySelection);
    }

    let mut seen = HashSet::new();
    let selection = (selection.iter().copied())
        .filter(|x| seen.insert(*x))
        .collect::<Vec<_>>();

    // Also rejects unknown ids and parent cycles up front
    let transforms = (selection.iter())
        .map(|&id| Ok((id, scene.world_transform(id)?)))
        .collect::<Result<HashMap<_, _>>>()?;

    let mut groups = Vec::new();
    for (name, members) in group_objects(scene, &selection, grouping) {
        let mut meshes = Vec::new();
        for id in members {
            let object = scene.get(id)?;
            let Some(geometry) = &object.geometry else {
                debug!("Skipping `{}`, it has no geometry", object.name);
                continue;
            };

            let mesh = source_mesh(&object.name, geometry.as_ref(), &transforms[&id])?;
            debug!(
                "Collected `{}` with {} vertices and {} triangles",
                object.name,
                mesh.vertex_count(),
                mesh.triangle_count()
            );
            meshes.push(mesh);
        }

        if meshes.is_empty() {
            debug!("Skipping group `{name}`, none of its objects have geometry");
            continue;
        }

        groups.push(Group::new(name, meshes));
    }

    Ok(groups)
}

/// Triangulated world space mesh of one object.
fn source_mesh(name: &str, geometry: &dyn Geometry, transform: &Matrix4<f64>) -> Result<SourceMesh> {
    let polygons = geometry.polygons();
    if polygons.is_empty() {
        return Err(Error::unsupported(name, "mesh has no vertices"));
    }

    let mut triangles = Vec::with_capacity(polygons.triangle_count());
    for (i, face) in polygons.faces.iter().enumerate() {
        triangulate(face, &polygons.vertices, &mut triangles)
            .map_err(|reason| Error::unsupported(name, format!("face {i}: {reason}")))?;
    }

    let vertices = (polygons.vertices.iter())
        .map(|x| transform_point(transform, x))
        .collect();
    Ok(SourceMesh::new(name, vertices, triangles))
}

/// Names and members of each group, members in selection or tree order.
fn group_objects(
    scene: &Scene,
    selection: &[ObjectId],
    grouping: Grouping,
) -> Vec<(String, Vec<ObjectId>)> {
    let name = |id: ObjectId| scene.object(id).map(|x| x.name.clone()).unwrap_or_default();
    let selected = selection.iter().copied().collect::<HashSet<_>>();

    match grouping {
        Grouping::ParentsAny => parent_groups(scene, &selected, |_, _| true),
        Grouping::ParentsVisible => parent_groups(scene, &selected, |_, x| x.visibility.visible),
        Grouping::ParentsViewable => parent_groups(scene, &selected, |_, x| x.visibility.viewable),
        Grouping::ParentsRenderable => {
            parent_groups(scene, &selected, |_, x| x.visibility.renderable)
        }
        Grouping::ParentsSelected => parent_groups(scene, &selected, |id, _| selected.contains(&id)),
        Grouping::All => vec![("all".to_owned(), selection.to_vec())],
        Grouping::PerObject => selection.iter().map(|&x| (name(x), vec![x])).collect(),
    }
}

/// Walks the scene tree from its roots. The first object accepted on each
/// branch forms a group with every selected object under it. Selected objects
/// above any accepted one are exported on their own.
fn parent_groups(
    scene: &Scene,
    selected: &HashSet<ObjectId>,
    accept: impl Fn(ObjectId, &SceneObject) -> bool,
) -> Vec<(String, Vec<ObjectId>)> {
    let mut groups = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = scene.roots().into_iter().rev().collect::<Vec<_>>();

    while let Some(id) = stack.pop() {
        let Some(object) = scene.object(id) else {
            continue;
        };

        if !visited.insert(id) {
            continue;
        }

        if accept(id, object) {
            let subtree = scene.subtree(id);
            let members = (subtree.iter().copied())
                .filter(|x| selected.contains(x))
                .collect::<Vec<_>>();
            visited.extend(subtree);

            if !members.is_empty() {
                groups.push((object.name.clone(), members));
            }
        } else {
            if selected.contains(&id) {
                groups.push((object.name.clone(), vec![id]));
            }

            stack.extend(scene.children(id).into_iter().rev());
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use nalgebra::Vector3;

    use super::*;
    use crate::{
        builder::MeshBuilder,
        geometry::{Instance, Polygons},
        scene::Visibility,
        Pos,
    };

    fn cube() -> Arc<dyn Geometry> {
        let mut builder = MeshBuilder::new();
        builder.add_box(Pos::zeros(), Pos::repeat(1.0));
        Arc::new(builder.build())
    }

    /// base (empty, hidden)
    ///  ├ left (cube)
    ///  └ arm (empty)
    ///     └ hand (cube)
    /// prop (cube)
    fn workshop() -> (Scene, [ObjectId; 5]) {
        let mut scene = Scene::new("workshop");
        let base = scene.add(SceneObject::new("base").with_visibility(Visibility {
            visible: false,
            ..Default::default()
        }));
        let left = scene.add(
            SceneObject::new("left")
                .with_parent(base)
                .with_geometry(cube())
                .selected(true),
        );
        let arm = scene.add(SceneObject::new("arm").with_parent(base).selected(true));
        let hand = scene.add(
            SceneObject::new("hand")
                .with_parent(arm)
                .with_geometry(cube())
                .with_transform(Matrix4::new_translation(&Vector3::new(0.0, 0.0, 2.0)))
                .selected(true),
        );
        let prop = scene.add(SceneObject::new("prop").with_geometry(cube()).selected(true));
        (scene, [base, left, arm, hand, prop])
    }

    fn summary(groups: &[Group]) -> Vec<(&str, Vec<&str>)> {
        (groups.iter())
            .map(|x| (x.name.as_str(), x.meshes.iter().map(SourceMesh::name).collect()))
            .collect()
    }

    #[test]
    fn empty_selection() {
        let (scene, _) = workshop();
        assert!(matches!(
            collect(&scene, &[], Grouping::All),
            Err(Error::EmptySelection)
        ));
    }

    #[test]
    fn parent_grouping() {
        let (scene, _) = workshop();
        let selection = scene.select(common::config::Selection::Selected);

        let groups = collect(&scene, &selection, Grouping::ParentsAny).unwrap();
        assert_eq!(
            summary(&groups),
            vec![("base", vec!["left", "hand"]), ("prop", vec!["prop"])]
        );

        // The hidden base no longer counts, arm is the topmost visible parent
        let groups = collect(&scene, &selection, Grouping::ParentsVisible).unwrap();
        assert_eq!(
            summary(&groups),
            vec![
                ("left", vec!["left"]),
                ("arm", vec!["hand"]),
                ("prop", vec!["prop"])
            ]
        );

        let visible = groups;
        let groups = collect(&scene, &selection, Grouping::ParentsSelected).unwrap();
        assert_eq!(summary(&groups), summary(&visible));
    }

    #[test]
    fn flat_grouping() {
        let (scene, [_, left, arm, hand, prop]) = workshop();
        let selection = [prop, left, prop, arm, hand];

        let groups = collect(&scene, &selection, Grouping::All).unwrap();
        assert_eq!(summary(&groups), vec![("all", vec!["prop", "left", "hand"])]);

        // The arm has no geometry, so its group disappears
        let groups = collect(&scene, &selection, Grouping::PerObject).unwrap();
        assert_eq!(
            summary(&groups),
            vec![
                ("prop", vec!["prop"]),
                ("left", vec!["left"]),
                ("hand", vec!["hand"])
            ]
        );
    }

    #[test]
    fn meshes_are_in_world_space() {
        let (scene, [_, _, _, hand, _]) = workshop();
        let groups = collect(&scene, &[hand], Grouping::PerObject).unwrap();

        let mesh = &groups[0].meshes[0];
        assert_eq!(mesh.transform(), &Matrix4::identity());
        assert_eq!(mesh.bounds(), (Pos::new(0.0, 0.0, 2.0), Pos::new(1.0, 1.0, 3.0)));
        // Six quads, two triangles each
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn instances_are_collected() {
        let mut scene = Scene::new("instances");
        let source = cube();
        let offset = Matrix4::new_translation(&Vector3::new(5.0, 0.0, 0.0));
        let copy = scene.add(
            SceneObject::new("copy")
                .with_geometry(Arc::new(Instance::new(source, offset)))
                .selected(true),
        );

        let groups = collect(&scene, &[copy], Grouping::PerObject).unwrap();
        assert_eq!(groups[0].meshes[0].bounds().0, Pos::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn unsupported_geometry() {
        let mut scene = Scene::new("broken");
        let empty = scene.add(
            SceneObject::new("nothing").with_geometry(Arc::new(Polygons::default())),
        );
        let line = scene.add(SceneObject::new("line").with_geometry(Arc::new(Polygons::new(
            vec![Pos::zeros(), Pos::x()],
            vec![vec![0, 1]],
        ))));

        for id in [empty, line] {
            let name = scene.object(id).unwrap().name.clone();
            assert!(matches!(
                collect(&scene, &[id], Grouping::PerObject),
                Err(Error::UnsupportedGeometry { object, .. }) if object == name
            ));
        }
    }
}
