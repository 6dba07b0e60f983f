use crate::error::ConfigurationError;
use crate::kinematics::posed::PlacedSphere;

use nalgebra::{Matrix4, Point3, Vector3};
use std::collections::VecDeque;

/// Bone of the rest skeleton
#[derive(Clone, Debug, PartialEq)]
pub struct BoneSpec {
    pub name: String,
    /// Parent bone index, `None` for the single root
    pub parent: Option<usize>,
    /// Local transform relative to the parent in the rest pose
    pub rest_local: Matrix4<f64>,
}

impl BoneSpec {
    pub fn new(name: impl Into<String>, parent: Option<usize>, rest_local: Matrix4<f64>) -> Self {
        Self {
            name: name.into(),
            parent,
            rest_local,
        }
    }
}

/// Bounding sphere rigidly attached to a bone
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphereSpec {
    pub bone: usize,
    /// Centre in the bone's local frame
    pub offset: Vector3<f64>,
    /// Rest radius, scaled by the bone's world transform when posed
    pub radius: f64,
    /// Interpenetration group, spheres of the same group never collide with each other
    pub group: usize,
}

/// Immutable rest pose: bone hierarchy plus attached bounding spheres
///
/// Shared by every pose evaluation, candidates never write to it.
#[derive(Clone, Debug, PartialEq)]
pub struct RestSkeleton {
    bones: Vec<BoneSpec>,
    spheres: Vec<SphereSpec>,
    /// Breadth-first order starting from the root, parents always precede children
    order: Vec<usize>,
    num_groups: usize,
}

impl RestSkeleton {
    /// Create a new [RestSkeleton]
    ///
    /// # Arguments
    /// - `bones`: bones with exactly one root, every bone must be reachable from it
    /// - `spheres`: bounding spheres, each attached to an existing bone
    pub fn new(bones: Vec<BoneSpec>, spheres: Vec<SphereSpec>) -> Result<Self, ConfigurationError> {
        let mut children = vec![vec![]; bones.len()];
        let mut roots = vec![];
        for (i, bone) in bones.iter().enumerate() {
            match bone.parent {
                None => roots.push(i),
                Some(parent) if parent < bones.len() && parent != i => children[parent].push(i),
                Some(parent) => return Err(ConfigurationError::ParentIndex { bone: i, parent }),
            }
        }
        let root = match roots[..] {
            [root] => root,
            _ => return Err(ConfigurationError::RootCount(roots.len())),
        };

        let mut order = Vec::with_capacity(bones.len());
        let mut queue = VecDeque::from([root]);
        while let Some(bone) = queue.pop_front() {
            order.push(bone);
            queue.extend(children[bone].iter().copied());
        }
        if order.len() != bones.len() {
            let mut reached = vec![false; bones.len()];
            order.iter().for_each(|&i| reached[i] = true);
            let unreachable = (0..bones.len()).filter(|&i| !reached[i]).collect();
            return Err(ConfigurationError::Unreachable(unreachable));
        }

        for (i, sphere) in spheres.iter().enumerate() {
            if sphere.bone >= bones.len() {
                return Err(ConfigurationError::SphereBone {
                    sphere: i,
                    bone: sphere.bone,
                });
            }
            let finite = sphere.offset.iter().all(|x| x.is_finite()) && sphere.radius.is_finite();
            if !finite || sphere.radius <= 0.0 {
                return Err(ConfigurationError::SphereGeometry { sphere: i });
            }
        }
        let num_groups = spheres.iter().map(|s| s.group + 1).max().unwrap_or(0);

        Ok(Self {
            bones,
            spheres,
            order,
            num_groups,
        })
    }

    #[inline]
    pub fn bones(&self) -> &[BoneSpec] {
        &self.bones
    }

    #[inline]
    pub fn spheres(&self) -> &[SphereSpec] {
        &self.spheres
    }

    #[inline]
    pub fn num_bones(&self) -> usize {
        self.bones.len()
    }

    /// Number of interpenetration groups, one more than the largest group index
    #[inline]
    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    /// Bone indices in breadth-first order from the root
    #[inline]
    pub fn hierarchy_order(&self) -> &[usize] {
        &self.order
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|bone| bone.name == name)
    }

    pub(crate) fn require_bone(&self, name: &str) -> Result<usize, ConfigurationError> {
        self.bone_index(name)
            .ok_or_else(|| ConfigurationError::MissingBone(name.to_owned()))
    }

    /// Compose world transforms: `world = parent_world * local`, the root's parent is `model_root`
    pub fn compose_world(
        &self,
        model_root: &Matrix4<f64>,
        locals: &[Matrix4<f64>],
        world: &mut Vec<Matrix4<f64>>,
    ) {
        world.clear();
        world.resize(self.bones.len(), Matrix4::identity());
        for &i in &self.order {
            let parent = match self.bones[i].parent {
                Some(p) => world[p],
                None => *model_root,
            };
            world[i] = parent * locals[i];
        }
    }

    /// Place every bounding sphere in world space
    ///
    /// The radius is scaled by the mean length of the bone transform's basis vectors, so
    /// uniform model scale grows the spheres and per-phalanx length stretch grows them in
    /// proportion.
    pub fn place_spheres(&self, world: &[Matrix4<f64>], model: usize, out: &mut Vec<PlacedSphere>) {
        out.clear();
        out.extend(self.spheres.iter().map(|sphere| {
            let transform = &world[sphere.bone];
            let center = transform.transform_point(&Point3::from(sphere.offset));
            let basis = transform.fixed_view::<3, 3>(0, 0);
            let scale =
                (basis.column(0).norm() + basis.column(1).norm() + basis.column(2).norm()) / 3.0;
            PlacedSphere {
                center,
                radius: sphere.radius * scale,
                group: sphere.group,
                model,
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn chain() -> Vec<BoneSpec> {
        vec![
            BoneSpec::new("root", None, Matrix4::identity()),
            BoneSpec::new("a", Some(0), Matrix4::new_translation(&Vector3::new(0.0, 1.0, 0.0))),
            BoneSpec::new("b", Some(1), Matrix4::new_translation(&Vector3::new(0.0, 2.0, 0.0))),
        ]
    }

    #[test]
    fn breadth_first_order() {
        let mut bones = chain();
        bones.push(BoneSpec::new("c", Some(0), Matrix4::identity()));
        let skeleton = RestSkeleton::new(bones, vec![]).unwrap();
        assert_eq!(skeleton.hierarchy_order(), &[0, 1, 3, 2]);
    }

    #[test]
    fn parents_may_follow_children() {
        let bones = vec![
            BoneSpec::new("leaf", Some(1), Matrix4::identity()),
            BoneSpec::new("root", None, Matrix4::identity()),
        ];
        let skeleton = RestSkeleton::new(bones, vec![]).unwrap();
        assert_eq!(skeleton.hierarchy_order(), &[1, 0]);
    }

    #[test]
    fn two_roots_are_rejected() {
        let mut bones = chain();
        bones[2].parent = None;
        assert_eq!(
            RestSkeleton::new(bones, vec![]).unwrap_err(),
            ConfigurationError::RootCount(2)
        );
    }

    #[test]
    fn cycles_are_rejected() {
        let mut bones = chain();
        bones.push(BoneSpec::new("x", Some(4), Matrix4::identity()));
        bones.push(BoneSpec::new("y", Some(3), Matrix4::identity()));
        assert_eq!(
            RestSkeleton::new(bones, vec![]).unwrap_err(),
            ConfigurationError::Unreachable(vec![3, 4])
        );
    }

    #[test]
    fn bad_spheres_are_rejected() {
        let sphere = SphereSpec {
            bone: 5,
            offset: Vector3::zeros(),
            radius: 1.0,
            group: 0,
        };
        assert!(matches!(
            RestSkeleton::new(chain(), vec![sphere]),
            Err(ConfigurationError::SphereBone { sphere: 0, bone: 5 })
        ));
        let sphere = SphereSpec {
            bone: 0,
            radius: 0.0,
            ..sphere
        };
        assert!(matches!(
            RestSkeleton::new(chain(), vec![sphere]),
            Err(ConfigurationError::SphereGeometry { sphere: 0 })
        ));
    }

    #[test]
    fn world_transforms_accumulate_down_the_chain() {
        let skeleton = RestSkeleton::new(chain(), vec![]).unwrap();
        let locals: Vec<_> = skeleton.bones().iter().map(|b| b.rest_local).collect();
        let root = Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0));
        let mut world = vec![];
        skeleton.compose_world(&root, &locals, &mut world);
        let tip = world[2].transform_point(&Point3::origin());
        assert_relative_eq!(tip, Point3::new(10.0, 3.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn spheres_follow_bones_and_scale() {
        let sphere = SphereSpec {
            bone: 1,
            offset: Vector3::new(0.0, 0.5, 0.0),
            radius: 2.0,
            group: 3,
        };
        let skeleton = RestSkeleton::new(chain(), vec![sphere]).unwrap();
        assert_eq!(skeleton.num_groups(), 4);
        let locals: Vec<_> = skeleton.bones().iter().map(|b| b.rest_local).collect();
        let mut world = vec![];
        skeleton.compose_world(&Matrix4::new_scaling(2.0), &locals, &mut world);
        let mut placed = vec![];
        skeleton.place_spheres(&world, 1, &mut placed);
        assert_relative_eq!(placed[0].center, Point3::new(0.0, 3.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(placed[0].radius, 4.0, epsilon = 1e-12);
        assert_eq!((placed[0].group, placed[0].model), (3, 1));
    }
}
