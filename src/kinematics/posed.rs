use nalgebra::{Matrix4, Point3};

/// Bounding sphere in world space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedSphere {
    pub center: Point3<f64>,
    pub radius: f64,
    /// Interpenetration group within its model
    pub group: usize,
    /// Index of the model owning the sphere
    pub model: usize,
}

impl PlacedSphere {
    /// Lower end of the sphere's extent along `axis`
    #[inline]
    pub fn extent_min(&self, axis: usize) -> f64 {
        self.center[axis] - self.radius
    }

    /// Upper end of the sphere's extent along `axis`
    #[inline]
    pub fn extent_max(&self, axis: usize) -> f64 {
        self.center[axis] + self.radius
    }

    /// Zero-size or non-finite spheres never collide
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.radius > 0.0 && self.radius.is_finite() && self.center.iter().all(|x| x.is_finite()))
    }

    /// Spheres of the same model and group are never tested against each other
    #[inline]
    pub fn same_group(&self, other: &Self) -> bool {
        self.model == other.model && self.group == other.group
    }
}

/// A single model in a candidate pose
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PosedModel {
    /// Current local transform of every bone
    pub local: Vec<Matrix4<f64>>,
    /// Current world transform of every bone
    pub world: Vec<Matrix4<f64>>,
    pub spheres: Vec<PlacedSphere>,
}

/// Everything a renderer needs to draw one candidate: all of its posed models
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PosedGeometry {
    pub models: Vec<PosedModel>,
}

impl PosedGeometry {
    /// Bounding spheres of every model
    pub fn spheres(&self) -> impl Iterator<Item = &PlacedSphere> {
        self.models.iter().flat_map(|model| model.spheres.iter())
    }

    pub(crate) fn collect_spheres(&self, out: &mut Vec<PlacedSphere>) {
        out.clear();
        out.extend(self.spheres().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(radius: f64) -> PlacedSphere {
        PlacedSphere {
            center: Point3::new(1.0, 2.0, 3.0),
            radius,
            group: 0,
            model: 0,
        }
    }

    #[test]
    fn extents() {
        let s = sphere(0.5);
        assert_eq!(s.extent_min(1), 1.5);
        assert_eq!(s.extent_max(2), 3.5);
    }

    #[test]
    fn degenerate_spheres() {
        assert!(sphere(0.0).is_degenerate());
        assert!(sphere(f64::NAN).is_degenerate());
        assert!(!sphere(1.0).is_degenerate());
    }

    #[test]
    fn groups_are_per_model() {
        let a = sphere(1.0);
        let b = PlacedSphere { model: 1, ..a };
        assert!(a.same_group(&a));
        assert!(!a.same_group(&b));
    }
}
