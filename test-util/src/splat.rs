use hand_model_fit::{DepthFrame, PosedGeometry, RenderError, ResidualRenderer};

use itertools::iproduct;
use ndarray::{Array2, ArrayView2, Zip};
use rayon::prelude::*;
use std::ops::Range;

/// Orthographic software renderer drawing every bounding sphere as its front hemisphere
///
/// The camera looks along `+z`. Pixel `(row, col)` samples world `(x, y)` =
/// `origin + (col, row) * pixel_size`, depth zero marks background.
#[derive(Clone, Debug, PartialEq)]
pub struct SphereSplatRenderer {
    height: usize,
    width: usize,
    pixel_size: f64,
    origin: (f64, f64),
    max_depth_diff: f64,
    max_batch_size: usize,
}

impl SphereSplatRenderer {
    /// Create a new [SphereSplatRenderer]
    ///
    /// # Arguments
    /// - `(height, width)`: image shape in pixels
    /// - `pixel_size`: pixel pitch in model units
    /// - `origin`: world `(x, y)` of pixel `(0, 0)`
    pub fn new(shape: (usize, usize), pixel_size: f64, origin: (f64, f64)) -> Self {
        Self {
            height: shape.0,
            width: shape.1,
            pixel_size,
            origin,
            max_depth_diff: Self::default_max_depth_diff(),
            max_batch_size: Self::default_max_batch_size(),
        }
    }

    pub fn with_max_batch_size(self, max_batch_size: usize) -> Self {
        Self {
            max_batch_size,
            ..self
        }
    }

    /// Per-pixel residual cap, also the cost of a pixel covered by only one of the images
    #[inline]
    pub fn default_max_depth_diff() -> f64 {
        30.0
    }

    #[inline]
    pub fn default_max_batch_size() -> usize {
        64
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    fn pixel_range(&self, center: f64, radius: f64, n: usize) -> Range<usize> {
        let lo = ((center - radius) / self.pixel_size).floor().max(0.0);
        let hi = ((center + radius) / self.pixel_size).ceil() + 1.0;
        if lo >= n as f64 || hi <= 0.0 {
            return 0..0;
        }
        (lo as usize)..(hi.min(n as f64) as usize)
    }

    /// Render into `depth`, which must have the renderer's shape
    pub fn render_into(&self, geometry: &PosedGeometry, depth: &mut Array2<f32>) {
        depth.fill(0.0);
        for sphere in geometry.spheres().filter(|s| !s.is_degenerate()) {
            let rows =
                self.pixel_range(sphere.center.y - self.origin.1, sphere.radius, self.height);
            let cols =
                self.pixel_range(sphere.center.x - self.origin.0, sphere.radius, self.width);
            for (row, col) in iproduct!(rows, cols) {
                let dx = self.origin.0 + col as f64 * self.pixel_size - sphere.center.x;
                let dy = self.origin.1 + row as f64 * self.pixel_size - sphere.center.y;
                let h2 = sphere.radius * sphere.radius - dx * dx - dy * dy;
                if h2 <= 0.0 {
                    continue;
                }
                let z = (sphere.center.z - h2.sqrt()) as f32;
                let pixel = &mut depth[(row, col)];
                if z > 0.0 && (*pixel == 0.0 || z < *pixel) {
                    *pixel = z;
                }
            }
        }
    }

    pub fn render(&self, geometry: &PosedGeometry) -> Array2<f32> {
        let mut depth = Array2::zeros(self.shape());
        self.render_into(geometry, &mut depth);
        depth
    }

    /// Mean of `min(|observed - synthetic|, max_depth_diff)` over the union of foreground
    /// pixels, zero for two empty images. Pixels labelled zero are background in `frame`.
    pub fn residual(&self, synthetic: ArrayView2<f32>, frame: &DepthFrame) -> f64 {
        let labels = frame.labels();
        let mut sum = 0.0;
        let mut union = 0usize;
        Zip::indexed(synthetic)
            .and(frame.depth())
            .for_each(|index, &synth, &observed| {
                let observed = match &labels {
                    Some(labels) if labels[index] == 0 => 0.0,
                    _ => observed,
                };
                let diff = match (observed > 0.0, synth > 0.0) {
                    (false, false) => return,
                    (true, true) => (f64::from(observed) - f64::from(synth))
                        .abs()
                        .min(self.max_depth_diff),
                    _ => self.max_depth_diff,
                };
                sum += diff;
                union += 1;
            });
        if union == 0 { 0.0 } else { sum / union as f64 }
    }

    fn check_frame(&self, frame: &DepthFrame) -> Result<(), RenderError> {
        if frame.dim() != self.shape() {
            return Err(RenderError::FrameShape {
                actual: frame.dim(),
                expected: self.shape(),
            });
        }
        Ok(())
    }
}

impl ResidualRenderer for SphereSplatRenderer {
    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn render_residual(
        &mut self,
        geometry: &PosedGeometry,
        frame: &DepthFrame,
    ) -> Result<f64, RenderError> {
        self.check_frame(frame)?;
        Ok(self.residual(self.render(geometry).view(), frame))
    }

    fn render_residual_batch(
        &mut self,
        geometries: &[PosedGeometry],
        frame: &DepthFrame,
    ) -> Result<Vec<f64>, RenderError> {
        self.check_frame(frame)?;
        let renderer = &*self;
        Ok(geometries
            .par_iter()
            .map_init(
                || Array2::zeros(renderer.shape()),
                |depth, geometry| {
                    renderer.render_into(geometry, depth);
                    renderer.residual(depth.view(), frame)
                },
            )
            .collect())
    }
}
