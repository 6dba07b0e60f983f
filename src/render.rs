use crate::error::RenderError;
use crate::kinematics::PosedGeometry;

use ndarray::{Array2, ArrayView2};

/// Observed depth image with an optional per-pixel hand label mask
///
/// Depth values are in model units along the viewing axis, zero marks a pixel without a
/// measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthFrame {
    depth: Array2<f32>,
    labels: Option<Array2<u8>>,
}

impl DepthFrame {
    pub fn new(depth: Array2<f32>) -> Self {
        Self {
            depth,
            labels: None,
        }
    }

    /// Create a frame with a label mask, the mask must have the shape of the depth image
    pub fn with_labels(depth: Array2<f32>, labels: Array2<u8>) -> Result<Self, RenderError> {
        if depth.dim() != labels.dim() {
            return Err(RenderError::FrameShape {
                actual: labels.dim(),
                expected: depth.dim(),
            });
        }
        Ok(Self {
            depth,
            labels: Some(labels),
        })
    }

    #[inline]
    pub fn depth(&self) -> ArrayView2<'_, f32> {
        self.depth.view()
    }

    #[inline]
    pub fn labels(&self) -> Option<ArrayView2<'_, u8>> {
        self.labels.as_ref().map(|labels| labels.view())
    }

    /// `(height, width)`
    #[inline]
    pub fn dim(&self) -> (usize, usize) {
        self.depth.dim()
    }
}

/// Renderer of the data term: synthesizes depth for posed geometry and compares it with the
/// observed frame
///
/// The residual of a candidate must not depend on which other candidates share its batch.
pub trait ResidualRenderer {
    /// Largest number of candidates accepted by
    /// [render_residual_batch](Self::render_residual_batch)
    fn max_batch_size(&self) -> usize;

    /// Residual of a single candidate
    fn render_residual(
        &mut self,
        geometry: &PosedGeometry,
        frame: &DepthFrame,
    ) -> Result<f64, RenderError>;

    /// Residuals of a batch of candidates, in input order
    fn render_residual_batch(
        &mut self,
        geometries: &[PosedGeometry],
        frame: &DepthFrame,
    ) -> Result<Vec<f64>, RenderError> {
        geometries
            .iter()
            .map(|geometry| self.render_residual(geometry, frame))
            .collect()
    }
}

impl<R: ResidualRenderer + ?Sized> ResidualRenderer for &mut R {
    fn max_batch_size(&self) -> usize {
        (**self).max_batch_size()
    }

    fn render_residual(
        &mut self,
        geometry: &PosedGeometry,
        frame: &DepthFrame,
    ) -> Result<f64, RenderError> {
        (**self).render_residual(geometry, frame)
    }

    fn render_residual_batch(
        &mut self,
        geometries: &[PosedGeometry],
        frame: &DepthFrame,
    ) -> Result<Vec<f64>, RenderError> {
        (**self).render_residual_batch(geometries, frame)
    }
}
