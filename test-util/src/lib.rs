pub use hands::{
    HAND_DEPTH, LEFT_HAND_SKELETON, RIGHT_HAND_SKELETON, posed_geometry, reference_hand,
    single_hand_renderer, synthetic_frame, two_hand_renderer,
};
pub use splat::SphereSplatRenderer;

mod hands;
mod splat;

#[cfg(test)]
mod tests {
    use super::*;

    use hand_model_fit::HandType;
    use hand_model_fit::ResidualRenderer;
    use hand_model_fit::coeff::HandCoeff;

    #[test]
    fn frame_of_the_rendered_pose_has_zero_residual() {
        let mut renderer = single_hand_renderer();
        let models = [reference_hand(HandType::Right, 0.0, 0.0)];
        let frame = synthetic_frame(&renderer, &models);
        assert!(frame.depth().iter().any(|&z| z > 0.0));
        let geometry = posed_geometry(&models);
        assert_eq!(renderer.render_residual(&geometry, &frame).unwrap(), 0.0);
    }

    #[test]
    fn residual_grows_with_offset() {
        let mut renderer = single_hand_renderer();
        let frame = synthetic_frame(&renderer, &[reference_hand(HandType::Right, 0.0, 0.0)]);
        let mut residual = |dz: f64| {
            let mut model = reference_hand(HandType::Right, 0.0, 0.0);
            model.coeffs_mut()[HandCoeff::HandPosZ.index()] += dz;
            renderer
                .render_residual(&posed_geometry(&[model]), &frame)
                .unwrap()
        };
        let small = residual(2.0);
        let large = residual(10.0);
        assert!(0.0 < small && small < large, "{small} {large}");
        assert!(large <= SphereSplatRenderer::default_max_depth_diff());
    }

    #[test]
    fn batch_matches_single() {
        let mut renderer = single_hand_renderer();
        let frame = synthetic_frame(&renderer, &[reference_hand(HandType::Right, 0.0, 0.0)]);
        let geometries: Vec<_> = (0..5)
            .map(|i| posed_geometry(&[reference_hand(HandType::Right, i as f64, 0.0)]))
            .collect();
        let batch = renderer.render_residual_batch(&geometries, &frame).unwrap();
        for (geometry, residual) in geometries.iter().zip(batch) {
            assert_eq!(renderer.render_residual(geometry, &frame).unwrap(), residual);
        }
    }

    #[test]
    fn frame_shape_is_checked() {
        let mut renderer = single_hand_renderer();
        let frame = synthetic_frame(&two_hand_renderer(), &[]);
        assert!(renderer.render_residual(&Default::default(), &frame).is_err());
    }
}
