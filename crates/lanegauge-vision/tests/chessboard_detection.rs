use lanegauge_core::synthetic::planar::{centred_board_pose, grid_points, project_view_all};
use lanegauge_core::{BrownConrady5, Iso3, Mat3, PinholeCamera, PinholeIntrinsics};
use lanegauge_vision::synthetic::render_chessboard;
use lanegauge_vision::{ChessboardDetector, PatternDetector, PatternSize};

const COLS: usize = 9;
const ROWS: usize = 6;
const SQUARE: f64 = 25.0;

fn camera() -> PinholeCamera {
    PinholeCamera::new(
        PinholeIntrinsics {
            fx: 800.0,
            fy: 800.0,
            cx: 319.5,
            cy: 239.5,
            skew: 0.0,
        },
        BrownConrady5::default(),
    )
}

fn image_from_board(camera: &PinholeCamera, pose: &Iso3) -> Mat3 {
    let r = pose.rotation.to_rotation_matrix();
    let t = pose.translation.vector;
    let mut rt = Mat3::zeros();
    rt.set_column(0, &r.matrix().column(0));
    rt.set_column(1, &r.matrix().column(1));
    rt.set_column(2, &t);
    camera.k.k_matrix() * rt
}

#[test]
fn tilted_board_is_found_in_object_order() {
    let cam = camera();
    let board_w = (COLS - 1) as f64 * SQUARE;
    let board_h = (ROWS - 1) as f64 * SQUARE;
    let objects = grid_points(COLS, ROWS, SQUARE);

    for (roll, pitch, yaw) in [(0.0, 0.0, 0.0), (0.05, 0.25, 0.0), (-0.1, 0.0, 0.3)] {
        let pose = centred_board_pose(board_w, board_h, 600.0, roll, pitch, yaw);
        let h = image_from_board(&cam, &pose);
        let img = render_chessboard(640, 480, &h, SQUARE, COLS, ROWS, 4).unwrap();
        let truth = project_view_all(&cam, &pose, &objects).unwrap();

        let corners = ChessboardDetector
            .detect(&img, PatternSize::new(COLS, ROWS))
            .expect("board detected");
        assert_eq!(corners.len(), COLS * ROWS);

        // Ordering may differ from the object grid by a half turn.
        let direct: f64 = corners.iter().zip(&truth).map(|(a, b)| (a - b).norm()).sum();
        let flipped: f64 = corners
            .iter()
            .rev()
            .zip(&truth)
            .map(|(a, b)| (a - b).norm())
            .sum();
        let mean_err = direct.min(flipped) / truth.len() as f64;
        assert!(mean_err < 0.5, "pose ({roll}, {pitch}, {yaw}): mean error {mean_err}");
    }
}
