//! Histogram-based lane-edge localization with temporal continuity.

use crate::BinaryMask;
use lanegauge_core::{Pt2, Real};
use serde::{Deserialize, Serialize};

/// Integer pixel location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: u32,
    pub y: u32,
}

impl PixelPoint {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn to_pt2(self) -> Pt2 {
        Pt2::new(self.x as Real, self.y as Real)
    }
}

/// Which row of the chosen run is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanePointMode {
    /// Start row of the run.
    Near,
    /// Midpoint of the run, rounded half to even.
    #[serde(alias = "center")]
    Centre,
    /// End row of the run.
    #[default]
    Far,
}

impl LanePointMode {
    pub fn row_for(self, run: &PeakRun) -> usize {
        match self {
            LanePointMode::Near => run.start,
            LanePointMode::Far => run.end,
            LanePointMode::Centre => run.center().round_ties_even() as usize,
        }
    }
}

/// A maximal run of consecutive histogram rows at or above the peak threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakRun {
    pub start: usize,
    /// Inclusive.
    pub end: usize,
    pub length: usize,
    pub sum: u64,
}

impl PeakRun {
    pub fn center(&self) -> f64 {
        (self.start + self.end) as f64 / 2.0
    }
}

/// Outcome of one localization. `NotFound` is a normal result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneDetection {
    Detected(PixelPoint),
    NotFound,
}

impl LaneDetection {
    pub fn point(&self) -> Option<PixelPoint> {
        match self {
            LaneDetection::Detected(p) => Some(*p),
            LaneDetection::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, LaneDetection::Detected(_))
    }
}

/// Last successful detection, threaded by the caller from frame to frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionState {
    last: Option<PixelPoint>,
}

impl DetectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self) -> Option<PixelPoint> {
        self.last
    }

    /// Remember a detection; `NotFound` keeps the previous one.
    pub fn update(&mut self, detection: &LaneDetection) {
        if let LaneDetection::Detected(p) = detection {
            self.last = Some(*p);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    /// Half width of the search column in pixels.
    pub column_width: u32,
    /// Minimum run length in rows.
    pub min_lane_width: usize,
    /// Maximum distance in rows between a run centre and the previous detection.
    pub max_jump: u32,
    pub lane_point_mode: LanePointMode,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            column_width: 5,
            min_lane_width: 15,
            max_jump: 30,
            lane_point_mode: LanePointMode::Far,
        }
    }
}

/// Fraction of the histogram maximum a row needs to join a run.
pub const PEAK_THRESHOLD_FRACTION: f64 = 0.2;

/// Count of foreground pixels per row in columns `[x_min, x_max)`, rows `[0, rows)`.
///
/// Returns `None` when the column is empty.
pub fn column_histogram(
    mask: &BinaryMask,
    reference: PixelPoint,
    column_width: u32,
) -> Option<Vec<u32>> {
    let (w, h) = mask.dimensions();
    let x_min = reference.x.saturating_sub(column_width);
    let x_max = reference.x.saturating_add(column_width).min(w);
    let rows = reference.y.min(h);
    if x_min >= x_max || rows == 0 {
        return None;
    }
    let hist = (0..rows)
        .map(|y| (x_min..x_max).filter(|&x| mask.get(x, y)).count() as u32)
        .collect();
    Some(hist)
}

/// Split the histogram into runs at or above 20% of its maximum and keep
/// those with `length >= min_len` and `sum >= 2 * min_len`.
pub fn extract_peak_runs(hist: &[u32], min_len: usize) -> Vec<PeakRun> {
    let max = hist.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }
    let threshold = max as f64 * PEAK_THRESHOLD_FRACTION;
    let min_sum = 2 * min_len as u64;

    let mut runs = Vec::new();
    let mut start: Option<usize> = None;
    let close = |start: usize, end: usize, runs: &mut Vec<PeakRun>| {
        let length = end - start + 1;
        let sum: u64 = hist[start..=end].iter().map(|&v| v as u64).sum();
        if length >= min_len && sum >= min_sum {
            runs.push(PeakRun {
                start,
                end,
                length,
                sum,
            });
        }
    };
    for (i, &v) in hist.iter().enumerate() {
        let above = v as f64 >= threshold;
        match (above, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                close(s, i - 1, &mut runs);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        close(s, hist.len() - 1, &mut runs);
    }
    runs
}

/// Pick one run.
///
/// With a previous row, the strongest run whose centre lies within
/// `max_jump` rows of it wins. Otherwise (or if none is in range) the
/// strongest run wins, ties going to the centre nearest the histogram
/// midpoint. Remaining ties keep the earliest run.
pub fn select_run(
    runs: &[PeakRun],
    hist_len: usize,
    previous_row: Option<u32>,
    max_jump: u32,
) -> Option<PeakRun> {
    if let Some(prev) = previous_row {
        let prev = prev as f64;
        let near = runs
            .iter()
            .filter(|r| (r.center() - prev).abs() <= max_jump as f64)
            .fold(None::<&PeakRun>, |best, r| match best {
                Some(b) if b.sum >= r.sum => Some(b),
                _ => Some(r),
            });
        if let Some(r) = near {
            return Some(*r);
        }
    }

    let mid = hist_len as f64 / 2.0;
    let key = |r: &PeakRun| (r.sum, -(r.center() - mid).abs());
    runs.iter()
        .fold(None::<&PeakRun>, |best, r| match best {
            Some(b) => {
                let (bs, bd) = key(b);
                let (rs, rd) = key(r);
                if rs > bs || (rs == bs && rd > bd) {
                    Some(r)
                } else {
                    Some(b)
                }
            }
            None => Some(r),
        })
        .copied()
}

/// Finds the lane edge in a narrow column above a fixed reference point.
///
/// Pure function of its inputs; the caller owns the [`DetectionState`].
#[derive(Debug, Clone)]
pub struct LaneLocalizer {
    config: LocalizerConfig,
}

impl LaneLocalizer {
    pub fn new(config: LocalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocalizerConfig {
        &self.config
    }

    pub fn locate(
        &self,
        mask: &BinaryMask,
        reference: PixelPoint,
        previous: Option<PixelPoint>,
    ) -> LaneDetection {
        let Some(hist) = column_histogram(mask, reference, self.config.column_width) else {
            return LaneDetection::NotFound;
        };
        let runs = extract_peak_runs(&hist, self.config.min_lane_width);
        let chosen = select_run(
            &runs,
            hist.len(),
            previous.map(|p| p.y),
            self.config.max_jump,
        );
        match chosen {
            Some(run) => LaneDetection::Detected(PixelPoint::new(
                reference.x,
                self.config.lane_point_mode.row_for(&run) as u32,
            )),
            None => LaneDetection::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HIST: [u32; 12] = [0, 0, 5, 5, 5, 0, 0, 8, 8, 8, 8, 0];

    fn run(start: usize, end: usize, sum: u64) -> PeakRun {
        PeakRun {
            start,
            end,
            length: end - start + 1,
            sum,
        }
    }

    #[test]
    fn peak_extraction_finds_two_runs() {
        let runs = extract_peak_runs(&HIST, 3);
        assert_eq!(runs, vec![run(2, 4, 15), run(7, 10, 32)]);
    }

    #[test]
    fn strongest_run_wins_without_history() {
        let runs = extract_peak_runs(&HIST, 3);
        assert_eq!(select_run(&runs, HIST.len(), None, 2), Some(run(7, 10, 32)));
    }

    #[test]
    fn continuity_prefers_run_near_previous_detection() {
        let runs = extract_peak_runs(&HIST, 3);
        assert_eq!(select_run(&runs, HIST.len(), Some(3), 2), Some(run(2, 4, 15)));
    }

    #[test]
    fn continuity_falls_back_when_nothing_in_range() {
        let runs = extract_peak_runs(&HIST, 3);
        assert_eq!(select_run(&runs, HIST.len(), Some(100), 2), Some(run(7, 10, 32)));
    }

    #[test]
    fn equal_sums_prefer_run_nearest_midpoint() {
        // Midpoint 10; centres 2 and 11.
        let runs = vec![run(1, 3, 30), run(10, 12, 30)];
        assert_eq!(select_run(&runs, 20, None, 5), Some(run(10, 12, 30)));
    }

    #[test]
    fn full_ties_keep_earliest_run() {
        // Midpoint 6; centres 3 and 9 are equally far.
        let runs = vec![run(2, 4, 30), run(8, 10, 30)];
        assert_eq!(select_run(&runs, 12, None, 5), Some(run(2, 4, 30)));
        assert_eq!(select_run(&runs, 12, Some(6), 3), Some(run(2, 4, 30)));
    }

    #[test]
    fn short_or_weak_runs_are_dropped() {
        assert!(extract_peak_runs(&HIST, 5).is_empty());
        // Length 3 passes, but 1 + 1 + 1 < 2 * 3.
        assert!(extract_peak_runs(&[1, 1, 1, 0], 3).is_empty());
    }

    #[test]
    fn run_touching_the_end_is_closed() {
        let runs = extract_peak_runs(&[0, 4, 4, 4], 3);
        assert_eq!(runs, vec![run(1, 3, 12)]);
    }

    #[test]
    fn point_modes() {
        let r = run(5, 9, 50);
        assert_eq!(LanePointMode::Far.row_for(&r), 9);
        assert_eq!(LanePointMode::Near.row_for(&r), 5);
        assert_eq!(LanePointMode::Centre.row_for(&r), 7);
        assert_eq!(LanePointMode::Centre.row_for(&run(2, 5, 8)), 4);
        assert_eq!(LanePointMode::Centre.row_for(&run(1, 4, 8)), 2);
    }

    #[test]
    fn point_mode_names() {
        let m: LanePointMode = serde_json::from_str("\"center\"").unwrap();
        assert_eq!(m, LanePointMode::Centre);
        assert_eq!(serde_json::to_string(&LanePointMode::Far).unwrap(), "\"far\"");
    }

    #[test]
    fn empty_inputs_are_not_found() {
        let localizer = LaneLocalizer::new(LocalizerConfig::default());
        let blank = BinaryMask::new(50, 50);
        assert_eq!(
            localizer.locate(&blank, PixelPoint::new(25, 40), None),
            LaneDetection::NotFound
        );
        let full = BinaryMask::from_fn(50, 50, |_, _| true);
        // Reference on the top row: nothing above it.
        assert_eq!(
            localizer.locate(&full, PixelPoint::new(25, 0), None),
            LaneDetection::NotFound
        );
        // Reference far right of the frame: empty column.
        assert_eq!(
            localizer.locate(&full, PixelPoint::new(80, 40), None),
            LaneDetection::NotFound
        );
        assert!(column_histogram(&full, PixelPoint::new(80, 40), 5).is_none());
    }

    #[test]
    fn band_in_mask_is_located() {
        let mask = BinaryMask::from_fn(200, 200, |_, y| (50..=60).contains(&y));
        let localizer = LaneLocalizer::new(LocalizerConfig {
            column_width: 5,
            min_lane_width: 5,
            max_jump: 30,
            lane_point_mode: LanePointMode::Centre,
        });
        let det = localizer.locate(&mask, PixelPoint::new(100, 150), None);
        assert_eq!(det, LaneDetection::Detected(PixelPoint::new(100, 55)));

        let far = LaneLocalizer::new(LocalizerConfig {
            lane_point_mode: LanePointMode::Far,
            ..*localizer.config()
        });
        assert_eq!(
            far.locate(&mask, PixelPoint::new(100, 150), None).point(),
            Some(PixelPoint::new(100, 60))
        );
    }

    #[test]
    fn detection_state_keeps_last_hit() {
        let mut state = DetectionState::new();
        assert_eq!(state.previous(), None);
        state.update(&LaneDetection::Detected(PixelPoint::new(3, 4)));
        state.update(&LaneDetection::NotFound);
        assert_eq!(state.previous(), Some(PixelPoint::new(3, 4)));
    }
}
