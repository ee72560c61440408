//! Boundary records: calibration archive and summary, homography record,
//! measurement CSV, and artifact discovery on disk.

use crate::{MeasurementSample, PatternConfig, PipelineError};
use anyhow::{bail, ensure, Context, Result};
use lanegauge_core::{
    mat3_from_rows, mat3_to_rows, CalibrationResult, GroundHomography, ImageSize, Real,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Extensions picked up when collecting calibration images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

/// Persisted calibration, consumed by every undistortion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationArchive {
    pub camera_matrix: [[Real; 3]; 3],
    /// `[k1, k2, p1, p2, k3]`
    pub dist_coeffs: [Real; 5],
    pub rms: Real,
    /// `[width, height]`
    pub image_size: [u32; 2],
    pub n_images_used: usize,
    pub chessboard_cols: usize,
    pub chessboard_rows: usize,
    pub square_mm: Real,
}

impl CalibrationArchive {
    pub fn new(result: &CalibrationResult, pattern: &PatternConfig) -> Self {
        Self {
            camera_matrix: mat3_to_rows(&result.camera_matrix()),
            dist_coeffs: result.dist_coeffs(),
            rms: result.rms,
            image_size: [result.image_size.width, result.image_size.height],
            n_images_used: result.images_used,
            chessboard_cols: pattern.cols,
            chessboard_rows: pattern.rows,
            square_mm: pattern.square_size_mm,
        }
    }

    pub fn to_result(&self) -> CalibrationResult {
        CalibrationResult::from_parts(
            &mat3_from_rows(&self.camera_matrix),
            self.dist_coeffs,
            self.rms,
            ImageSize::new(self.image_size[0], self.image_size[1]),
            self.n_images_used,
        )
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path.as_ref(), self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let archive: Self = read_json(path.as_ref())?;
        ensure!(
            archive.to_result().camera.k.is_valid(),
            "calibration archive {} holds an invalid camera matrix",
            path.as_ref().display()
        );
        Ok(archive)
    }
}

/// Load a calibration archive straight into a [`CalibrationResult`].
pub fn load_calibration_archive(path: impl AsRef<Path>) -> Result<CalibrationResult> {
    Ok(CalibrationArchive::load(path)?.to_result())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChessboardDims {
    pub cols: usize,
    pub rows: usize,
}

/// Human-readable companion of a [`CalibrationArchive`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub output_path: PathBuf,
    pub image_dir: PathBuf,
    pub images_used: usize,
    pub image_size: [u32; 2],
    pub rms: Real,
    pub chessboard_dims: ChessboardDims,
    pub square_mm: Real,
}

impl CalibrationSummary {
    pub fn new(
        output_path: impl Into<PathBuf>,
        image_dir: impl Into<PathBuf>,
        result: &CalibrationResult,
        pattern: &PatternConfig,
    ) -> Self {
        Self {
            output_path: output_path.into(),
            image_dir: image_dir.into(),
            images_used: result.images_used,
            image_size: [result.image_size.width, result.image_size.height],
            rms: result.rms,
            chessboard_dims: ChessboardDims {
                cols: pattern.cols,
                rows: pattern.rows,
            },
            square_mm: pattern.square_size_mm,
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path.as_ref(), self)
    }
}

/// `<dir>/<stem>_summary.json` next to an archive path.
pub fn summary_path_for(archive_path: &Path) -> PathBuf {
    let stem = archive_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    archive_path.with_file_name(format!("{stem}_summary.json"))
}

/// `{"homography_matrix": [[..], [..], [..]]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomographyRecord {
    pub homography_matrix: [[Real; 3]; 3],
}

impl From<&GroundHomography> for HomographyRecord {
    fn from(h: &GroundHomography) -> Self {
        Self {
            homography_matrix: mat3_to_rows(h.matrix()),
        }
    }
}

pub fn save_homography_record(path: impl AsRef<Path>, h: &GroundHomography) -> Result<()> {
    write_json(path.as_ref(), &HomographyRecord::from(h))
}

pub fn load_homography_record(path: impl AsRef<Path>) -> Result<GroundHomography> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read homography record {}", path.display()))?;
    parse_homography_record(&text).with_context(|| format!("in {}", path.display()))
}

/// Accepts `homography_matrix`, `H`, or a bare nested array. Anything but
/// an invertible 3x3 matrix is rejected.
pub fn parse_homography_record(json: &str) -> Result<GroundHomography> {
    let value: Value = serde_json::from_str(json).context("homography record is not JSON")?;
    let matrix = match &value {
        Value::Object(map) => map
            .get("homography_matrix")
            .or_else(|| map.get("H"))
            .unwrap_or(&value),
        _ => &value,
    };

    let shape_error = |rows: usize, cols: usize| PipelineError::HomographyShape { rows, cols };
    let Some(rows) = matrix.as_array() else {
        return Err(shape_error(0, 0).into());
    };
    let mut out = [[0.0; 3]; 3];
    for (r, row) in rows.iter().enumerate() {
        let Some(cols) = row.as_array() else {
            return Err(shape_error(rows.len(), 0).into());
        };
        if rows.len() != 3 || cols.len() != 3 {
            return Err(shape_error(rows.len(), cols.len()).into());
        }
        for (c, v) in cols.iter().enumerate() {
            let Some(x) = v.as_f64() else {
                bail!("homography entry ({r}, {c}) is not a number: {v}");
            };
            out[r][c] = x;
        }
    }
    if rows.len() != 3 {
        return Err(shape_error(rows.len(), 0).into());
    }
    Ok(GroundHomography::new(mat3_from_rows(&out)).map_err(PipelineError::from)?)
}

/// CSV with header `frame,cm_to_lane`; missing samples are written as `NaN`.
pub fn write_measurement_csv_to<W: Write>(mut out: W, samples: &[MeasurementSample]) -> Result<()> {
    writeln!(out, "frame,cm_to_lane")?;
    for s in samples {
        match s.distance_cm {
            Some(d) => writeln!(out, "{},{}", s.frame, d)?,
            None => writeln!(out, "{},NaN", s.frame)?,
        }
    }
    out.flush()?;
    Ok(())
}

pub fn write_measurement_csv(path: impl AsRef<Path>, samples: &[MeasurementSample]) -> Result<()> {
    let path = path.as_ref();
    create_parent(path)?;
    let file = fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_measurement_csv_to(BufWriter::new(file), samples)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Every image under `root` (recursively), sorted by path.
pub fn find_calibration_images(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    walk(root.as_ref(), &mut |p| {
        if has_extension(p, IMAGE_EXTENSIONS) {
            found.push(p.to_path_buf());
        }
    })?;
    found.sort();
    Ok(found)
}

/// The single file under `root` with the given extension.
pub fn find_unique_file(root: impl AsRef<Path>, extension: &str) -> Result<PathBuf> {
    let root = root.as_ref();
    let mut found = Vec::new();
    walk(root, &mut |p| {
        if has_extension(p, &[extension]) {
            found.push(p.to_path_buf());
        }
    })?;
    found.sort();
    match found.len() {
        0 => bail!("no *.{extension} file under {}", root.display()),
        1 => Ok(found.remove(0)),
        n => bail!("{n} *.{extension} files under {}: {found:?}", root.display()),
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

fn walk(dir: &Path, visit: &mut dyn FnMut(&Path)) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, visit)?;
        } else {
            visit(&path);
        }
    }
    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    create_parent(path)?;
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanegauge_core::Mat3;

    fn calibration() -> CalibrationResult {
        let k = Mat3::new(910.0, 0.0, 639.5, 0.0, 905.0, 359.5, 0.0, 0.0, 1.0);
        CalibrationResult::from_parts(
            &k,
            [-0.12, 0.03, 0.001, -0.002, 0.0],
            0.41,
            ImageSize::new(1280, 720),
            17,
        )
    }

    #[test]
    fn archive_and_summary_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calib").join("camera_intrinsics.json");
        let pattern = PatternConfig::default();
        let archive = CalibrationArchive::new(&calibration(), &pattern);
        archive.save(&path).unwrap();
        let loaded = load_calibration_archive(&path).unwrap();
        assert_eq!(loaded, calibration());

        let summary_path = summary_path_for(&path);
        assert!(summary_path.ends_with("calib/camera_intrinsics_summary.json"));
        CalibrationSummary::new(&path, dir.path(), &loaded, &pattern)
            .save(&summary_path)
            .unwrap();
        let json: Value = serde_json::from_str(&fs::read_to_string(&summary_path).unwrap()).unwrap();
        assert_eq!(json["images_used"], 17);
        assert_eq!(json["image_size"], serde_json::json!([1280, 720]));
        assert_eq!(json["chessboard_dims"]["cols"], 9);
        assert_eq!(json["square_mm"], 25.0);
    }

    #[test]
    fn homography_record_key_variants() {
        let expected = Mat3::new(1.0, 2.0, 3.0, 0.0, 1.0, 4.0, 0.0, 0.0, 1.0);
        for text in [
            r#"{"homography_matrix": [[1,2,3],[0,1,4],[0,0,1]]}"#,
            r#"{"H": [[1,2,3],[0,1,4],[0,0,1]]}"#,
            r#"[[1,2,3],[0,1,4],[0,0,1]]"#,
        ] {
            assert_eq!(*parse_homography_record(text).unwrap().matrix(), expected);
        }
    }

    #[test]
    fn homography_record_shape_is_enforced() {
        for text in [
            r#"{"homography_matrix": [[1,0],[0,1]]}"#,
            r#"[[1,0,0],[0,1,0]]"#,
            r#"[[1,0,0],[0,1,0],[0,0,1],[0,0,1]]"#,
            r#"{"matrix": [[1,0,0],[0,1,0],[0,0,1]]}"#,
        ] {
            let err = parse_homography_record(text).unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<PipelineError>(),
                    Some(PipelineError::HomographyShape { .. })
                ),
                "{text}: {err}"
            );
        }
        assert!(parse_homography_record(r#"[[1,0,0],[0,"a",0],[0,0,1]]"#).is_err());
        assert!(parse_homography_record(r#"[[1,0,0],[0,1,0],[0,0,0]]"#).is_err());
    }

    #[test]
    fn homography_record_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.json");
        let h = GroundHomography::new(Mat3::new(0.5, 0.0, -3.0, 0.1, 0.4, 2.0, 0.0, 0.001, 1.0))
            .unwrap();
        save_homography_record(&path, &h).unwrap();
        assert_eq!(load_homography_record(&path).unwrap(), h);
        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("homography_matrix").is_some());
    }

    #[test]
    fn csv_marks_missing_frames() {
        let samples = [
            MeasurementSample {
                frame: 1,
                distance_cm: Some(141.7),
            },
            MeasurementSample {
                frame: 2,
                distance_cm: None,
            },
        ];
        let mut buf = Vec::new();
        write_measurement_csv_to(&mut buf, &samples).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "frame,cm_to_lane\n1,141.7\n2,NaN\n"
        );
    }

    #[test]
    fn artifact_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("z.PNG"), b"").unwrap();
        fs::write(nested.join("a.jpg"), b"").unwrap();
        fs::write(nested.join("notes.txt"), b"").unwrap();
        fs::write(nested.join("site.json"), b"{}").unwrap();

        let images = find_calibration_images(dir.path()).unwrap();
        assert_eq!(images, vec![nested.join("a.jpg"), dir.path().join("z.PNG")]);
        assert_eq!(find_unique_file(dir.path(), "json").unwrap(), nested.join("site.json"));
        assert!(find_unique_file(dir.path(), "npz").is_err());
        fs::write(dir.path().join("other.json"), b"{}").unwrap();
        assert!(find_unique_file(dir.path(), "json").is_err());
    }
}
