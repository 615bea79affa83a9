use std::path::Path;

use e57::{CartesianCoordinate, E57Reader};

use crate::pointcloud::PointCloud;

/// Error types for the E57 module.
#[derive(Debug, thiserror::Error)]
pub enum E57Error {
    /// Failed to read E57 file
    #[error("Failed to read E57 file: {0}")]
    Read(#[from] e57::Error),

    /// The file contains no scans
    #[error("E57 file contains no scans")]
    NoScans,

    /// The requested scan does not exist
    #[error("Scan index {0} out of range, file has {1} scans")]
    ScanOutOfRange(usize, usize),
}

/// Which scans of an E57 file to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanSelection {
    /// A single scan by its position in the file.
    Index(usize),
    /// Every scan, merged into one point cloud.
    All,
}

impl Default for ScanSelection {
    fn default() -> Self {
        ScanSelection::Index(0)
    }
}

/// Options for [`read_e57`].
#[derive(Debug, Clone)]
pub struct E57ReadOptions {
    /// The scans to read.
    pub scan: ScanSelection,
    /// Transform points with the scan pose into the file coordinate system.
    pub apply_pose: bool,
    /// Read colors when the scan stores them.
    pub read_colors: bool,
}

impl Default for E57ReadOptions {
    fn default() -> Self {
        Self {
            scan: ScanSelection::default(),
            apply_pose: true,
            read_colors: true,
        }
    }
}

/// Read the Cartesian points of an E57 file.
///
/// Spherical coordinates are converted to Cartesian ones. Points without a
/// valid position are skipped. Colors are returned only if every selected
/// scan stores them, points whose color is flagged invalid become black.
pub fn read_e57(path: impl AsRef<Path>, options: &E57ReadOptions) -> Result<PointCloud, E57Error> {
    let mut reader = E57Reader::from_file(path)?;
    let pointclouds = reader.pointclouds();
    if pointclouds.is_empty() {
        return Err(E57Error::NoScans);
    }

    let selected = match options.scan {
        ScanSelection::Index(index) => {
            let pc = pointclouds
                .get(index)
                .cloned()
                .ok_or(E57Error::ScanOutOfRange(index, pointclouds.len()))?;
            vec![pc]
        }
        ScanSelection::All => pointclouds,
    };

    let with_colors = options.read_colors && selected.iter().all(|pc| pc.has_color());

    let capacity = selected.iter().map(|pc| pc.records as usize).sum();
    let mut points = Vec::with_capacity(capacity);
    let mut colors = Vec::with_capacity(if with_colors { capacity } else { 0 });

    for pc in &selected {
        log::debug!(
            "Reading scan {} with {} records",
            pc.name.as_deref().unwrap_or("<unnamed>"),
            pc.records
        );

        let mut iter = reader.pointcloud_simple(pc)?;
        iter.spherical_to_cartesian(true);
        iter.apply_pose(options.apply_pose);

        let mut skipped = 0usize;
        for point in iter {
            let point = point?;
            match point.cartesian {
                CartesianCoordinate::Valid { x, y, z } => {
                    points.push([x, y, z]);
                    if with_colors {
                        colors.push(match point.color {
                            Some(c) => [unit_to_u8(c.red), unit_to_u8(c.green), unit_to_u8(c.blue)],
                            None => INVALID_COLOR,
                        });
                    }
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            log::debug!("Skipped {} points without a valid position", skipped);
        }
    }

    Ok(PointCloud::new(points, with_colors.then_some(colors), None))
}

// Stand-in for points whose color is flagged invalid.
const INVALID_COLOR: [u8; 3] = [0, 0, 0];

fn unit_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use e57::{
        E57Writer, Quaternion, Record, RecordDataType, RecordName, RecordValue, Transform,
        Translation,
    };

    fn write_scan(path: &Path, scans: &[Vec<[f32; 3]>], with_colors: bool) {
        let mut writer = E57Writer::from_file(path, "file_guid").unwrap();
        for (i, scan) in scans.iter().enumerate() {
            let mut prototype = vec![
                Record::CARTESIAN_X_F32,
                Record::CARTESIAN_Y_F32,
                Record::CARTESIAN_Z_F32,
            ];
            if with_colors {
                prototype.extend([Record::COLOR_RED_U8, Record::COLOR_GREEN_U8, Record::COLOR_BLUE_U8]);
            }
            let mut pc_writer = writer
                .add_pointcloud(&format!("scan_guid_{i}"), prototype)
                .unwrap();
            for p in scan {
                let mut values = vec![
                    RecordValue::Single(p[0]),
                    RecordValue::Single(p[1]),
                    RecordValue::Single(p[2]),
                ];
                if with_colors {
                    values.extend([
                        RecordValue::Integer(255),
                        RecordValue::Integer(0),
                        RecordValue::Integer(0),
                    ]);
                }
                pc_writer.add_point(values).unwrap();
            }
            pc_writer.finalize().unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_read_first_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.e57");
        write_scan(
            &path,
            &[
                vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
                vec![[7.0, 8.0, 9.0]],
            ],
            false,
        );

        let pointcloud = read_e57(&path, &E57ReadOptions::default()).unwrap();
        assert_eq!(pointcloud.len(), 2);
        assert_eq!(pointcloud.points()[0], [1.0, 2.0, 3.0]);
        assert_eq!(pointcloud.points()[1], [4.0, 5.0, 6.0]);
        assert!(pointcloud.colors().is_none());
        assert!(pointcloud.normals().is_none());
    }

    #[test]
    fn test_read_all_scans_and_colors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.e57");
        write_scan(
            &path,
            &[vec![[1.0, 2.0, 3.0]], vec![[7.0, 8.0, 9.0]]],
            true,
        );

        let options = E57ReadOptions {
            scan: ScanSelection::All,
            ..Default::default()
        };
        let pointcloud = read_e57(&path, &options).unwrap();
        assert_eq!(pointcloud.len(), 2);
        assert_eq!(pointcloud.points()[1], [7.0, 8.0, 9.0]);
        assert_eq!(pointcloud.colors().unwrap()[0], [255, 0, 0]);
    }

    #[test]
    fn test_scan_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.e57");
        write_scan(&path, &[vec![[1.0, 2.0, 3.0]]], false);

        let options = E57ReadOptions {
            scan: ScanSelection::Index(3),
            ..Default::default()
        };
        assert!(matches!(
            read_e57(&path, &options),
            Err(E57Error::ScanOutOfRange(3, 1))
        ));
    }

    #[test]
    fn test_not_an_e57_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"definitely not e57").unwrap();
        assert!(matches!(
            read_e57(file.path(), &E57ReadOptions::default()),
            Err(E57Error::Read(_))
        ));
    }

    #[test]
    fn test_invalid_point_color() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.e57");

        let mut writer = E57Writer::from_file(&path, "file_guid").unwrap();
        let prototype = vec![
            Record::CARTESIAN_X_F32,
            Record::CARTESIAN_Y_F32,
            Record::CARTESIAN_Z_F32,
            Record::COLOR_RED_U8,
            Record::COLOR_GREEN_U8,
            Record::COLOR_BLUE_U8,
            Record {
                name: RecordName::IsColorInvalid,
                data_type: RecordDataType::Integer { min: 0, max: 1 },
            },
        ];
        let mut pc_writer = writer.add_pointcloud("scan_guid", prototype).unwrap();
        for (i, invalid) in [0, 1, 0].into_iter().enumerate() {
            pc_writer
                .add_point(vec![
                    RecordValue::Single(i as f32),
                    RecordValue::Single(0.0),
                    RecordValue::Single(0.0),
                    RecordValue::Integer(0),
                    RecordValue::Integer(255),
                    RecordValue::Integer(0),
                    RecordValue::Integer(invalid),
                ])
                .unwrap();
        }
        pc_writer.finalize().unwrap();
        writer.finalize().unwrap();

        let pointcloud = read_e57(&path, &E57ReadOptions::default()).unwrap();
        let colors = pointcloud.colors().unwrap();
        assert_eq!(colors.len(), pointcloud.len());
        assert_eq!(colors[0], [0, 255, 0]);
        assert_eq!(colors[1], INVALID_COLOR);
        assert_eq!(colors[2], [0, 255, 0]);

        let options = E57ReadOptions {
            read_colors: false,
            ..Default::default()
        };
        assert!(read_e57(&path, &options).unwrap().colors().is_none());
    }

    #[test]
    fn test_spherical_scan_to_cartesian() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.e57");

        let mut writer = E57Writer::from_file(&path, "file_guid").unwrap();
        let prototype = vec![
            Record::SPHERICAL_AZIMUTH_F64,
            Record::SPHERICAL_ELEVATION_F64,
            Record::SPHERICAL_RANGE_F64,
        ];
        let mut pc_writer = writer.add_pointcloud("scan_guid", prototype).unwrap();
        // (azimuth, elevation, range)
        let samples = [
            (0.0, 0.0, 2.0),
            (std::f64::consts::FRAC_PI_2, 0.0, 3.0),
            (0.0, std::f64::consts::FRAC_PI_2, 1.5),
        ];
        for (azimuth, elevation, range) in samples {
            pc_writer
                .add_point(vec![
                    RecordValue::Double(azimuth),
                    RecordValue::Double(elevation),
                    RecordValue::Double(range),
                ])
                .unwrap();
        }
        pc_writer.finalize().unwrap();
        writer.finalize().unwrap();

        let pointcloud = read_e57(&path, &E57ReadOptions::default()).unwrap();
        assert_eq!(pointcloud.len(), 3);
        let expected = [[2.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 1.5]];
        for (p, e) in pointcloud.points().iter().zip(expected) {
            for k in 0..3 {
                assert_abs_diff_eq!(p[k], e[k], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_skip_direction_and_invalid_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.e57");

        let mut writer = E57Writer::from_file(&path, "file_guid").unwrap();
        let prototype = vec![
            Record::CARTESIAN_X_F64,
            Record::CARTESIAN_Y_F64,
            Record::CARTESIAN_Z_F64,
            Record::CARTESIAN_INVALID_STATE,
        ];
        let mut pc_writer = writer.add_pointcloud("scan_guid", prototype).unwrap();
        // 0 = valid, 1 = direction only, 2 = invalid
        for (i, state) in [0, 1, 2, 0].into_iter().enumerate() {
            pc_writer
                .add_point(vec![
                    RecordValue::Double(i as f64),
                    RecordValue::Double(1.0),
                    RecordValue::Double(1.0),
                    RecordValue::Integer(state),
                ])
                .unwrap();
        }
        pc_writer.finalize().unwrap();
        writer.finalize().unwrap();

        let pointcloud = read_e57(&path, &E57ReadOptions::default()).unwrap();
        assert_eq!(pointcloud.points(), &vec![[0.0, 1.0, 1.0], [3.0, 1.0, 1.0]]);
    }

    #[test]
    fn test_apply_pose() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.e57");

        let mut writer = E57Writer::from_file(&path, "file_guid").unwrap();
        let prototype = vec![
            Record::CARTESIAN_X_F64,
            Record::CARTESIAN_Y_F64,
            Record::CARTESIAN_Z_F64,
        ];
        let mut pc_writer = writer.add_pointcloud("scan_guid", prototype).unwrap();
        // 90 degrees around z, then shifted along x
        let half = std::f64::consts::FRAC_PI_4;
        pc_writer.set_transform(Some(Transform {
            rotation: Quaternion {
                w: half.cos(),
                x: 0.0,
                y: 0.0,
                z: half.sin(),
            },
            translation: Translation {
                x: 10.0,
                y: 0.0,
                z: 0.0,
            },
        }));
        pc_writer
            .add_point(vec![
                RecordValue::Double(1.0),
                RecordValue::Double(0.0),
                RecordValue::Double(2.0),
            ])
            .unwrap();
        pc_writer.finalize().unwrap();
        writer.finalize().unwrap();

        let posed = read_e57(&path, &E57ReadOptions::default()).unwrap();
        let p = posed.points()[0];
        assert_abs_diff_eq!(p[0], 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p[1], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p[2], 2.0, epsilon = 1e-9);

        let options = E57ReadOptions {
            apply_pose: false,
            ..Default::default()
        };
        let local = read_e57(&path, &options).unwrap();
        assert_eq!(local.points()[0], [1.0, 0.0, 2.0]);
    }

    #[test]
    fn test_unit_to_u8() {
        assert_eq!(unit_to_u8(0.0), 0);
        assert_eq!(unit_to_u8(1.0), 255);
        assert_eq!(unit_to_u8(2.0), 255);
        assert_eq!(unit_to_u8(-1.0), 0);
    }
}
