use std::path::PathBuf;

use argh::FromArgs;
use scanmesh_3d::io::e57::ScanSelection;
use scanmesh_3d::normals::KdTreeSearchParam;

/// Ball radii used when no `--radius` is given.
pub const DEFAULT_RADII: [f64; 3] = [0.005, 0.01, 0.02];

#[derive(FromArgs, Debug)]
/// Convert uploaded E57 scans into PLY point clouds and OBJ meshes.
pub struct Args {
    /// address to listen on
    #[argh(option, default = "String::from(\"127.0.0.1\")")]
    pub host: String,

    /// port to listen on
    #[argh(option, default = "5000")]
    pub port: u16,

    /// directory where uploaded E57 files are stored
    #[argh(option, default = "PathBuf::from(\"uploads\")")]
    pub upload_dir: PathBuf,

    /// directory for the converted PLY point clouds
    #[argh(option, default = "PathBuf::from(\"ply_files\")")]
    pub ply_dir: PathBuf,

    /// directory for the reconstructed OBJ meshes
    #[argh(option, default = "PathBuf::from(\"mesh_files\")")]
    pub mesh_dir: PathBuf,

    /// scans with fewer points are rejected
    #[argh(option, default = "5000")]
    pub min_points: usize,

    /// search radius for normal estimation
    #[argh(option, default = "0.1")]
    pub normal_radius: f64,

    /// maximum number of neighbours for normal estimation
    #[argh(option, default = "50")]
    pub normal_max_nn: usize,

    /// neighbours used to orient the normals
    #[argh(option, default = "100")]
    pub orient_k: usize,

    /// ball pivoting radius, repeat for several radii
    #[argh(option)]
    pub radius: Vec<f64>,

    /// index of the scan to convert
    #[argh(option, default = "0")]
    pub scan: usize,

    /// merge every scan of the file instead of reading a single one
    #[argh(switch)]
    pub all_scans: bool,

    /// maximum upload size in megabytes
    #[argh(option, default = "1024")]
    pub max_upload_mb: usize,
}

impl Args {
    /// The conversion parameters selected on the command line.
    pub fn params(&self) -> ConversionParams {
        ConversionParams {
            min_points: self.min_points,
            normal_search: KdTreeSearchParam::Hybrid {
                radius: self.normal_radius,
                max_nn: self.normal_max_nn,
            },
            orient_k: self.orient_k,
            radii: if self.radius.is_empty() {
                DEFAULT_RADII.to_vec()
            } else {
                self.radius.clone()
            },
            scan: if self.all_scans {
                ScanSelection::All
            } else {
                ScanSelection::Index(self.scan)
            },
        }
    }

    /// The storage directories selected on the command line.
    pub fn storage(&self) -> Storage {
        Storage {
            upload_dir: self.upload_dir.clone(),
            ply_dir: self.ply_dir.clone(),
            mesh_dir: self.mesh_dir.clone(),
        }
    }

    /// The upload size limit in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Parameters of the scan to mesh conversion.
#[derive(Debug, Clone)]
pub struct ConversionParams {
    /// Scans with fewer points are rejected.
    pub min_points: usize,
    /// Neighbourhood for normal estimation.
    pub normal_search: KdTreeSearchParam,
    /// Neighbours used to orient the normals.
    pub orient_k: usize,
    /// Ball pivoting radii.
    pub radii: Vec<f64>,
    /// Scans to read from the E57 file.
    pub scan: ScanSelection,
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            min_points: 5000,
            normal_search: KdTreeSearchParam::default(),
            orient_k: 100,
            radii: DEFAULT_RADII.to_vec(),
            scan: ScanSelection::default(),
        }
    }
}

/// Directories where the service keeps its files.
#[derive(Debug, Clone)]
pub struct Storage {
    /// Uploaded E57 files.
    pub upload_dir: PathBuf,
    /// Converted PLY point clouds.
    pub ply_dir: PathBuf,
    /// Reconstructed meshes.
    pub mesh_dir: PathBuf,
}

impl Storage {
    /// Storage with the three directories under `root`.
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            upload_dir: root.join("uploads"),
            ply_dir: root.join("ply_files"),
            mesh_dir: root.join("mesh_files"),
        }
    }

    /// Create the directories if they do not exist.
    pub fn create_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.upload_dir, &self.ply_dir, &self.mesh_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::from_args(&["scanmesh-serve"], &[]).unwrap();
        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 5000);
        assert_eq!(args.max_upload_bytes(), 1024 * 1024 * 1024);

        let params = args.params();
        assert_eq!(params.min_points, 5000);
        assert_eq!(params.orient_k, 100);
        assert_eq!(params.radii, DEFAULT_RADII.to_vec());
        assert_eq!(params.scan, ScanSelection::Index(0));
        assert_eq!(params.normal_search, KdTreeSearchParam::default());

        let storage = args.storage();
        assert_eq!(storage.upload_dir, PathBuf::from("uploads"));
        assert_eq!(storage.ply_dir, PathBuf::from("ply_files"));
        assert_eq!(storage.mesh_dir, PathBuf::from("mesh_files"));
    }

    #[test]
    fn test_repeated_radius_and_all_scans() {
        let args = Args::from_args(
            &["scanmesh-serve"],
            &["--radius", "0.1", "--radius", "0.2", "--all-scans", "--port", "8080"],
        )
        .unwrap();
        let params = args.params();
        assert_eq!(params.radii, vec![0.1, 0.2]);
        assert_eq!(params.scan, ScanSelection::All);
        assert_eq!(args.port, 8080);
    }

    #[test]
    fn test_create_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::under(dir.path());
        storage.create_dirs().unwrap();
        assert!(storage.upload_dir.is_dir());
        assert!(storage.ply_dir.is_dir());
        assert!(storage.mesh_dir.is_dir());
        // idempotent
        storage.create_dirs().unwrap();
    }
}
