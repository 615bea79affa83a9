use glam::DVec3;

/// A point cloud with points, colors, and normals.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    // The points in the point cloud.
    points: Vec<[f64; 3]>,
    // The colors of the points.
    colors: Option<Vec<[u8; 3]>>,
    // The normals of the points.
    normals: Option<Vec<[f64; 3]>>,
}

/// Error returned when per-point attributes do not match the number of points.
#[derive(Debug, thiserror::Error)]
#[error("Attribute length ({0}) does not match the number of points ({1})")]
pub struct AttributeLengthError(pub usize, pub usize);

impl PointCloud {
    /// Create a new point cloud from points, colors (optional), and normals (optional).
    pub fn new(
        points: Vec<[f64; 3]>,
        colors: Option<Vec<[u8; 3]>>,
        normals: Option<Vec<[f64; 3]>>,
    ) -> Self {
        Self {
            points,
            colors,
            normals,
        }
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &Vec<[f64; 3]> {
        &self.points
    }

    /// Get as reference the colors of the points in the point cloud.
    pub fn colors(&self) -> Option<&Vec<[u8; 3]>> {
        self.colors.as_ref()
    }

    /// Get as reference the normals of the points in the point cloud.
    pub fn normals(&self) -> Option<&Vec<[f64; 3]>> {
        self.normals.as_ref()
    }

    /// Check whether the point cloud carries one normal per point.
    pub fn has_normals(&self) -> bool {
        self.normals
            .as_ref()
            .is_some_and(|normals| normals.len() == self.points.len())
    }

    /// Replace the normals of the point cloud.
    ///
    /// Fails when the number of normals differs from the number of points.
    pub fn set_normals(&mut self, normals: Vec<[f64; 3]>) -> Result<(), AttributeLengthError> {
        if normals.len() != self.points.len() {
            return Err(AttributeLengthError(normals.len(), self.points.len()));
        }
        self.normals = Some(normals);
        Ok(())
    }

    /// Mutable access to the normals, if any.
    pub(crate) fn normals_mut(&mut self) -> Option<&mut Vec<[f64; 3]>> {
        self.normals.as_mut()
    }

    /// Consume the point cloud and return its parts.
    pub fn into_parts(
        self,
    ) -> (
        Vec<[f64; 3]>,
        Option<Vec<[u8; 3]>>,
        Option<Vec<[f64; 3]>>,
    ) {
        (self.points, self.colors, self.normals)
    }

    /// Get the minimum bound of the point cloud.
    pub fn get_min_bound(&self) -> DVec3 {
        if self.points.is_empty() {
            return DVec3::ZERO;
        }
        self.points
            .iter()
            .map(DVec3::from_array_ref)
            .fold(DVec3::splat(f64::INFINITY), |a, b| a.min(b))
    }

    /// Get the maximum bound of the point cloud.
    pub fn get_max_bound(&self) -> DVec3 {
        if self.points.is_empty() {
            return DVec3::ZERO;
        }
        self.points
            .iter()
            .map(DVec3::from_array_ref)
            .fold(DVec3::splat(f64::NEG_INFINITY), |a, b| a.max(b))
    }
}

/// Conversion helper between `[f64; 3]` and `DVec3`.
pub(crate) trait FromArrayRef {
    fn from_array_ref(array: &[f64; 3]) -> Self;
}

impl FromArrayRef for DVec3 {
    #[inline]
    fn from_array_ref(array: &[f64; 3]) -> Self {
        DVec3::new(array[0], array[1], array[2])
    }
}
