//! Mesh payloads.
//!
//! Structured meshes ([`LatVolMesh`], [`ImageMesh`]) store their resolution
//! and a [`Transform`] from index space to world space; node positions are
//! computed on demand. Transforming a structured mesh composes into that
//! transform instead of touching every node.

use glam::DVec3;
use strata_core::Payload;
use strata_transform::Transform;

use crate::bbox::BBox;

/// Index-space to world-space transform placing node `0` at `min` and node
/// `n - 1` at `max` on each axis.
fn lattice_transform(counts: DVec3, min: DVec3, max: DVec3) -> Transform {
    let steps = (counts - DVec3::ONE).max(DVec3::ONE);
    let mut t = Transform::IDENTITY;
    t.pre_scale((max - min) / steps).pre_translate(min);
    t
}

/// Regular volumetric lattice with `ni * nj * nk` nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct LatVolMesh {
    ni: usize,
    nj: usize,
    nk: usize,
    transform: Transform,
}

impl LatVolMesh {
    /// Creates a lattice spanning the box `[min, max]`.
    pub fn new(ni: usize, nj: usize, nk: usize, min: DVec3, max: DVec3) -> Self {
        let counts = DVec3::new(ni as f64, nj as f64, nk as f64);
        Self {
            ni,
            nj,
            nk,
            transform: lattice_transform(counts, min, max),
        }
    }

    /// Node count along i.
    pub fn ni(&self) -> usize {
        self.ni
    }

    /// Node count along j.
    pub fn nj(&self) -> usize {
        self.nj
    }

    /// Node count along k.
    pub fn nk(&self) -> usize {
        self.nk
    }

    /// Index-to-world transform.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// World position of node `(i, j, k)`.
    pub fn node(&self, i: usize, j: usize, k: usize) -> DVec3 {
        self.transform
            .transform_point(DVec3::new(i as f64, j as f64, k as f64))
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.ni.saturating_mul(self.nj).saturating_mul(self.nk)
    }

    /// Number of hexahedral cells.
    pub fn cell_count(&self) -> usize {
        self.ni
            .saturating_sub(1)
            .saturating_mul(self.nj.saturating_sub(1))
            .saturating_mul(self.nk.saturating_sub(1))
    }

    fn corners(&self) -> Vec<DVec3> {
        if self.node_count() == 0 {
            return Vec::new();
        }
        let (ei, ej, ek) = (self.ni - 1, self.nj - 1, self.nk - 1);
        let mut corners = Vec::with_capacity(8);
        for i in [0, ei] {
            for j in [0, ej] {
                for k in [0, ek] {
                    corners.push(self.node(i, j, k));
                }
            }
        }
        corners
    }
}

/// Regular 2D lattice of `ni * nj` nodes lying in its local z = 0 plane.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMesh {
    ni: usize,
    nj: usize,
    transform: Transform,
}

impl ImageMesh {
    /// Creates an image spanning `[min, max]`; the z components are ignored.
    pub fn new(ni: usize, nj: usize, min: DVec3, max: DVec3) -> Self {
        let counts = DVec3::new(ni as f64, nj as f64, 1.0);
        let min = min.truncate().extend(0.0);
        let max = max.truncate().extend(0.0);
        Self {
            ni,
            nj,
            transform: lattice_transform(counts, min, max),
        }
    }

    /// Node count along i.
    pub fn ni(&self) -> usize {
        self.ni
    }

    /// Node count along j.
    pub fn nj(&self) -> usize {
        self.nj
    }

    /// Index-to-world transform.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// World position of node `(i, j)`.
    pub fn node(&self, i: usize, j: usize) -> DVec3 {
        self.transform
            .transform_point(DVec3::new(i as f64, j as f64, 0.0))
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.ni.saturating_mul(self.nj)
    }

    /// Number of quadrilateral faces.
    pub fn face_count(&self) -> usize {
        self.ni.saturating_sub(1).saturating_mul(self.nj.saturating_sub(1))
    }

    fn corners(&self) -> Vec<DVec3> {
        if self.node_count() == 0 {
            return Vec::new();
        }
        let (ei, ej) = (self.ni - 1, self.nj - 1);
        vec![
            self.node(0, 0),
            self.node(ei, 0),
            self.node(0, ej),
            self.node(ei, ej),
        ]
    }
}

/// Unstructured set of points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloudMesh {
    /// Point positions.
    pub points: Vec<DVec3>,
}

impl PointCloudMesh {
    /// Creates a point cloud.
    pub fn new(points: Vec<DVec3>) -> Self {
        Self { points }
    }
}

/// Discriminant of a [`Mesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshKind {
    /// Regular volumetric lattice.
    LatVol,
    /// Regular 2D lattice.
    Image,
    /// Unstructured points.
    PointCloud,
}

/// Any supported mesh.
#[derive(Debug, Clone, PartialEq)]
pub enum Mesh {
    /// Regular volumetric lattice.
    LatVol(LatVolMesh),
    /// Regular 2D lattice.
    Image(ImageMesh),
    /// Unstructured points.
    PointCloud(PointCloudMesh),
}

impl Payload for Mesh {
    const TYPE_NAME: &'static str = "Mesh";
}

impl Mesh {
    /// Which kind of mesh this is.
    pub fn kind(&self) -> MeshKind {
        match self {
            Mesh::LatVol(_) => MeshKind::LatVol,
            Mesh::Image(_) => MeshKind::Image,
            Mesh::PointCloud(_) => MeshKind::PointCloud,
        }
    }

    /// The lattice, if this is a LatVol mesh.
    pub fn as_latvol(&self) -> Option<&LatVolMesh> {
        match self {
            Mesh::LatVol(m) => Some(m),
            _ => None,
        }
    }

    /// The image, if this is an image mesh.
    pub fn as_image(&self) -> Option<&ImageMesh> {
        match self {
            Mesh::Image(m) => Some(m),
            _ => None,
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        match self {
            Mesh::LatVol(m) => m.node_count(),
            Mesh::Image(m) => m.node_count(),
            Mesh::PointCloud(m) => m.points.len(),
        }
    }

    /// Number of top-dimensional elements (cells, faces or points).
    pub fn element_count(&self) -> usize {
        match self {
            Mesh::LatVol(m) => m.cell_count(),
            Mesh::Image(m) => m.face_count(),
            Mesh::PointCloud(m) => m.points.len(),
        }
    }

    /// All node positions in index order, i fastest.
    pub fn node_positions(&self) -> Vec<DVec3> {
        match self {
            Mesh::LatVol(m) => {
                let mut out = Vec::with_capacity(m.node_count());
                for k in 0..m.nk {
                    for j in 0..m.nj {
                        for i in 0..m.ni {
                            out.push(m.node(i, j, k));
                        }
                    }
                }
                out
            }
            Mesh::Image(m) => {
                let mut out = Vec::with_capacity(m.node_count());
                for j in 0..m.nj {
                    for i in 0..m.ni {
                        out.push(m.node(i, j));
                    }
                }
                out
            }
            Mesh::PointCloud(m) => m.points.clone(),
        }
    }

    /// Bounding box of all nodes.
    pub fn bounding_box(&self) -> BBox {
        match self {
            Mesh::LatVol(m) => BBox::from_points(m.corners()),
            Mesh::Image(m) => BBox::from_points(m.corners()),
            Mesh::PointCloud(m) => BBox::from_points(m.points.iter().copied()),
        }
    }

    /// Applies `t` after the mesh's current placement.
    pub fn transform(&mut self, t: &Transform) {
        match self {
            Mesh::LatVol(m) => {
                m.transform.pre_transform(t);
            }
            Mesh::Image(m) => {
                m.transform.pre_transform(t);
            }
            Mesh::PointCloud(m) => {
                for p in &mut m.points {
                    *p = t.transform_point(*p);
                }
            }
        }
    }
}

impl From<LatVolMesh> for Mesh {
    fn from(m: LatVolMesh) -> Self {
        Mesh::LatVol(m)
    }
}

impl From<ImageMesh> for Mesh {
    fn from(m: ImageMesh) -> Self {
        Mesh::Image(m)
    }
}

impl From<PointCloudMesh> for Mesh {
    fn from(m: PointCloudMesh) -> Self {
        Mesh::PointCloud(m)
    }
}
