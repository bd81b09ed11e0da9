//! Mesh and field payloads for strata.
//!
//! - [`Mesh`] - LatVol, image and point-cloud meshes
//! - [`Field`] - A mesh with samples placed by a [`BasisOrder`]
//! - [`CreateImage`] - Image-plane generator and its [`CreateImageModule`]

mod bbox;
pub mod create_image;
mod field;
mod mesh;

pub use bbox::BBox;
pub use create_image::{
    CreateImage, CreateImageInputs, CreateImageModule, CreateImageParams, DataLocation, ImageAxis,
    SizingMode,
};
pub use field::{BasisOrder, DataType, Field, FieldValues};
pub use mesh::{ImageMesh, LatVolMesh, Mesh, MeshKind, PointCloudMesh};
