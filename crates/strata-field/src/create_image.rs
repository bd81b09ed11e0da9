//! The CreateImage generator.
//!
//! Builds a 2D image mesh and a zero-valued field on it, sized and placed
//! either from parameters, from an optional input field's lattice, or along a
//! custom center/normal pair.
//!
//! The placement transform is composed in a fixed order. For the X, Y and Z
//! axes: rotate the local XY plane onto the axis, scale by the input field's
//! bounding-box diagonal, translate to the slice position. For the custom
//! axis: scale by the diagonal's largest component, map local z onto the
//! plane normal through a change of basis, translate to the center.

use glam::{DMat3, DVec3};
use strata_core::{
    Algorithm, AlgorithmError, AlgorithmOutput, AlgorithmParameters, DenseMatrix, ExecutionContext,
    Handle, Module, ModuleError, ModuleInfo, ModuleState, ParameterName, PortDescriptor,
    StateSchema, StateUpdates, Warnings,
};
use strata_transform::{Transform, safe_normalize};

use crate::field::{BasisOrder, DataType, Field};
use crate::mesh::{ImageMesh, LatVolMesh, Mesh};

pub const WIDTH: ParameterName = ParameterName::new("Width");
pub const HEIGHT: ParameterName = ParameterName::new("Height");
pub const DEPTH: ParameterName = ParameterName::new("Depth");
pub const PAD_PERCENT: ParameterName = ParameterName::new("PadPercent");
pub const MODE: ParameterName = ParameterName::new("Mode");
pub const AXIS: ParameterName = ParameterName::new("Axis");
pub const CENTER_X: ParameterName = ParameterName::new("CenterX");
pub const CENTER_Y: ParameterName = ParameterName::new("CenterY");
pub const CENTER_Z: ParameterName = ParameterName::new("CenterZ");
pub const NORMAL_X: ParameterName = ParameterName::new("NormalX");
pub const NORMAL_Y: ParameterName = ParameterName::new("NormalY");
pub const NORMAL_Z: ParameterName = ParameterName::new("NormalZ");
pub const POSITION: ParameterName = ParameterName::new("Position");
pub const INDEX: ParameterName = ParameterName::new("Index");
pub const DATA_LOCATION: ParameterName = ParameterName::new("DataLocation");

pub const INPUT_FIELD: &str = "InputField";
pub const SIZE_MATRIX: &str = "SizeMatrix";
pub const OV_MATRIX: &str = "OVMatrix";
pub const OUTPUT_FIELD: &str = "OutputField";

/// Seed cross products shorter than this (squared) are re-picked.
const DEGENERATE_SEED: f64 = 1.0e-6;

/// How the image resolution is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingMode {
    /// Width and height come from parameters.
    Manual,
    /// Width, height and depth are inferred from a LatVol input.
    Auto,
}

impl SizingMode {
    /// Legal option strings.
    pub const OPTIONS: &'static [&'static str] = &["Manual", "Auto"];

    /// Option string for this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            SizingMode::Manual => "Manual",
            SizingMode::Auto => "Auto",
        }
    }

    /// Parses an option string.
    pub fn parse(s: &str) -> Result<Self, AlgorithmError> {
        match s {
            "Manual" => Ok(SizingMode::Manual),
            "Auto" => Ok(SizingMode::Auto),
            _ => Err(AlgorithmError::Configuration(format!("unrecognized Mode {s:?}"))),
        }
    }
}

/// Orientation of the image plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAxis {
    /// Plane perpendicular to x.
    X,
    /// Plane perpendicular to y.
    Y,
    /// Plane perpendicular to z.
    Z,
    /// Plane given by a center and normal.
    Custom,
}

impl ImageAxis {
    /// Legal option strings.
    pub const OPTIONS: &'static [&'static str] = &["X", "Y", "Z", "Custom"];

    /// Option string for this axis.
    pub fn as_str(self) -> &'static str {
        match self {
            ImageAxis::X => "X",
            ImageAxis::Y => "Y",
            ImageAxis::Z => "Z",
            ImageAxis::Custom => "Custom",
        }
    }

    /// Parses an option string.
    pub fn parse(s: &str) -> Result<Self, AlgorithmError> {
        match s {
            "X" => Ok(ImageAxis::X),
            "Y" => Ok(ImageAxis::Y),
            "Z" => Ok(ImageAxis::Z),
            "Custom" => Ok(ImageAxis::Custom),
            _ => Err(AlgorithmError::Configuration(format!("unrecognized Axis {s:?}"))),
        }
    }

    /// Coordinate index of an aligned axis.
    pub fn index(self) -> Option<usize> {
        match self {
            ImageAxis::X => Some(0),
            ImageAxis::Y => Some(1),
            ImageAxis::Z => Some(2),
            ImageAxis::Custom => None,
        }
    }

    /// Rotation `(angle, axis)` taking the local XY plane onto this axis's
    /// plane.
    pub fn rotation(self) -> Option<(f64, DVec3)> {
        match self {
            ImageAxis::X => Some((-0.5 * std::f64::consts::PI, DVec3::Y)),
            ImageAxis::Y => Some((0.5 * std::f64::consts::PI, DVec3::X)),
            ImageAxis::Z => Some((0.0, DVec3::Z)),
            ImageAxis::Custom => None,
        }
    }
}

/// Where the output field stores its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataLocation {
    /// One sample per node.
    Nodes,
    /// One sample per face.
    Faces,
    /// No samples.
    None,
}

impl DataLocation {
    /// Legal option strings.
    pub const OPTIONS: &'static [&'static str] = &["Nodes", "Faces", "None"];

    /// Parses an option string.
    pub fn parse(s: &str) -> Result<Self, AlgorithmError> {
        match s {
            "Nodes" => Ok(DataLocation::Nodes),
            "Faces" => Ok(DataLocation::Faces),
            "None" => Ok(DataLocation::None),
            _ => Err(AlgorithmError::Configuration(format!(
                "unsupported data location {s:?}"
            ))),
        }
    }

    /// Basis order of the output field.
    pub fn basis(self) -> BasisOrder {
        match self {
            DataLocation::Nodes => BasisOrder::Linear,
            DataLocation::Faces => BasisOrder::Constant,
            DataLocation::None => BasisOrder::NoData,
        }
    }
}

/// Declares every CreateImage parameter with its default.
pub fn declare_parameters(schema: &mut StateSchema) {
    schema
        .declare(&WIDTH, 20)
        .declare(&HEIGHT, 20)
        .declare(&DEPTH, 2)
        .declare_real(&PAD_PERCENT, 0.0)
        .declare_option(&MODE, "Manual", SizingMode::OPTIONS)
        .declare_option(&AXIS, "X", ImageAxis::OPTIONS)
        .declare_real(&CENTER_X, 0.0)
        .declare_real(&CENTER_Y, 0.0)
        .declare_real(&CENTER_Z, 0.0)
        .declare_real(&NORMAL_X, 1.0)
        .declare_real(&NORMAL_Y, 1.0)
        .declare_real(&NORMAL_Z, 1.0)
        .declare_real(&POSITION, 0.0)
        .declare(&INDEX, 0)
        .declare_option(&DATA_LOCATION, "Nodes", DataLocation::OPTIONS);
}

/// Parameters read by [`CreateImage`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreateImageParams {
    pub width: i64,
    pub height: i64,
    pub depth: i64,
    pub pad_percent: f64,
    pub mode: SizingMode,
    pub axis: ImageAxis,
    pub center: DVec3,
    pub normal: DVec3,
    /// Slice position along the axis, -1 at the low face and 1 at the high.
    pub position: f64,
    pub index: i64,
    pub data_location: DataLocation,
}

impl AlgorithmParameters for CreateImageParams {
    fn from_state(state: &ModuleState) -> Result<Self, AlgorithmError> {
        Ok(Self {
            width: state.get_int(&WIDTH)?,
            height: state.get_int(&HEIGHT)?,
            depth: state.get_int(&DEPTH)?,
            pad_percent: state.get_real(&PAD_PERCENT)?,
            mode: SizingMode::parse(state.get_option(&MODE)?)?,
            axis: ImageAxis::parse(state.get_option(&AXIS)?)?,
            center: DVec3::new(
                state.get_real(&CENTER_X)?,
                state.get_real(&CENTER_Y)?,
                state.get_real(&CENTER_Z)?,
            ),
            normal: DVec3::new(
                state.get_real(&NORMAL_X)?,
                state.get_real(&NORMAL_Y)?,
                state.get_real(&NORMAL_Z)?,
            ),
            position: state.get_real(&POSITION)?,
            index: state.get_int(&INDEX)?,
            data_location: DataLocation::parse(state.get_option(&DATA_LOCATION)?)?,
        })
    }
}

/// Inputs to [`CreateImage`]; all optional.
#[derive(Debug, Clone, Default)]
pub struct CreateImageInputs {
    /// Field whose bounds and lattice size the image.
    pub field: Option<Handle<Field>>,
    /// 1x1 (square) or 2x1 (width, height) resolution.
    pub size: Option<Handle<DenseMatrix>>,
    /// 2x3 matrix: row 0 is the center, row 1 the normal.
    pub center_normal: Option<Handle<DenseMatrix>>,
}

/// Generates an image field.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateImage;

impl Algorithm for CreateImage {
    type Inputs = CreateImageInputs;
    type Parameters = CreateImageParams;
    type Outputs = Handle<Field>;

    fn name(&self) -> &'static str {
        "CreateImage"
    }

    fn run(
        &self,
        inputs: &CreateImageInputs,
        params: &CreateImageParams,
    ) -> Result<AlgorithmOutput<Handle<Field>>, AlgorithmError> {
        let mut warnings = Warnings::new(self.name());
        let mut updates = StateUpdates::new();
        let mut width = params.width;
        let mut height = params.height;
        let mut depth = params.depth;
        let mut mode = params.mode;

        if let Some(size) = &inputs.size {
            (width, height) = image_size(size)?;
            updates.set(&WIDTH, width).set(&HEIGHT, height);
        }

        let mut center = params.center;
        let mut normal = params.normal;
        if let Some(matrix) = &inputs.center_normal {
            (center, normal) = center_and_normal(matrix)?;
        }
        let normal = safe_normalize(normal);

        let mut transform = Transform::IDENTITY;
        if let Some((angle, axis)) = params.axis.rotation() {
            transform.pre_rotate(angle, axis);
        }
        if params.axis == ImageAxis::Custom {
            orient_custom(&mut transform, center, normal, inputs.field.as_deref())?;
        }

        let mut data_type = DataType::Scalar;
        if let Some(field) = &inputs.field {
            data_type = field.data_type();

            if mode == SizingMode::Auto {
                match (field.mesh().as_latvol(), params.axis.index()) {
                    (Some(lattice), Some(axis)) => {
                        let size = auto_size(lattice, axis, field.basis());
                        (width, height, depth) = size;
                        updates
                            .set(&WIDTH, width)
                            .set(&HEIGHT, height)
                            .set(&DEPTH, depth);
                    }
                    (Some(_), None) => warnings.push("Custom axis, resize manually."),
                    (None, _) => {
                        warnings.push("No autosize algorithm for this field type, resize manually.");
                        mode = SizingMode::Manual;
                        updates.set(&MODE, mode.as_str());
                    }
                }
            }

            if let Some(axis) = params.axis.index() {
                let bbox = field.mesh().bounding_box();
                let diagonal = bbox.diagonal();
                if diagonal != DVec3::ZERO {
                    transform.pre_scale(diagonal);
                }
                let position = match mode {
                    SizingMode::Manual => params.position,
                    SizingMode::Auto => {
                        let position = slice_position(params.index, depth, field.basis());
                        updates.set(&POSITION, position);
                        position
                    }
                };
                let mut location = bbox.center();
                location[axis] += diagonal[axis] * position / 2.0;
                transform.pre_translate(location);
            }
        }

        let pad = params.pad_percent / 100.0;
        let mut min = DVec3::new(-0.5, -0.5, 0.0);
        let mut max = DVec3::new(0.5, 0.5, 0.0);
        let extent = (max - min) * pad;
        min -= extent;
        max += extent;

        let (ni, nj) = image_dims(width, height)?;
        let mut mesh = Mesh::from(ImageMesh::new(ni, nj, min, max));
        mesh.transform(&transform);
        log::debug!(
            "{}: {ni}x{nj} image on axis {}, transform {:?}",
            self.name(),
            params.axis.as_str(),
            transform.to_rows_array()
        );

        let field = Field::new(mesh, params.data_location.basis(), data_type);
        Ok(AlgorithmOutput::new(Handle::new(field))
            .with_updates(updates)
            .with_warnings(warnings.into_vec()))
    }
}

/// Reads `(width, height)` from a 1x1 or 2x1 size matrix.
fn image_size(size: &DenseMatrix) -> Result<(i64, i64), AlgorithmError> {
    let entry = |row: usize| {
        let v = size[(row, 0)];
        if v.is_finite() {
            Ok(v as i64)
        } else {
            Err(AlgorithmError::InvalidInput(format!(
                "image size matrix entry {row} is not finite: {v}"
            )))
        }
    };
    match size.shape() {
        (1, 1) => {
            let n = entry(0)?;
            Ok((n, n))
        }
        (2, 1) => Ok((entry(0)?, entry(1)?)),
        (rows, cols) => Err(AlgorithmError::InvalidInput(format!(
            "image size matrix must have only 1 or 2 elements, got {rows}x{cols}"
        ))),
    }
}

/// Node counts for a `width x height` image, at least 2 per side.
///
/// Fails when the samples of the largest value type could not be addressed.
fn image_dims(width: i64, height: i64) -> Result<(usize, usize), AlgorithmError> {
    let too_large =
        || AlgorithmError::InvalidInput(format!("{width}x{height} image is too large"));
    let ni = usize::try_from(width.max(2)).map_err(|_| too_large())?;
    let nj = usize::try_from(height.max(2)).map_err(|_| too_large())?;
    let bytes = ni
        .checked_mul(nj)
        .and_then(|nodes| nodes.checked_mul(size_of::<DMat3>()))
        .ok_or_else(too_large)?;
    if bytes > isize::MAX as usize {
        return Err(too_large());
    }
    Ok((ni, nj))
}

/// Reads the center (row 0) and normal (row 1) from a 2x3 matrix.
fn center_and_normal(matrix: &DenseMatrix) -> Result<(DVec3, DVec3), AlgorithmError> {
    if matrix.shape() != (2, 3) {
        let (rows, cols) = matrix.shape();
        return Err(AlgorithmError::InvalidInput(format!(
            "center and normal matrix must be 2x3 (center in row 0, normal in row 1), got {rows}x{cols}"
        )));
    }
    let row = |r: usize| DVec3::new(matrix[(r, 0)], matrix[(r, 1)], matrix[(r, 2)]);
    Ok((row(0), row(1)))
}

/// Orthonormal in-plane basis `(x, y, n)` for a plane facing away from
/// `normal`. A zero normal yields the canonical frame.
fn custom_frame(normal: DVec3) -> (DVec3, DVec3, DVec3) {
    let n = -normal;
    if n == DVec3::ZERO {
        return (DVec3::X, DVec3::Y, DVec3::Z);
    }
    let mut fake_y = DVec3::Z.cross(n);
    if fake_y.length_squared() < DEGENERATE_SEED {
        fake_y = DVec3::X.cross(n);
    }
    let fake_x = n.cross(fake_y);
    (
        safe_normalize(fake_x),
        safe_normalize(fake_y),
        safe_normalize(n),
    )
}

fn orient_custom(
    transform: &mut Transform,
    center: DVec3,
    normal: DVec3,
    field: Option<&Field>,
) -> Result<(), AlgorithmError> {
    let (fake_x, fake_y, plane_normal) = custom_frame(normal);
    if let Some(field) = field {
        let scale = field.mesh().bounding_box().diagonal().max_element();
        if scale > 0.0 {
            transform.pre_scale(DVec3::splat(scale));
        }
    }
    let frame = Transform::from_basis(DVec3::ZERO, fake_x, fake_y, plane_normal);
    let inverted = frame
        .inverse()
        .ok_or_else(|| AlgorithmError::Logic("custom image frame is singular".into()))?;
    transform
        .change_basis(&inverted)
        .map_err(|e| AlgorithmError::Logic(e.to_string()))?;
    transform.pre_translate(center);
    Ok(())
}

/// In-plane resolution and depth of a lattice sliced across `axis`.
///
/// Depth counts samples: cells for cell-centered data, nodes otherwise.
fn auto_size(lattice: &LatVolMesh, axis: usize, basis: BasisOrder) -> (i64, i64, i64) {
    let n = |count: usize| (count as i64).max(2);
    let (w, h, d) = match axis {
        0 => (n(lattice.nj()), n(lattice.nk()), n(lattice.ni())),
        1 => (n(lattice.ni()), n(lattice.nk()), n(lattice.nj())),
        _ => (n(lattice.ni()), n(lattice.nj()), n(lattice.nk())),
    };
    let depth = if basis == BasisOrder::Constant { d - 1 } else { d };
    (w, h, depth)
}

/// Position in [-1, 1] of sample `index` out of `depth`.
///
/// Cell-centered samples sit half a cell in from the faces; node-centered
/// samples span face to face.
fn slice_position(index: i64, depth: i64, basis: BasisOrder) -> f64 {
    let index = index as f64;
    let depth = depth as f64;
    let fraction = if basis == BasisOrder::Constant {
        (index + 0.5) / depth
    } else {
        index / (depth - 1.0).max(1.0)
    };
    2.0 * fraction - 1.0
}

/// Network module wrapping [`CreateImage`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateImageModule;

impl Module for CreateImageModule {
    fn info(&self) -> ModuleInfo {
        ModuleInfo {
            name: "CreateImage",
            category: "NewField",
            package: "strata",
        }
    }

    fn inputs(&self) -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::optional::<Field>(INPUT_FIELD),
            PortDescriptor::optional::<DenseMatrix>(SIZE_MATRIX),
            PortDescriptor::optional::<DenseMatrix>(OV_MATRIX),
        ]
    }

    fn outputs(&self) -> Vec<PortDescriptor> {
        vec![PortDescriptor::new::<Field>(OUTPUT_FIELD)]
    }

    fn set_state_defaults(&self, schema: &mut StateSchema) {
        declare_parameters(schema);
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<(), ModuleError> {
        let inputs = CreateImageInputs {
            field: ctx.get_optional_input(INPUT_FIELD)?,
            size: ctx.get_optional_input(SIZE_MATRIX)?,
            center_normal: ctx.get_optional_input(OV_MATRIX)?,
        };
        let output = CreateImage.run_with_state(&inputs, ctx.state())?;
        let field = ctx.accept(output)?;
        ctx.send_output(OUTPUT_FIELD, field)
    }
}
