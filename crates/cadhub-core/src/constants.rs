//! Global constants for cadhub-core
//!
//! Parameter short names are shared with the CAD templates' own parameter
//! sets and must match exactly (case-sensitive).

/// Shape kind
pub const KIND: &str = "kind";
/// Length
pub const LENGTH: &str = "len";
/// Width or diameter
pub const WIDTH_OR_DIAMETER: &str = "wid_diam";
/// Height
pub const HEIGHT: &str = "height";
/// Supporting length
pub const LENGTH_SUPPORT: &str = "len_supp";
/// Angle
pub const ANGLE: &str = "ang";
/// Supporting angle
pub const ANGLE_SUPPORT: &str = "ang_supp";
/// Wall thickness
pub const THICKNESS: &str = "thickn";
/// External shape reference
pub const EXTERNAL_SHAPE: &str = "ext_shape";
/// Mass
pub const MASS: &str = "mass";
/// Volume
pub const VOLUME: &str = "volume";
/// Moment of inertia
pub const MOMENT_OF_INERTIA: &str = "MoI";
/// Center of gravity
pub const CENTER_OF_GRAVITY: &str = "CoG";
/// Orientation matrix (9 values, row-major)
pub const ORIENTATION: &str = "orientation";
/// Position vector (3 values)
pub const POSITION: &str = "position";

/// Aggregate mass variants published by assemblies
pub const MASS_VARIANTS: &[&str] = &["m", "mass_margin", "mass_with_margin", "dry_mass", "wet_mass"];

/// Suffix every template artifact carries after the shape kind tag
pub const TEMPLATE_SUFFIX: &str = "template";

/// Extension of assembly documents
pub const PRODUCT_EXTENSION: &str = "CATProduct";

/// Extension of part documents
pub const PART_EXTENSION: &str = "CATPart";

/// Tolerance used when comparing real parameter values and positions
pub const VALUE_TOLERANCE: f64 = 1e-9;
