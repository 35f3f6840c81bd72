//! Shape kinds and shape descriptors
//!
//! A shape descriptor is resolved from a decoded parameter set. Resolution is
//! pure: the same set always yields the same descriptor, and nothing here
//! talks to the CAD application.

use std::fmt;

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use cadhub_automation::PositionComponents;

use crate::constants::{self, VALUE_TOLERANCE};
use crate::parameter::{ParameterSet, ParameterValue};

/// Geometry category driving which template artifact is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShapeKind {
    #[default]
    None,
    Box,
    Cylinder,
    Cone,
    Sphere,
    Paraboloid,
    Tetrahedron,
    Wedge,
    Capsule,
    Triangle,
    CylinderSegment,
    SphericalSegment,
    PlanarQuadrilateral,
    DiscSegment,
    ParaboloidSegment,
    Dish,
    Rectangle,
}

impl ShapeKind {
    /// Every kind that can be backed by a template
    pub const TEMPLATED: [ShapeKind; 16] = [
        ShapeKind::Box,
        ShapeKind::Cylinder,
        ShapeKind::Cone,
        ShapeKind::Sphere,
        ShapeKind::Paraboloid,
        ShapeKind::Tetrahedron,
        ShapeKind::Wedge,
        ShapeKind::Capsule,
        ShapeKind::Triangle,
        ShapeKind::CylinderSegment,
        ShapeKind::SphericalSegment,
        ShapeKind::PlanarQuadrilateral,
        ShapeKind::DiscSegment,
        ShapeKind::ParaboloidSegment,
        ShapeKind::Dish,
        ShapeKind::Rectangle,
    ];

    /// Textual tag used in hub values and template file names
    pub fn tag(&self) -> &'static str {
        match self {
            ShapeKind::None => "none",
            ShapeKind::Box => "quadprism",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Cone => "cone",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Paraboloid => "paraboloid",
            ShapeKind::Tetrahedron => "tetrahedron",
            ShapeKind::Wedge => "wedge",
            ShapeKind::Capsule => "capsule",
            ShapeKind::Triangle => "triangle",
            ShapeKind::CylinderSegment => "cylindersegment",
            ShapeKind::SphericalSegment => "sphericalsegment",
            ShapeKind::PlanarQuadrilateral => "planarquadrilateral",
            ShapeKind::DiscSegment => "discsegment",
            ShapeKind::ParaboloidSegment => "paraboloidsegment",
            ShapeKind::Dish => "dish",
            ShapeKind::Rectangle => "rectangle",
        }
    }

    /// Look a kind up by tag or variant name, ignoring case
    ///
    /// Unknown strings map to `None`.
    pub fn from_tag(raw: &str) -> Self {
        let raw = raw.trim();
        Self::TEMPLATED
            .into_iter()
            .find(|kind| {
                raw.eq_ignore_ascii_case(kind.tag()) || raw.eq_ignore_ascii_case(&format!("{:?}", kind))
            })
            .unwrap_or(ShapeKind::None)
    }

    /// Kind carried by the `kind` parameter of a set
    pub fn from_parameters(parameters: &ParameterSet) -> Self {
        match parameters.get(constants::KIND) {
            Some(ParameterValue::ShapeKindValue(kind)) => *kind,
            Some(ParameterValue::Text(text)) => Self::from_tag(text),
            _ => ShapeKind::None,
        }
    }

    /// Short names of the dimensions this kind is normally driven by
    pub fn required_dimensions(&self) -> &'static [&'static str] {
        use constants::{ANGLE, HEIGHT, LENGTH, WIDTH_OR_DIAMETER};
        match self {
            ShapeKind::None => &[],
            ShapeKind::Box | ShapeKind::Tetrahedron | ShapeKind::Wedge => {
                &[LENGTH, WIDTH_OR_DIAMETER, HEIGHT]
            }
            ShapeKind::Cylinder | ShapeKind::Cone | ShapeKind::Paraboloid | ShapeKind::Dish => {
                &[WIDTH_OR_DIAMETER, HEIGHT]
            }
            ShapeKind::Sphere => &[WIDTH_OR_DIAMETER],
            ShapeKind::Capsule
            | ShapeKind::Triangle
            | ShapeKind::PlanarQuadrilateral
            | ShapeKind::Rectangle => &[LENGTH, WIDTH_OR_DIAMETER],
            ShapeKind::CylinderSegment | ShapeKind::ParaboloidSegment => {
                &[WIDTH_OR_DIAMETER, HEIGHT, ANGLE]
            }
            ShapeKind::SphericalSegment | ShapeKind::DiscSegment => &[WIDTH_OR_DIAMETER, ANGLE],
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Position and orientation of an element relative to its parent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub rotation: DMat3,
    pub translation: DVec3,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            rotation: DMat3::IDENTITY,
            translation: DVec3::ZERO,
        }
    }
}

impl Placement {
    /// Create a placement from rotation and translation
    pub fn new(rotation: DMat3, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Build from the `orientation` (row-major) and `position` compounds
    pub fn from_parameters(parameters: &ParameterSet) -> Self {
        let mut placement = Self::default();
        match parameters.compound(constants::ORIENTATION) {
            Some(rows) if rows.len() == 9 => {
                let mut values = [0.0; 9];
                values.copy_from_slice(rows);
                placement.rotation = DMat3::from_cols_array(&values).transpose();
            }
            Some(rows) => tracing::warn!("Orientation has {} values, expected 9", rows.len()),
            None => {}
        }
        match parameters.compound(constants::POSITION) {
            Some(xyz) if xyz.len() == 3 => placement.translation = DVec3::new(xyz[0], xyz[1], xyz[2]),
            Some(xyz) => tracing::warn!("Position has {} values, expected 3", xyz.len()),
            None => {}
        }
        placement
    }

    /// Components in `SetComponents` order: X, Y, Z axes then origin
    pub fn to_components(&self) -> PositionComponents {
        let mut components = [0.0; 12];
        components[..9].copy_from_slice(&self.rotation.to_cols_array());
        components[9..].copy_from_slice(&self.translation.to_array());
        components
    }

    /// Build from components in `SetComponents` order
    pub fn from_components(components: &PositionComponents) -> Self {
        let mut axes = [0.0; 9];
        axes.copy_from_slice(&components[..9]);
        Self {
            rotation: DMat3::from_cols_array(&axes),
            translation: DVec3::new(components[9], components[10], components[11]),
        }
    }

    /// Equal within tolerance
    pub fn approx_eq(&self, other: &Placement) -> bool {
        self.rotation.abs_diff_eq(other.rotation, VALUE_TOLERANCE)
            && self.translation.abs_diff_eq(other.translation, VALUE_TOLERANCE)
    }
}

/// Typed description of a parametric shape
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShapeDescriptor {
    pub kind: ShapeKind,
    pub length: Option<f64>,
    pub width_or_diameter: Option<f64>,
    pub height: Option<f64>,
    pub length_support: Option<f64>,
    pub angle: Option<f64>,
    pub angle_support: Option<f64>,
    pub thickness: Option<f64>,
    pub external_shape: Option<String>,
    pub placement: Placement,
}

impl ShapeDescriptor {
    /// Resolve a descriptor from decoded parameters
    pub fn resolve(parameters: &ParameterSet) -> Self {
        Self::resolve_with_kind(parameters, ShapeKind::from_parameters(parameters))
    }

    /// Resolve with an already decoded kind
    pub fn resolve_with_kind(parameters: &ParameterSet, kind: ShapeKind) -> Self {
        Self {
            kind,
            length: parameters.number(constants::LENGTH),
            width_or_diameter: parameters.number(constants::WIDTH_OR_DIAMETER),
            height: parameters.number(constants::HEIGHT),
            length_support: parameters.number(constants::LENGTH_SUPPORT),
            angle: parameters.number(constants::ANGLE),
            angle_support: parameters.number(constants::ANGLE_SUPPORT),
            thickness: parameters.number(constants::THICKNESS),
            external_shape: parameters
                .get(constants::EXTERNAL_SHAPE)
                .map(ToString::to_string),
            placement: Placement::from_parameters(parameters),
        }
    }

    /// Whether the shape can be synchronized at all
    pub fn is_supported(&self) -> bool {
        self.kind != ShapeKind::None
    }

    /// Dimension value by short name
    pub fn dimension(&self, short_name: &str) -> Option<f64> {
        match short_name {
            constants::LENGTH => self.length,
            constants::WIDTH_OR_DIAMETER => self.width_or_diameter,
            constants::HEIGHT => self.height,
            constants::LENGTH_SUPPORT => self.length_support,
            constants::ANGLE => self.angle,
            constants::ANGLE_SUPPORT => self.angle_support,
            constants::THICKNESS => self.thickness,
            _ => None,
        }
    }

    /// Dimensions the kind is normally driven by but that are unset
    pub fn missing_dimensions(&self) -> Vec<&'static str> {
        self.kind
            .required_dimensions()
            .iter()
            .copied()
            .filter(|name| self.dimension(name).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::HubParameter;
    use approx::assert_relative_eq;

    #[test]
    fn test_kind_lookup() {
        assert_eq!(ShapeKind::from_tag("quadprism"), ShapeKind::Box);
        assert_eq!(ShapeKind::from_tag("QUADPRISM"), ShapeKind::Box);
        assert_eq!(ShapeKind::from_tag("box"), ShapeKind::Box);
        assert_eq!(ShapeKind::from_tag("CylinderSegment"), ShapeKind::CylinderSegment);
        assert_eq!(ShapeKind::from_tag("blob"), ShapeKind::None);
        assert_eq!(ShapeKind::from_tag(""), ShapeKind::None);
    }

    #[test]
    fn test_tags_are_unique() {
        for kind in ShapeKind::TEMPLATED {
            assert_eq!(ShapeKind::from_tag(kind.tag()), kind);
        }
    }

    #[test]
    fn test_empty_set_is_unsupported() {
        let descriptor = ShapeDescriptor::resolve(&ParameterSet::new());
        assert_eq!(descriptor.kind, ShapeKind::None);
        assert!(!descriptor.is_supported());
        assert_eq!(descriptor.placement, Placement::default());
    }

    #[test]
    fn test_resolve_quadprism() {
        let set = ParameterSet::from_hub(&[
            HubParameter::scalar("kind", "quadprism"),
            HubParameter::scalar("height", "888mm"),
            HubParameter::scalar("ext_shape", "56,4"),
        ]);
        let descriptor = ShapeDescriptor::resolve(&set);
        assert_eq!(descriptor.kind, ShapeKind::Box);
        assert_relative_eq!(descriptor.height.unwrap(), 888.0);
        assert_eq!(descriptor.external_shape.as_deref(), Some("56.4"));
        assert!(descriptor.length.is_none());
        assert!(descriptor.is_supported());
        assert_eq!(descriptor.missing_dimensions(), vec!["len", "wid_diam"]);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let set = ParameterSet::from_hub(&[
            HubParameter::scalar("kind", "cylinder"),
            HubParameter::scalar("wid_diam", "0,5 m"),
            HubParameter::scalar("height", "2 m"),
        ]);
        assert_eq!(ShapeDescriptor::resolve(&set), ShapeDescriptor::resolve(&set));
        assert!(ShapeDescriptor::resolve(&set).missing_dimensions().is_empty());
    }

    #[test]
    fn test_placement_from_parameters() {
        let set = ParameterSet::from_hub(&[
            HubParameter::compound("orientation", &["0", "-1", "0", "1", "0", "0", "0", "0", "1"]),
            HubParameter::compound("position", &["10", "20", "30"]),
        ]);
        let placement = Placement::from_parameters(&set);
        // Row-major input: first row is (0, -1, 0)
        assert_relative_eq!(placement.rotation.row(0).y, -1.0);
        assert_relative_eq!(placement.rotation.x_axis.y, 1.0);
        assert_eq!(placement.translation, DVec3::new(10.0, 20.0, 30.0));

        let components = placement.to_components();
        assert_eq!(&components[9..], &[10.0, 20.0, 30.0]);
        assert!(Placement::from_components(&components).approx_eq(&placement));
    }
}
