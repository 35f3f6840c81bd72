//! CAD automation trait definitions
//!
//! The CAD application exposes an object graph
//! (`Application → Documents → Document → Product → Parameters`).
//! These traits flatten that graph into calls addressed by opaque handle
//! tokens, so callers never own the remote objects.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque token for a document living in the CAD application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentHandle(pub u64);

/// Opaque token for a product (assembly node or part instance)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductHandle(pub u64);

/// Opaque token for the main body of a part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u64);

/// Document properties (`Name`, `Path`, `FullName`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// File name including extension, e.g. `Rover.CATProduct`
    pub name: String,
    /// Directory holding the document
    pub path: PathBuf,
}

impl DocumentInfo {
    /// Full path of the backing file
    pub fn full_name(&self) -> PathBuf {
        self.path.join(&self.name)
    }
}

/// Product properties (`Name`, `PartNumber`, `DescriptionRef`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub name: String,
    pub part_number: String,
    pub description: String,
}

/// A parameter as the CAD application reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawParameter {
    pub name: String,
    /// Result of `ValueAsString()`
    pub value: String,
}

/// Typed value written into a product parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AutomationValue {
    /// Real parameter with its unit suffix (may be empty)
    Real { value: f64, unit: String },
    Boolean(bool),
    Text(String),
}

impl AutomationValue {
    /// Render the value the way `ValueAsString()` does
    pub fn value_as_string(&self) -> String {
        match self {
            AutomationValue::Real { value, unit } => format!("{}{}", value, unit),
            AutomationValue::Boolean(value) => value.to_string(),
            AutomationValue::Text(value) => value.clone(),
        }
    }
}

/// 24-bit RGB color as stored in body graphic properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Create a color from RGB components
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Both color properties of a body; either may be undefined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorProperties {
    pub real: Option<Color>,
    pub visible: Option<Color>,
}

/// Position components as `SetComponents` expects them:
/// the three rotation axes (9 values) followed by the origin (3 values)
pub type PositionComponents = [f64; 12];

/// Identity position
pub const IDENTITY_POSITION: PositionComponents =
    [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];

/// Error type for automation calls
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AutomationError {
    #[error("No running CAD application")]
    NotRunning,

    #[error("Object unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown product handle: {0:?}")]
    UnknownProduct(ProductHandle),

    #[error("Unknown document handle: {0:?}")]
    UnknownDocument(DocumentHandle),

    #[error("Call rejected: {0}")]
    Rejected(String),
}

impl AutomationError {
    /// Whether the failure is the transient "object unavailable" condition
    pub fn is_transient(&self) -> bool {
        matches!(self, AutomationError::Unavailable(_))
    }
}

/// Result type for automation calls
pub type AutomationResult<T> = Result<T, AutomationError>;

/// The CAD automation interface
///
/// Implementations are not expected to be thread safe; see
/// [`ApartmentThread`](crate::ApartmentThread) for serializing calls onto a
/// single owning thread.
pub trait CadAutomation {
    /// Get the name of this backend
    fn name(&self) -> &str;

    /// Check whether an application instance is reachable
    fn is_running(&self) -> bool;

    /// The document currently active in the application
    fn active_document(&self) -> AutomationResult<DocumentHandle>;

    /// Document properties
    fn document(&self, document: DocumentHandle) -> AutomationResult<DocumentInfo>;

    /// Root product of a document
    fn root_product(&self, document: DocumentHandle) -> AutomationResult<ProductHandle>;

    /// Product properties
    fn product(&self, product: ProductHandle) -> AutomationResult<ProductInfo>;

    /// Child products (`Products[]`) in native order
    fn children(&self, product: ProductHandle) -> AutomationResult<Vec<ProductHandle>>;

    /// Document backing the product's reference product
    fn reference_document(&self, product: ProductHandle) -> AutomationResult<DocumentHandle>;

    /// Parameters published by the product
    fn parameters(&self, product: ProductHandle) -> AutomationResult<Vec<RawParameter>>;

    /// Create the parameter or overwrite its value
    fn set_parameter(
        &mut self,
        product: ProductHandle,
        name: &str,
        value: &AutomationValue,
    ) -> AutomationResult<()>;

    /// Current position of the product relative to its parent
    fn position(&self, product: ProductHandle) -> AutomationResult<PositionComponents>;

    /// Move the product
    fn set_position(
        &mut self,
        product: ProductHandle,
        components: PositionComponents,
    ) -> AutomationResult<()>;

    /// Insert an existing file as a new component below `parent`
    fn add_component_from_file(
        &mut self,
        parent: ProductHandle,
        file: &Path,
    ) -> AutomationResult<ProductHandle>;

    /// Main body of a part product, if it has one
    fn main_body(&self, product: ProductHandle) -> AutomationResult<Option<BodyHandle>>;

    /// Real and visible colors of a body
    fn body_colors(
        &self,
        document: DocumentHandle,
        body: BodyHandle,
    ) -> AutomationResult<ColorProperties>;

    /// Set the real color of a body
    fn set_body_color(
        &mut self,
        document: DocumentHandle,
        body: BodyHandle,
        color: Color,
    ) -> AutomationResult<()>;

    /// Material currently applied to the product
    fn material(&self, product: ProductHandle) -> AutomationResult<Option<String>>;

    /// Apply a material from the library
    fn apply_material(&mut self, product: ProductHandle, material: &str) -> AutomationResult<()>;

    /// Names of all materials in a material library
    fn material_library(&self, library: &Path) -> AutomationResult<Vec<String>>;
}

/// A backend used when no application is installed; every call fails
#[derive(Debug, Default)]
pub struct DetachedAutomation;

impl DetachedAutomation {
    fn fail<T>() -> AutomationResult<T> {
        Err(AutomationError::NotRunning)
    }
}

impl CadAutomation for DetachedAutomation {
    fn name(&self) -> &str {
        "detached"
    }

    fn is_running(&self) -> bool {
        false
    }

    fn active_document(&self) -> AutomationResult<DocumentHandle> {
        Self::fail()
    }

    fn document(&self, _document: DocumentHandle) -> AutomationResult<DocumentInfo> {
        Self::fail()
    }

    fn root_product(&self, _document: DocumentHandle) -> AutomationResult<ProductHandle> {
        Self::fail()
    }

    fn product(&self, _product: ProductHandle) -> AutomationResult<ProductInfo> {
        Self::fail()
    }

    fn children(&self, _product: ProductHandle) -> AutomationResult<Vec<ProductHandle>> {
        Self::fail()
    }

    fn reference_document(&self, _product: ProductHandle) -> AutomationResult<DocumentHandle> {
        Self::fail()
    }

    fn parameters(&self, _product: ProductHandle) -> AutomationResult<Vec<RawParameter>> {
        Self::fail()
    }

    fn set_parameter(
        &mut self,
        _product: ProductHandle,
        _name: &str,
        _value: &AutomationValue,
    ) -> AutomationResult<()> {
        Self::fail()
    }

    fn position(&self, _product: ProductHandle) -> AutomationResult<PositionComponents> {
        Self::fail()
    }

    fn set_position(
        &mut self,
        _product: ProductHandle,
        _components: PositionComponents,
    ) -> AutomationResult<()> {
        Self::fail()
    }

    fn add_component_from_file(
        &mut self,
        _parent: ProductHandle,
        _file: &Path,
    ) -> AutomationResult<ProductHandle> {
        Self::fail()
    }

    fn main_body(&self, _product: ProductHandle) -> AutomationResult<Option<BodyHandle>> {
        Self::fail()
    }

    fn body_colors(
        &self,
        _document: DocumentHandle,
        _body: BodyHandle,
    ) -> AutomationResult<ColorProperties> {
        Self::fail()
    }

    fn set_body_color(
        &mut self,
        _document: DocumentHandle,
        _body: BodyHandle,
        _color: Color,
    ) -> AutomationResult<()> {
        Self::fail()
    }

    fn material(&self, _product: ProductHandle) -> AutomationResult<Option<String>> {
        Self::fail()
    }

    fn apply_material(&mut self, _product: ProductHandle, _material: &str) -> AutomationResult<()> {
        Self::fail()
    }

    fn material_library(&self, _library: &Path) -> AutomationResult<Vec<String>> {
        Self::fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_as_string() {
        let real = AutomationValue::Real {
            value: 888.0,
            unit: "mm".into(),
        };
        assert_eq!(real.value_as_string(), "888mm");
        assert_eq!(AutomationValue::Boolean(true).value_as_string(), "true");
        assert_eq!(AutomationValue::Text("56.4".into()).value_as_string(), "56.4");
    }

    #[test]
    fn test_detached_is_not_running() {
        let cad = DetachedAutomation;
        assert!(!cad.is_running());
        assert_eq!(cad.active_document(), Err(AutomationError::NotRunning));
    }

    #[test]
    fn test_transient_classification() {
        assert!(AutomationError::Unavailable("busy".into()).is_transient());
        assert!(!AutomationError::NotRunning.is_transient());
    }
}
