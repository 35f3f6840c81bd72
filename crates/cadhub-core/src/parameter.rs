//! Parameter values exchanged between the hub and the CAD model

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{self, VALUE_TOLERANCE};
use crate::shape::ShapeKind;
use crate::units::{self, DoubleWithUnit};

/// A typed parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    DoubleWithUnit(DoubleWithUnit),
    Text(String),
    Boolean(bool),
    ShapeKindValue(ShapeKind),
}

impl ParameterValue {
    /// Decode a raw string published under `short_name`
    ///
    /// `kind` always decodes to a shape kind; otherwise numbers win over
    /// booleans, and anything else is kept as text.
    pub fn decode(short_name: &str, raw: &str) -> Self {
        if short_name == constants::KIND {
            return ParameterValue::ShapeKindValue(ShapeKind::from_tag(raw));
        }
        if let Some(number) = units::decode(raw) {
            return ParameterValue::DoubleWithUnit(number);
        }
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => ParameterValue::Boolean(true),
            "false" => ParameterValue::Boolean(false),
            _ => ParameterValue::Text(raw.to_string()),
        }
    }

    /// Numeric magnitude, if this is a real value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::DoubleWithUnit(v) => Some(v.value),
            _ => None,
        }
    }

    /// Value comparison that tolerates float noise
    pub fn same_as(&self, other: &ParameterValue) -> bool {
        match (self, other) {
            (ParameterValue::DoubleWithUnit(a), ParameterValue::DoubleWithUnit(b)) => {
                a.approx_eq(b, VALUE_TOLERANCE)
            }
            _ => self == other,
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterValue::DoubleWithUnit(v) => write!(f, "{}", v),
            ParameterValue::Text(t) => write!(f, "{}", t),
            ParameterValue::Boolean(b) => write!(f, "{}", b),
            ParameterValue::ShapeKindValue(kind) => write!(f, "{}", kind.tag()),
        }
    }
}

/// A parameter as published by the hub: short name and raw value strings
///
/// Scalar parameters carry one value; `position` carries 3 and
/// `orientation` 9 (row-major).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubParameter {
    pub short_name: String,
    pub values: Vec<String>,
}

impl HubParameter {
    /// Single-valued hub parameter
    pub fn scalar(short_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            values: vec![value.into()],
        }
    }

    /// Multi-valued hub parameter
    pub fn compound(short_name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            short_name: short_name.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Decoded parameters keyed by short name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    values: BTreeMap<String, ParameterValue>,
    /// Multi-valued parameters (position, orientation) decoded component-wise
    compounds: BTreeMap<String, Vec<f64>>,
}

fn is_compound(short_name: &str) -> bool {
    short_name == constants::POSITION || short_name == constants::ORIENTATION
}

impl ParameterSet {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode hub parameters
    ///
    /// Components of compound parameters that fail to decode are dropped
    /// along with the whole compound.
    pub fn from_hub(parameters: &[HubParameter]) -> Self {
        let mut set = Self::new();
        for parameter in parameters {
            if is_compound(&parameter.short_name) {
                let components: Option<Vec<f64>> = parameter
                    .values
                    .iter()
                    .map(|v| units::decode(v).map(|d| d.value))
                    .collect();
                match components {
                    Some(components) => {
                        set.compounds.insert(parameter.short_name.clone(), components);
                    }
                    None => tracing::warn!(
                        "Ignoring non-numeric component in '{}'",
                        parameter.short_name
                    ),
                }
            } else if let Some(raw) = parameter.values.first() {
                set.insert(
                    parameter.short_name.clone(),
                    ParameterValue::decode(&parameter.short_name, raw),
                );
            }
        }
        set
    }

    /// Decode parameters read back from a CAD product
    pub fn from_raw<'a>(parameters: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut set = Self::new();
        for (name, raw) in parameters {
            set.insert(name.to_string(), ParameterValue::decode(name, raw));
        }
        set
    }

    /// Insert or replace a scalar parameter
    pub fn insert(&mut self, short_name: impl Into<String>, value: ParameterValue) {
        self.values.insert(short_name.into(), value);
    }

    /// Get a scalar parameter by short name
    pub fn get(&self, short_name: &str) -> Option<&ParameterValue> {
        self.values.get(short_name)
    }

    /// Numeric value of a parameter, if present and numeric
    pub fn number(&self, short_name: &str) -> Option<f64> {
        self.get(short_name).and_then(ParameterValue::as_f64)
    }

    /// Components of a compound parameter
    pub fn compound(&self, short_name: &str) -> Option<&[f64]> {
        self.compounds.get(short_name).map(Vec::as_slice)
    }

    /// Mass, falling back to the aggregate mass variants
    pub fn mass(&self) -> Option<f64> {
        std::iter::once(constants::MASS)
            .chain(constants::MASS_VARIANTS.iter().copied())
            .find_map(|name| self.number(name))
    }

    /// Scalar parameters in short-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters, scalar and compound
    pub fn len(&self) -> usize {
        self.values.len() + self.compounds.len()
    }

    /// No scalar or compound parameter present
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.compounds.is_empty()
    }
}
