//! CAD Hub Bridge Core
//!
//! This crate keeps a CAD product tree in step with hub parameters:
//! - Unit-value codec and typed parameter values
//! - Shape resolution from parameter sets
//! - Template lookup and installation
//! - Mirror tree of the CAD product graph
//! - Add-or-update synchronizer with change history
//! - Connection context, colors, materials and settings

pub mod cancel;
pub mod color;
pub mod config;
pub mod connection;
pub mod constants;
pub mod error;
pub mod history;
pub mod material;
pub mod parameter;
pub mod shape;
pub mod sync;
pub mod template;
pub mod tree;
pub mod units;

pub use cancel::*;
pub use color::*;
pub use config::*;
pub use connection::*;
pub use error::*;
pub use history::*;
pub use material::*;
pub use parameter::*;
pub use shape::*;
pub use sync::*;
pub use template::*;
pub use tree::*;
pub use units::DoubleWithUnit;
