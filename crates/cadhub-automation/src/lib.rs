//! CAD Automation Abstraction
//!
//! This crate provides:
//! - Opaque handle tokens for documents, products and bodies
//! - The `CadAutomation` trait over the application's object graph
//! - An in-memory backend for tests and offline runs
//! - A single-thread apartment that serializes every automation call

pub mod apartment;
pub mod backend;
pub mod traits;

// Re-exports for convenience
pub use apartment::{ApartmentError, ApartmentHandle, ApartmentThread};
pub use backend::{
    MemoryBody, MemoryDocument, MemoryParameter, MemoryProduct, MemorySession, SessionError,
};
pub use traits::{
    AutomationError, AutomationResult, AutomationValue, BodyHandle, CadAutomation, Color,
    ColorProperties, DetachedAutomation, DocumentHandle, DocumentInfo, IDENTITY_POSITION,
    PositionComponents, ProductHandle, ProductInfo, RawParameter,
};
