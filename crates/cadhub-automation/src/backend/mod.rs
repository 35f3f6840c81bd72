//! Automation backends

mod memory;

pub use memory::{
    MemoryBody, MemoryDocument, MemoryParameter, MemoryProduct, MemorySession, SessionError,
};
