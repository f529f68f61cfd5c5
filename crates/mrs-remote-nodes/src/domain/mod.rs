//! # Domain Module
//!
//! Core domain types for remote node confirmation.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod request;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use request::*;
pub use value_objects::*;
