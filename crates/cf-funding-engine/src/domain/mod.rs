//! # Domain Module
//!
//! Projects, milestones, funding rules and the error taxonomy.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod lifecycle;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use lifecycle::*;
pub use value_objects::*;
