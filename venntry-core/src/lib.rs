//! Venntry Core - Catalog Entity Types
//!
//! Pure data structures shared by every other crate: identifiers, the
//! catalog aggregates, and the error taxonomy. No I/O lives here.

pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;

pub use entities::*;
pub use enums::*;
pub use error::*;
pub use identity::*;
