//! Class and metadata builders shared by unit and integration tests.

mod builders;
mod factories;

pub use builders::*;
pub use factories::*;
