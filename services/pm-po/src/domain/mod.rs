//! 领域层

pub mod entities;
pub mod numbering;
pub mod reconciliation;
pub mod repositories;
pub mod totals;
pub mod unit_of_work;
pub mod value_objects;

pub use entities::*;
pub use repositories::*;
pub use unit_of_work::*;
pub use value_objects::*;
