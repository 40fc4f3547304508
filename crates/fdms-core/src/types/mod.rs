//! Input data types and analysis policies.

mod policy;
mod roi;
mod stack;

pub use policy::*;
pub use roi::*;
pub use stack::*;
