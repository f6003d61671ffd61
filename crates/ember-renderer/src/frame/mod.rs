//! Frame resources: render targets, completeness checks and SSAO data.

mod resource_set;
mod ssao_kernel;
mod targets;

pub use resource_set::*;
pub use ssao_kernel::*;
pub use targets::*;
