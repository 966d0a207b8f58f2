pub mod row;
pub mod system;

pub use row::{
    homogeneous_scalar_product, reduced_scalar_product, scalar_product, LinearRow, RowKind,
    Topology,
};
pub use system::LinearSystem;
