#![allow(clippy::len_without_is_empty)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

//! Numerical abstract domains over exact rational arithmetic: convex
//! polyhedra and grids in dual representation, interval boxes, bounded
//! difference and octagonal shapes, finite unions and reduced products.

pub mod abandon;
pub mod bd_shape;
pub mod bit_matrix;
pub mod boxes;
pub mod congruence;
pub mod constraint;
pub mod domain;
pub mod error;
pub mod expr;
pub mod generator;
pub mod grid;
pub mod grid_generator;
pub mod init;
pub mod interval;
pub mod linear;
pub mod mip;
pub mod octagonal_shape;
pub mod polyhedron;
pub mod powerset;
pub mod product;
pub mod relation;

pub use bd_shape::BdShape;
pub use boxes::{Complexity, IntervalBox};
pub use domain::{AbstractDomain, RationalBox};
pub use congruence::{Congruence, CongruenceSystem};
pub use constraint::{Constraint, ConstraintSystem, ConstraintType};
pub use error::{Error, Result};
pub use expr::{LinearExpr, Variable};
pub use generator::{Generator, GeneratorSystem, GeneratorType};
pub use grid::Grid;
pub use grid_generator::{GridGenerator, GridGeneratorSystem, GridGeneratorType};
pub use linear::{RowKind, Topology};
pub use octagonal_shape::OctagonalShape;
pub use polyhedron::Polyhedron;
pub use powerset::Powerset;
pub use product::{
    ConstraintsReduction, NoReduction, PartiallyReducedProduct, Reduction, SmashReduction,
};
pub use relation::{PolyConRelation, PolyGenRelation, RelSym};
