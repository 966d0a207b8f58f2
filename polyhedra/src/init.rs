//! Library initialization: the process-wide rounding direction and the
//! zero-dimension singleton values.

use std::sync::Mutex;

use once_cell::sync::Lazy;
use polyhedra_arith::fpu::{self, FpuState};

use crate::congruence::Congruence;
use crate::constraint::Constraint;
use crate::generator::Generator;
use crate::grid_generator::GridGenerator;
use crate::polyhedron::Polyhedron;
use crate::powerset::Powerset;

static SAVED_FPU: Mutex<Option<FpuState>> = Mutex::new(None);

static ZERO_DIM_FALSE_CONSTRAINT: Lazy<Constraint> = Lazy::new(Constraint::zero_dim_false);
static ZERO_DIM_POSITIVITY: Lazy<Constraint> = Lazy::new(Constraint::zero_dim_positivity);
static EPSILON_GEQ_ZERO: Lazy<Constraint> = Lazy::new(|| Constraint::epsilon_geq_zero(0));
static EPSILON_LEQ_ONE: Lazy<Constraint> = Lazy::new(|| Constraint::epsilon_leq_one(0));
static ZERO_DIM_FALSE_CONGRUENCE: Lazy<Congruence> = Lazy::new(Congruence::zero_dim_false);
static ZERO_DIM_INTEGRALITY: Lazy<Congruence> = Lazy::new(Congruence::zero_dim_integrality);
static ZERO_DIM_POINT: Lazy<Generator> = Lazy::new(Generator::zero_dim_point);
static ZERO_DIM_GRID_POINT: Lazy<GridGenerator> = Lazy::new(GridGenerator::zero_dim_point);
static ZERO_DIM_FALSE_POWERSET: Lazy<Powerset<Polyhedron>> =
    Lazy::new(|| Powerset::new_empty(0));

/// Saves the FPU rounding direction and forces every singleton. Idempotent.
pub fn initialize() {
    let mut saved = SAVED_FPU.lock().expect("init lock");
    if saved.is_none() {
        *saved = Some(fpu::save_rounding_mode());
    }
    Lazy::force(&ZERO_DIM_FALSE_CONSTRAINT);
    Lazy::force(&ZERO_DIM_POSITIVITY);
    Lazy::force(&EPSILON_GEQ_ZERO);
    Lazy::force(&EPSILON_LEQ_ONE);
    Lazy::force(&ZERO_DIM_FALSE_CONGRUENCE);
    Lazy::force(&ZERO_DIM_INTEGRALITY);
    Lazy::force(&ZERO_DIM_POINT);
    Lazy::force(&ZERO_DIM_GRID_POINT);
    Lazy::force(&ZERO_DIM_FALSE_POWERSET);
}

/// Restores the rounding direction saved by [`initialize`]; a no-op when
/// initialization never ran.
pub fn finalize() {
    let mut saved = SAVED_FPU.lock().expect("finalize lock");
    if let Some(state) = saved.take() {
        fpu::restore_rounding_mode(state);
    }
}

/// The unsatisfiable 0-dimension constraint `-1 >= 0`.
pub fn zero_dim_false_constraint() -> &'static Constraint {
    &ZERO_DIM_FALSE_CONSTRAINT
}

/// The 0-dimension positivity constraint `1 >= 0`.
pub fn zero_dim_positivity_constraint() -> &'static Constraint {
    &ZERO_DIM_POSITIVITY
}

/// The 0-dimension epsilon lower bound.
pub fn epsilon_geq_zero_constraint() -> &'static Constraint {
    &EPSILON_GEQ_ZERO
}

/// The 0-dimension epsilon upper bound.
pub fn epsilon_leq_one_constraint() -> &'static Constraint {
    &EPSILON_LEQ_ONE
}

/// The unsatisfiable 0-dimension congruence `1 = 0`.
pub fn zero_dim_false_congruence() -> &'static Congruence {
    &ZERO_DIM_FALSE_CONGRUENCE
}

/// The integrality congruence `0 = 0 (mod 1)`.
pub fn zero_dim_integrality_congruence() -> &'static Congruence {
    &ZERO_DIM_INTEGRALITY
}

/// The origin of the 0-dimension space.
pub fn zero_dim_point_generator() -> &'static Generator {
    &ZERO_DIM_POINT
}

/// The grid origin of the 0-dimension space.
pub fn zero_dim_grid_point_generator() -> &'static GridGenerator {
    &ZERO_DIM_GRID_POINT
}

/// The bottom powerset element of the 0-dimension space.
pub fn zero_dim_false_powerset() -> &'static Powerset<Polyhedron> {
    &ZERO_DIM_FALSE_POWERSET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_finalize_idempotent() {
        initialize();
        initialize();
        assert!(zero_dim_false_constraint().is_inconsistent());
        assert!(zero_dim_positivity_constraint().is_tautological());
        assert!(zero_dim_false_congruence().is_inconsistent());
        assert!(zero_dim_integrality_congruence().is_tautological());
        assert!(zero_dim_point_generator().is_point());
        assert!(zero_dim_grid_point_generator().is_point());
        assert!(zero_dim_false_powerset().is_empty().unwrap());
        finalize();
        finalize();
    }
}
