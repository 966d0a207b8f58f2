//! Saving and restoring the CPU floating-point rounding direction.
//!
//! The library does no floating-point arithmetic itself, but it owns the
//! process-wide rounding direction between `initialize` and `finalize` so
//! that scalar kernels layered on top observe a known state.

/// Opaque snapshot of the FP control/status state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FpuState(u32);

#[cfg(target_arch = "x86_64")]
pub fn save_rounding_mode() -> FpuState {
    // MXCSR holds the SSE rounding-control bits.
    FpuState(unsafe { core::arch::x86_64::_mm_getcsr() })
}

#[cfg(target_arch = "x86_64")]
pub fn restore_rounding_mode(state: FpuState) {
    unsafe { core::arch::x86_64::_mm_setcsr(state.0) }
}

#[cfg(not(target_arch = "x86_64"))]
pub fn save_rounding_mode() -> FpuState {
    FpuState(0)
}

#[cfg(not(target_arch = "x86_64"))]
pub fn restore_rounding_mode(_state: FpuState) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_restore_round_trips() {
        let saved = save_rounding_mode();
        restore_rounding_mode(saved);
        assert_eq!(save_rounding_mode(), saved);
    }
}
