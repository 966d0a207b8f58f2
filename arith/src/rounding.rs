use serde::{Deserialize, Serialize};

/// Direction in which an inexact scalar operation is allowed to move its
/// result. `NotNeeded` asserts the operation is exact for the scalar kind in
/// use; it is a logic error to perform a lossy operation under it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Rounding {
    Down,
    Up,
    NotNeeded,
}

impl Rounding {
    /// The direction rounding the opposite way.
    pub fn reversed(self) -> Self {
        match self {
            Rounding::Down => Rounding::Up,
            Rounding::Up => Rounding::Down,
            Rounding::NotNeeded => Rounding::NotNeeded,
        }
    }
}

/// How a computed scalar relates to the exact mathematical value.
///
/// `Below`/`Above` admit equality; the strict variants promise the stored
/// value moved off the exact one, which lets interval code close an open
/// bound that rounding has crossed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Rounded {
    Exact,
    Below,
    Above,
    StrictlyBelow,
    StrictlyAbove,
    MinusOverflow,
    PlusOverflow,
}

impl Rounded {
    pub fn is_exact(self) -> bool {
        self == Rounded::Exact
    }

    pub fn is_overflow(self) -> bool {
        matches!(self, Rounded::MinusOverflow | Rounded::PlusOverflow)
    }

    /// Result classification for an inexact outcome in direction `dir`.
    pub fn inexact(dir: Rounding) -> Self {
        match dir {
            Rounding::Down => Rounded::StrictlyBelow,
            Rounding::Up => Rounded::StrictlyAbove,
            Rounding::NotNeeded => unreachable!("lossy operation under Rounding::NotNeeded"),
        }
    }
}

/// Three-valued answer used to carry open/closed information through
/// interval computations before it can be resolved.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Ternary {
    No,
    Maybe,
    Yes,
}

impl Ternary {
    pub fn from_bool(b: bool) -> Self {
        if b {
            Ternary::Yes
        } else {
            Ternary::No
        }
    }

    /// Three-valued disjunction.
    pub fn or(self, other: Ternary) -> Ternary {
        use Ternary::*;
        match (self, other) {
            (Yes, _) | (_, Yes) => Yes,
            (Maybe, _) | (_, Maybe) => Maybe,
            _ => No,
        }
    }

    /// Collapses to a bool, treating `Maybe` as the given default.
    pub fn decide(self, maybe: bool) -> bool {
        match self {
            Ternary::Yes => true,
            Ternary::No => false,
            Ternary::Maybe => maybe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ternary_or() {
        assert_eq!(Ternary::No.or(Ternary::No), Ternary::No);
        assert_eq!(Ternary::No.or(Ternary::Maybe), Ternary::Maybe);
        assert_eq!(Ternary::Maybe.or(Ternary::Yes), Ternary::Yes);
    }

    #[test]
    fn test_reversed() {
        assert_eq!(Rounding::Down.reversed(), Rounding::Up);
        assert_eq!(Rounding::NotNeeded.reversed(), Rounding::NotNeeded);
    }
}
