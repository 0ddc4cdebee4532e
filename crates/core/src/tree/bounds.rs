#![forbid(unsafe_code)]

// A node's interval in the nested-set encoding. Corrupt intervals must stay
// representable so the integrity checker can count them; `check` reports
// whether the structural invariants hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub lft: i64,
    pub rgt: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoundsError {
    Inverted,
    EvenSpan,
}

impl BoundsError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Inverted => "lft must be strictly less than rgt",
            Self::EvenSpan => "rgt - lft must be odd",
        }
    }
}

impl Bounds {
    pub fn new(lft: i64, rgt: i64) -> Self {
        Self { lft, rgt }
    }

    pub fn check(&self) -> Result<(), BoundsError> {
        if self.lft >= self.rgt {
            return Err(BoundsError::Inverted);
        }
        if (self.rgt - self.lft) % 2 == 0 {
            return Err(BoundsError::EvenSpan);
        }
        Ok(())
    }

    pub fn height(&self) -> i64 {
        self.rgt - self.lft + 1
    }

    pub fn node_count(&self) -> i64 {
        self.height() / 2
    }

    pub fn descendant_count(&self) -> i64 {
        self.node_count() - 1
    }

    pub fn is_leaf(&self) -> bool {
        self.rgt == self.lft + 1
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        self.lft < other.lft && other.rgt < self.rgt
    }

    pub fn contains_value(&self, value: i64) -> bool {
        self.lft <= value && value <= self.rgt
    }
}
