#![forbid(unsafe_code)]

use super::Bounds;

// Gap rule: every bound at or past the cut shifts by `height`. A negative
// height closes a gap.
pub fn gap_shift(bound: i64, cut: i64, height: i64) -> i64 {
    if bound >= cut { bound + height } else { bound }
}

// Relocation of the subtree `[lft, rgt]` so that its new left bound is the
// requested position. `from..=to` is the full range of bounds the move
// touches; bounds inside the original interval shift by `distance`, every
// other bound in the range shifts by `height`. Signs are already adjusted
// for the move direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MovePlan {
    pub lft: i64,
    pub rgt: i64,
    pub from: i64,
    pub to: i64,
    pub height: i64,
    pub distance: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveError {
    InsideOwnSubtree,
}

impl MoveError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::InsideOwnSubtree => "target position is inside the moved subtree",
        }
    }
}

impl MovePlan {
    // Returns Ok(None) when the node is already in place.
    pub fn compute(bounds: Bounds, position: i64) -> Result<Option<MovePlan>, MoveError> {
        let Bounds { lft, rgt } = bounds;
        if position > lft && position <= rgt {
            return Err(MoveError::InsideOwnSubtree);
        }

        let mut height = rgt - lft + 1;
        let from = lft.min(position);
        let to = rgt.max(position - 1);
        let mut distance = to - from + 1 - height;

        if distance == 0 {
            return Ok(None);
        }

        if position > lft {
            height = -height;
        } else {
            distance = -distance;
        }

        Ok(Some(MovePlan {
            lft,
            rgt,
            from,
            to,
            height,
            distance,
        }))
    }

    pub fn patch(&self, bound: i64) -> i64 {
        if bound >= self.lft && bound <= self.rgt {
            bound + self.distance
        } else if bound >= self.from && bound <= self.to {
            bound + self.height
        } else {
            bound
        }
    }
}
