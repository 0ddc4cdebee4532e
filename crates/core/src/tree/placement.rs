#![forbid(unsafe_code)]

// Pending structural intent for a node. A caller holds and re-targets this
// value freely; it is resolved into a concrete cut position only when the
// store executes the create or move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Root,
    FirstChildOf(i64),
    LastChildOf(i64),
    Before(i64),
    After(i64),
}
