//! Search engine for optimal Golomb rulers.
//!
//! A Golomb ruler is a set of marks at integer positions such that every
//! pairwise distance between marks is distinct. The engine performs a
//! depth-first backtracking search over mark placements for one candidate
//! length at a time, pruning with an incremental distance-uniqueness check,
//! and can partition the search space across worker threads that race to the
//! first valid ruler.

pub mod distance;
pub mod lut;
pub mod ruler;
pub mod solver;
