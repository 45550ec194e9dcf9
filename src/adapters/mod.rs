//! Implementations of the port traits.

pub mod fixture;
pub mod live;
