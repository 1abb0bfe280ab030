//! Some utility functions and data structures that the kernel can take use of.

pub mod numset;

pub use numset::{NumSet, NumState, Number};
