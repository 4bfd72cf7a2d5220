//! Library half of the `beacon-emit` binary: argument parsing and the
//! proxy walkthrough, kept here so they can be tested.

pub mod args;
pub mod demo;
