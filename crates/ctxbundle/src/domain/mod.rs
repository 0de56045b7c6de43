//! Core domain types shared by the codec and its collaborators.

pub mod errors;
pub mod model;
