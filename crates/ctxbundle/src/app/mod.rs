//! Application layer: the bundling codec and the collaborators feeding it.

pub mod classify;
pub mod export;
pub mod reverse;
pub mod scan;
pub mod selection;
pub mod tokens;
pub mod tree;
