//! Render Graph System
//!
//! A minimal host for two-phase render passes: each pass declares its
//! resources in `setup`, and the graph decides from those declarations which
//! passes run and in what order before calling `execute`.

pub mod graph;
pub mod pass;
pub mod resource;

pub use graph::*;
pub use pass::*;
pub use resource::*;
