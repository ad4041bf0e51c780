//! Small data-structure building blocks shared by the body/joint/collider
//! sets and the joint interaction graph used for island building.

pub mod arena;
pub mod graph;

pub use arena::{Arena, Index};
pub use graph::InteractionGraph;
