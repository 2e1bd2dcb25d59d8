pub mod blend;
pub mod config;
pub mod discovery;
pub mod error;
pub mod loader;
pub mod location;
pub mod merge;
pub mod naming;
pub mod normalize;
pub mod parse;
pub mod reader;
pub mod resolve;

pub use blend::{BlendOptions, Blender};
pub use merge::MergeMode;
