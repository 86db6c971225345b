pub mod blocks;
pub mod node_mockup;
