pub mod binary;
pub mod rot_block;
pub mod store;
