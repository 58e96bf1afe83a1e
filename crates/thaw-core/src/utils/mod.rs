//! Small pure helpers shared by adapters and the engine.

pub mod byte_size;
