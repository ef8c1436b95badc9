pub mod loader;
pub mod opcode;
pub mod vm;

pub use opcode::Opcode;
pub use vm::{Error, Vm};
