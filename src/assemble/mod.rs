/// Command interpreter and frame sequencing.
pub mod assembler;
/// Encoding parameters and the frame clock.
pub mod state;
