mod bits;

pub use bits::{unzigzag, zigzag, BitReader, BitWriter, MAX_FIXED_WIDTH};
