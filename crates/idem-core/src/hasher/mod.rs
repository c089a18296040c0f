pub mod digest;
pub mod pipeline;

pub use digest::{hash_file, DIGEST_HEX_LEN};
pub use pipeline::{HashFailure, HashPipeline, HashStream, Hashed};
