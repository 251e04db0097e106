use std::io::Write;

use crate::Result;

pub use crate::cmd::ComputeParameters;
pub use crate::distance::{DistanceMatrix, Distances};
pub use crate::encodings::HashFunctions;
pub use crate::sketch::Sketch;
pub use crate::storage::Storage;

pub trait ToWriter {
    fn to_writer<W>(&self, writer: &mut W) -> Result<()>
    where
        W: Write;
}
