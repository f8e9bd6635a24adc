mod commission;
mod course;
mod enrollment;
mod transaction;
mod withdrawal;

pub use commission::*;
pub use course::*;
pub use enrollment::*;
pub use transaction::*;
pub use withdrawal::*;
