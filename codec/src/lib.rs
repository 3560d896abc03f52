mod output;
mod tx;
mod utils;
mod value;
mod witness;

pub use output::*;
pub use tx::*;
pub use utils::*;
pub use value::*;
pub use witness::*;
