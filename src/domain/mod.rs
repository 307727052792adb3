pub mod analysis;
pub mod error;
pub mod row;
pub mod search_result;

pub use analysis::*;
pub use error::*;
pub use row::*;
pub use search_result::*;
