pub mod reload;
pub mod search;
pub mod status;

pub use reload::*;
pub use search::*;
pub use status::*;
