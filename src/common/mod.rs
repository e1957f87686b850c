pub mod error;
pub mod transaction;
pub mod util;
