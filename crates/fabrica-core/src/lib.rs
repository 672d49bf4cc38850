pub mod error;
pub mod id;
pub mod time;

pub use error::{CoreError, Result};
pub use id::generate_id;
pub use time::now_utc;
