pub mod codec;
pub mod command;
pub mod error;
pub mod models;
pub mod throttle;
pub mod traits;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use codec::*;
pub use command::*;
pub use error::*;
pub use models::*;
pub use throttle::*;
pub use traits::*;
