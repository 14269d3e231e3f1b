pub use crate::errors::{Error, Result};
pub use crate::res::prelude::*;
