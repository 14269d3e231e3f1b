//! # What is This?
//!
//! _stockroom_ is a runtime asset registry. It resolves named assets to shared,
//! reference-counted objects, loads them either inline or on a dedicated background
//! thread, tracks the dependencies that assets declare while they are being
//! deserialized, and controls their lifetime through sweeping and purging.
//!
//! Check out the `res` module for the details of the loading pipeline.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

pub mod errors;
pub mod res;
pub mod utils;

pub mod prelude;
