//! Linear models and the small statistics helpers they share.

pub mod ols;
pub mod signif;
pub mod utility;

pub use ols::{Coefficient, OlsError, OlsFit, fit};
