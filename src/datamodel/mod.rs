pub mod measurement;

pub use measurement::{Measurement, Pairs};
