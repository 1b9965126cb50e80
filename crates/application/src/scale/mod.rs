pub mod controller;

pub use controller::{ScaleController, ScaleSettings};
