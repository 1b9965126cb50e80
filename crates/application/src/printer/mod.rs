pub mod builder;
pub mod controller;

pub use builder::LabelBuilder;
pub use controller::{PrinterController, PrinterSettings};
