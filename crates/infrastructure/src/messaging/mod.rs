pub mod composite_publisher;
pub mod json_lines;

pub use composite_publisher::CompositeEventPublisher;
pub use json_lines::{JsonLinesPublisher, TracingEventPublisher};
