pub mod link;
pub mod serializer;

pub use link::DeviceLink;
pub use serializer::DeviceCommandSerializer;
