pub mod types;

pub use types::ResourceDescriptor;
