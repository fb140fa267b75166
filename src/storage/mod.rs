pub mod format;
pub mod multiplex;
pub mod serializer;
