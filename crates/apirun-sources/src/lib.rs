pub mod file;
pub mod postman;
pub mod source;

pub use file::FileSource;
pub use postman::PostmanApiSource;
pub use source::CollectionSource;
