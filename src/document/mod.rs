mod core;
pub mod decode;

pub use self::core::Document;
pub use decode::{DocumentDecoder, RawDecoder, RecordDecoder, SerdeDecoder};
