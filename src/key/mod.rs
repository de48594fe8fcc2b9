//! Key types, codec, and composite-key boundary handling (C1 + C7).

mod codec;
mod composite;
mod item;

pub use codec::{Encryption, KeyCodec};
pub use composite::{extend_boundary, Boundary, Side};
pub use item::{FieldType, Key, KeyItem};
