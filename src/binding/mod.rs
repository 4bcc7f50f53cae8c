//! The binding engine: declarative member metadata, the generic
//! object-graph codec and the path resolver.
//!
//! Configuration types opt in by implementing [`Reflect`] with an explicit
//! `match` over their member names and by describing those members in a
//! static [`Catalog`]. Everything else in this module works purely through
//! those two.

pub mod catalog;
pub mod codec;
pub mod path;
pub mod reflect;
pub mod value;

pub use catalog::{Catalog, CatalogError, CustomEditor, PropertyDescriptor};
pub use path::{parse_path, resolve_for_read, resolve_for_write, PathError, PathSegment};
pub use reflect::{check_members, no_indexer, Indexer, Member, Reflect, ReflectError};
pub use value::{parse_bool, ConfigValue, ConversionError, ValueKind};
