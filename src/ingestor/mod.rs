pub mod m3u_parser;

pub use m3u_parser::{ENTRY_MARKER, Entries, PlaylistDocument};
