//! SSE wire protocol
//!
//! Each event serializes as two text fields terminated by a blank line:
//!
//! ```text
//! event: <topic>\n
//! data: <json>\n
//! \n
//! ```
//!
//! Multiple events are concatenated with no extra separators; two
//! consecutive newlines are the sole event delimiter. The encoder emits
//! exactly the two fields above. The decoder additionally understands the
//! `id:` and `retry:` fields, comment lines and CRLF line endings for
//! interoperability with other SSE producers.

pub mod decoder;
pub mod encoder;
pub mod event;

pub use decoder::EventDecoder;
pub use encoder::encode_event;
pub use event::{Event, DEFAULT_TOPIC};
