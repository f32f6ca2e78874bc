//! Data Models
//!
//! - `Note` - user-authored note with serialized rich-text content
//! - `Connection` - persisted directed edge between two notes
//! - `MentionToken` - a mention reference parsed out of note content

mod connection;
mod note;

pub use connection::Connection;
pub use note::{MentionToken, Note};
