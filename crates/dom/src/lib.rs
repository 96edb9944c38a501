pub mod document;
pub mod error;
pub mod node;
pub mod serialize;

pub use document::{Attribute, Document, NodeId, OwnedQName, ROOT_ID};
pub use error::DomError;
pub use node::NodeRef;
pub use serialize::serialize;
