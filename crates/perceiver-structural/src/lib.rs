//! Structural perception: turns the live element tree into an indexed,
//! serialized view the model can address by number.

pub mod errors;
pub mod indexer;
pub mod model;
pub mod ports;
pub mod probe;
pub mod serialize;
pub mod structural;
pub mod tree;

pub use errors::PerceiverError;
pub use indexer::index_dom;
pub use model::{
    Capture, CaptureOptions, ComputedStyle, HighlightBox, NodeKind, ProbeNode, ProbeSnapshot,
    RawNode, Rect, Viewport,
};
pub use ports::{DomProbe, DriverProbe, LiveDom};
pub use serialize::DEFAULT_INCLUDE_ATTRIBUTES;
pub use structural::{Perception, StructuralPerceiver};
pub use tree::{DomTree, ElementData, NodeData, NodeId, TextData};
