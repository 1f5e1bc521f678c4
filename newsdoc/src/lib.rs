pub mod content;
pub mod html;

pub use content::{ContentBlock, ContentState};
pub use html::from_html::from_html;
pub use html::to_html::{AtomicKind, GeneratorOptions, to_html};
