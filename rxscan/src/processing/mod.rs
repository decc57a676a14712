mod formatter;
mod pipeline;

pub use formatter::{format_lines, TextFormatter};
pub use pipeline::ExtractionPipeline;
