//! Extract, transform and load of raw reviews into the staging worksheet.

mod pipeline;

pub use pipeline::EtlPipeline;
