pub mod channel;
pub mod dataset;
pub mod report;
pub mod source;

pub use channel::*;
pub use dataset::*;
pub use report::*;
pub use source::*;
