//! Analysis pipeline
//!
//! A request is assembled by [`RequestBuilder`] and then handed to one of two
//! delivery components:
//!
//! - [`StreamingDelivery`] forwards text fragments as the backend emits them
//! - [`SynchronousDelivery`] waits for the complete response
//!
//! Both convert backend failures into data ([`ResponseFragment`] or
//! [`AnalysisResult`]) instead of returning errors.

pub mod request;
pub mod result;
pub mod streaming;
pub mod synchronous;

pub use request::{AnalysisRequest, RequestBuilder};
pub use result::{AnalysisResult, ResultStatus, ANALYSIS_ERROR_PREFIX};
pub use streaming::{FragmentKind, FragmentStream, ResponseFragment, StreamingDelivery};
pub use synchronous::SynchronousDelivery;
