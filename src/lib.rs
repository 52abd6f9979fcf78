//! Flare gRPC X-Ray Interceptors
//!
//! Unary client/server interceptors for tonic that propagate the `X-Amzn-Trace-Id`
//! header, record one tracing segment per inbound call and classify call outcomes
//! into error, fault and throttle.

pub mod config;
pub mod error;
pub mod header;
pub mod interceptor;
pub mod middleware;
pub mod segment;
pub mod utils;

// Re-exports
pub use config::{SamplingConfig, SegmentConfig, ServiceConfig, TracingConfig};
pub use error::{Result, TraceError};
pub use header::{SamplingDecision, TRACE_HEADER_KEY, TraceHeader, format_response_header};

// 拦截器 re-exports
pub use interceptor::*;
pub use middleware::{Authority, AuthorityLayer, AuthorityService};

// 段与记录器 re-exports
pub use segment::{
    ConstantSampler, Recorder, RecorderConfig, RequestDescriptor, SamplingStrategy, Segment,
    SegmentData, SegmentGuard, TraceContext,
};
