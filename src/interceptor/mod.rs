//! gRPC 追踪拦截器模块
//!
//! 提供客户端/服务端一元调用拦截器，以及它们共用的结果分类和属性提取

pub mod classify;
pub mod client;
pub mod extract;
pub mod namer;
pub mod server;

pub use classify::{Outcome, classify_error};
pub use client::ClientInterceptor;
pub use extract::{EncodedSize, Unstructured, client_ip, record_content_length};
pub use namer::{DynamicSegmentNamer, FixedSegmentNamer, SegmentNamer};
pub use server::{
    ServerInterceptor, ServerInterceptorOptions, ServerOption, with_context, with_segment_namer,
};

/// 所有一元 gRPC 调用在段中记录的请求方法
pub const GRPC_METHOD: &str = "POST";

/// 客户端子段的命名空间
pub const REMOTE_NAMESPACE: &str = "remote";
