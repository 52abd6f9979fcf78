//! gRPC 错误转换
//!
//! 把拦截器自身的错误转换为 `tonic::Status`，以便直接从 RPC 调用路径返回

use super::TraceError;
use tonic::Status;

impl From<TraceError> for Status {
    fn from(err: TraceError) -> Self {
        match err {
            // 用法错误：调用根本没有发出
            TraceError::SegmentNotFound => Status::failed_precondition(err.to_string()),
            TraceError::InvalidMetadata(_) => Status::internal(err.to_string()),
            TraceError::Config(_) => Status::internal(err.to_string()),
        }
    }
}
