//! RPC 结果分类
//!
//! 把调用返回的错误映射为 error（调用方造成）、fault（服务端造成）
//! 或 throttle（限流），写入段的结果标记。

use crate::segment::Segment;
use std::error::Error;
use tonic::{Code, Status};

/// 分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    None,
    Error,
    Fault,
    Throttle,
}

impl Outcome {
    /// 按 gRPC 状态码分类
    pub fn from_code(code: Code) -> Self {
        match code {
            Code::Cancelled
            | Code::InvalidArgument
            | Code::NotFound
            | Code::AlreadyExists
            | Code::PermissionDenied
            | Code::Unauthenticated
            | Code::FailedPrecondition
            | Code::Aborted
            | Code::OutOfRange => Outcome::Error,

            Code::Unknown
            | Code::DeadlineExceeded
            | Code::Unimplemented
            | Code::Internal
            | Code::Unavailable
            | Code::DataLoss => Outcome::Fault,

            Code::ResourceExhausted => Outcome::Throttle,

            _ => Outcome::None,
        }
    }

    /// 按任意错误分类
    ///
    /// 沿错误链查找 `tonic::Status`，找不到状态码的错误一律视为 fault。
    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        match find_status(err) {
            Some(status) => Outcome::from_code(status.code()),
            None => Outcome::Fault,
        }
    }
}

fn find_status<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a Status> {
    let mut source = Some(err);
    while let Some(err) = source {
        if let Some(status) = err.downcast_ref::<Status>() {
            return Some(status);
        }
        source = err.source();
    }
    None
}

/// 分类错误并在段锁内写入标记
pub fn classify_error(segment: &Segment, err: &(dyn Error + 'static)) -> Outcome {
    let outcome = Outcome::from_error(err);
    let mut data = segment.lock();
    match outcome {
        Outcome::Error => data.error = true,
        Outcome::Fault => data.fault = true,
        Outcome::Throttle => data.throttle = true,
        Outcome::None => {}
    }
    outcome
}
