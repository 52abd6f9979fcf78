//! 错误处理模块
//!
//! 拦截器自身只产生少量错误：客户端缺少活动段（调用方用法错误）、
//! 追踪头无法写入 metadata、配置加载失败。RPC 本身的错误从不经过这里，
//! 拦截器只观察并分类，不包装也不改写。

pub mod conversions;
pub mod grpc;

use thiserror::Error;

/// 追踪拦截器错误
#[derive(Error, Debug)]
pub enum TraceError {
    /// 客户端调用时上下文中没有活动段
    #[error("failed to record gRPC transaction: segment cannot be found")]
    SegmentNotFound,

    /// 追踪头无法编码为 ASCII metadata
    #[error("invalid trace header metadata: {0}")]
    InvalidMetadata(String),

    /// 配置读取或解析失败
    #[error("配置错误: {0}")]
    Config(String),
}

/// 拦截器层使用的结果类型
pub type Result<T> = std::result::Result<T, TraceError>;
