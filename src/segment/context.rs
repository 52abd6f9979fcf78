//! 追踪上下文
//!
//! 对应一次调用的"环境上下文"：当前活动段和可选的记录器。
//! 服务端拦截器把派生出的上下文放入请求扩展，handler 通过
//! [`TraceContext::from_request`] 取出后交给客户端拦截器使用。

use super::{Recorder, Segment};
use std::sync::Arc;
use tonic::Request;

#[derive(Debug, Clone, Default)]
pub struct TraceContext {
    segment: Option<Arc<Segment>>,
    recorder: Option<Arc<Recorder>>,
}

impl TraceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_segment(mut self, segment: Arc<Segment>) -> Self {
        self.segment = Some(segment);
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<Recorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// 当前活动段
    pub fn segment(&self) -> Option<&Arc<Segment>> {
        self.segment.as_ref()
    }

    pub fn recorder(&self) -> Option<&Arc<Recorder>> {
        self.recorder.as_ref()
    }

    /// 从请求扩展中取出上下文
    pub fn from_request<T>(req: &Request<T>) -> Option<Self> {
        req.extensions().get::<TraceContext>().cloned()
    }
}
