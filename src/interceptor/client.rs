//! 客户端一元调用拦截器
//!
//! 在当前活动段下为每次调用开启一个以目标 host 命名的子段，
//! 注入下游追踪头，记录请求属性和结果分类。调用返回的错误原样透传。

use super::classify::classify_error;
use super::extract::{EncodedSize, record_content_length};
use super::{GRPC_METHOD, REMOTE_NAMESPACE};
use crate::error::TraceError;
use crate::header::TRACE_HEADER_KEY;
use crate::segment::{SegmentGuard, TraceContext};
use crate::utils::insert_value;
use std::error::Error;
use std::future::Future;
use tonic::{Request, Response, Status};
use tracing::{debug, warn};

/// 客户端拦截器
#[derive(Debug, Clone)]
pub struct ClientInterceptor {
    host: String,
}

impl ClientInterceptor {
    /// `host` 为目标服务地址，用作子段名和请求 URL 的 host 部分
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// 拦截一次一元调用
    ///
    /// 上下文中没有活动段属于用法错误，直接返回且不会发起调用。
    pub async fn intercept<T, R, F, Fut>(
        &self,
        ctx: &TraceContext,
        method: &str,
        mut request: Request<T>,
        invoker: F,
    ) -> Result<Response<R>, Status>
    where
        F: FnOnce(Request<T>) -> Fut,
        Fut: Future<Output = Result<Response<R>, Status>>,
        R: EncodedSize,
    {
        let Some(parent) = ctx.segment() else {
            warn!(host = %self.host, method, "No active segment for outgoing gRPC call");
            return Err(TraceError::SegmentNotFound.into());
        };

        let guard = SegmentGuard::new(parent.begin_subsegment(self.host.as_str()));
        let segment = guard.segment();

        let downstream = segment.downstream_header().to_string();
        if let Err(err) = insert_value(request.metadata_mut(), TRACE_HEADER_KEY, &downstream) {
            debug!(?err, header = %downstream, "Failed to inject grpc trace header");
        }

        {
            let mut data = segment.lock();
            data.namespace = REMOTE_NAMESPACE.to_string();
            data.http.request.url = format!("grpc://{}{}", self.host, method);
            data.http.request.method = GRPC_METHOD.to_string();
        }

        let result = invoker(request).await;

        match &result {
            Ok(response) => record_content_length(segment, response.get_ref()),
            Err(status) => {
                classify_error(segment, status);
            }
        }

        segment.close(result.as_ref().err().map(|s| s as &(dyn Error + 'static)));
        result
    }
}
