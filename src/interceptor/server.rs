//! 服务端一元调用拦截器
//!
//! 每次入站调用都会创建一个新段，作用域与调用一致：无论 handler 成功、
//! 失败、panic 还是被取消，段都会且只会关闭一次。

use super::classify::classify_error;
use super::extract::{EncodedSize, client_ip, record_content_length};
use super::namer::SegmentNamer;
use super::GRPC_METHOD;
use crate::header::{TRACE_HEADER_KEY, TraceHeader, format_response_header};
use crate::middleware::Authority;
use crate::segment::{Recorder, RequestDescriptor, SegmentGuard, TraceContext};
use crate::utils::{insert_value, single_value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tonic::metadata::MetadataMap;
use tonic::{Request, Response, Status};
use tracing::debug;

const USER_AGENT_KEY: &str = "user-agent";

/// 服务端拦截器配置
#[derive(Clone, Default)]
pub struct ServerInterceptorOptions {
    /// 携带记录器配置的上下文
    pub context: Option<TraceContext>,
    pub segment_namer: Option<Arc<dyn SegmentNamer>>,
}

impl fmt::Debug for ServerInterceptorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerInterceptorOptions")
            .field("context", &self.context)
            .field("segment_namer", &self.segment_namer.is_some())
            .finish()
    }
}

/// 服务端拦截器配置项
pub enum ServerOption {
    Context(TraceContext),
    SegmentNamer(Arc<dyn SegmentNamer>),
}

impl ServerOption {
    fn apply(self, options: &mut ServerInterceptorOptions) {
        match self {
            ServerOption::Context(ctx) => options.context = Some(ctx),
            ServerOption::SegmentNamer(namer) => options.segment_namer = Some(namer),
        }
    }
}

/// 从上下文中解析记录器配置
pub fn with_context(ctx: TraceContext) -> ServerOption {
    ServerOption::Context(ctx)
}

/// 自定义段命名策略
pub fn with_segment_namer(namer: impl SegmentNamer + 'static) -> ServerOption {
    ServerOption::SegmentNamer(Arc::new(namer))
}

/// 服务端拦截器
#[derive(Debug, Clone)]
pub struct ServerInterceptor {
    options: ServerInterceptorOptions,
    recorder: Arc<Recorder>,
}

impl ServerInterceptor {
    pub fn new(options: impl IntoIterator<Item = ServerOption>) -> Self {
        let mut resolved = ServerInterceptorOptions::default();
        for option in options {
            option.apply(&mut resolved);
        }

        let recorder = resolved
            .context
            .as_ref()
            .and_then(|ctx| ctx.recorder().cloned())
            .unwrap_or_default();

        Self {
            options: resolved,
            recorder,
        }
    }

    /// 计算段名：自定义策略优先，否则为 `host + full_method`
    pub fn segment_name(&self, host: &str, full_method: &str) -> String {
        match &self.options.segment_namer {
            Some(namer) => namer.name(host),
            None => format!("{}{}", host, full_method),
        }
    }

    /// 拦截一次入站一元调用
    ///
    /// handler 收到的请求扩展中带有派生的 [`TraceContext`]，其中的段即本次调用的段。
    /// 返回值与 handler 的返回值一致，只是在响应（或错误状态）的 metadata 中附加了追踪头。
    pub async fn intercept<T, R, F, Fut>(
        &self,
        full_method: &str,
        mut request: Request<T>,
        handler: F,
    ) -> Result<Response<R>, Status>
    where
        F: FnOnce(Request<T>) -> Fut,
        Fut: Future<Output = Result<Response<R>, Status>>,
        R: EncodedSize,
    {
        let trace_header =
            TraceHeader::parse(single_value(request.metadata(), TRACE_HEADER_KEY).unwrap_or(""));

        let host = request
            .extensions()
            .get::<Authority>()
            .map(|authority| authority.as_str().to_string())
            .unwrap_or_default();
        let url = format!("grpc://{}{}", host, full_method);
        let name = self.segment_name(&host, full_method);

        let descriptor = RequestDescriptor {
            host,
            url,
            method: GRPC_METHOD.to_string(),
        };
        let segment = self.recorder.begin_segment(name, &descriptor, &trace_header);
        let guard = SegmentGuard::new(Arc::clone(&segment));

        record_request_attributes(&guard, request.metadata(), &descriptor);

        request.extensions_mut().insert(
            TraceContext::new()
                .with_segment(segment)
                .with_recorder(Arc::clone(&self.recorder)),
        );

        let mut result = handler(request).await;

        let segment = guard.segment();
        match &result {
            Ok(response) => record_content_length(segment, response.get_ref()),
            Err(status) => {
                classify_error(segment, status);
            }
        }

        let response_header = {
            let data = segment.lock();
            format_response_header(
                &data.trace_id,
                data.sampled,
                trace_header.is_sampling_requested(),
            )
        };
        let metadata = match &mut result {
            Ok(response) => response.metadata_mut(),
            Err(status) => status.metadata_mut(),
        };
        if let Err(err) = insert_value(metadata, TRACE_HEADER_KEY, &response_header) {
            debug!(?err, method = full_method, "Failed to send the grpc trace header");
        }

        result
    }
}

impl Default for ServerInterceptor {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

fn record_request_attributes(
    guard: &SegmentGuard,
    metadata: &MetadataMap,
    descriptor: &RequestDescriptor,
) {
    let forwarded_ip = client_ip(metadata);
    let user_agent = single_value(metadata, USER_AGENT_KEY);

    let mut data = guard.segment().lock();
    if let Some(ip) = forwarded_ip {
        data.http.request.client_ip = ip;
        data.http.request.x_forwarded_for = true;
    }
    data.http.request.url = descriptor.url.clone();
    data.http.request.method = descriptor.method.clone();
    if let Some(user_agent) = user_agent {
        data.http.request.user_agent = user_agent.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::namer::FixedSegmentNamer;
    use crate::segment::{ConstantSampler, RecorderConfig};

    #[test]
    fn default_segment_name_is_host_and_method() {
        let interceptor = ServerInterceptor::default();
        assert_eq!(
            interceptor.segment_name("svc.example:443", "/pkg.Service/Method"),
            "svc.example:443/pkg.Service/Method"
        );
    }

    #[test]
    fn options_apply_in_order() {
        let recorder = Arc::new(Recorder::new(RecorderConfig {
            service_version: Some("2.0.1".to_string()),
            sampler: Arc::new(ConstantSampler::new(false)),
        }));
        let interceptor = ServerInterceptor::new([
            with_segment_namer(FixedSegmentNamer::new("first")),
            with_context(TraceContext::new().with_recorder(recorder)),
            with_segment_namer(FixedSegmentNamer::new("orders")),
        ]);

        assert_eq!(interceptor.segment_name("any", "/a.B/C"), "orders");
        assert_eq!(
            interceptor.recorder.config().service_version.as_deref(),
            Some("2.0.1")
        );
    }

    #[tokio::test]
    async fn handler_sees_derived_context() {
        let interceptor = ServerInterceptor::default();

        let response = interceptor
            .intercept("/pkg.Service/Method", Request::new(()), |req| async move {
                let ctx = TraceContext::from_request(&req).expect("derived context");
                let segment = ctx.segment().expect("active segment");
                assert!(!segment.is_closed());
                Ok(Response::new(()))
            })
            .await
            .unwrap();

        assert!(response.metadata().get(TRACE_HEADER_KEY).is_some());
    }
}
