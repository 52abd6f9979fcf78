use std::task::{Context, Poll};
use tower::{Layer, Service};

/// 请求的 `:authority`（host[:port]）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority(String);

impl Authority {
    pub fn new(authority: impl Into<String>) -> Self {
        Self(authority.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 优先取 URI 中的 authority，HTTP/1 风格的请求回退到 `host` 头
    pub fn from_http<B>(req: &http::Request<B>) -> Option<Self> {
        if let Some(authority) = req.uri().authority() {
            return Some(Self::new(authority.as_str()));
        }

        req.headers()
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .filter(|host| !host.is_empty())
            .map(Self::new)
    }
}

/// Authority 中间件层
#[derive(Debug, Clone, Default)]
pub struct AuthorityLayer;

impl AuthorityLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for AuthorityLayer {
    type Service = AuthorityService<S>;

    fn layer(&self, service: S) -> Self::Service {
        AuthorityService { inner: service }
    }
}

#[derive(Debug, Clone)]
pub struct AuthorityService<S> {
    inner: S,
}

impl<S, B> Service<http::Request<B>> for AuthorityService<S>
where
    S: Service<http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        if let Some(authority) = Authority::from_http(&req) {
            req.extensions_mut().insert(authority);
        }
        self.inner.call(req)
    }
}
