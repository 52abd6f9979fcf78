//! gRPC 传输层中间件
//!
//! tonic 不会把 HTTP/2 伪头暴露到 metadata 中，`AuthorityLayer` 负责把
//! `:authority` 转存到请求扩展，供服务端拦截器读取

pub mod authority;

pub use authority::{Authority, AuthorityLayer, AuthorityService};
