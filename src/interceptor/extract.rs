//! 请求/响应属性提取

use crate::segment::Segment;
use crate::utils::single_value;
use tonic::metadata::MetadataMap;

pub const FORWARDED_FOR_KEY: &str = "x-forwarded-for";

/// 从 `x-forwarded-for` 提取客户端 IP
///
/// 该键必须恰好出现一次：重复的头可能被伪造，无法判断哪个可信。
/// 取逗号分隔的第一个地址并去掉首尾空白。
pub fn client_ip(metadata: &MetadataMap) -> Option<String> {
    let forwarded_for = single_value(metadata, FORWARDED_FOR_KEY)?;
    if forwarded_for.is_empty() {
        return None;
    }
    forwarded_for
        .split(',')
        .next()
        .map(|ip| ip.trim().to_string())
}

/// 响应的编码字节数
///
/// 只有结构化（protobuf）消息才有意义；其他响应返回 `None`，
/// 段中已有的响应长度保持不变。
pub trait EncodedSize {
    fn encoded_size(&self) -> Option<usize>;
}

impl<M: prost::Message> EncodedSize for M {
    fn encoded_size(&self) -> Option<usize> {
        Some(self.encoded_len())
    }
}

/// 非结构化响应的包装，不参与响应长度统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unstructured<T>(pub T);

impl<T> EncodedSize for Unstructured<T> {
    fn encoded_size(&self) -> Option<usize> {
        None
    }
}

/// 在段锁内记录响应长度
pub fn record_content_length<R: EncodedSize + ?Sized>(segment: &Segment, reply: &R) {
    if let Some(size) = reply.encoded_size() {
        segment.lock().http.response.content_length = size;
    }
}
