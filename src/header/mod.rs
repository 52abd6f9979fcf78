//! 追踪头编解码
//!
//! 处理 `X-Amzn-Trace-Id` 格式的追踪头：以 `;` 分隔的 `Key=Value` 字段，
//! 识别 `Root`、`Parent`、`Sampled`，其余字段原样保留。
//! 解析永不失败，无法识别的输入退化为"无追踪上下文"。

use std::fmt;

/// 追踪头的 metadata key（请求注入、请求提取、响应回显共用）
pub const TRACE_HEADER_KEY: &str = "x-amzn-trace-id";

const ROOT_KEY: &str = "Root";
const PARENT_KEY: &str = "Parent";
const SAMPLED_KEY: &str = "Sampled";
const SELF_KEY: &str = "Self";

/// 采样决策
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingDecision {
    /// 未携带或无法识别
    #[default]
    Unknown,
    /// 调用方要求被调方做出并回报采样决策（`Sampled=?`）
    Requested,
    /// `Sampled=1`
    Sampled,
    /// `Sampled=0`
    NotSampled,
}

impl SamplingDecision {
    fn from_value(value: &str) -> Self {
        match value {
            "1" => SamplingDecision::Sampled,
            "0" => SamplingDecision::NotSampled,
            "?" => SamplingDecision::Requested,
            _ => SamplingDecision::Unknown,
        }
    }

    fn as_value(&self) -> Option<&'static str> {
        match self {
            SamplingDecision::Sampled => Some("1"),
            SamplingDecision::NotSampled => Some("0"),
            SamplingDecision::Requested => Some("?"),
            SamplingDecision::Unknown => None,
        }
    }
}

/// 追踪头
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TraceHeader {
    pub trace_id: String,
    pub parent_id: Option<String>,
    pub sampling_decision: SamplingDecision,
    /// 未识别的 `key=value` 字段，按出现顺序保留
    pub additional_data: Vec<(String, String)>,
}

impl TraceHeader {
    /// 解析追踪头字符串
    ///
    /// 空串、乱码、缺字段都不会报错，只会得到对应字段为空的头。
    pub fn parse(raw: &str) -> Self {
        let mut header = TraceHeader::default();

        for field in raw.split(';') {
            let Some((key, value)) = split_field(field) else {
                continue;
            };

            match key {
                ROOT_KEY => header.trace_id = value.to_string(),
                PARENT_KEY => header.parent_id = Some(value.to_string()),
                SAMPLED_KEY => header.sampling_decision = SamplingDecision::from_value(value),
                // 负载均衡器写入的注解，不向下游传播
                SELF_KEY => {}
                _ => header
                    .additional_data
                    .push((key.to_string(), value.to_string())),
            }
        }

        header
    }

    /// 是否携带了可延续的追踪
    pub fn has_trace_id(&self) -> bool {
        !self.trace_id.is_empty()
    }

    /// 调用方是否要求回报采样决策
    pub fn is_sampling_requested(&self) -> bool {
        self.sampling_decision == SamplingDecision::Requested
    }
}

/// 格式化响应追踪头
///
/// 只有当入站头显式请求采样决策时才回显 `Sampled`，否则只输出 `Root`。
pub fn format_response_header(trace_id: &str, sampled: bool, was_requested: bool) -> String {
    let mut header = format!("{}={}", ROOT_KEY, trace_id);
    if was_requested {
        header.push_str(if sampled { ";Sampled=1" } else { ";Sampled=0" });
    }
    header
}

impl fmt::Display for TraceHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = Vec::with_capacity(3 + self.additional_data.len());

        if self.has_trace_id() {
            fields.push(format!("{}={}", ROOT_KEY, self.trace_id));
        }
        if let Some(parent_id) = self.parent_id.as_deref().filter(|p| !p.is_empty()) {
            fields.push(format!("{}={}", PARENT_KEY, parent_id));
        }
        if let Some(value) = self.sampling_decision.as_value() {
            fields.push(format!("{}={}", SAMPLED_KEY, value));
        }
        for (key, value) in &self.additional_data {
            fields.push(format!("{}={}", key, value));
        }

        f.write_str(&fields.join(";"))
    }
}

fn split_field(field: &str) -> Option<(&str, &str)> {
    let (key, value) = field.trim().split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}
