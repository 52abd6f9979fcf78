//! 记录器
//!
//! 负责按入站追踪头创建根段并决定采样。采样算法本身不在此实现，
//! 只提供 `SamplingStrategy` 接入点和一个常量策略。

use super::{HttpData, RequestData, Segment, SegmentData, id};
use crate::header::{SamplingDecision, TraceHeader};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 合成的请求描述，用于为新段填充请求属性和采样决策
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub host: String,
    pub url: String,
    pub method: String,
}

/// 采样策略
pub trait SamplingStrategy: Send + Sync + fmt::Debug {
    fn should_trace(&self, request: &RequestDescriptor) -> bool;
}

/// 常量采样策略
#[derive(Debug, Clone, Copy)]
pub struct ConstantSampler {
    sampled: bool,
}

impl ConstantSampler {
    pub fn new(sampled: bool) -> Self {
        Self { sampled }
    }
}

impl SamplingStrategy for ConstantSampler {
    fn should_trace(&self, _request: &RequestDescriptor) -> bool {
        self.sampled
    }
}

/// 记录器配置
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub service_version: Option<String>,
    pub sampler: Arc<dyn SamplingStrategy>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            service_version: None,
            sampler: Arc::new(ConstantSampler::new(true)),
        }
    }
}

/// 记录器
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    config: RecorderConfig,
}

impl Recorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// 根据入站追踪头创建根段
    ///
    /// 头中带有追踪 ID 时延续该追踪，否则开启新追踪。`Sampled`/`NotSampled`
    /// 直接采用，`Unknown`/`Requested` 交给采样策略决定。
    pub fn begin_segment(
        &self,
        name: impl Into<String>,
        request: &RequestDescriptor,
        header: &TraceHeader,
    ) -> Arc<Segment> {
        let trace_id = if header.has_trace_id() {
            header.trace_id.clone()
        } else {
            id::new_trace_id()
        };

        let sampled = match header.sampling_decision {
            SamplingDecision::Sampled => true,
            SamplingDecision::NotSampled => false,
            SamplingDecision::Requested | SamplingDecision::Unknown => {
                self.config.sampler.should_trace(request)
            }
        };

        let data = SegmentData {
            id: id::new_segment_id(),
            trace_id,
            parent_id: header.parent_id.clone(),
            name: name.into(),
            sampled,
            service_version: self.config.service_version.clone(),
            start_time: id::epoch_seconds(),
            in_progress: true,
            http: HttpData {
                request: RequestData {
                    url: request.url.clone(),
                    method: request.method.clone(),
                    ..RequestData::default()
                },
                ..HttpData::default()
            },
            incoming_header: Some(header.clone()),
            ..SegmentData::default()
        };

        debug!(
            segment_id = %data.id,
            trace_id = %data.trace_id,
            name = %data.name,
            sampled,
            "Segment started"
        );

        Segment::from_data(data)
    }
}
