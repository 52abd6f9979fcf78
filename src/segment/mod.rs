//! 追踪段模块
//!
//! 段记录一次 RPC 调用：追踪身份、请求/响应属性和结果分类标记。
//! 段可能在多个并发路径上被修改（例如子段），因此所有字段读写都经由
//! 段自带的互斥锁，多个字段作为一个事务一起更新。

pub mod context;
pub mod id;
pub mod recorder;

pub use context::TraceContext;
pub use recorder::{ConstantSampler, Recorder, RecorderConfig, RequestDescriptor, SamplingStrategy};

use crate::header::{SamplingDecision, TraceHeader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// 父段最多保留的已关闭子段数，超出时从最早的已关闭子段开始丢弃
pub const MAX_RETAINED_SUBSEGMENTS: usize = 100;

/// 段内的 HTTP 请求属性
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestData {
    pub url: String,
    pub method: String,
    pub client_ip: String,
    /// `client_ip` 来自 `x-forwarded-for` 时为 true
    pub x_forwarded_for: bool,
    pub user_agent: String,
}

/// 段内的 HTTP 响应属性
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseData {
    pub content_length: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpData {
    pub request: RequestData,
    pub response: ResponseData,
}

/// 关闭段时记录的异常
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    pub message: String,
}

/// 段字段，只能在持有段锁时访问
#[derive(Debug, Clone, Default)]
pub struct SegmentData {
    pub id: String,
    pub trace_id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub namespace: String,
    pub sampled: bool,
    pub service_version: Option<String>,
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub in_progress: bool,
    pub error: bool,
    pub fault: bool,
    pub throttle: bool,
    pub http: HttpData,
    pub cause: Vec<Exception>,
    /// 根段收到的入站追踪头，向下游传播时沿用其附加字段
    pub incoming_header: Option<TraceHeader>,
}

/// 追踪段
#[derive(Debug)]
pub struct Segment {
    data: Mutex<SegmentData>,
    closed: AtomicBool,
    subsegments: Mutex<Vec<Arc<Segment>>>,
}

impl Segment {
    pub(crate) fn from_data(data: SegmentData) -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(data),
            closed: AtomicBool::new(false),
            subsegments: Mutex::new(Vec::new()),
        })
    }

    /// 获取段锁
    ///
    /// 锁只应覆盖字段读写本身，不能跨越 RPC 调用或 handler 执行持有。
    pub fn lock(&self) -> MutexGuard<'_, SegmentData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 在当前段下开启子段，子段共享追踪 ID 和采样决策
    ///
    /// 长期存活的父段会发起大量下游调用，已关闭的子段只保留最近
    /// [`MAX_RETAINED_SUBSEGMENTS`] 个，进行中的子段不会被丢弃。
    pub fn begin_subsegment(self: &Arc<Self>, name: impl Into<String>) -> Arc<Segment> {
        let child = {
            let parent = self.lock();
            SegmentData {
                id: id::new_segment_id(),
                trace_id: parent.trace_id.clone(),
                parent_id: Some(parent.id.clone()),
                name: name.into(),
                sampled: parent.sampled,
                service_version: parent.service_version.clone(),
                start_time: id::epoch_seconds(),
                in_progress: true,
                incoming_header: parent.incoming_header.clone(),
                ..SegmentData::default()
            }
        };

        let child = Segment::from_data(child);
        let mut subsegments = self
            .subsegments
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let closed = subsegments.iter().filter(|s| s.is_closed()).count();
        let mut excess = closed.saturating_sub(MAX_RETAINED_SUBSEGMENTS);
        subsegments.retain(|s| {
            if excess > 0 && s.is_closed() {
                excess -= 1;
                return false;
            }
            true
        });
        subsegments.push(Arc::clone(&child));
        child
    }

    /// 已开启的子段
    pub fn subsegments(&self) -> Vec<Arc<Segment>> {
        self.subsegments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 向下游传播的追踪头：`Root=<trace>;Parent=<本段 ID>;Sampled=<0|1>`
    pub fn downstream_header(&self) -> TraceHeader {
        let data = self.lock();
        let mut header = data.incoming_header.clone().unwrap_or_default();
        header.trace_id = data.trace_id.clone();
        header.parent_id = Some(data.id.clone());
        header.sampling_decision = if data.sampled {
            SamplingDecision::Sampled
        } else {
            SamplingDecision::NotSampled
        };
        header
    }

    /// 关闭段
    ///
    /// 只有第一次调用生效，返回是否由本次调用完成关闭。传入的错误记录到
    /// `cause` 中；error/fault/throttle 标记只由状态分类写入。
    pub fn close(&self, err: Option<&(dyn std::error::Error + 'static)>) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }

        let mut data = self.lock();
        data.end_time = Some(id::epoch_seconds());
        data.in_progress = false;
        if let Some(err) = err {
            data.cause.push(Exception {
                message: err.to_string(),
            });
        }

        debug!(
            segment_id = %data.id,
            trace_id = %data.trace_id,
            name = %data.name,
            sampled = data.sampled,
            error = data.error,
            fault = data.fault,
            throttle = data.throttle,
            "Segment closed"
        );
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// 段的作用域守卫，drop 时关闭段
///
/// handler 正常返回、返回错误、panic 或 future 被取消时都会触发关闭。
#[derive(Debug)]
pub struct SegmentGuard {
    segment: Arc<Segment>,
}

impl SegmentGuard {
    pub fn new(segment: Arc<Segment>) -> Self {
        Self { segment }
    }

    pub fn segment(&self) -> &Arc<Segment> {
        &self.segment
    }
}

impl Drop for SegmentGuard {
    fn drop(&mut self) {
        self.segment.close(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_segment(sampled: bool) -> Arc<Segment> {
        Segment::from_data(SegmentData {
            id: "53995c3f42cd8ad8".to_string(),
            trace_id: "1-5759e988-bd862e3fe1be46a994272793".to_string(),
            sampled,
            in_progress: true,
            ..SegmentData::default()
        })
    }

    #[test]
    fn close_happens_once() {
        let segment = root_segment(true);
        assert!(segment.close(None));
        let first_end = segment.lock().end_time;

        let err = std::io::Error::other("late failure");
        assert!(!segment.close(Some(&err)));
        assert_eq!(segment.lock().end_time, first_end);
        assert!(segment.lock().cause.is_empty());
        assert!(!segment.lock().in_progress);
    }

    #[test]
    fn close_records_cause_without_flags() {
        let segment = root_segment(true);
        let err = std::io::Error::other("connection reset");
        segment.close(Some(&err));

        let data = segment.lock();
        assert_eq!(data.cause.len(), 1);
        assert_eq!(data.cause[0].message, "connection reset");
        assert!(!data.error && !data.fault && !data.throttle);
    }

    #[test]
    fn guard_closes_on_drop() {
        let segment = root_segment(false);
        {
            let _guard = SegmentGuard::new(Arc::clone(&segment));
            assert!(!segment.is_closed());
        }
        assert!(segment.is_closed());
    }

    #[test]
    fn closed_subsegments_are_bounded() {
        let segment = root_segment(true);
        let open = segment.begin_subsegment("long-running");

        for i in 0..MAX_RETAINED_SUBSEGMENTS + 10 {
            segment.begin_subsegment(format!("call-{i}")).close(None);
        }
        let latest = segment.begin_subsegment("latest");

        let subsegments = segment.subsegments();
        let closed = subsegments.iter().filter(|s| s.is_closed()).count();
        assert_eq!(closed, MAX_RETAINED_SUBSEGMENTS);
        assert!(subsegments.iter().any(|s| Arc::ptr_eq(s, &open)));
        assert!(subsegments.iter().any(|s| Arc::ptr_eq(s, &latest)));
        // 最早关闭的子段先被丢弃
        assert!(!subsegments.iter().any(|s| s.lock().name == "call-0"));
        let newest_call = format!("call-{}", MAX_RETAINED_SUBSEGMENTS + 9);
        assert!(subsegments.iter().any(|s| s.lock().name == newest_call));
    }

    #[test]
    fn subsegment_inherits_trace() {
        let segment = root_segment(true);
        let child = segment.begin_subsegment("svc.example:443");

        let data = child.lock();
        assert_eq!(data.trace_id, "1-5759e988-bd862e3fe1be46a994272793");
        assert_eq!(data.parent_id.as_deref(), Some("53995c3f42cd8ad8"));
        assert_eq!(data.name, "svc.example:443");
        assert!(data.sampled);
        drop(data);

        assert_eq!(segment.subsegments().len(), 1);
    }

    #[test]
    fn downstream_header_points_at_segment() {
        let segment = root_segment(false);
        segment.lock().incoming_header = Some(TraceHeader::parse("Root=1-old;Lineage=a:1"));

        assert_eq!(
            segment.downstream_header().to_string(),
            "Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=0;Lineage=a:1"
        );
    }
}
