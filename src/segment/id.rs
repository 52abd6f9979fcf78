//! 段 ID 与追踪 ID 生成
//!
//! 追踪 ID 形如 `1-5759e988-bd862e3fe1be46a994272793`：版本号、
//! 8 位十六进制秒级时间戳、24 位十六进制随机数。段 ID 为 16 位十六进制随机数。

use uuid::Uuid;

const TRACE_ID_VERSION: &str = "1";

/// 生成新的追踪 ID
pub fn new_trace_id() -> String {
    let epoch = chrono::Utc::now().timestamp();
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{:08x}-{}", TRACE_ID_VERSION, epoch, &random[..24])
}

/// 生成新的段 ID
pub fn new_segment_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    random[..16].to_string()
}

/// 当前时间（秒，带小数）
pub(crate) fn epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
