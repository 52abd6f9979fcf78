//! 段命名策略

/// 根据 host 计算段名
pub trait SegmentNamer: Send + Sync {
    fn name(&self, host: &str) -> String;
}

impl<F> SegmentNamer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn name(&self, host: &str) -> String {
        self(host)
    }
}

/// 固定段名
#[derive(Debug, Clone)]
pub struct FixedSegmentNamer {
    name: String,
}

impl FixedSegmentNamer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl SegmentNamer for FixedSegmentNamer {
    fn name(&self, _host: &str) -> String {
        self.name.clone()
    }
}

/// 动态段名：host 命中识别模式时以 host 命名，否则使用回退名
///
/// 模式支持 `*`（任意长度）和 `?`（单个字符），不区分大小写。
#[derive(Debug, Clone)]
pub struct DynamicSegmentNamer {
    fallback_name: String,
    recognized_hosts: String,
}

impl DynamicSegmentNamer {
    pub fn new(fallback_name: impl Into<String>, recognized_hosts: impl Into<String>) -> Self {
        Self {
            fallback_name: fallback_name.into(),
            recognized_hosts: recognized_hosts.into(),
        }
    }
}

impl SegmentNamer for DynamicSegmentNamer {
    fn name(&self, host: &str) -> String {
        if wildcard_match(&self.recognized_hosts, host) {
            host.to_string()
        } else {
            self.fallback_name.clone()
        }
    }
}

/// 不区分大小写的通配符匹配
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();

    let (mut p, mut t) = (0, 0);
    // 最近一个 `*` 的位置，以及它当时对齐的文本位置
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
