use crate::error::Result;
use crate::interceptor::{
    DynamicSegmentNamer, FixedSegmentNamer, SegmentNamer, ServerInterceptor, ServerOption,
    with_context,
};
use crate::segment::{ConstantSampler, Recorder, RecorderConfig, TraceContext};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TracingConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    pub segment: Option<SegmentConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SamplingConfig {
    /// 入站头没有给出采样决策时使用
    #[serde(default = "default_sampled")]
    pub default_sampled: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            default_sampled: default_sampled(),
        }
    }
}

fn default_sampled() -> bool {
    true
}

/// 段命名配置
///
/// 设置 `fixed_name` 时总是使用该名字；设置 `recognized_hosts` 时命中的 host
/// 直接作为段名，其余使用 `fallback_name`（缺省为服务名）
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SegmentConfig {
    pub fixed_name: Option<String>,
    pub recognized_hosts: Option<String>,
    pub fallback_name: Option<String>,
}

impl TracingConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TracingConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn recorder(&self) -> Recorder {
        Recorder::new(RecorderConfig {
            service_version: self.service.version.clone(),
            sampler: Arc::new(ConstantSampler::new(self.sampling.default_sampled)),
        })
    }

    pub fn segment_namer(&self) -> Option<Arc<dyn SegmentNamer>> {
        let segment = self.segment.as_ref()?;

        if let Some(name) = &segment.fixed_name {
            return Some(Arc::new(FixedSegmentNamer::new(name.clone())));
        }

        let recognized_hosts = segment.recognized_hosts.as_ref()?;
        let fallback_name = segment
            .fallback_name
            .clone()
            .or_else(|| self.service.name.clone())
            .unwrap_or_default();
        Some(Arc::new(DynamicSegmentNamer::new(
            fallback_name,
            recognized_hosts.clone(),
        )))
    }

    /// 按配置构建服务端拦截器
    pub fn server_interceptor(&self) -> ServerInterceptor {
        let mut options = vec![with_context(
            TraceContext::new().with_recorder(Arc::new(self.recorder())),
        )];
        if let Some(namer) = self.segment_namer() {
            options.push(ServerOption::SegmentNamer(namer));
        }
        ServerInterceptor::new(options)
    }
}
