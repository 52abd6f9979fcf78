//! 错误类型转换实现

use super::TraceError;
use std::io;

impl From<io::Error> for TraceError {
    fn from(err: io::Error) -> Self {
        TraceError::Config(format!("读取配置文件失败: {}", err))
    }
}

impl From<toml::de::Error> for TraceError {
    fn from(err: toml::de::Error) -> Self {
        TraceError::Config(format!("TOML 解析错误: {}", err))
    }
}

impl From<tonic::metadata::errors::InvalidMetadataValue> for TraceError {
    fn from(err: tonic::metadata::errors::InvalidMetadataValue) -> Self {
        TraceError::InvalidMetadata(err.to_string())
    }
}
