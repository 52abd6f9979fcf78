//! metadata 工具函数

use crate::error::Result;
use tonic::metadata::{Ascii, MetadataMap, MetadataValue};

/// 提取只出现一次的 metadata 值
///
/// 键不存在、出现多次或值不是合法 ASCII 时返回 `None`。
pub fn single_value<'a>(metadata: &'a MetadataMap, key: &str) -> Option<&'a str> {
    let mut values = metadata.get_all(key).iter();
    let value = values.next()?;
    if values.next().is_some() {
        return None;
    }
    value.to_str().ok()
}

/// 以静态键写入 ASCII metadata，覆盖已有值
pub fn insert_value(metadata: &mut MetadataMap, key: &'static str, value: &str) -> Result<()> {
    let value: MetadataValue<Ascii> = value.parse()?;
    metadata.insert(key, value);
    Ok(())
}
