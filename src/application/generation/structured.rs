//! 结构化输出解析

use serde_json::Value;

use super::drafts::{Draft, SchemaError};
use crate::application::ports::GenerationResponse;

/// 去掉 ```json ... ``` 代码围栏
fn strip_code_fence(output: &str) -> &str {
    let trimmed = output.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// 把原始输出解析为 JSON 值
pub fn extract_json(response: &GenerationResponse) -> Result<Value, SchemaError> {
    if let Some(parsed) = response.parsed_output.as_ref().filter(|v| v.is_object()) {
        return Ok(parsed.clone());
    }
    serde_json::from_str(strip_code_fence(&response.output))
        .map_err(|e| SchemaError::Malformed(e.to_string()))
}

/// 解析并严格校验草稿，然后规范化自由文本字段
pub fn parse_draft<T: Draft>(response: &GenerationResponse) -> Result<T, SchemaError> {
    let value = extract_json(response)?;
    let mut draft: T =
        serde_json::from_value(value).map_err(|e| SchemaError::Malformed(e.to_string()))?;
    draft.validate()?;
    draft.normalize();
    Ok(draft)
}
