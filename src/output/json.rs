use crate::model::Report;
use anyhow::Result;

pub fn generate_json_string(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
