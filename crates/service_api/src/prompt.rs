//! Prompt construction for the plan generator and decoding of its reply.

use async_trait::async_trait;
use serde_json::Value;

/// Produces the raw text reply of a language model for a fully built prompt.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

pub fn build_plan_prompt(request: &str, part_numbers: &[String], locations: &[String]) -> String {
    let parts = serde_json::to_string(part_numbers).unwrap_or_else(|_| "[]".into());
    let locations = serde_json::to_string(locations).unwrap_or_else(|_| "[]".into());
    format!(
        r#"You are a manufacturing engineer. A manager has made a request: "{request}".

Convert this high-level request into a detailed plan.
1. First, generate the `eBOM_parts` list. Infer the part numbers and quantities needed from the inventory list below.
2. Second, generate the `mBOM_steps` (the manufacturing plan) with locations. Mention the part number of every part a step consumes in that step's text.

Part numbers available in the inventory system:
{parts}

Factory locations:
{locations}

Return ONLY a single, valid JSON object with this exact structure:
{{
  "eBOM_parts": [
    {{"part_number": "CHAS-ENC-001", "name": "Small Enclosure", "quantity": 1}},
    {{"part_number": "DIN-RAIL-1M", "name": "1m DIN Rail", "quantity": 2}}
  ],
  "mBOM_steps": [
    {{"step": "1. Mount 2x DIN-RAIL-1M rails to CHAS-ENC-001", "location": "Station C"}},
    {{"step": "2. Perform quality check", "location": "Quality Control"}}
  ]
}}"#
    )
}

/// Strips markdown code fences and decodes the reply as JSON.
pub fn parse_plan_reply(raw: &str) -> Result<Value, serde_json::Error> {
    let cleaned = raw.trim().replace("```json", "").replace("```", "");
    serde_json::from_str(cleaned.trim())
}
