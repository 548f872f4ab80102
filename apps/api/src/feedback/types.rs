//! Feedback schema and the record-level feedback slot.
//!
//! A record's `feedback` is either the empty string (analysis pending or
//! failed) or a JSON object that deserializes as [`Feedback`]. Nothing else
//! can be constructed or read back.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    Good,
    Improve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFeedback {
    pub score: f64,
    #[serde(default)]
    pub tips: Vec<Tip>,
}

/// Structured scoring produced by the AI service. Only `overallScore` is
/// mandatory; category breakdowns must match their shape when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub overall_score: f64,
    #[serde(rename = "ATS", default, skip_serializing_if = "Option::is_none")]
    pub ats: Option<CategoryFeedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone_and_style: Option<CategoryFeedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<CategoryFeedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<CategoryFeedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<CategoryFeedback>,
}

/// A JSON object already checked against [`Feedback`]. Keeps the object
/// exactly as the AI produced it, extra keys included.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackValue {
    raw: Value,
    parsed: Feedback,
}

impl FeedbackValue {
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let parsed = Feedback::deserialize(&raw)?;
        Ok(Self { raw, parsed })
    }

    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    pub fn feedback(&self) -> &Feedback {
        &self.parsed
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum FeedbackSlot {
    #[default]
    Pending,
    Scored(FeedbackValue),
}

impl FeedbackSlot {
    pub fn overall_score(&self) -> Option<f64> {
        match self {
            FeedbackSlot::Pending => None,
            FeedbackSlot::Scored(v) => Some(v.feedback().overall_score),
        }
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        matches!(self, FeedbackSlot::Pending)
    }
}

impl Serialize for FeedbackSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeedbackSlot::Pending => serializer.serialize_str(""),
            FeedbackSlot::Scored(v) => v.as_value().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FeedbackSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        match Value::deserialize(deserializer)? {
            Value::String(s) if s.is_empty() => Ok(FeedbackSlot::Pending),
            raw @ Value::Object(_) => FeedbackValue::from_value(raw)
                .map(FeedbackSlot::Scored)
                .map_err(|e| D::Error::custom(format!("invalid feedback object: {e}"))),
            other => Err(D::Error::custom(format!(
                "feedback must be an empty string or an object, got {other}"
            ))),
        }
    }
}
