//! HTTP routes

pub mod enrollment;
pub mod frames;

use proctor::AttemptId;
use serde::{Deserialize, Deserializer};

/// Exam clients send the attempt id either as a number or as a numeric string
pub(crate) fn attempt_id<'de, D>(deserializer: D) -> Result<AttemptId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(AttemptId),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom("attempt id is not an integer")),
    }
}
