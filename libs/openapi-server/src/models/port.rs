//! Serde helpers for API ports sent as a number or as numeric text.
//!
//! Browser prompts post `"8728"` rather than `8728`, and stores written from
//! those requests keep the string form.

use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum PortRepr {
    Number(u64),
    Text(String),
}

/// `None` for a blank string or zero
fn parse<E: de::Error>(repr: PortRepr) -> Result<Option<u16>, E> {
    let value = match repr {
        PortRepr::Number(n) => n,
        PortRepr::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<u64>()
                .map_err(|_| E::custom(format!("invalid port {text:?}")))?
        }
    };
    match value {
        0 => Ok(None),
        n => u16::try_from(n)
            .map(Some)
            .map_err(|_| E::custom(format!("port {n} out of range"))),
    }
}

/// Required port
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    parse::<D::Error>(PortRepr::deserialize(deserializer)?)?
        .ok_or_else(|| de::Error::custom("port is required"))
}

/// Optional port; null, blank and zero all mean unset
pub fn deserialize_opt<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u16>, D::Error> {
    match Option::<PortRepr>::deserialize(deserializer)? {
        Some(repr) => parse(repr),
        None => Ok(None),
    }
}
