use serde::Serialize;

/// Number of digits in a well-formed IMEI
pub const IMEI_LEN: usize = 15;

/// A device identifier that passed the shape check.
///
/// Only the shape is validated (15 ASCII digits); the Luhn check digit is not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Imei(String);

impl Imei {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() == IMEI_LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Imei {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
