//! Maps the maintenance feed's resource names onto cluster hostnames.
//!
//! The feed names a machine `<scaleset>_<instance>` while the machine joins
//! the cluster under `<scaleset><suffix>`, where the suffix is the instance
//! number in base 36, left-padded with zeros by magnitude band.

const BASE36_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum HostnameError {
    #[error("Resource name {0:?} is missing the _<instance> suffix")]
    MissingSeparator(String),
    #[error("Resource name {name:?} has a non-numeric instance suffix")]
    InvalidInstance {
        name: String,
        source: std::num::ParseIntError,
    },
    #[error("Suffix {suffix:?} contains the non base 36 digit {digit:?}")]
    InvalidDigit { suffix: String, digit: char },
    #[error("Suffix {0:?} exceeds the 64 bit instance range")]
    InstanceOutOfRange(String),
}

/// Translates a resource name like `node_40` into the hostname the same
/// machine carries inside the cluster, `node000014`.
pub fn encode(resource_name: &str) -> Result<String, HostnameError> {
    let mut parts = resource_name.splitn(2, '_');
    let name = parts.next().unwrap_or_default();
    let instance = parts
        .next()
        .ok_or_else(|| HostnameError::MissingSeparator(resource_name.to_owned()))?;

    let instance: u64 = instance.parse().map_err(|source| HostnameError::InvalidInstance {
        name: resource_name.to_owned(),
        source,
    })?;

    Ok(format!("{}{}", name, encode_instance(instance)))
}

/// Base 36 with banded zero padding. The bands shrink the padding as the
/// magnitude grows, keeping the suffix at a fixed width over the instance
/// numbers a scale set hands out.
pub fn encode_instance(instance: u64) -> String {
    let padding = match instance {
        0..=35 => "00000",
        36..=1295 => "0000",
        1296..=46655 => "000",
        46656..=1676015 => "00",
        _ => "0",
    };

    format!("{}{}", padding, encode_base36(instance))
}

/// Inverse of [`encode_instance`] over the numeric suffix, tolerant of
/// padding and case.
pub fn decode_instance(suffix: &str) -> Result<u64, HostnameError> {
    let mut instance: u64 = 0;

    for digit in suffix.chars() {
        let value = match digit.to_ascii_uppercase() {
            d @ '0'..='9' => d as u64 - '0' as u64,
            d @ 'A'..='Z' => d as u64 - 'A' as u64 + 10,
            _ => {
                return Err(HostnameError::InvalidDigit {
                    suffix: suffix.to_owned(),
                    digit,
                })
            }
        };

        instance = instance
            .checked_mul(36)
            .and_then(|i| i.checked_add(value))
            .ok_or_else(|| HostnameError::InstanceOutOfRange(suffix.to_owned()))?;
    }

    Ok(instance)
}

fn encode_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_owned();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_ALPHABET[(value % 36) as usize]);
        value /= 36;
    }

    digits.iter().rev().map(|&d| char::from(d)).collect()
}
