use serde::{Deserialize, Serialize};

/// Client identity as the booking surfaces know it. There is no account
/// system; the normalized phone number is the de facto key for "my
/// bookings" lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub name: String,
    pub phone: String,
}

/// Normalizes a phone number to the local 10-digit `0XXXXXXXXX` form,
/// accepting the international `27…` variants clients tend to paste in.
pub fn normalize_phone(raw: &str) -> anyhow::Result<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    let local = if digits.starts_with("27") && digits.len() == 11 {
        format!("0{}", &digits[2..])
    } else if digits.starts_with("270") && digits.len() == 12 {
        digits[2..].to_string()
    } else {
        digits
    };

    let valid = local.len() == 10
        && local.starts_with('0')
        && local.chars().all(|c| c.is_ascii_digit())
        && local != "0000000000";

    if !valid {
        anyhow::bail!("invalid phone number: expected a 10-digit mobile number starting with 0");
    }
    Ok(local)
}
