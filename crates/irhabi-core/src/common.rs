use rand::{Rng, thread_rng};

use crate::error::AppError;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

/// Random string of `n` ASCII letters.
pub fn random_str(n: usize) -> String {
    random_from(LETTERS, n)
}

/// Random string of `n` decimal digits.
pub fn random_numeric(n: usize) -> String {
    random_from(DIGITS, n)
}

fn random_from(charset: &[u8], n: usize) -> String {
    let mut rng = thread_rng();
    (0..n)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}

/// Truncate `num` to `precision` decimal places (no rounding).
pub fn float_precision(num: f64, precision: u32) -> f64 {
    let m = 10f64.powi(precision as i32);
    (num * m).trunc() / m
}

/// Round `num` to `precision` decimals, rounding away from zero when the
/// fractional remainder reaches `intermed`.
///
/// `rounder(2.588, 0.5, 1)` is `2.6`, `rounder(2.588, 0.9, 1)` is `2.5`.
pub fn rounder(num: f64, intermed: f64, precision: u32) -> f64 {
    let pow = 10f64.powi(precision as i32);
    let digit = pow * num;
    let div = digit.fract();

    let round = if num > 0.0 {
        if div >= intermed {
            digit.ceil()
        } else {
            digit.floor()
        }
    } else if div >= intermed {
        digit.floor()
    } else {
        digit.ceil()
    };

    round / pow
}

/// Obfuscate a numeric id by swapping its 16-bit halves.
///
/// The transform is its own inverse, so [`decrypt`] applies it again.
pub fn encrypt(id: i64) -> String {
    let num = id as u64 & 0xFFFF_FFFF;
    (((num & 0x0000_FFFF) << 16) + ((num & 0xFFFF_0000) >> 16)).to_string()
}

/// Recover the id obfuscated by [`encrypt`].
pub fn decrypt(value: &str) -> Result<i64, AppError> {
    let parsed = value.trim().parse::<i64>().unwrap_or(0);
    let id: i64 = encrypt(parsed).parse().unwrap_or(0);
    if id == 0 {
        return Err(AppError::Generic(format!(
            "Invalid encryption values: {value}"
        )));
    }
    Ok(id)
}

/// Hash a password with bcrypt at the default cost.
pub fn password_hash(plain: &str) -> Result<String, AppError> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Generic(format!("Failed to hash password: {e}")))
}

/// Compare a bcrypt hash with its possible plaintext.
pub fn password_verify(hashed: &str, plain: &str) -> bool {
    bcrypt::verify(plain, hashed).unwrap_or(false)
}

/// True when `items` holds an element equal to `needle`.
pub fn contains<S: AsRef<str>>(items: &[S], needle: &str) -> bool {
    items.iter().any(|item| item.as_ref() == needle)
}
