use std::{fmt, ops::RangeInclusive};

use rand::Rng;

/// 5位数字验证码，取值范围`[10000, 99999]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpCode(u32);

impl OtpCode {
    pub const RANGE: RangeInclusive<u32> = 10_000..=99_999;

    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        Self(rng.gen_range(Self::RANGE))
    }

    #[cfg(test)]
    pub(crate) fn parse(value: u32) -> Result<OtpCode, String> {
        if Self::RANGE.contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!("`{value}` is not a 5-digit code."))
        }
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// 候选值是否与验证码相同，无法解析的输入为`None`，永不匹配
    pub fn matches(&self, candidate: Option<i64>) -> bool {
        candidate == Some(i64::from(self.0))
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
