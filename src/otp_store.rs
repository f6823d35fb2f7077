use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Duration, Utc};

use crate::domain::{OtpCode, SubscriberEmail};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOtp {
    pub code: OtpCode,
    pub expires_at: DateTime<Utc>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum OtpError {
    #[error("OTP not found or expired")]
    NotFound,
    #[error("OTP has expired")]
    Expired,
    #[error("Invalid OTP")]
    Invalid,
}

/// 进程内的待验证码存储
///
/// 每个邮件地址最多保存一个[`PendingOtp`]，新的验证码覆盖旧的。
/// 每次操作只持有一次锁，校验过期、比对、删除在同一临界区内完成。
/// 进程重启后全部丢失。
pub struct OtpStore {
    pending: Mutex<HashMap<SubscriberEmail, PendingOtp>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl OtpStore {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            clock,
            ttl,
        }
    }

    pub fn with_system_clock(ttl: Duration) -> Self {
        Self::new(Arc::new(SystemClock), ttl)
    }

    /// 生成新的验证码并覆盖该邮件地址之前的验证码
    pub fn issue(&self, email: &SubscriberEmail) -> OtpCode {
        let code = OtpCode::generate(&mut rand::thread_rng());
        self.insert(email, code);
        code
    }

    pub fn insert(&self, email: &SubscriberEmail, code: OtpCode) -> PendingOtp {
        let pending = PendingOtp {
            code,
            expires_at: self.clock.now() + self.ttl,
        };
        self.entries().insert(email.clone(), pending);
        pending
    }

    /// 校验验证码
    ///
    /// - 不存在：[`OtpError::NotFound`]
    /// - 已过期：删除并返回[`OtpError::Expired`]
    /// - 匹配：删除，验证码只能使用一次
    /// - 不匹配：[`OtpError::Invalid`]，保留验证码，过期前可重试
    ///
    /// `candidate`为`None`表示输入无法解析为整数
    pub fn verify(&self, email: &SubscriberEmail, candidate: Option<i64>) -> Result<(), OtpError> {
        let mut entries = self.entries();
        let pending = *entries.get(email).ok_or(OtpError::NotFound)?;

        if self.clock.now() > pending.expires_at {
            entries.remove(email);
            return Err(OtpError::Expired);
        }

        if !pending.code.matches(candidate) {
            return Err(OtpError::Invalid);
        }

        entries.remove(email);
        Ok(())
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<SubscriberEmail, PendingOtp>> {
        // map中只有普通数据，锁中毒后可直接继续使用
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
