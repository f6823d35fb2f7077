mod otp_code;
mod subscriber;
mod subscriber_email;

pub use otp_code::OtpCode;
pub use subscriber::Subscriber;
pub use subscriber_email::SubscriberEmail;
