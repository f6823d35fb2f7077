use chrono::Duration;

use crate::helper::{message_of, spawn_app, TestApp};

async fn subscribe(app: &TestApp, email: &str) -> u32 {
    let res = app
        .post_subscribe(&serde_json::json!({ "email": email }))
        .await;
    assert_eq!(200, res.status().as_u16());

    app.get_otp_code(&email.trim().to_lowercase()).await
}

fn wrong(code: u32) -> u32 {
    if code == 99_999 {
        10_000
    } else {
        code + 1
    }
}

#[tokio::test]
async fn subscribe_then_verify_flow() {
    let app = spawn_app().await;
    let code = subscribe(&app, "a@x.com").await;

    let res = app
        .post_subscribe(&serde_json::json!({ "email": "a@x.com" }))
        .await;
    assert_eq!(400, res.status().as_u16());

    let res = app
        .post_verify(&serde_json::json!({ "email": "a@x.com", "otp": wrong(code) }))
        .await;
    assert_eq!(400, res.status().as_u16());
    assert_eq!("Invalid OTP", message_of(res).await);

    let res = app
        .post_verify(&serde_json::json!({ "email": "a@x.com", "otp": code }))
        .await;
    assert_eq!(200, res.status().as_u16());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!("OTP verified successfully", body["message"]);
    assert_eq!(true, body["success"]);

    let res = app
        .post_verify(&serde_json::json!({ "email": "a@x.com", "otp": code }))
        .await;
    assert_eq!(400, res.status().as_u16());
    assert_eq!("OTP not found or expired", message_of(res).await);
}

#[tokio::test]
async fn otp_as_string_and_unnormalized_email() {
    let app = spawn_app().await;
    let code = subscribe(&app, "b@x.com").await;

    let res = app
        .post_verify(&serde_json::json!({ "email": " B@X.com", "otp": code.to_string() }))
        .await;
    assert_eq!(200, res.status().as_u16());
}

#[tokio::test]
async fn expired_otp_is_rejected() {
    let app = spawn_app().await;
    let code = subscribe(&app, "a@x.com").await;

    app.clock.advance(Duration::minutes(5) + Duration::seconds(1));

    let res = app
        .post_verify(&serde_json::json!({ "email": "a@x.com", "otp": code }))
        .await;
    assert_eq!(400, res.status().as_u16());
    assert_eq!("OTP has expired", message_of(res).await);

    let res = app
        .post_verify(&serde_json::json!({ "email": "a@x.com", "otp": code }))
        .await;
    assert_eq!(400, res.status().as_u16());
    assert_eq!("OTP not found or expired", message_of(res).await);
}

#[tokio::test]
async fn wrong_otp_allows_retry_before_expiry() {
    let app = spawn_app().await;
    let code = subscribe(&app, "a@x.com").await;

    for otp in [
        serde_json::json!(wrong(code)),
        serde_json::json!("not-a-number"),
    ] {
        let res = app
            .post_verify(&serde_json::json!({ "email": "a@x.com", "otp": otp }))
            .await;
        assert_eq!(400, res.status().as_u16());
        assert_eq!("Invalid OTP", message_of(res).await);
    }

    app.clock.advance(Duration::minutes(4));
    let res = app
        .post_verify(&serde_json::json!({ "email": "a@x.com", "otp": code }))
        .await;
    assert_eq!(200, res.status().as_u16());
}

#[tokio::test]
async fn unknown_email_is_not_found() {
    let app = spawn_app().await;

    let res = app
        .post_verify(&serde_json::json!({ "email": "nobody@x.com", "otp": 12345 }))
        .await;
    assert_eq!(400, res.status().as_u16());
    assert_eq!("OTP not found or expired", message_of(res).await);
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let app = spawn_app().await;

    let datas = [
        (serde_json::json!({ "otp": "12345" }), "email is missing."),
        (serde_json::json!({ "email": "", "otp": "12345" }), "email is empty."),
        (serde_json::json!({ "email": "a@x.com" }), "otp is missing."),
        (serde_json::json!({ "email": "a@x.com", "otp": null }), "otp is null."),
        (serde_json::json!({ "email": "a@x.com", "otp": " " }), "otp is blank."),
        (serde_json::json!({ "email": "a@x.com", "otp": 0 }), "otp is zero."),
    ];
    for (body, payload) in datas {
        let res = app.post_verify(&body).await;
        assert_eq!(400, res.status().as_u16(), "{payload}");
        assert_eq!("Email and OTP are required", message_of(res).await, "{payload}");
    }
}

#[tokio::test]
async fn fractional_otp_is_truncated() {
    let app = spawn_app().await;
    let code = subscribe(&app, "a@x.com").await;

    let res = app
        .post_verify(&serde_json::json!({ "email": "a@x.com", "otp": f64::from(code) + 0.7 }))
        .await;
    assert_eq!(200, res.status().as_u16());
}

#[tokio::test]
async fn otp_with_trailing_garbage_uses_leading_digits() {
    let app = spawn_app().await;
    let code = subscribe(&app, "a@x.com").await;

    let res = app
        .post_verify(&serde_json::json!({ "email": "a@x.com", "otp": format!(" {code}abc") }))
        .await;
    assert_eq!(200, res.status().as_u16());
}

#[tokio::test]
async fn otp_of_wrong_type_is_invalid_body() {
    let app = spawn_app().await;

    let res = app
        .post_verify(&serde_json::json!({ "email": "a@x.com", "otp": [12345] }))
        .await;
    assert_eq!(400, res.status().as_u16());
    assert_eq!("Invalid request body", message_of(res).await);
}
