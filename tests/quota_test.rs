mod common;

use serde_json::Value;

async fn quota(app: &common::TestApp, token: &str) -> Value {
    let resp = app
        .client
        .get(app.url("/me/quota"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    body["data"].clone()
}

#[tokio::test]
async fn sixth_report_of_the_day_is_rejected() {
    let app = common::spawn_app().await;
    let (user_id, token) = common::create_test_user(&app, "Quota").await;
    let bbmp = common::category_id(&app.db, "bbmp").await;

    for i in 0..5 {
        // ~1.1 km apart, well outside the duplicate radius.
        common::submit_ok(
            &app,
            &token,
            bbmp,
            common::BASE_LAT + 0.01 * i as f64,
            common::BASE_LNG,
        )
        .await;
    }

    let resp = common::submit(
        &app,
        &token,
        &common::complaint_body(bbmp, common::BASE_LAT + 0.2, common::BASE_LNG),
    )
    .await;
    assert_eq!(resp.status(), 429);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "quota_exceeded");

    let complaints = common::count_rows(
        &app.db,
        "SELECT COUNT(*) FROM complaints WHERE user_id = $1",
        vec![user_id.into()],
    )
    .await;
    assert_eq!(complaints, 5);

    let usage = quota(&app, &token).await;
    assert_eq!(usage["used"], 5);
    assert_eq!(usage["limit"], 5);
    assert_eq!(usage["remaining"], 0);
}

#[tokio::test]
async fn reports_today_counts_up() {
    let app = common::spawn_app().await;
    let (_user_id, token) = common::create_test_user(&app, "Counter").await;
    let traffic = common::category_id(&app.db, "traffic").await;

    for expected in 1..=3 {
        let resp = common::submit(
            &app,
            &token,
            &common::complaint_body(
                traffic,
                common::BASE_LAT,
                common::BASE_LNG + 0.01 * expected as f64,
            ),
        )
        .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["reports_today"], expected);
    }

    let usage = quota(&app, &token).await;
    assert_eq!(usage["remaining"], 2);
}

#[tokio::test]
async fn rejected_duplicate_does_not_consume_quota() {
    let app = common::spawn_app().await;
    let (_a, token_a) = common::create_test_user(&app, "First").await;
    let (_b, token_b) = common::create_test_user(&app, "Second").await;
    let bbmp = common::category_id(&app.db, "bbmp").await;

    common::submit_ok(&app, &token_a, bbmp, common::BASE_LAT, common::BASE_LNG).await;

    let resp = common::submit(
        &app,
        &token_b,
        &common::complaint_body(bbmp, common::BASE_LAT, common::BASE_LNG),
    )
    .await;
    assert_eq!(resp.status(), 409);

    let usage = quota(&app, &token_b).await;
    assert_eq!(usage["used"], 0);
    assert_eq!(usage["remaining"], 5);
}

#[tokio::test]
async fn quotas_are_per_user() {
    let app = common::spawn_app().await;
    let (_a, token_a) = common::create_test_user(&app, "Busy").await;
    let (_b, token_b) = common::create_test_user(&app, "Fresh").await;
    let bbmp = common::category_id(&app.db, "bbmp").await;

    for i in 0..5 {
        common::submit_ok(
            &app,
            &token_a,
            bbmp,
            common::BASE_LAT + 0.01 * i as f64,
            common::BASE_LNG,
        )
        .await;
    }

    common::submit_ok(
        &app,
        &token_b,
        bbmp,
        common::BASE_LAT - 0.05,
        common::BASE_LNG,
    )
    .await;

    assert_eq!(quota(&app, &token_a).await["remaining"], 0);
    assert_eq!(quota(&app, &token_b).await["used"], 1);
}

#[tokio::test]
async fn concurrent_submissions_never_exceed_the_limit() {
    let app = common::spawn_app().await;
    let (user_id, token) = common::create_test_user(&app, "Burst").await;
    let bbmp = common::category_id(&app.db, "bbmp").await;

    let requests = (0..8).map(|i| {
        let client = app.client.clone();
        let url = app.url("/complaints");
        let token = token.clone();
        let body = common::complaint_body(
            bbmp,
            common::BASE_LAT + 0.01 * i as f64,
            common::BASE_LNG,
        );
        tokio::spawn(async move {
            client
                .post(url)
                .bearer_auth(token)
                .json(&body)
                .send()
                .await
                .unwrap()
                .status()
                .as_u16()
        })
    });

    let mut accepted = 0;
    let mut limited = 0;
    for handle in requests.collect::<Vec<_>>() {
        match handle.await.unwrap() {
            200 => accepted += 1,
            429 => limited += 1,
            other => panic!("unexpected status {}", other),
        }
    }
    assert_eq!(accepted, 5);
    assert_eq!(limited, 3);

    let complaints = common::count_rows(
        &app.db,
        "SELECT COUNT(*) FROM complaints WHERE user_id = $1",
        vec![user_id.into()],
    )
    .await;
    assert_eq!(complaints, 5);
}
