mod common;

use serde_json::Value;
use uuid::Uuid;

async fn board(app: &common::TestApp, query: &str) -> Vec<Value> {
    let resp = app
        .client
        .get(app.url(&format!("/leaderboard{}", query)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    body["data"].as_array().unwrap().clone()
}

async fn rank(app: &common::TestApp, user_id: Uuid) -> Value {
    let resp = app
        .client
        .get(app.url(&format!("/users/{}/rank", user_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    body["data"].clone()
}

#[tokio::test]
async fn ordered_by_points() {
    let app = common::spawn_app().await;
    let (a, token_a) = common::create_test_user(&app, "Three Reports").await;
    let (b, token_b) = common::create_test_user(&app, "One Report").await;
    let (c, token_c) = common::create_test_user(&app, "Cleaner").await;
    let (admin, admin_token) = common::create_test_user(&app, "Admin").await;
    common::make_admin(&app.db, admin).await;
    let bbmp = common::category_id(&app.db, "bbmp").await;

    for i in 0..3 {
        common::submit_ok(
            &app,
            &token_a,
            bbmp,
            common::BASE_LAT + 0.01 * i as f64,
            common::BASE_LNG,
        )
        .await;
    }
    common::submit_ok(&app, &token_b, bbmp, common::BASE_LAT - 0.01, common::BASE_LNG).await;
    let cleaned =
        common::submit_ok(&app, &token_c, bbmp, common::BASE_LAT - 0.02, common::BASE_LNG).await;

    let resp = app
        .client
        .post(app.url(&format!("/admin/complaints/{}/awards", cleaned)))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "action": "self_cleaned" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let entries = board(&app, "").await;
    let summary: Vec<(String, i64, i64)> = entries
        .iter()
        .map(|e| {
            (
                e["user_id"].as_str().unwrap().to_string(),
                e["points"].as_i64().unwrap(),
                e["rank"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            (c.to_string(), 40, 1),
            (a.to_string(), 30, 2),
            (b.to_string(), 10, 3),
        ]
    );
    assert_eq!(entries[0]["display_name"], "Cleaner");
    assert_eq!(entries[1]["total_reports"], 3);

    // No ledger activity, no entry.
    assert!(entries.iter().all(|e| e["user_id"] != admin.to_string()));
}

#[tokio::test]
async fn ties_share_rank_and_earliest_reporter_leads() {
    let app = common::spawn_app().await;
    let (early, token_early) = common::create_test_user(&app, "Early").await;
    let (late, token_late) = common::create_test_user(&app, "Late").await;
    let (penalised, token_penalised) = common::create_test_user(&app, "Penalised").await;
    let (admin, admin_token) = common::create_test_user(&app, "Admin").await;
    common::make_admin(&app.db, admin).await;
    let bbmp = common::category_id(&app.db, "bbmp").await;

    common::submit_ok(&app, &token_early, bbmp, common::BASE_LAT, common::BASE_LNG).await;
    common::submit_ok(&app, &token_late, bbmp, common::BASE_LAT + 0.01, common::BASE_LNG).await;
    let bogus = common::submit_ok(
        &app,
        &token_penalised,
        bbmp,
        common::BASE_LAT + 0.02,
        common::BASE_LNG,
    )
    .await;
    let resp = app
        .client
        .post(app.url(&format!("/admin/complaints/{}/awards", bogus)))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "action": "false_report" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let entries = board(&app, "").await;
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["user_id"], early.to_string());
    assert_eq!(entries[1]["user_id"], late.to_string());
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[1]["rank"], 1);
    assert_eq!(entries[2]["user_id"], penalised.to_string());
    assert_eq!(entries[2]["rank"], 3);
    assert_eq!(entries[2]["points"], -10);

    let late_rank = rank(&app, late).await;
    assert_eq!(late_rank["rank"], 1);
    assert_eq!(late_rank["points"], 10);
    assert_eq!(rank(&app, penalised).await["rank"], 3);
}

#[tokio::test]
async fn users_without_activity_have_no_rank() {
    let app = common::spawn_app().await;
    let (idle, _token) = common::create_test_user(&app, "Idle").await;

    assert!(rank(&app, idle).await.is_null());
    assert!(rank(&app, Uuid::new_v4()).await.is_null());
    assert!(board(&app, "").await.is_empty());
}

#[tokio::test]
async fn limit_is_validated_and_applied() {
    let app = common::spawn_app().await;
    let bbmp = common::category_id(&app.db, "bbmp").await;

    for i in 0..3 {
        let (_user, token) = common::create_test_user(&app, &format!("User {}", i)).await;
        common::submit_ok(
            &app,
            &token,
            bbmp,
            common::BASE_LAT + 0.01 * i as f64,
            common::BASE_LNG,
        )
        .await;
    }

    assert_eq!(board(&app, "?limit=1").await.len(), 1);
    let all = board(&app, "").await;
    let tail = board(&app, "?offset=1&limit=5").await;
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0]["user_id"], all[1]["user_id"]);
    assert_eq!(tail[0]["rank"], all[1]["rank"]);
    assert!(board(&app, "?offset=100").await.is_empty());
    assert_eq!(board(&app, "").await.len(), 3);
    assert_eq!(board(&app, "?limit=100").await.len(), 3);

    for bad in ["limit=0", "limit=101", "offset=101"] {
        let resp = app
            .client
            .get(app.url(&format!("/leaderboard?{}", bad)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "{}", bad);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], "validation");
    }
}

#[tokio::test]
async fn rejected_or_penalised_reports_are_not_counted() {
    let app = common::spawn_app().await;
    let (_user, token) = common::create_test_user(&app, "Careless").await;
    let (admin, admin_token) = common::create_test_user(&app, "Admin").await;
    common::make_admin(&app.db, admin).await;
    let bbmp = common::category_id(&app.db, "bbmp").await;

    let kept = common::submit_ok(&app, &token, bbmp, common::BASE_LAT, common::BASE_LNG).await;
    let bogus =
        common::submit_ok(&app, &token, bbmp, common::BASE_LAT + 0.01, common::BASE_LNG).await;
    let rejected =
        common::submit_ok(&app, &token, bbmp, common::BASE_LAT + 0.02, common::BASE_LNG).await;

    assert_eq!(board(&app, "").await[0]["total_reports"], 3);

    for status in ["forwarded", "rejected"] {
        assert_eq!(
            common::transition(&app, &admin_token, rejected, status)
                .await
                .status(),
            200
        );
    }
    let resp = app
        .client
        .post(app.url(&format!("/admin/complaints/{}/awards", bogus)))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "action": "false_report" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let entries = board(&app, "").await;
    assert_eq!(entries[0]["points"], 10);
    assert_eq!(entries[0]["total_reports"], 1);

    // A lone penalised report counts for nothing.
    assert_eq!(
        common::transition(&app, &admin_token, kept, "forwarded")
            .await
            .status(),
        200
    );
    assert_eq!(
        common::transition(&app, &admin_token, kept, "rejected")
            .await
            .status(),
        200
    );
    assert_eq!(board(&app, "").await[0]["total_reports"], 0);
}

#[tokio::test]
async fn top_n_matches_the_endpoint() {
    let app = common::spawn_app().await;
    let bbmp = common::category_id(&app.db, "bbmp").await;
    for i in 0..2 {
        let (_user, token) = common::create_test_user(&app, &format!("Reporter {}", i)).await;
        common::submit_ok(
            &app,
            &token,
            bbmp,
            common::BASE_LAT + 0.01 * i as f64,
            common::BASE_LNG,
        )
        .await;
    }

    let top = civicdesk::services::LeaderboardService::new(app.db.clone())
        .top_n(1)
        .await
        .unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].rank, 1);
    assert_eq!(top[0].points, 10);
    assert_eq!(
        serde_json::to_value(&top[0]).unwrap(),
        board(&app, "?limit=1").await[0]
    );
}
