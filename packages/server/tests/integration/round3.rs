use crate::common::{TestApp, routes};
use serde_json::json;

fn code_artifact(code: &str) -> serde_json::Value {
    json!({"type": "code", "language": "python", "code": code})
}

fn web_artifact() -> serde_json::Value {
    json!({"type": "web", "html": "<p>hi</p>", "css": "p { color: red; }", "js": ""})
}

/// A participant who finished round 2 and got flagged by the ranker.
async fn qualified_user(app: &TestApp, admin: &str, username: &str) -> String {
    let token = app.create_authenticated_user(username, "pass1234").await;
    app.promote_user(username, 3, true).await;
    app.set_round_access(admin, 3, true).await;
    token
}

mod track_choice {
    use super::*;

    #[tokio::test]
    async fn unqualified_participants_cannot_choose() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
        let token = app.create_authenticated_user("alice", "pass1234").await;
        app.set_round_access(&admin, 3, true).await;

        let res = app
            .put_with_token(routes::TRACK, &json!({"track": "dsa"}), &token)
            .await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn choosing_requires_the_gate() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", "pass1234").await;
        app.promote_user("alice", 3, true).await;

        let res = app
            .put_with_token(routes::TRACK, &json!({"track": "dsa"}), &token)
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "ROUND_DISABLED");
    }

    #[tokio::test]
    async fn the_choice_is_write_once() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
        let token = qualified_user(&app, &admin, "alice").await;

        let first = app
            .put_with_token(routes::TRACK, &json!({"track": "dsa"}), &token)
            .await;
        assert_eq!(first.status, 200);
        assert_eq!(first.body["track"], "dsa");

        // Same value again: idempotent no-op.
        let repeat = app
            .put_with_token(routes::TRACK, &json!({"track": "dsa"}), &token)
            .await;
        assert_eq!(repeat.status, 200);

        // Different value: permanently immutable.
        let switch = app
            .put_with_token(routes::TRACK, &json!({"track": "web"}), &token)
            .await;
        assert_eq!(switch.status, 409);
        assert_eq!(switch.body["code"], "IMMUTABLE_CHOICE");

        let me = app.get_with_token(routes::ME, &token).await;
        assert_eq!(me.body["round3_track"], "dsa");
    }
}

mod challenges {
    use super::*;

    #[tokio::test]
    async fn catalog_requires_a_chosen_track() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
        let token = qualified_user(&app, &admin, "alice").await;

        let res = app.get_with_token(routes::CHALLENGES, &token).await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn catalog_lists_the_track_with_templates() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
        let token = qualified_user(&app, &admin, "alice").await;
        app.put_with_token(routes::TRACK, &json!({"track": "web"}), &token)
            .await;

        let res = app.get_with_token(routes::CHALLENGES, &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["track"], "web");
        let challenges = res.body["challenges"].as_array().unwrap();
        assert_eq!(challenges.len(), 3);
        assert!(challenges[0]["templates"]["html"].is_string());
        assert_eq!(res.body["track_complete"], false);
    }
}

mod submissions {
    use super::*;

    #[tokio::test]
    async fn artifacts_enter_the_review_queue_unscored() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
        let token = qualified_user(&app, &admin, "alice").await;
        app.put_with_token(routes::TRACK, &json!({"track": "dsa"}), &token)
            .await;

        let res = app
            .post_with_token(
                routes::ROUND3_SUBMISSIONS,
                &json!({"challenge_id": 1, "artifact": code_artifact("def two_sum(n, t): ...")}),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["scored"], false);
        assert!(res.body["score"].is_null());
        assert_eq!(res.body["auto_submitted"], false);
        assert_eq!(res.body["challenge_name"], "Two Sum");
    }

    #[tokio::test]
    async fn artifact_shape_must_match_the_track() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
        let token = qualified_user(&app, &admin, "alice").await;
        app.put_with_token(routes::TRACK, &json!({"track": "dsa"}), &token)
            .await;

        let res = app
            .post_with_token(
                routes::ROUND3_SUBMISSIONS,
                &json!({"challenge_id": 1, "artifact": web_artifact()}),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn each_challenge_accepts_one_submission() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
        let token = qualified_user(&app, &admin, "alice").await;
        app.put_with_token(routes::TRACK, &json!({"track": "dsa"}), &token)
            .await;

        let body = json!({"challenge_id": 1, "artifact": code_artifact("pass")});
        let first = app
            .post_with_token(routes::ROUND3_SUBMISSIONS, &body, &token)
            .await;
        assert_eq!(first.status, 201);

        let second = app
            .post_with_token(routes::ROUND3_SUBMISSIONS, &body, &token)
            .await;
        assert_eq!(second.status, 409);
        assert_eq!(second.body["code"], "ALREADY_ATTEMPTED");
    }

    #[tokio::test]
    async fn the_track_closes_after_three_challenges() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
        let token = qualified_user(&app, &admin, "alice").await;
        app.put_with_token(routes::TRACK, &json!({"track": "dsa"}), &token)
            .await;

        for id in 1..=3 {
            let res = app
                .post_with_token(
                    routes::ROUND3_SUBMISSIONS,
                    &json!({"challenge_id": id, "artifact": code_artifact("pass")}),
                    &token,
                )
                .await;
            assert_eq!(res.status, 201, "challenge {id}: {}", res.text);
        }

        let catalog = app.get_with_token(routes::CHALLENGES, &token).await;
        assert_eq!(catalog.body["track_complete"], true);
        assert_eq!(
            catalog.body["completed_challenge_ids"].as_array().unwrap().len(),
            3
        );

        let extra = app
            .post_with_token(
                routes::ROUND3_SUBMISSIONS,
                &json!({"challenge_id": 1, "artifact": code_artifact("pass")}),
                &token,
            )
            .await;
        assert_eq!(extra.status, 409);
        assert_eq!(extra.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn unknown_challenges_are_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
        let token = qualified_user(&app, &admin, "alice").await;
        app.put_with_token(routes::TRACK, &json!({"track": "dsa"}), &token)
            .await;

        let res = app
            .post_with_token(
                routes::ROUND3_SUBMISSIONS,
                &json!({"challenge_id": 99, "artifact": code_artifact("pass")}),
                &token,
            )
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn revocation_flagged_submissions_are_recorded_as_auto() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
        let token = qualified_user(&app, &admin, "alice").await;
        app.put_with_token(routes::TRACK, &json!({"track": "dsa"}), &token)
            .await;

        let res = app
            .post_with_token(
                routes::ROUND3_SUBMISSIONS,
                &json!({
                    "challenge_id": 2,
                    "artifact": code_artifact("def is_balanced(s): return True"),
                    "auto_submitted": true,
                }),
                &token,
            )
            .await;
        assert_eq!(res.status, 201);
        assert_eq!(res.body["auto_submitted"], true);
    }
}

mod review {
    use super::*;

    async fn submitted_id(app: &TestApp, admin: &str) -> i64 {
        let token = qualified_user(app, admin, "alice").await;
        app.put_with_token(routes::TRACK, &json!({"track": "dsa"}), &token)
            .await;
        let res = app
            .post_with_token(
                routes::ROUND3_SUBMISSIONS,
                &json!({"challenge_id": 1, "artifact": code_artifact("pass")}),
                &token,
            )
            .await;
        assert_eq!(res.status, 201);
        res.id()
    }

    #[tokio::test]
    async fn the_queue_lists_unscored_submissions_with_usernames() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
        submitted_id(&app, &admin).await;

        let res = app
            .get_with_token(&format!("{}?scored=false", routes::REVIEW), &admin)
            .await;
        assert_eq!(res.status, 200);
        let items = res.body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["username"], "alice");
        assert_eq!(items[0]["scored"], false);
    }

    #[tokio::test]
    async fn scoring_accepts_exactly_the_configured_pair() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
        let id = submitted_id(&app, &admin).await;

        let invalid = app
            .post_with_token(&routes::review_score(id), &json!({"score": 3}), &admin)
            .await;
        assert_eq!(invalid.status, 400);
        assert_eq!(invalid.body["code"], "INVALID_SCORE");

        let accept = app
            .post_with_token(&routes::review_score(id), &json!({"score": 4}), &admin)
            .await;
        assert_eq!(accept.status, 200, "{}", accept.text);
        assert_eq!(accept.body["score"], 4);
        assert_eq!(accept.body["scored"], true);
        assert!(accept.body["scored_at"].is_string());
    }

    #[tokio::test]
    async fn reject_delta_is_minus_one() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
        let id = submitted_id(&app, &admin).await;

        let reject = app
            .post_with_token(&routes::review_score(id), &json!({"score": -1}), &admin)
            .await;
        assert_eq!(reject.status, 200);
        assert_eq!(reject.body["score"], -1);
    }

    #[tokio::test]
    async fn scoring_is_final() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
        let id = submitted_id(&app, &admin).await;

        let first = app
            .post_with_token(&routes::review_score(id), &json!({"score": 4}), &admin)
            .await;
        assert_eq!(first.status, 200);

        let again = app
            .post_with_token(&routes::review_score(id), &json!({"score": -1}), &admin)
            .await;
        assert_eq!(again.status, 409);
        assert_eq!(again.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn contestants_cannot_review_or_score() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("admin1", "pass1234", "admin").await;
        let id = submitted_id(&app, &admin).await;
        let token = app.create_authenticated_user("mallory", "pass1234").await;

        let list = app.get_with_token(routes::REVIEW, &token).await;
        assert_eq!(list.status, 403);

        let score = app
            .post_with_token(&routes::review_score(id), &json!({"score": 4}), &token)
            .await;
        assert_eq!(score.status, 403);
    }
}
