use serde_json::json;

use crate::common::{ADMIN_SECRET, TestApp, routes};

mod identity {
    use super::*;

    #[tokio::test]
    async fn anonymous_caller_sees_an_empty_client_persona() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::PERSONA, Some("anon-1")).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["persona"], "client");
        assert_eq!(res.body["name"], "");
        assert_eq!(res.body["recovery_code"], "");
        assert_eq!(res.body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn naming_issues_a_recovery_code_and_derived_id() {
        let app = TestApp::spawn().await;

        let (id, code) = app.create_persona("anon-1", "Ada").await;

        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_ne!(id, "anon-1");

        let me = app.get(routes::PERSONA, Some(&id)).await;
        assert_eq!(me.body["name"], "Ada");
        assert_eq!(me.body["recovery_code"], code.as_str());
    }

    #[tokio::test]
    async fn renaming_keeps_the_persona_id_and_code() {
        let app = TestApp::spawn().await;
        let (id, code) = app.create_persona("anon-1", "Ada").await;

        let res = app
            .post_json(routes::PERSONA_NAME, &json!({"name": "Ada L."}), Some(&id))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["id"], id.as_str());
        assert_eq!(res.body["recovery_code"], code.as_str());
        assert_eq!(app.get(routes::PERSONA, Some(&id)).await.body["name"], "Ada L.");
    }

    #[tokio::test]
    async fn naming_requires_a_client_id() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(routes::PERSONA_NAME, &json!({"name": "Ada"}), None)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(routes::PERSONA_NAME, &json!({"name": "   "}), Some("anon-1"))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(routes::PERSONA_NAME, &json!({"nickname": "Ada"}), Some("anon-1"))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod recovery {
    use super::*;

    #[tokio::test]
    async fn recovery_code_returns_the_same_persona() {
        let app = TestApp::spawn().await;
        let (id, code) = app.create_persona("anon-1", "Ada").await;

        let res = app
            .post_json(routes::PERSONA_RECOVER, &json!({"code": code}), None)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["id"], id.as_str());
        assert_eq!(res.body["name"], "Ada");
        assert_eq!(res.body["persona"], "client");
    }

    #[tokio::test]
    async fn recovery_code_is_case_and_whitespace_insensitive() {
        let app = TestApp::spawn().await;
        let (id, code) = app.create_persona("anon-1", "Ada").await;

        let res = app
            .post_json(
                routes::PERSONA_RECOVER,
                &json!({"code": format!("  {}  ", code.to_lowercase())}),
                None,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["id"], id.as_str());
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(routes::PERSONA_RECOVER, &json!({"code": "ZZZZ9999"}), None)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod escalation {
    use super::*;

    #[tokio::test]
    async fn correct_secret_grants_admin() {
        let app = TestApp::spawn().await;
        let (id, code) = app.create_persona("anon-1", "Root").await;

        let res = app
            .post_json(
                routes::PERSONA_ADMIN,
                &json!({"secret": ADMIN_SECRET}),
                Some(&id),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "success");

        assert_eq!(app.get(routes::PERSONA, Some(&id)).await.body["persona"], "admin");
        let recovered = app
            .post_json(routes::PERSONA_RECOVER, &json!({"code": code}), None)
            .await;
        assert_eq!(recovered.body["persona"], "admin");
    }

    #[tokio::test]
    async fn wrong_secret_is_denied() {
        let app = TestApp::spawn().await;
        let (id, _) = app.create_persona("anon-1", "Mallory").await;

        let res = app
            .post_json(routes::PERSONA_ADMIN, &json!({"secret": "guess"}), Some(&id))
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
        assert_eq!(app.get(routes::PERSONA, Some(&id)).await.body["persona"], "client");
    }

    #[tokio::test]
    async fn unnamed_caller_cannot_escalate() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(
                routes::PERSONA_ADMIN,
                &json!({"secret": ADMIN_SECRET}),
                Some("anon-1"),
            )
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn admin_survives_a_rename() {
        let app = TestApp::spawn().await;
        let id = app.create_admin("Root").await;

        let res = app
            .post_json(routes::PERSONA_NAME, &json!({"name": "Root 2"}), Some(&id))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(app.get(routes::PERSONA, Some(&id)).await.body["persona"], "admin");
    }
}

mod service {
    use super::*;

    #[tokio::test]
    async fn version_is_reported() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::VERSION, None).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn unknown_routes_return_json_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get("/api/nope", None).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn openapi_document_lists_the_api() {
        let app = TestApp::spawn().await;

        let res = app.get("/api-docs/openapi.json", None).await;

        assert_eq!(res.status, 200);
        assert!(res.body["paths"]["/api/persona"].is_object());
        assert!(res.body["paths"]["/api/files/{id}"]["delete"].is_object());
    }
}
