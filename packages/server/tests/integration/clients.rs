use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn admin_lists_every_persona() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin("Root").await;
    let (ada, code) = app.create_persona("anon-1", "Ada").await;

    let res = app.get(routes::CLIENTS, Some(&admin)).await;

    assert_eq!(res.status, 200);
    let clients = res.body.as_array().unwrap();
    assert_eq!(clients.len(), 2);
    let listed = clients.iter().find(|c| c["id"] == ada.as_str()).unwrap();
    assert_eq!(listed["name"], "Ada");
    assert_eq!(listed["recovery_code"], code.as_str());
    assert_eq!(listed["is_admin"], false);
}

#[tokio::test]
async fn non_admins_cannot_list() {
    let app = TestApp::spawn().await;
    let (ada, _) = app.create_persona("anon-1", "Ada").await;

    let res = app.get(routes::CLIENTS, Some(&ada)).await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn admin_edits_name_code_and_role() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin("Root").await;
    let (ada, _) = app.create_persona("anon-1", "Ada").await;

    let res = app
        .put_json(
            &routes::client(&ada),
            &json!({"name": "Ada L.", "recovery_code": "newcode1", "is_admin": true}),
            Some(&admin),
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["id"], ada.as_str());
    assert_eq!(res.body["recovery_code"], "NEWCODE1");
    assert_eq!(res.body["is_admin"], true);

    let recovered = app
        .post_json(routes::PERSONA_RECOVER, &json!({"code": "NEWCODE1"}), None)
        .await;
    assert_eq!(recovered.body["id"], ada.as_str());
    assert_eq!(recovered.body["persona"], "admin");
}

#[tokio::test]
async fn recovery_codes_stay_unique() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin("Root").await;
    let (_, ada_code) = app.create_persona("anon-1", "Ada").await;
    let (bob, _) = app.create_persona("anon-2", "Bob").await;

    let res = app
        .put_json(
            &routes::client(&bob),
            &json!({"name": "Bob", "recovery_code": ada_code, "is_admin": false}),
            Some(&admin),
        )
        .await;

    assert_eq!(res.status, 409);
    assert_eq!(res.body["code"], "CONFLICT");
}

#[tokio::test]
async fn admin_cannot_demote_itself() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin("Root").await;
    let me = app.get(routes::PERSONA, Some(&admin)).await;
    let code = me.body["recovery_code"].as_str().unwrap();

    let res = app
        .put_json(
            &routes::client(&admin),
            &json!({"name": "Root", "recovery_code": code, "is_admin": false}),
            Some(&admin),
        )
        .await;

    assert_eq!(res.status, 403);
    assert_eq!(app.get(routes::PERSONA, Some(&admin)).await.body["persona"], "admin");
}

#[tokio::test]
async fn editing_an_unknown_persona_is_not_found() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin("Root").await;

    let res = app
        .put_json(
            &routes::client("no-such-persona"),
            &json!({"name": "Ghost", "recovery_code": "GHOST001", "is_admin": false}),
            Some(&admin),
        )
        .await;

    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn deleted_persona_keeps_its_files() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin("Root").await;
    let (ada, code) = app.create_persona("anon-1", "Ada").await;
    app.upload_text("a.txt", "x", &ada).await;

    let res = app.delete(&routes::client(&ada), Some(&admin)).await;
    assert_eq!(res.status, 204);

    let recovered = app
        .post_json(routes::PERSONA_RECOVER, &json!({"code": code}), None)
        .await;
    assert_eq!(recovered.status, 404);

    let files = app.get(routes::FILES, Some(&admin)).await;
    assert_eq!(files.body["total"], 1);
    assert_eq!(files.body["files"][0]["owner_name"], "Unknown");
}

#[tokio::test]
async fn admin_cannot_delete_itself() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin("Root").await;

    let res = app.delete(&routes::client(&admin), Some(&admin)).await;

    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn non_admins_cannot_delete_personas() {
    let app = TestApp::spawn().await;
    let (ada, _) = app.create_persona("anon-1", "Ada").await;
    let (bob, _) = app.create_persona("anon-2", "Bob").await;

    let res = app.delete(&routes::client(&bob), Some(&ada)).await;

    assert_eq!(res.status, 403);
    assert_eq!(app.get(routes::PERSONA, Some(&bob)).await.body["name"], "Bob");
}
