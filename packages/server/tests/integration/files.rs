use serde_json::json;

use crate::common::{MAX_BLOB_SIZE, TestApp, routes};

mod upload {
    use super::*;

    #[tokio::test]
    async fn upload_stores_metadata_and_bytes() {
        let app = TestApp::spawn().await;

        let file = app.upload_text("notes.txt", "hello depot", "anon-1").await;

        assert_eq!(file["original_name"], "notes.txt");
        assert_eq!(file["size"], 11);
        assert_eq!(file["owner_id"], "anon-1");
        assert_eq!(file["is_public"], false);
        assert!(file.get("stored_location").is_none());
        assert_eq!(app.blob_count(), 1);

        let id = file["id"].as_str().unwrap();
        let res = app.get(&routes::download(id), Some("anon-1")).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.text, "hello depot");
        assert_eq!(res.header("content-type"), Some("text/plain"));
        assert!(
            res.header("content-disposition")
                .unwrap()
                .contains("notes.txt")
        );
    }

    #[tokio::test]
    async fn upload_requires_a_client_id() {
        let app = TestApp::spawn().await;

        let res = app.upload("a.txt", b"x".to_vec(), None).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(app.blob_count(), 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let app = TestApp::spawn().await;
        let bytes = vec![b'x'; MAX_BLOB_SIZE as usize + 1];

        let res = app.upload("big.bin", bytes, Some("anon-1")).await;

        assert_eq!(res.status, 400);
        assert_eq!(app.blob_count(), 0);
    }

    #[tokio::test]
    async fn uploads_of_identical_content_get_separate_files() {
        let app = TestApp::spawn().await;

        let a = app.upload_text("a.txt", "same", "anon-1").await;
        let b = app.upload_text("a.txt", "same", "anon-1").await;

        assert_ne!(a["id"], b["id"]);
        assert_ne!(a["download_link"], b["download_link"]);
        assert_eq!(app.blob_count(), 2);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn callers_only_see_their_own_files() {
        let app = TestApp::spawn().await;
        app.upload_text("mine.txt", "1", "anon-1").await;
        app.upload_text("theirs.txt", "2", "anon-2").await;

        let res = app.get(routes::FILES, Some("anon-1")).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"], 1);
        assert_eq!(res.body["files"][0]["original_name"], "mine.txt");
    }

    #[tokio::test]
    async fn admin_sees_every_partition() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        app.upload_text("a.txt", "1", "anon-1").await;
        app.upload_text("b.txt", "2", "anon-2").await;

        let res = app.get(routes::FILES, Some(&admin)).await;

        assert_eq!(res.body["total"], 2);
    }

    #[tokio::test]
    async fn listing_requires_a_client_id() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::FILES, None).await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let app = TestApp::spawn().await;
        app.upload_text("Quarterly_Report.pdf", "1", "anon-1").await;
        app.upload_text("photo.jpg", "2", "anon-1").await;

        let res = app
            .get(&format!("{}?search=REPORT", routes::FILES), Some("anon-1"))
            .await;

        assert_eq!(res.body["total"], 1);
        assert_eq!(res.body["files"][0]["original_name"], "Quarterly_Report.pdf");
    }

    #[tokio::test]
    async fn pages_partition_the_listing() {
        let app = TestApp::spawn().await;
        for name in ["a.txt", "b.txt", "c.txt"] {
            app.upload_text(name, "x", "anon-1").await;
        }

        let first = app
            .get(&format!("{}?page=1&limit=2", routes::FILES), Some("anon-1"))
            .await;
        let second = app
            .get(&format!("{}?page=2&limit=2", routes::FILES), Some("anon-1"))
            .await;

        assert_eq!(first.body["files"].as_array().unwrap().len(), 2);
        assert_eq!(second.body["files"].as_array().unwrap().len(), 1);
        assert_eq!(first.body["pagination"]["total_pages"], 2);
        assert_eq!(first.body["total"], 3);

        let mut ids: Vec<_> = first.body["files"]
            .as_array()
            .unwrap()
            .iter()
            .chain(second.body["files"].as_array().unwrap())
            .map(|f| f["id"].as_str().unwrap().to_string())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn nonsense_paging_falls_back_to_defaults() {
        let app = TestApp::spawn().await;
        app.upload_text("a.txt", "x", "anon-1").await;

        let res = app
            .get(&format!("{}?page=0&limit=-5", routes::FILES), Some("anon-1"))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["pagination"]["page"], 1);
        assert_eq!(res.body["pagination"]["per_page"], 8);
    }

    #[tokio::test]
    async fn owner_names_follow_the_persona() {
        let app = TestApp::spawn().await;
        let (id, _) = app.create_persona("anon-1", "Ada").await;
        app.upload_text("a.txt", "x", &id).await;

        let res = app.get(routes::FILES, Some(&id)).await;

        assert_eq!(res.body["files"][0]["owner_name"], "Ada");
    }
}

mod adoption {
    use super::*;

    #[tokio::test]
    async fn naming_moves_anonymous_uploads_to_the_persona() {
        let app = TestApp::spawn().await;
        let file = app.upload_text("draft.txt", "x", "anon-1").await;

        let (id, _) = app.create_persona("anon-1", "Ada").await;

        let mine = app.get(routes::FILES, Some(&id)).await;
        assert_eq!(mine.body["total"], 1);
        assert_eq!(mine.body["files"][0]["id"], file["id"]);
        assert_eq!(mine.body["files"][0]["owner_id"], id.as_str());

        let old = app.get(routes::FILES, Some("anon-1")).await;
        assert_eq!(old.body["total"], 0);
    }

    #[tokio::test]
    async fn recovered_persona_sees_its_files_from_a_new_device() {
        let app = TestApp::spawn().await;
        let (id, code) = app.create_persona("anon-1", "Ada").await;
        app.upload_text("a.txt", "x", &id).await;

        let recovered = app
            .post_json(routes::PERSONA_RECOVER, &json!({"code": code}), Some("anon-9"))
            .await;
        let recovered_id = recovered.body["id"].as_str().unwrap();

        let res = app.get(routes::FILES, Some(recovered_id)).await;
        assert_eq!(res.body["total"], 1);
    }
}

mod access {
    use super::*;

    #[tokio::test]
    async fn private_files_are_hidden_from_others() {
        let app = TestApp::spawn().await;
        let file = app.upload_text("a.txt", "secret", "anon-1").await;
        let id = file["id"].as_str().unwrap();

        let meta = app.get(&routes::file(id), Some("anon-2")).await;
        let bytes = app.get(&routes::download(id), Some("anon-2")).await;

        assert_eq!(meta.status, 404);
        assert_eq!(bytes.status, 404);
    }

    #[tokio::test]
    async fn download_link_works_for_anyone() {
        let app = TestApp::spawn().await;
        let file = app.upload_text("a.txt", "shared", "anon-1").await;
        let link = file["download_link"].as_str().unwrap();

        let res = app.get(&routes::download(link), None).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.text, "shared");
    }

    #[tokio::test]
    async fn matching_etag_is_not_modified() {
        let app = TestApp::spawn().await;
        let file = app.upload_text("a.txt", "cached", "anon-1").await;
        let id = file["id"].as_str().unwrap();

        let first = app.get(&routes::download(id), Some("anon-1")).await;
        let etag = first.header("etag").unwrap().to_string();

        let second = app
            .get_with_headers(
                &routes::download(id),
                Some("anon-1"),
                &[("If-None-Match", etag.as_str())],
            )
            .await;
        assert_eq!(second.status, 304);
    }

    #[tokio::test]
    async fn public_files_are_visible_to_everyone() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let file = app.upload_text("a.txt", "open", "anon-1").await;
        let id = file["id"].as_str().unwrap();

        let res = app
            .put_json(
                &routes::file(id),
                &json!({"original_name": "a.txt", "owner_id": "anon-1", "is_public": true}),
                Some(&admin),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["is_public"], true);

        assert_eq!(app.get(&routes::file(id), None).await.status, 200);
        assert_eq!(app.get(&routes::download(id), Some("anon-2")).await.text, "open");
    }
}

mod editing {
    use super::*;

    #[tokio::test]
    async fn only_admins_can_edit_metadata() {
        let app = TestApp::spawn().await;
        let file = app.upload_text("a.txt", "x", "anon-1").await;
        let id = file["id"].as_str().unwrap();

        let res = app
            .put_json(
                &routes::file(id),
                &json!({"original_name": "b.txt", "owner_id": "anon-1"}),
                Some("anon-1"),
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn reassigning_moves_the_file_between_owners() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let (bob, _) = app.create_persona("anon-bob", "Bob").await;
        let file = app.upload_text("a.txt", "x", "anon-1").await;
        let id = file["id"].as_str().unwrap();

        let res = app
            .put_json(
                &routes::file(id),
                &json!({"original_name": "renamed.txt", "owner_id": bob}),
                Some(&admin),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["original_name"], "renamed.txt");
        assert_eq!(res.body["owner_name"], "Bob");

        assert_eq!(app.get(routes::FILES, Some(&bob)).await.body["total"], 1);
        assert_eq!(app.get(routes::FILES, Some("anon-1")).await.body["total"], 0);
        assert_eq!(app.get(&routes::download(id), Some(&bob)).await.text, "x");
    }

    #[tokio::test]
    async fn empty_owner_hands_the_file_to_the_system() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let file = app.upload_text("a.txt", "x", "anon-1").await;
        let id = file["id"].as_str().unwrap();

        let res = app
            .put_json(
                &routes::file(id),
                &json!({"original_name": "a.txt", "owner_id": ""}),
                Some(&admin),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["owner_id"], "");
        assert_eq!(res.body["owner_name"], "System");
    }

    #[tokio::test]
    async fn unsafe_names_are_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let file = app.upload_text("a.txt", "x", "anon-1").await;
        let id = file["id"].as_str().unwrap();

        let res = app
            .put_json(
                &routes::file(id),
                &json!({"original_name": "../etc/passwd", "owner_id": "anon-1"}),
                Some(&admin),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn owner_can_delete_and_bytes_are_removed() {
        let app = TestApp::spawn().await;
        let file = app.upload_text("a.txt", "x", "anon-1").await;
        let id = file["id"].as_str().unwrap();
        let link = file["download_link"].as_str().unwrap();

        let res = app.delete(&routes::file(id), Some("anon-1")).await;

        assert_eq!(res.status, 204);
        assert_eq!(app.blob_count(), 0);
        assert_eq!(app.get(&routes::file(id), Some("anon-1")).await.status, 404);
        assert_eq!(app.get(&routes::download(link), None).await.status, 404);
    }

    #[tokio::test]
    async fn others_cannot_delete() {
        let app = TestApp::spawn().await;
        let file = app.upload_text("a.txt", "x", "anon-1").await;
        let id = file["id"].as_str().unwrap();

        let res = app.delete(&routes::file(id), Some("anon-2")).await;

        assert_eq!(res.status, 403);
        assert_eq!(app.blob_count(), 1);
    }

    #[tokio::test]
    async fn admin_can_delete_any_file() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let file = app.upload_text("a.txt", "x", "anon-1").await;
        let id = file["id"].as_str().unwrap();

        let res = app.delete(&routes::file(id), Some(&admin)).await;

        assert_eq!(res.status, 204);
    }

    #[tokio::test]
    async fn deleting_a_missing_file_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.delete(&routes::file("no-such-file"), Some("anon-1")).await;

        assert_eq!(res.status, 404);
    }
}

mod reserved_id {
    use super::*;

    const SYSTEM_ID: &str = "_system";

    #[tokio::test]
    async fn system_id_cannot_list_unowned_files() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;
        let file = app.upload_text("secret.txt", "x", "anon-1").await;
        let id = file["id"].as_str().unwrap();
        let res = app
            .put_json(
                &routes::file(id),
                &json!({"original_name": "secret.txt", "owner_id": ""}),
                Some(&admin),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let listed = app.get(routes::FILES, Some(SYSTEM_ID)).await;

        assert_eq!(listed.status, 400);
        assert_eq!(listed.body["code"], "VALIDATION_ERROR");
        assert!(!listed.text.contains("secret.txt"));
        assert_eq!(app.get(&routes::file(id), Some(SYSTEM_ID)).await.status, 404);
    }

    #[tokio::test]
    async fn system_id_cannot_upload() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("Root").await;

        let res = app.upload("a.txt", b"x".to_vec(), Some(SYSTEM_ID)).await;

        assert_eq!(res.status, 400);
        assert_eq!(app.blob_count(), 0);
        assert_eq!(app.get(routes::FILES, Some(&admin)).await.body["total"], 0);
    }

    #[tokio::test]
    async fn system_id_is_an_anonymous_persona() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::PERSONA, Some(SYSTEM_ID)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["persona"], "client");
        assert_eq!(res.body["name"], "");
    }
}
