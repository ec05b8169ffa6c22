mod common;

use anyhow::Result;
use reqwest::multipart;
use reqwest::StatusCode;
use serde_json::{json, Value};

// Full document lifecycle against a real database. Every test here skips
// cleanly when no database is configured, so the suite still passes in
// environments without DATABASE_URL.

const PDF_BYTES: &[u8] = b"%PDF-1.4 lifecycle fixture";

async fn create_branch(server: &common::TestServer, password: &str) -> Result<Value> {
    let username = common::unique("branch");
    let res = reqwest::Client::new()
        .post(format!("{}/api/branches", server.base_url))
        .bearer_auth(common::main_manager_token())
        .json(&json!({
            "branch_name": common::unique("Lifecycle Branch"),
            "branch_location": "Riyadh",
            "branch_type": "school",
            "username": username,
            "password": password
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(res.json::<Value>().await?["data"].clone())
}

async fn create_employee(server: &common::TestServer, branch_id: i64) -> Result<Value> {
    let res = reqwest::Client::new()
        .post(format!("{}/api/employees", server.base_url))
        .bearer_auth(common::main_manager_token())
        .json(&json!({
            "employee_id_number": common::unique("emp"),
            "branch_id": branch_id,
            "first_name": "Test",
            "second_name": "Case",
            "third_name": "Of",
            "fourth_name": "Records",
            "occupation": "teacher",
            "nationality": "Saudi",
            "date_of_birth_gregorian": "1990-01-15",
            "id_or_residency_number": common::unique("id"),
            "id_type": "citizen",
            "gender": "female"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(res.json::<Value>().await?["data"].clone())
}

fn pdf_part(file_name: &str) -> Result<multipart::Part> {
    Ok(multipart::Part::bytes(PDF_BYTES.to_vec())
        .file_name(file_name.to_string())
        .mime_str("application/pdf")?)
}

async fn upload_employee_document(
    server: &common::TestServer,
    employee_id: i64,
    document_type: &str,
    file_name: &str,
) -> Result<Value> {
    let form = multipart::Form::new()
        .text("employee_id", employee_id.to_string())
        .text("document_type", document_type.to_string())
        .part("file", pdf_part(file_name)?);
    let res = reqwest::Client::new()
        .post(format!("{}/api/documents", server.base_url))
        .bearer_auth(common::main_manager_token())
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(res.json::<Value>().await?["data"].clone())
}

async fn upload_branch_document(
    server: &common::TestServer,
    branch_id: i64,
    document_type: &str,
    file_name: &str,
) -> Result<Value> {
    let form = multipart::Form::new()
        .text("branch_id", branch_id.to_string())
        .text("document_type", document_type.to_string())
        .part("file", pdf_part(file_name)?);
    let res = reqwest::Client::new()
        .post(format!("{}/api/branch-documents", server.base_url))
        .bearer_auth(common::main_manager_token())
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(res.json::<Value>().await?["data"].clone())
}

#[tokio::test]
async fn upload_then_download_returns_the_original_bytes() -> Result<()> {
    let server = common::ensure_server().await?;
    if !server.database_ready().await {
        return Ok(());
    }
    let client = reqwest::Client::new();

    let branch = create_branch(server, "secret123").await?;
    let employee = create_employee(server, branch["id"].as_i64().unwrap()).await?;
    let document = upload_employee_document(
        server,
        employee["id"].as_i64().unwrap(),
        "passport",
        "passport scan.pdf",
    )
    .await?;

    let res = client
        .get(format!("{}/api/documents/{}/download", server.base_url, document["id"]))
        .bearer_auth(common::main_manager_token())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("content-type").unwrap().to_str()?,
        "application/pdf"
    );
    assert!(res
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()?
        .contains("passport scan.pdf"));
    assert_eq!(res.bytes().await?.as_ref(), PDF_BYTES);
    Ok(())
}

#[tokio::test]
async fn replacing_a_license_supersedes_the_active_sibling() -> Result<()> {
    let server = common::ensure_server().await?;
    if !server.database_ready().await {
        return Ok(());
    }
    let client = reqwest::Client::new();

    let branch = create_branch(server, "secret123").await?;
    let branch_id = branch["id"].as_i64().unwrap();
    let old = upload_branch_document(server, branch_id, "license", "license-2024.pdf").await?;
    let current = upload_branch_document(server, branch_id, "license", "license-2025.pdf").await?;

    // Replace the newer license's file; the older one gets deactivated in the
    // same transaction
    let form = multipart::Form::new().part("file", pdf_part("license-2025-v2.pdf")?);
    let res = client
        .put(format!("{}/api/branch-documents/{}", server.base_url, current["id"]))
        .bearer_auth(common::main_manager_token())
        .multipart(form)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let replaced = res.json::<Value>().await?["data"].clone();

    // The row points at the new blob and the old one is gone from storage
    assert_ne!(replaced["file_path"], current["file_path"]);
    assert!(server.storage_dir.join(replaced["file_path"].as_str().unwrap()).exists());
    assert!(!server.storage_dir.join(current["file_path"].as_str().unwrap()).exists());

    let res = client
        .get(format!(
            "{}/api/branch-documents?branch_id={}&document_type=license",
            server.base_url, branch_id
        ))
        .bearer_auth(common::main_manager_token())
        .send()
        .await?;
    let active = res.json::<Value>().await?["data"].as_array().unwrap().clone();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["id"], replaced["id"]);

    // MIME filtering applies to the branch listing as well
    let res = client
        .get(format!(
            "{}/api/branch-documents?branch_id={}&document_type=license&mime_type=image/png",
            server.base_url, branch_id
        ))
        .bearer_auth(common::main_manager_token())
        .send()
        .await?;
    assert!(res.json::<Value>().await?["data"].as_array().unwrap().is_empty());

    // The superseded license survives as an inactive row
    let res = client
        .get(format!(
            "{}/api/branch-documents/{}?include_inactive=true",
            server.base_url, old["id"]
        ))
        .bearer_auth(common::main_manager_token())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["is_active"], false);
    Ok(())
}

#[tokio::test]
async fn concurrent_replacements_leave_exactly_one_active_license() -> Result<()> {
    let server = common::ensure_server().await?;
    if !server.database_ready().await {
        return Ok(());
    }
    let client = reqwest::Client::new();

    let branch = create_branch(server, "secret123").await?;
    let branch_id = branch["id"].as_i64().unwrap();
    let first = upload_branch_document(server, branch_id, "license", "license-a.pdf").await?;
    let second = upload_branch_document(server, branch_id, "license", "license-b.pdf").await?;

    let replace = |id: i64, name: &str| {
        let client = client.clone();
        let url = format!("{}/api/branch-documents/{}", server.base_url, id);
        let name = name.to_string();
        async move {
            let form = multipart::Form::new().part("file", pdf_part(&name)?);
            let res = client
                .put(url)
                .bearer_auth(common::main_manager_token())
                .multipart(form)
                .send()
                .await?;
            Ok::<StatusCode, anyhow::Error>(res.status())
        }
    };

    // Each replacement deactivates the other's row; the active-row guard on
    // the update turns the loser into a 409 instead of zero active licenses
    let (a, b) = tokio::join!(
        replace(first["id"].as_i64().unwrap(), "license-a2.pdf"),
        replace(second["id"].as_i64().unwrap(), "license-b2.pdf"),
    );
    let (a, b) = (a?, b?);
    assert!(a == StatusCode::OK || a == StatusCode::CONFLICT, "unexpected: {a}");
    assert!(b == StatusCode::OK || b == StatusCode::CONFLICT, "unexpected: {b}");
    assert!(a == StatusCode::OK || b == StatusCode::OK);

    let res = client
        .get(format!(
            "{}/api/branch-documents?branch_id={}&document_type=license",
            server.base_url, branch_id
        ))
        .bearer_auth(common::main_manager_token())
        .send()
        .await?;
    let active = res.json::<Value>().await?["data"].as_array().unwrap().clone();
    assert_eq!(active.len(), 1, "exactly one license may stay active");
    Ok(())
}

#[tokio::test]
async fn verification_is_idempotent_and_main_manager_only() -> Result<()> {
    let server = common::ensure_server().await?;
    if !server.database_ready().await {
        return Ok(());
    }
    let client = reqwest::Client::new();

    let branch = create_branch(server, "secret123").await?;
    let branch_id = branch["id"].as_i64().unwrap();
    let employee = create_employee(server, branch_id).await?;
    let document = upload_employee_document(
        server,
        employee["id"].as_i64().unwrap(),
        "employment_contract",
        "contract.pdf",
    )
    .await?;

    // Even the owning branch's manager cannot verify
    let res = client
        .post(format!("{}/api/documents/{}/verify", server.base_url, document["id"]))
        .bearer_auth(common::branch_manager_token(branch_id as i32))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(format!("{}/api/documents/{}/verify", server.base_url, document["id"]))
        .bearer_auth(common::main_manager_token())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let verified = res.json::<Value>().await?["data"].clone();
    assert_eq!(verified["is_verified"], true);
    let first_verified_at = verified["verified_at"].clone();
    assert!(!first_verified_at.is_null());

    // Re-verifying keeps the original verification timestamp
    let res = client
        .post(format!("{}/api/documents/{}/verify", server.base_url, document["id"]))
        .bearer_auth(common::main_manager_token())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["verified_at"], first_verified_at);
    Ok(())
}

#[tokio::test]
async fn soft_deleted_documents_survive_behind_include_inactive() -> Result<()> {
    let server = common::ensure_server().await?;
    if !server.database_ready().await {
        return Ok(());
    }
    let client = reqwest::Client::new();

    let branch = create_branch(server, "secret123").await?;
    let employee = create_employee(server, branch["id"].as_i64().unwrap()).await?;
    let employee_id = employee["id"].as_i64().unwrap();
    let document =
        upload_employee_document(server, employee_id, "bank_iban", "iban.pdf").await?;

    let res = client
        .delete(format!("{}/api/documents/{}", server.base_url, document["id"]))
        .bearer_auth(common::main_manager_token())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // Gone from default reads and listings
    let res = client
        .get(format!("{}/api/documents/{}", server.base_url, document["id"]))
        .bearer_auth(common::main_manager_token())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(format!("{}/api/documents?employee_id={}", server.base_url, employee_id))
        .bearer_auth(common::main_manager_token())
        .send()
        .await?;
    assert!(res.json::<Value>().await?["data"].as_array().unwrap().is_empty());

    // The row and the blob both survive for the audit trail
    let res = client
        .get(format!(
            "{}/api/documents/{}?include_inactive=true",
            server.base_url, document["id"]
        ))
        .bearer_auth(common::main_manager_token())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["is_active"], false);
    assert!(server.storage_dir.join(document["file_path"].as_str().unwrap()).exists());
    Ok(())
}

#[tokio::test]
async fn branch_credentials_round_trip_through_login() -> Result<()> {
    let server = common::ensure_server().await?;
    if !server.database_ready().await {
        return Ok(());
    }
    let client = reqwest::Client::new();

    let branch = create_branch(server, "correct horse battery").await?;
    let username = branch["username"].as_str().unwrap();

    let res = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "username": username, "password": "wrong password" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(format!("{}/api/auth/login", server.base_url))
        .json(&json!({ "username": username, "password": "correct horse battery" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let token = res.json::<Value>().await?["data"]["token"].as_str().unwrap().to_string();

    let res = client
        .get(format!("{}/api/auth/me", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let me = res.json::<Value>().await?["data"].clone();
    assert_eq!(me["role"], "branch_manager");
    assert_eq!(me["branch_id"], branch["id"]);
    Ok(())
}
