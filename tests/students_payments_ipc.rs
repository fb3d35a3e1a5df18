use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_feesd");
    let mut child = Command::new(exe)
        .env_remove("FEESD_WORKSPACE")
        .env_remove("FEESD_SEED_ON_OPEN")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn feesd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value
}

fn request_err_code(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false), "{}", value);
    value["error"]["code"].as_str().unwrap_or_default().to_string()
}

fn new_student(class_level: u8, section: &str) -> serde_json::Value {
    json!({
        "name": "Kavya Iyer",
        "class": class_level,
        "section": section,
        "password": "kavya",
        "guardianName": "Lakshmi Iyer",
        "contact": "9876543210"
    })
}

#[test]
fn create_sync_and_delete_student() {
    let workspace = temp_dir("feesd-students-flow");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let mut seeded: Vec<&str> = selected["changed"]
        .as_array()
        .expect("changed keys")
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    seeded.sort();
    assert_eq!(seeded, vec!["fees", "payments", "students"]);

    let list = request_ok(&mut stdin, &mut reader, "2", "students.list", json!({}));
    assert_eq!(list["result"]["students"].as_array().map(|a| a.len()), Some(246));
    assert!(list.get("changed").is_none());

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({ "student": new_student(5, "C") }),
    );
    assert_eq!(created["result"]["student"]["id"], json!("HCS3241"));
    assert_eq!(created["changed"], json!(["students"]));

    let synced = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "payments.syncMonths",
        json!({ "studentId": "HCS3241", "months": ["May", "April"] }),
    );
    let payments = synced["result"]["created"].as_array().expect("created");
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[0]["month"], json!("April"));
    assert_eq!(payments[1]["month"], json!("May"));
    assert!(payments.iter().all(|p| p["amount"] == json!(10000.0)));
    assert_eq!(synced["changed"], json!(["payments"]));

    let breakdown = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "reports.monthlyBreakdown",
        json!({ "studentId": "HCS3241" }),
    );
    let months = breakdown["result"]["months"].as_array().expect("months");
    assert_eq!(months.len(), 12);
    assert_eq!(months[0]["status"], json!("Paid"));
    assert_eq!(months[1]["status"], json!("Paid"));
    assert_eq!(months[2]["status"], json!("Unpaid"));
    assert_eq!(breakdown["result"]["record"]["paid"], json!(20000.0));

    // Re-sync replaces the monthly set.
    let resynced = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "payments.syncMonths",
        json!({ "studentId": "HCS3241", "months": ["June"] }),
    );
    assert_eq!(resynced["result"]["created"].as_array().map(|a| a.len()), Some(1));
    let mine = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "payments.list",
        json!({ "studentId": "HCS3241" }),
    );
    let mine = mine["result"]["payments"].as_array().expect("payments").clone();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["month"], json!("June"));

    let recorded = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "payments.record",
        json!({ "payment": { "studentId": "HCS3241", "amount": 2500, "month": "July", "year": 2025 } }),
    );
    assert!(recorded["result"]["payment"]["id"]
        .as_str()
        .expect("payment id")
        .starts_with('P'));

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "students.delete",
        json!({ "id": "HCS3241" }),
    );
    assert_eq!(deleted["result"]["studentRemoved"], json!(true));
    assert_eq!(deleted["result"]["paymentsRemoved"], json!(2));
    assert_eq!(deleted["changed"], json!(["students", "payments"]));

    let gone = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "students.get",
        json!({ "id": "HCS3241" }),
    );
    assert_eq!(gone["result"]["student"], json!(null));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn store_errors_map_to_codes() {
    let workspace = temp_dir("feesd-students-errors");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "student": new_student(5, "E") }),
    );
    assert_eq!(code, "validation");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({ "student": { "name": "No Class" } }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "payments.syncMonths",
        json!({ "studentId": "HCS1234", "months": ["Multiple"] }),
    );
    assert_eq!(code, "validation");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "5",
        "payments.syncMonths",
        json!({ "studentId": "HCS9999", "months": ["April"] }),
    );
    assert_eq!(code, "not_found");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "6",
        "payments.record",
        json!({ "payment": { "studentId": "HCS1234", "amount": -5, "month": "April", "year": 2025 } }),
    );
    assert_eq!(code, "validation");

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "7",
        "students.update",
        json!({ "student": {
            "id": "HCS9999", "name": "Ghost", "class": 3, "section": "A",
            "guardianName": "G", "contact": "1"
        } }),
    );
    assert_eq!(code, "not_found");

    let fees = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "fees.update",
        json!({ "fees": [{ "classLevel": 9, "monthlyFee": 9000, "otherFees": [] }] }),
    );
    assert_eq!(fees["changed"], json!(["fees"]));

    let before = request_ok(&mut stdin, &mut reader, "9", "payments.list", json!({}));
    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "10",
        "payments.syncMonths",
        json!({ "studentId": "HCS1234", "months": ["April"] }),
    );
    assert_eq!(code, "fee_structure_not_found");
    let after = request_ok(&mut stdin, &mut reader, "11", "payments.list", json!({}));
    assert_eq!(before["result"], after["result"]);

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "12",
        "reports.monthlyBreakdown",
        json!({ "studentId": "HCS1234" }),
    );
    assert_eq!(code, "fee_structure_not_found");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn update_keeps_password_when_omitted() {
    let workspace = temp_dir("feesd-students-update");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.update",
        json!({ "student": {
            "id": "HCS1234", "name": "Rahul K. Sharma", "class": 10, "section": "B",
            "guardianName": "Ramesh Sharma", "contact": "1234567890"
        } }),
    );
    let fetched = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.get",
        json!({ "id": "HCS1234" }),
    );
    assert_eq!(fetched["result"]["student"]["name"], json!("Rahul K. Sharma"));
    assert_eq!(fetched["result"]["student"]["section"], json!("B"));
    assert_eq!(fetched["result"]["student"]["password"], json!("0000"));

    let login = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "auth.login",
        json!({ "role": "student", "studentId": "HCS1234", "password": "0000" }),
    );
    assert_eq!(login["result"]["name"], json!("Rahul K. Sharma"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
