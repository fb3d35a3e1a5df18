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

fn spawn_sidecar(envs: &[(&str, String)]) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_feesd");
    let mut cmd = Command::new(exe);
    cmd.env_remove("FEESD_WORKSPACE")
        .env_remove("FEESD_SEED_ON_OPEN");
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let mut child = cmd
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
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(true), "{}", value);
    value
}

#[test]
fn data_survives_restart_and_auto_open() {
    let workspace = temp_dir("feesd-persist");

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar(&[]);
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
            "payments.syncMonths",
            json!({ "studentId": "HCS0003", "months": ["April", "March"] }),
        );
        drop(stdin);
        let _ = child.wait();
    }

    let (mut child, mut stdin, mut reader) =
        spawn_sidecar(&[("FEESD_WORKSPACE", workspace.to_string_lossy().to_string())]);

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["result"]["storeOpen"], json!(true));
    assert_eq!(
        health["result"]["collections"],
        json!(["students", "payments", "fees"])
    );

    // Nothing is missing, so nothing is reseeded.
    let init = request_ok(&mut stdin, &mut reader, "2", "store.initialize", json!({}));
    assert_eq!(
        init["result"]["seeded"],
        json!({ "students": false, "fees": false, "payments": false })
    );
    assert!(init.get("changed").is_none());

    let payments = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "payments.list",
        json!({ "studentId": "HCS0003" }),
    );
    let months: Vec<&str> = payments["result"]["payments"]
        .as_array()
        .expect("payments")
        .iter()
        .filter_map(|p| p["month"].as_str())
        .collect();
    assert_eq!(months, vec!["April", "March"]);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn seeding_on_open_can_be_disabled() {
    let workspace = temp_dir("feesd-no-seed");
    let (mut child, mut stdin, mut reader) =
        spawn_sidecar(&[("FEESD_SEED_ON_OPEN", "false".to_string())]);

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert!(selected.get("changed").is_none());

    let empty = request_ok(&mut stdin, &mut reader, "2", "students.list", json!({}));
    assert_eq!(empty["result"]["students"], json!([]));

    let fees = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "fees.update",
        json!({ "fees": [{ "classLevel": 1, "monthlyFee": 500, "otherFees": [] }] }),
    );
    assert_eq!(fees["result"]["count"], json!(1));

    // Fees are present, so only students and payments are seeded.
    let init = request_ok(&mut stdin, &mut reader, "4", "store.initialize", json!({}));
    assert_eq!(
        init["result"]["seeded"],
        json!({ "students": true, "fees": false, "payments": true })
    );
    assert_eq!(init["changed"], json!(["students", "payments"]));

    let fee = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "fees.get",
        json!({ "classLevel": 1 }),
    );
    assert_eq!(fee["result"]["fee"]["monthlyFee"], json!(500.0));
    let missing = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "fees.get",
        json!({ "classLevel": 2 }),
    );
    assert_eq!(missing["result"]["fee"], json!(null));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn bundle_moves_collections_between_workspaces() {
    let source = temp_dir("feesd-bundle-src");
    let target = temp_dir("feesd-bundle-dst");
    let bundle = source.join("out").join("fees-backup.zip");
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&[]);

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": source.to_string_lossy() }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "payments.syncMonths",
        json!({ "studentId": "HCS0003", "months": ["May"] }),
    );
    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "backup.exportBundle",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    assert_eq!(exported["result"]["bundleFormat"], json!("feesd-collections-v1"));
    assert_eq!(exported["result"]["entryCount"], json!(4));
    assert!(exported.get("changed").is_none());

    let mut snapshot = Vec::new();
    for (i, method) in ["students.list", "payments.list", "fees.list"].iter().enumerate() {
        let v = request_ok(&mut stdin, &mut reader, &format!("s{}", i), method, json!({}));
        snapshot.push(v["result"].clone());
    }

    // The target gets its own freshly generated roster on open.
    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "workspace.select",
        json!({ "path": target.to_string_lossy() }),
    );
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "backup.importBundle",
        json!({ "inPath": bundle.to_string_lossy() }),
    );
    assert_eq!(imported["changed"], json!(["students", "fees", "payments"]));
    assert_eq!(
        imported["result"]["counts"]["students"],
        json!(snapshot[0]["students"].as_array().map(|a| a.len()))
    );

    for (i, method) in ["students.list", "payments.list", "fees.list"].iter().enumerate() {
        let v = request_ok(&mut stdin, &mut reader, &format!("t{}", i), method, json!({}));
        assert_eq!(v["result"], snapshot[i], "{} differs after import", method);
    }

    let not_a_bundle = target.join("notes.txt");
    std::fs::write(&not_a_bundle, "not a zip").expect("write file");
    let rejected = request(
        &mut stdin,
        &mut reader,
        "6",
        "backup.importBundle",
        json!({ "inPath": not_a_bundle.to_string_lossy() }),
    );
    assert_eq!(rejected["error"]["code"], json!("invalid_bundle"));
    let after = request_ok(&mut stdin, &mut reader, "7", "students.list", json!({}));
    assert_eq!(after["result"], snapshot[0]);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(source);
    let _ = std::fs::remove_dir_all(target);
}
