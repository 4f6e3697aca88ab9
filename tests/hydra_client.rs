//! Integration tests for the Hydra client.
//!
//! A minimal HTTP server on a random local port stands in for Hydra. Each test
//! server answers a fixed number of requests from a path → response table and
//! records the request line and headers of each request it saw.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use assemble_installer::hydra::{CiSource, HydraClient};

const JOBSET: &str = "experimental-nix-installer/experimental-installer";

struct Seen {
    request_line: String,
    accept: Option<String>,
    user_agent: Option<String>,
}

struct Recorded {
    requests: Arc<Mutex<Vec<Seen>>>,
}

/// Serve `count` requests, answering each path from `routes` (404 otherwise).
fn spawn_hydra(routes: Vec<(&str, u16, &str)>, count: usize) -> (String, Recorded) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let url = format!("http://{}", listener.local_addr().unwrap());
    let routes: HashMap<String, (u16, String)> = routes
        .into_iter()
        .map(|(p, s, b)| (p.to_string(), (s, b.to_string())))
        .collect();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);

    thread::spawn(move || {
        for _ in 0..count {
            let (mut stream, _) = listener.accept().expect("failed to accept");
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut accept = None;
            let mut user_agent = None;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim();
                if line.is_empty() {
                    break;
                }
                if let Some((k, v)) = line.split_once(':') {
                    if k.eq_ignore_ascii_case("accept") {
                        accept = Some(v.trim().to_string());
                    } else if k.eq_ignore_ascii_case("user-agent") {
                        user_agent = Some(v.trim().to_string());
                    }
                }
            }

            let path = request_line
                .split_whitespace()
                .nth(1)
                .unwrap_or("")
                .to_string();
            seen.lock().unwrap().push(Seen {
                request_line: request_line.trim().to_string(),
                accept,
                user_agent,
            });

            let (status, body) = routes
                .get(&path)
                .cloned()
                .unwrap_or((404, r#"{"error":"no such route"}"#.to_string()));
            let response = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });

    (url, Recorded { requests })
}

#[test]
fn fetches_evaluations_with_json_accept_header() {
    let evals = r#"{"evals":[
        {"id":42,"flake":"github:NixOS/experimental-nix-installer/abc123","builds":[1,2],"timestamp":1700000000},
        {"id":41,"flake":"github:NixOS/experimental-nix-installer/def456","builds":[3]}
    ]}"#;
    let path = format!("/jobset/{JOBSET}/evals");
    let (url, recorded) = spawn_hydra(vec![(path.as_str(), 200, evals)], 1);

    let client = HydraClient::new(&url, JOBSET).unwrap();
    let got = client.evaluations().unwrap();

    assert_eq!(got.len(), 2);
    assert_eq!(got[0].id, 42);
    assert_eq!(got[0].builds, vec![1, 2]);
    assert!(got[0].flake.ends_with("abc123"));

    let requests = recorded.requests.lock().unwrap();
    assert_eq!(requests[0].request_line, format!("GET {path} HTTP/1.1"));
    assert_eq!(requests[0].accept.as_deref(), Some("application/json"));
}

#[test]
fn fetches_build_metadata() {
    let build = r#"{"id":1,"system":"x86_64-linux","finished":1,"buildstatus":0,
        "buildoutputs":{"out":{"path":"/nix/store/aaaa-nix-installer-static"}}}"#;
    let (url, _recorded) = spawn_hydra(vec![("/build/1", 200, build)], 1);

    let client = HydraClient::new(&format!("{url}/"), JOBSET).unwrap();
    let got = client.build(1).unwrap();

    assert!(got.is_finished());
    assert_eq!(got.system, "x86_64-linux");
    assert_eq!(got.out_path().unwrap(), "/nix/store/aaaa-nix-installer-static");
}

#[test]
fn missing_build_maps_to_not_found() {
    let (url, _recorded) = spawn_hydra(vec![], 1);
    let client = HydraClient::new(&url, JOBSET).unwrap();

    let err = client.build(999).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("Not found: no such route"), "got: {msg}");
}

#[test]
fn server_error_is_reported() {
    let path = format!("/jobset/{JOBSET}/evals");
    let (url, _recorded) = spawn_hydra(vec![(path.as_str(), 503, "maintenance")], 1);
    let client = HydraClient::new(&url, JOBSET).unwrap();

    let err = client.evaluations().unwrap_err();
    assert!(format!("{err:#}").contains("Server error: maintenance"));
}

#[test]
fn other_status_is_unexpected_response() {
    let (url, _recorded) = spawn_hydra(vec![("/build/7", 403, r#"{"error":"forbidden"}"#)], 1);
    let client = HydraClient::new(&url, JOBSET).unwrap();

    let err = client.build(7).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("Unexpected response (HTTP 403"), "got: {msg}");
    assert!(msg.contains("forbidden"), "got: {msg}");
}

#[test]
fn requests_identify_the_client() {
    let build = r#"{"id":2,"system":"aarch64-linux","finished":0}"#;
    let (url, recorded) = spawn_hydra(vec![("/build/2", 200, build)], 1);
    let client = HydraClient::new(&url, JOBSET).unwrap();

    client.build(2).unwrap();

    let requests = recorded.requests.lock().unwrap();
    let user_agent = requests[0].user_agent.as_deref().unwrap_or("");
    assert!(user_agent.starts_with("assemble-installer/"), "got: {user_agent}");
}

#[test]
fn malformed_json_is_a_parse_error() {
    let (url, _recorded) = spawn_hydra(vec![("/build/5", 200, "<html>login</html>")], 1);
    let client = HydraClient::new(&url, JOBSET).unwrap();

    let err = client.build(5).unwrap_err();
    assert!(err.to_string().contains("failed to parse build response"));
}

#[test]
fn connection_refused_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = HydraClient::new(&url, JOBSET).unwrap();
    let err = client.evaluations().unwrap_err();
    assert!(err.to_string().contains("failed to connect to Hydra"));
}
