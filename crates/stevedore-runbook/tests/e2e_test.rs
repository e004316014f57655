//! End-to-end tests from compose text to printed command lines.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::path::Path;

use stevedore_compose::{parse_compose, resolve};
use stevedore_runbook::{DumpOp, Verb, container_name, dump_restore, orchestration, project_name};

const MONGO: &str = "services:
  mongo:
    image: mongo:7.0.4
    environment:
      - MONGO_INITDB_ROOT_USERNAME=${MONGOUSER}
      - MONGO_INITDB_ROOT_PASSWORD=${MONGOPASSWORD}
    volumes:
      - ./mongodb:/data
    ports:
      - 127.0.0.1:27017:27017
";

fn vars() -> BTreeMap<String, String> {
    [("MONGOUSER", "admin"), ("MONGOPASSWORD", "secret")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ── Orchestration ────────────────────────────────────────────────────

#[test]
fn runbook_up_and_down_for_directory_project() {
    let doc = parse_compose(MONGO).expect("should parse");
    let project = project_name(&doc, Path::new("/home/ops/mongo-local")).expect("project");
    assert_eq!(project, "mongo-local");

    let file = Path::new("/home/ops/mongo-local/docker-compose.yml");
    assert_eq!(
        orchestration(file, Some(&project), Verb::Up).to_string(),
        "docker compose -f /home/ops/mongo-local/docker-compose.yml -p mongo-local up -d"
    );
    assert_eq!(
        orchestration(file, Some(&project), Verb::Down).to_string(),
        "docker compose -f /home/ops/mongo-local/docker-compose.yml -p mongo-local down"
    );
}

// ── Dump and restore ─────────────────────────────────────────────────

#[test]
fn runbook_dump_then_restore_same_directory() {
    let doc = parse_compose(MONGO).expect("should parse");
    let resolved = resolve(&doc, &vars()).expect("should resolve");
    let project = project_name(&doc, Path::new("/srv/db")).expect("project");
    let container = container_name(&project, &doc.services[0]);
    assert_eq!(container, "db-mongo-1");

    let mongo = resolved.service("mongo").expect("mongo");
    let dir = Path::new("./mongodb/dump");
    let dump = dump_restore(mongo, &container, DumpOp::Dump, dir).expect("dump");
    let restore = dump_restore(mongo, &container, DumpOp::Restore { drop: true }, dir)
        .expect("restore");

    assert_eq!(dump.argv().last(), Some(&"/data/dump"));
    assert_eq!(restore.argv().last(), Some(&"/data/dump"));
    assert!(!dump.to_string().contains("secret"));
    assert!(restore.reveal().contains("--password secret"));
}
