use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;

use super::*;
use crate::config::test_site_config;
use crate::pipeline::Invalidation;

fn site() -> (TempDir, Arc<SiteConfig>) {
    let dir = TempDir::new().unwrap();
    let config = test_site_config(dir.path(), "");
    let root = config.root.clone();
    write(&root, "src/index.html", "<h1>Home</h1>");
    write(&root, "src/about.html", "<h1>About</h1>");
    write(&root, "src/assets/scss/app.scss", ".a { color: red; }\n");
    (dir, Arc::new(config))
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

async fn next(rx: &mut mpsc::Receiver<WsMsg>) -> Option<WsMsg> {
    timeout(Duration::from_secs(10), rx.recv()).await.ok().flatten()
}

async fn quiet(rx: &mut mpsc::Receiver<WsMsg>) -> bool {
    timeout(Duration::from_millis(300), rx.recv()).await.is_err()
}

#[tokio::test]
async fn test_queued_changes_yield_one_trailing_run() {
    let (_dir, config) = site();
    let root = config.root.clone();
    let (tx, rx) = mpsc::channel(32);
    let (ws_tx, mut ws_rx) = mpsc::channel(32);

    // queued before the actor starts: the first starts a run, the rest
    // are folded into the single pending slot
    tx.send(RoleMsg::Change(Work::invalidate(Invalidation::Full)))
        .await
        .unwrap();
    for _ in 0..5 {
        let about = root.join("src/about.html");
        tx.send(RoleMsg::Change(Work::invalidate(Invalidation::file(about))))
            .await
            .unwrap();
    }

    let actor = RoleActor::new(Role::Html, rx, ws_tx, Arc::clone(&config));
    let handle = tokio::spawn(actor.run());

    for _ in 0..2 {
        let msg = next(&mut ws_rx).await.expect("reload after each run");
        assert!(matches!(msg, WsMsg::Event(ReloadEvent::FullReload { .. })));
    }
    assert!(quiet(&mut ws_rx).await, "exactly one trailing run");

    tx.send(RoleMsg::Shutdown).await.unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_failure_overlays_then_clears() {
    let (_dir, config) = site();
    let root = config.root.clone();
    let (tx, rx) = mpsc::channel(32);
    let (ws_tx, mut ws_rx) = mpsc::channel(32);
    let handle = tokio::spawn(RoleActor::new(Role::Css, rx, ws_tx, Arc::clone(&config)).run());

    let app = root.join("src/assets/scss/app.scss");
    write(&root, "src/assets/scss/app.scss", ".a { color: red;\n");
    tx.send(RoleMsg::Change(Work::invalidate(Invalidation::file(&app))))
        .await
        .unwrap();

    match next(&mut ws_rx).await {
        Some(WsMsg::Error { path, .. }) => assert!(path.ends_with("app.scss")),
        other => panic!("expected error overlay, got {other:?}"),
    }

    write(&root, "src/assets/scss/app.scss", ".a { color: blue; }\n");
    tx.send(RoleMsg::Change(Work::invalidate(Invalidation::file(&app))))
        .await
        .unwrap();

    assert!(matches!(next(&mut ws_rx).await, Some(WsMsg::ClearError { role: Role::Css })));
    let mut targets = Vec::new();
    for _ in 0..2 {
        match next(&mut ws_rx).await {
            Some(WsMsg::Event(ReloadEvent::StyleInject { url, .. })) => targets.push(url),
            other => panic!("expected style injection, got {other:?}"),
        }
    }
    assert_eq!(targets, ["/assets/css/app.css", "/assets/css/app.min.css"]);

    drop(tx);
    handle.await.unwrap();
}

#[tokio::test]
async fn test_removed_source_is_pruned() {
    let (_dir, config) = site();
    let root = config.root.clone();
    crate::pipeline::run_role(&config, Role::Html, &Invalidation::Full).unwrap();
    let output = config.output_dir().join("about.html");
    assert!(output.is_file());

    let about = root.join("src/about.html");
    fs::remove_file(&about).unwrap();

    let (tx, rx) = mpsc::channel(32);
    let (ws_tx, mut ws_rx) = mpsc::channel(32);
    let handle = tokio::spawn(RoleActor::new(Role::Html, rx, ws_tx, Arc::clone(&config)).run());
    tx.send(RoleMsg::Change(Work::remove(&about))).await.unwrap();

    assert!(matches!(
        next(&mut ws_rx).await,
        Some(WsMsg::Event(ReloadEvent::FullReload { .. }))
    ));
    assert!(!output.exists());
    assert!(config.output_dir().join("index.html").is_file());

    drop(tx);
    handle.await.unwrap();
}
