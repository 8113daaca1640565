use std::path::{Path, PathBuf};
use std::time::Duration;

use rustc_hash::FxHashMap;
use tempfile::TempDir;

use super::debouncer::{ChangeKind, DEBOUNCE_MS, Debouncer};
use super::router::route;
use super::watch_roots::collect_watch_roots;
use crate::actor::role::Work;
use crate::config::{SiteConfig, test_site_config};
use crate::core::Role;
use crate::pipeline::Invalidation;

fn make_config() -> (TempDir, SiteConfig) {
    let temp = TempDir::new().unwrap();
    let config = test_site_config(temp.path(), "");
    (temp, config)
}

fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().map(PathBuf::from).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::File)
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

fn changes(root: &Path, items: &[(&str, ChangeKind)]) -> FxHashMap<PathBuf, ChangeKind> {
    items
        .iter()
        .map(|(rel, kind)| (root.join(rel), *kind))
        .collect()
}

// =============================================================================
// debouncer
// =============================================================================

#[test]
fn test_debouncer_empty() {
    let debouncer = Debouncer::new();
    assert!(!debouncer.is_ready());
}

#[test]
fn test_event_routing_by_kind() {
    let mut debouncer = Debouncer::new();

    debouncer.add_event(&make_event(vec!["/tmp/a.html"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/b.html"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/c.html"], remove_kind()));

    assert_eq!(debouncer.changes.len(), 3);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/a.html")], ChangeKind::Created);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/b.html")], ChangeKind::Modified);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/c.html")], ChangeKind::Removed);
}

#[test]
fn test_temp_files_ignored() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(
        vec!["/tmp/.index.html.swp", "/tmp/index.html~", "/tmp/4913"],
        modify_kind(),
    ));
    assert!(debouncer.changes.is_empty());
    assert!(debouncer.last_event.is_none());
}

#[test]
fn test_metadata_changes_ignored() {
    let mut debouncer = Debouncer::new();
    let kind = notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
        notify::event::MetadataKind::WriteTime,
    ));
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], kind));
    assert!(debouncer.changes.is_empty());
}

#[test]
fn test_dedup_first_event_wins() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], modify_kind()));

    assert_eq!(debouncer.changes.len(), 1);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/a.html")], ChangeKind::Created);
}

#[test]
fn test_remove_then_create_restores() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], remove_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], create_kind()));
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/a.html")], ChangeKind::Created);
}

#[test]
fn test_create_then_remove_discards() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], remove_kind()));
    assert!(debouncer.changes.is_empty(), "created+removed should discard");
}

#[test]
fn test_modify_then_remove_upgrades() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], remove_kind()));
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/a.html")], ChangeKind::Removed);
}

#[test]
fn test_sleep_duration_no_events() {
    let debouncer = Debouncer::new();
    assert!(debouncer.sleep_duration() >= Duration::from_secs(3600));
}

#[test]
fn test_sleep_duration_after_event() {
    let mut debouncer = Debouncer::new();
    debouncer.last_event = Some(std::time::Instant::now());

    let dur = debouncer.sleep_duration();
    assert!(dur >= Duration::from_millis(DEBOUNCE_MS - 10));
    assert!(dur <= Duration::from_millis(DEBOUNCE_MS));
}

#[test]
fn test_take_after_quiet_window() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], modify_kind()));
    assert!(debouncer.take_if_ready().is_none());

    std::thread::sleep(Duration::from_millis(DEBOUNCE_MS + 20));
    let batch = debouncer.take_if_ready().unwrap();
    assert_eq!(batch.len(), 1);
    assert!(debouncer.last_event.is_none());
    assert!(debouncer.take_if_ready().is_none());
}

#[test]
fn test_cancelled_window_resets() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.html"], remove_kind()));

    std::thread::sleep(Duration::from_millis(DEBOUNCE_MS + 20));
    assert!(debouncer.take_if_ready().is_none());
    assert!(debouncer.last_event.is_none());
}

// =============================================================================
// router
// =============================================================================

#[test]
fn test_direct_source_routes_file() {
    let (_tmp, config) = make_config();
    let root = config.root.as_path();
    let routed = route(changes(root, &[("src/about.html", ChangeKind::Modified)]), &config);

    assert_eq!(routed.len(), 1);
    assert_eq!(
        routed[&Role::Html],
        Work::invalidate(Invalidation::file(root.join("src/about.html")))
    );
}

#[test]
fn test_include_change_routes_full() {
    let (_tmp, config) = make_config();
    let root = config.root.as_path();
    let routed = route(
        changes(
            root,
            &[
                ("src/partials/header.html", ChangeKind::Modified),
                ("src/index.html", ChangeKind::Modified),
                ("src/data/site.yml", ChangeKind::Modified),
            ],
        ),
        &config,
    );
    assert_eq!(routed[&Role::Html], Work::invalidate(Invalidation::Full));
}

#[test]
fn test_sass_partial_routes_full() {
    let (_tmp, config) = make_config();
    let root = config.root.as_path();
    let routed = route(
        changes(root, &[("src/assets/scss/_vars.scss", ChangeKind::Modified)]),
        &config,
    );
    assert_eq!(routed[&Role::Css], Work::invalidate(Invalidation::Full));

    let nested = route(
        changes(root, &[("src/assets/scss/components/button.scss", ChangeKind::Created)]),
        &config,
    );
    assert_eq!(nested[&Role::Css], Work::invalidate(Invalidation::Full));
}

#[test]
fn test_removed_source_routes_prune() {
    let (_tmp, config) = make_config();
    let root = config.root.as_path();
    let routed = route(
        changes(root, &[("src/assets/images/logo.png", ChangeKind::Removed)]),
        &config,
    );
    assert_eq!(
        routed[&Role::Images],
        Work::remove(root.join("src/assets/images/logo.png"))
    );
}

#[test]
fn test_svg_font_reaches_both_roles() {
    let (_tmp, mut config) = make_config();
    let root = config.root.clone();
    // one glob covering both trees
    config = test_site_config(
        &root,
        "[images]\nsource = \"src/assets/**/*.svg\"\nwatch = \"src/assets/**/*.svg\"",
    );
    let routed = route(
        changes(&root, &[("src/assets/fonts/icons.svg", ChangeKind::Modified)]),
        &config,
    );
    assert!(routed.contains_key(&Role::Images));
    assert!(routed.contains_key(&Role::Fonts));
}

#[test]
fn test_unrelated_and_output_paths_ignored() {
    let (_tmp, config) = make_config();
    let root = config.root.as_path();
    let routed = route(
        changes(
            root,
            &[
                ("README.md", ChangeKind::Modified),
                ("dist/index.html", ChangeKind::Modified),
                ("sitepipe.toml", ChangeKind::Modified),
            ],
        ),
        &config,
    );
    assert!(routed.is_empty());
}

// =============================================================================
// watch roots
// =============================================================================

#[test]
fn test_watch_roots_cover_roles_and_skip_output() {
    let (_tmp, config) = make_config();
    let root = config.root.as_path();
    let roots = collect_watch_roots(&config);

    assert_eq!(roots, vec![root.join("src")]);
    assert!(roots.iter().all(|r| !r.starts_with(config.output_dir())));
}
