//! Integration tests for registry loading.
//!
//! These tests exercise the public API end to end: files on disk, multi-file
//! merging, canonical naming and the diagnostics a broken registry produces.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test registry_integration -- --nocapture
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use campaign_codex::config::CodexConfig;
use campaign_codex::core::codex::{CodexError, IdentityKind, Registry};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("Failed to write registry file");
    path
}

/// Counts WARN events seen by the subscriber it is installed in.
struct WarnCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

const CAMPAIGN: &str = "\
# Kampania w Małopolsce

## Gracze
* Jan Kowalski
  - @alias: Janek

## Postacie
* Zordon
  - @player: Janek
  - @location: Kraków (2021-01:2024-06)
  - @status: Active (2021:)

## Miejsca
* Polska
* Kraków
  - @in: Polska
* Wawel
  - @in: Kraków
";

const OVERRIDES: &str = "\
## Characters
* zordon
  - @location: Gdańsk (2024-07:)
  - @group: Drużyna Smoka

## Places
* Gdańsk
  - @in: Polska
";

#[test]
fn test_multi_file_histories_are_concatenated() {
    let dir = TempDir::new().unwrap();
    let campaign = write(&dir, "campaign.md", CAMPAIGN);
    let overrides = write(&dir, "overrides.md", OVERRIDES);

    let mut registry = Registry::new().with_reference_date(ymd(2025, 1, 1));
    registry.load_files(&[&campaign, &overrides]).unwrap();
    registry.finalize();

    assert!(registry.diagnostics().is_empty());
    assert_eq!(registry.len(), 6);

    let zordon = registry.get(IdentityKind::Character, "Zordon").unwrap();
    assert_eq!(
        zordon.histories.location.values().collect::<Vec<_>>(),
        vec!["Kraków", "Gdańsk"]
    );
    assert_eq!(zordon.histories.group.len(), 1);
    assert_eq!(zordon.current.location.as_deref(), Some("Gdańsk"));
    assert_eq!(zordon.current.groups, vec!["Drużyna Smoka"]);
    assert_eq!(zordon.sources.len(), 2);

    // Earlier reference date sees the first file's value.
    assert_eq!(
        zordon.state_at(ymd(2023, 5, 1)).location.as_deref(),
        Some("Kraków")
    );

    let jan = registry.get(IdentityKind::Person, "Jan Kowalski").unwrap();
    assert_eq!(jan.characters, vec!["Zordon"]);
}

#[test]
fn test_canonical_place_paths() {
    let dir = TempDir::new().unwrap();
    let campaign = write(&dir, "campaign.md", CAMPAIGN);
    let overrides = write(&dir, "overrides.md", OVERRIDES);

    let mut registry = Registry::new();
    registry.load_files(&[campaign, overrides]).unwrap();
    registry.finalize();

    let id = |name: &str| {
        registry
            .get(IdentityKind::Place, name)
            .map(|i| i.canonical_id.clone())
            .unwrap()
    };
    assert_eq!(id("Polska"), "place/Polska");
    assert_eq!(id("Wawel"), "place/Polska/Kraków/Wawel");
    assert_eq!(id("Gdańsk"), "place/Polska/Gdańsk");
    assert_eq!(
        registry.find("zordon").map(|i| i.canonical_id.as_str()),
        Some("character/Zordon")
    );
}

#[test]
fn test_containment_cycle_warns_once() {
    let counter = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(counter.clone()));

    let registry = tracing::subscriber::with_default(subscriber, || {
        let mut registry = Registry::new();
        registry.add_source(
            "cycle.md",
            "## Places\n* Rivendell\n  - @in: Imladris\n* Imladris\n  - @in: Rivendell\n",
        );
        registry.finalize();
        registry
    });

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(registry.diagnostics().cycle_count(), 1);
    assert_eq!(
        registry
            .get(IdentityKind::Place, "Rivendell")
            .unwrap()
            .canonical_id,
        "place/Rivendell"
    );
    assert_eq!(
        registry
            .get(IdentityKind::Place, "Imladris")
            .unwrap()
            .canonical_id,
        "place/Imladris"
    );
}

#[test]
fn test_missing_file_is_a_hard_error() {
    let dir = TempDir::new().unwrap();
    let present = write(&dir, "campaign.md", CAMPAIGN);
    let missing = dir.path().join("nope.md");

    let mut registry = Registry::new();
    let err = registry.load_files(&[present, missing]).unwrap_err();

    assert!(matches!(err, CodexError::ReadFailed { .. }));
    assert!(!err.is_recoverable());
    // The readable file before it was still loaded.
    assert!(registry.find("Wawel").is_some());
}

#[test]
fn test_registry_from_config() {
    let dir = TempDir::new().unwrap();
    let campaign = write(&dir, "campaign.md", CAMPAIGN);

    let toml = format!(
        "[registry]\nfiles = [{:?}]\nreference_date = \"2022-06-01\"\n",
        campaign.display().to_string()
    );
    let config = CodexConfig::from_toml_str(&toml).unwrap();

    let mut registry = Registry::from_config(&config).unwrap();
    registry.finalize();

    assert_eq!(registry.reference_date(), ymd(2022, 6, 1));
    let zordon = registry.get(IdentityKind::Character, "Zordon").unwrap();
    assert_eq!(zordon.current.location.as_deref(), Some("Kraków"));
    assert_eq!(zordon.current.status.as_deref(), Some("Active"));
}

#[test]
fn test_json_export_round_trips_dates() {
    let mut registry = Registry::new().with_reference_date(ymd(2023, 1, 1));
    registry.add_source("campaign.md", CAMPAIGN);
    registry.finalize();

    let json = registry.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let zordon = value
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["name"] == "Zordon")
        .unwrap();
    assert_eq!(zordon["histories"]["location"][0]["valid_from"], "2021-01-01");
    assert_eq!(zordon["histories"]["location"][0]["valid_to"], "2024-06-30");
}
