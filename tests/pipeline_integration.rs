//! End-to-end tests over on-disk content, stage tiers and packs.

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tempfile::TempDir;

use compendium_forge::config::PipelineConfig;
use compendium_forge::core::identity::identify;
use compendium_forge::core::merge::{merge, MergeSource, Priority};
use compendium_forge::core::model::{EntityRecord, EntityType};
use compendium_forge::core::pipeline::{Pipeline, StageOptions};
use compendium_forge::core::stage_store::Tier;
use compendium_forge::core::validate::{validate_report, Violation};
use compendium_forge::core::PipelineError;
use compendium_forge::ingestion::LineCorpus;

// ============================================================================
// Fixtures
// ============================================================================

fn pipeline(root: &Path) -> Pipeline {
    Pipeline::new(PipelineConfig::default().rooted_at(root))
}

fn write_json(root: &Path, file: &str, value: Value) {
    fs::write(root.join(file), serde_json::to_vec_pretty(&value).unwrap()).unwrap();
}

fn read_lines(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn seed_content(root: &Path) {
    write_json(
        root,
        "talents.json",
        json!([
            {"name": "KNIFE FIGHTING", "requirements": "Close Combat 2", "description": "Add +1 to melee damage."},
            {"name": "Alert", "requirements": "Awareness 1"},
        ]),
    );
    write_json(
        root,
        "assignments.json",
        json!([{
            "name": "Field Agent",
            "attributes": {"body": 3, "mind": 2, "spirit": 2},
            "coreSkill": "Close Combat",
            "skillOptions": "Stealth, Ranged",
            "coreTalent": "Knife Fighting",
            "talents": "Alert",
            "equipment": "Flashlight, Warrant Card",
        }]),
    );
    write_json(
        root,
        "gear.json",
        json!([
            {"name": "Flashlight", "quantity": -3, "description": "Curated torch."},
            {"name": "Lock Picks", "requisition": {"dn": 9}},
        ]),
    );
}

// ============================================================================
// Build
// ============================================================================

#[test]
fn test_build_writes_packs_and_prefers_curated_gear() {
    let dir = TempDir::new().unwrap();
    seed_content(dir.path());

    let report = pipeline(dir.path()).build().unwrap();
    let names: Vec<&str> = report.packs.iter().map(|p| p.pack.as_str()).collect();
    assert_eq!(
        names,
        vec!["skills.db", "talents.db", "assignments.db", "gear.db", "all-items.db"]
    );

    let gear = read_lines(&dir.path().join("packs/gear.db"));
    assert_eq!(gear.len(), 2);
    let flashlight = gear.iter().find(|g| g["name"] == "Flashlight").unwrap();
    assert_eq!(flashlight["system"]["quantity"], 0);
    let picks = gear.iter().find(|g| g["name"] == "Lock Picks").unwrap();
    assert_eq!(picks["system"]["requisition"]["dn"], 6);

    let merged = read_lines(&dir.path().join("packs/all-items.db"));
    let flashlights: Vec<&Value> = merged.iter().filter(|r| r["name"] == "Flashlight").collect();
    assert_eq!(flashlights.len(), 1);
    assert_eq!(flashlights[0]["system"]["description"], "Curated torch.");
    assert!(merged.iter().any(|r| r["name"] == "Warrant Card"));
    assert_eq!(report.discarded, 1);
}

#[test]
fn test_build_is_byte_identical_on_rerun() {
    let dir = TempDir::new().unwrap();
    seed_content(dir.path());
    let p = pipeline(dir.path());

    p.build().unwrap();
    let first = fs::read(dir.path().join("packs/all-items.db")).unwrap();
    p.build().unwrap();
    let second = fs::read(dir.path().join("packs/all-items.db")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_pack_ids_are_content_addressed() {
    let dir = TempDir::new().unwrap();
    seed_content(dir.path());
    pipeline(dir.path()).build().unwrap();

    let talents = read_lines(&dir.path().join("packs/talents.db"));
    assert_eq!(talents[0]["name"], "Knife Fighting");
    assert_eq!(talents[0]["_id"], identify(EntityType::Talent, "Knife Fighting"));
}

#[test]
fn test_validation_failure_writes_nothing() {
    let dir = TempDir::new().unwrap();
    seed_content(dir.path());
    write_json(
        dir.path(),
        "assignments.json",
        json!([{
            "name": "Occultist",
            "coreSkill": "Ocult",
            "skillOptions": "Astrology",
            "coreTalent": "Alert",
            "talents": "alert",
        }]),
    );

    let err = pipeline(dir.path()).build().unwrap_err();
    assert!(err.is_validation());
    let PipelineError::Validation(report) = err else {
        unreachable!()
    };
    assert_eq!(report.len(), 3);
    assert!(report.to_string().contains("did you mean 'Occult'"));
    assert!(!dir.path().join("packs").exists());
}

// ============================================================================
// Stage
// ============================================================================

#[test]
fn test_stage_promotes_on_first_run_only() {
    let dir = TempDir::new().unwrap();
    seed_content(dir.path());
    let p = pipeline(dir.path());
    let store = p.stage_store();

    let reports = p.stage(&["gear.json".to_string()], StageOptions::default()).unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].promoted);
    assert_eq!(reports[0].reviewed, 2);

    // A reviewer trims the reviewed tier by hand.
    let reviewed = store.path(Tier::Reviewed, "gear.json");
    fs::write(&reviewed, "[]\n").unwrap();

    let reports = p.stage(&["gear.json".to_string()], StageOptions::default()).unwrap();
    assert!(!reports[0].promoted);
    assert_eq!(reports[0].reviewed, 0);
    assert_eq!(fs::read_to_string(&reviewed).unwrap(), "[]\n");

    let reports = p
        .stage(&["gear.json".to_string()], StageOptions { promote: true, sync: false })
        .unwrap();
    assert!(reports[0].promoted);
    assert_eq!(reports[0].reviewed, 2);
}

#[test]
fn test_sync_is_gated_and_restaging_is_stable() {
    let dir = TempDir::new().unwrap();
    seed_content(dir.path());
    let p = pipeline(dir.path());
    let canonical = dir.path().join("talents.json");
    let original = fs::read(&canonical).unwrap();

    p.stage(&[], StageOptions::default()).unwrap();
    assert_eq!(fs::read(&canonical).unwrap(), original);

    p.stage(&[], StageOptions { promote: false, sync: true }).unwrap();
    let synced = fs::read(&canonical).unwrap();
    assert_ne!(synced, original);

    // Staging the synced output again reproduces the same normalized tier.
    let normalized = p.stage_store().path(Tier::Normalized, "talents.json");
    let before = fs::read(&normalized).unwrap();
    p.stage(&[], StageOptions { promote: true, sync: true }).unwrap();
    assert_eq!(fs::read(&normalized).unwrap(), before);
    assert_eq!(fs::read(&canonical).unwrap(), synced);
}

#[test]
fn test_stage_keeps_raw_bytes() {
    let dir = TempDir::new().unwrap();
    seed_content(dir.path());
    let p = pipeline(dir.path());
    p.stage(&["talents.json".to_string()], StageOptions::default()).unwrap();

    assert_eq!(
        fs::read(p.stage_store().path(Tier::Raw, "talents.json")).unwrap(),
        fs::read(dir.path().join("talents.json")).unwrap()
    );
    let status = p.status();
    let talents = status.iter().find(|s| s.file == "talents.json").unwrap();
    assert_eq!(talents.count(Tier::Raw), Some(2));
    assert_eq!(talents.count(Tier::Reviewed), Some(2));
}

// ============================================================================
// Extraction to build
// ============================================================================

#[test]
fn test_extracted_talent_round_trip() {
    let dir = TempDir::new().unwrap();
    let p = pipeline(dir.path());
    let corpus = LineCorpus::from_text(
        "TALENTS\n\nKNIFE FIGHTING\nREQUIREMENTS: Close Combat 2\nAdd +1 to melee damage.\n",
    );
    p.extract_to(&corpus, dir.path(), false).unwrap();
    write_json(dir.path(), "assignments.json", json!([]));

    p.build().unwrap();
    let talents = read_lines(&dir.path().join("packs/talents.db"));
    assert_eq!(talents.len(), 1);
    assert_eq!(talents[0]["name"], "Knife Fighting");
    assert_eq!(talents[0]["system"]["requirements"], "Close Combat 2");
    assert_eq!(talents[0]["system"]["description"], "Add +1 to melee damage.");
}

// ============================================================================
// Library properties
// ============================================================================

#[test]
fn test_merge_priority_is_explicit() {
    let curated = vec![EntityRecord::new(EntityType::Gear, "Flashlight")];
    let mut generated_flashlight = EntityRecord::new(EntityType::Gear, "FLASHLIGHT");
    generated_flashlight.attributes.insert("quantity".into(), json!(9));
    let generated = vec![generated_flashlight];

    // Listed first, but generated records still lose.
    let outcome = merge(&[
        MergeSource::new("generated", Priority::Generated, &generated),
        MergeSource::new("curated", Priority::Curated, &curated),
    ]);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].name, "Flashlight");
    assert_eq!(outcome.discarded[0].source, "generated");
}

#[test]
fn test_validator_reports_every_violation() {
    let skills = vec![EntityRecord::new(EntityType::Skill, "Stealth")];
    let talents = vec![EntityRecord::new(EntityType::Talent, "Alert")];
    let mut assignment = EntityRecord::new(EntityType::Assignment, "Burglar");
    assignment.attributes.insert("coreSkill".into(), json!("Lockpicking"));
    assignment.attributes.insert("skillOptions".into(), json!("Stealth, Forgery"));
    assignment.attributes.insert("coreTalent".into(), json!("Alert"));
    assignment.attributes.insert("talents".into(), json!("Alert"));

    let report = validate_report(&[assignment], &skills, &talents);
    let unknown: Vec<&Violation> = report
        .violations
        .iter()
        .filter(|v| matches!(v, Violation::UnknownSkill { .. }))
        .collect();
    assert_eq!(unknown.len(), 2);
    assert!(report
        .violations
        .iter()
        .any(|v| matches!(v, Violation::DuplicateTalents { .. })));
    assert_eq!(report.len(), 3);
}
