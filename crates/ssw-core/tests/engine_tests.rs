use chrono::{NaiveDate, NaiveDateTime};
use ssw_core::{BACKUP_DIR_NAME, EmulatorProfile, GameGroup, MemTree, SaveSwitcher, SaveTree, scan};
use std::collections::BTreeMap;

fn fixed_clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(3, 4, 5).unwrap()
}

fn gba(root: &str) -> EmulatorProfile<String> {
    EmulatorProfile::new("gba", "mGBA", root.to_string(), [".SAV"])
}

fn zelda_tree() -> MemTree {
    let t = MemTree::new();
    t.add_file("saves/zelda.sav", b"base bytes");
    t.add_file("saves/zelda_sam.sav", b"sam bytes");
    t
}

fn only_group(t: &MemTree) -> GameGroup<String> {
    let mut groups = scan(t, &[gba("saves")]);
    assert_eq!(groups.len(), 1, "expected one group: {:?}", groups);
    groups.remove(0)
}

fn backups(t: &MemTree, dir: &str) -> BTreeMap<String, Vec<u8>> {
    let prefix = format!("{}/{}/", dir, BACKUP_DIR_NAME);
    t.files()
        .into_iter()
        .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|n| (n.to_string(), v)))
        .collect()
}

#[test]
fn scan_groups_base_and_variants() {
    let t = MemTree::new();
    t.add_file("saves/zelda.sav", b"b");
    t.add_file("saves/zelda_alex.sav", b"a");
    t.add_file("saves/zelda_sam.sav", b"s");
    let g = only_group(&t);
    assert_eq!(g.id(), "gba||zelda|sav");
    assert_eq!(g.emulator_name, "mGBA");
    assert_eq!(g.directory, "saves");
    assert_eq!(g.base_save.as_ref().unwrap().filename, "zelda.sav");
    assert_eq!(g.owners().collect::<Vec<_>>(), vec!["alex", "sam"]);
    assert_eq!(g.variant_saves["sam"].handle, "saves/zelda_sam.sav");
    assert!(g.base_save.as_ref().unwrap().modified_at.is_some());
}

#[test]
fn scan_filters_extensions_and_reserved_names() {
    let t = MemTree::new();
    t.add_file("saves/save.dat", b"x");
    t.add_file("saves/.hidden.sav", b"x");
    t.add_file("saves/metroid.SAV", b"x");
    t.add_file("saves/pending.tmp", b"x");
    let profile = EmulatorProfile::new("gba", "mGBA", "saves".to_string(), ["sav", "tmp"]);
    let groups = scan(&t, &[profile]);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key.base_name, "metroid");
    assert_eq!(groups[0].key.extension, "SAV");
}

#[test]
fn scan_skips_backup_folders_at_any_depth() {
    let t = MemTree::new();
    t.add_file(&format!("saves/{}/zelda.sav", BACKUP_DIR_NAME), b"x");
    t.add_file(&format!("saves/gen3/{}/deep/emerald.sav", BACKUP_DIR_NAME), b"x");
    t.add_file("saves/gen3/ruby_alex.sav", b"x");
    let groups = scan(&t, &[gba("saves")]);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key.relative_dir, "gen3");
    assert_eq!(groups[0].id(), "gba|gen3|ruby|sav");
    assert!(groups[0].base_save.is_none());
}

#[test]
fn scan_sorts_by_base_name_ignoring_case() {
    let t = MemTree::new();
    t.add_file("saves/b.sav", b"x");
    t.add_file("saves/c/A.sav", b"x");
    t.add_file("saves/C.sav", b"x");
    let names: Vec<_> = scan(&t, &[gba("saves")]).into_iter().map(|g| g.key.base_name).collect();
    assert_eq!(names, vec!["A", "b", "C"]);
}

#[test]
fn scan_skips_unreadable_root() {
    let t = MemTree::new();
    t.add_file("gba/zelda.sav", b"x");
    t.add_file("snes/mario.srm", b"x");
    t.deny("gba");
    let snes = EmulatorProfile::new("snes", "Snes9x", "snes".to_string(), ["srm"]);
    let missing = EmulatorProfile::new("nds", "melonDS", "nowhere".to_string(), ["sav"]);
    let groups = scan(&t, &[gba("gba"), missing, snes]);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key.emulator_id, "snes");
}

#[test]
fn switch_archives_base_and_restores_target() {
    let t = zelda_tree();
    let g = only_group(&t);
    let out = SaveSwitcher::with_clock(&t, fixed_clock).switch_owner(&g, Some("alex"), "sam");
    assert!(out.succeeded, "{}", out.message);
    assert_eq!(out.message, "Switched to sam");
    assert_eq!(t.contents("saves/zelda.sav").unwrap(), b"sam bytes");
    assert_eq!(t.contents("saves/zelda_alex.sav").unwrap(), b"base bytes");
    assert!(!t.exists("saves/zelda_sam.sav"));

    let b = backups(&t, "saves");
    assert_eq!(b["zelda_20240102_030405.sav.bak"], b"base bytes");
    assert_eq!(b["zelda_sam_20240102_030405.sav.bak"], b"sam bytes");
}

#[test]
fn switch_to_active_owner_is_a_no_op() {
    let t = zelda_tree();
    let g = only_group(&t);
    let before = t.files();
    let out = SaveSwitcher::new(&t).switch_owner(&g, Some("sam"), "sam");
    assert!(out.succeeded);
    assert_eq!(out.message, "Already active for sam");
    assert_eq!(t.files(), before);
    assert_eq!(t.mutations(), 0);
}

#[test]
fn switch_requires_current_owner_when_base_exists() {
    let t = zelda_tree();
    let g = only_group(&t);
    let before = t.files();
    for source in [None, Some("  ")] {
        let out = SaveSwitcher::new(&t).switch_owner(&g, source, "sam");
        assert!(!out.succeeded);
        assert_eq!(out.message, "Current save owner is required");
    }
    assert_eq!(t.files(), before);
}

#[test]
fn switch_to_new_owner_leaves_no_base() {
    let t = MemTree::new();
    t.add_file("saves/zelda.sav", b"base bytes");
    let g = only_group(&t);
    let out = SaveSwitcher::with_clock(&t, fixed_clock).switch_owner(&g, Some("alex"), "sam");
    assert!(out.succeeded);
    assert_eq!(out.message, "No save for sam yet. A fresh save will be created by the emulator.");
    assert!(!t.exists("saves/zelda.sav"));
    assert_eq!(t.contents("saves/zelda_alex.sav").unwrap(), b"base bytes");
    assert_eq!(backups(&t, "saves")["zelda_20240102_030405.sav.bak"], b"base bytes");
}

#[test]
fn switch_without_base_needs_no_owner() {
    let t = MemTree::new();
    t.add_file("saves/zelda_sam.sav", b"sam bytes");
    let g = only_group(&t);
    let out = SaveSwitcher::new(&t).switch_owner(&g, None, "sam");
    assert!(out.succeeded, "{}", out.message);
    assert_eq!(t.contents("saves/zelda.sav").unwrap(), b"sam bytes");
    assert!(!t.exists("saves/zelda_sam.sav"));
}

#[test]
fn overwritten_variant_is_kept_in_backups() {
    let t = zelda_tree();
    t.add_file("saves/zelda_alex.sav", b"old alex bytes");
    let g = only_group(&t);
    let out = SaveSwitcher::with_clock(&t, fixed_clock).switch_owner(&g, Some("alex"), "sam");
    assert!(out.succeeded);
    assert_eq!(t.contents("saves/zelda_alex.sav").unwrap(), b"base bytes");

    let kept: Vec<Vec<u8>> = backups(&t, "saves").into_values().collect();
    let expected: [&[u8]; 3] = [b"base bytes", b"sam bytes", b"old alex bytes"];
    for original in expected {
        assert!(kept.iter().any(|k| k.as_slice() == original), "{:?} missing from backups", original);
    }
}

#[test]
fn repeated_switches_version_backups_within_one_second() {
    let t = zelda_tree();
    let sw = SaveSwitcher::with_clock(&t, fixed_clock);
    assert!(sw.switch_owner(&only_group(&t), Some("alex"), "sam").succeeded);
    assert!(sw.switch_owner(&only_group(&t), Some("sam"), "alex").succeeded);

    assert_eq!(t.contents("saves/zelda.sav").unwrap(), b"base bytes");
    assert_eq!(t.contents("saves/zelda_sam.sav").unwrap(), b"sam bytes");
    assert!(!t.exists("saves/zelda_alex.sav"));

    let b = backups(&t, "saves");
    assert_eq!(b["zelda_20240102_030405.sav.bak"], b"base bytes");
    assert_eq!(b["zelda_20240102_030405.sav_1.bak"], b"sam bytes");
    assert_eq!(b.len(), 4);
}

#[test]
fn switch_stops_when_backup_cannot_be_taken() {
    let t = zelda_tree();
    let g = only_group(&t);
    t.deny(&format!("saves/{}", BACKUP_DIR_NAME));
    let before = t.files();
    let out = SaveSwitcher::new(&t).switch_owner(&g, Some("alex"), "sam");
    assert!(!out.succeeded);
    assert!(out.message.starts_with("Could not back up zelda.sav"), "{}", out.message);
    assert_eq!(t.files(), before);
    assert_eq!(t.mutations(), 0);
}

#[test]
fn switch_failing_midway_keeps_earlier_steps() {
    let t = zelda_tree();
    let g = only_group(&t);
    t.deny("saves/zelda_sam.sav");
    let out = SaveSwitcher::with_clock(&t, fixed_clock).switch_owner(&g, Some("alex"), "sam");
    assert!(!out.succeeded);
    assert_eq!(out.message, "zelda_sam.sav is no longer accessible");
    assert_eq!(t.contents("saves/zelda.sav").unwrap(), b"base bytes");
    assert_eq!(t.contents("saves/zelda_alex.sav").unwrap(), b"base bytes");
    assert_eq!(backups(&t, "saves")["zelda_20240102_030405.sav.bak"], b"base bytes");
}

#[test]
fn switch_continues_when_backup_names_run_out() {
    let t = zelda_tree();
    let g = only_group(&t);
    let taken = "zelda_20240102_030405.sav.bak";
    t.add_file(&format!("saves/{}/{}", BACKUP_DIR_NAME, taken), b"old");
    for n in 1..1000 {
        let name = format!("zelda_20240102_030405.sav_{}.bak", n);
        t.add_file(&format!("saves/{}/{}", BACKUP_DIR_NAME, name), b"old");
    }
    let out = SaveSwitcher::with_clock(&t, fixed_clock).switch_owner(&g, Some("alex"), "sam");
    assert!(out.succeeded, "{}", out.message);
    assert_eq!(out.message, "Switched to sam");
    assert_eq!(t.contents("saves/zelda.sav").unwrap(), b"sam bytes");
    assert_eq!(t.contents("saves/zelda_alex.sav").unwrap(), b"base bytes");

    let b = backups(&t, "saves");
    assert_eq!(b.len(), 1001);
    assert!(b.iter().filter(|(k, _)| k.starts_with("zelda_2")).all(|(_, v)| v == b"old"));
    assert_eq!(b["zelda_sam_20240102_030405.sav.bak"], b"sam bytes");
}

#[test]
fn switch_reports_inaccessible_directory() {
    let t = zelda_tree();
    let g = only_group(&t);
    t.deny("saves");
    let out = SaveSwitcher::new(&t).switch_owner(&g, Some("alex"), "sam");
    assert!(!out.succeeded);
    assert_eq!(out.message, "Game directory is no longer accessible");
}

#[test]
fn switch_rejects_path_like_owner() {
    let t = zelda_tree();
    let g = only_group(&t);
    let out = SaveSwitcher::new(&t).switch_owner(&g, Some("alex"), "../sam");
    assert!(!out.succeeded);
    assert!(out.message.starts_with("Invalid owner tag"));
    assert_eq!(t.mutations(), 0);
}

#[test]
fn preview_reports_without_mutating() {
    let t = zelda_tree();
    let g = only_group(&t);
    let sw = SaveSwitcher::new(&t);
    let p = sw.preview(&g, "sam").unwrap();
    assert!(p.base_exists && p.target_variant_exists);
    assert!(p.target_modified_at.is_some());
    let p = sw.preview(&g, "alex").unwrap();
    assert!(!p.target_variant_exists);
    assert_eq!(p.target_modified_at, None);
    assert_eq!(t.mutations(), 0);
}

#[test]
fn export_uses_unique_timestamped_names() {
    let t = zelda_tree();
    let exports = t.add_dir("exports");
    let g = only_group(&t);
    let sw = SaveSwitcher::with_clock(&t, fixed_clock);
    let first = sw.export(&g, &exports);
    let second = sw.export(&g, &exports);
    assert_eq!(first.message, "Exported to zelda_20240102_030405.sav");
    assert_eq!(second.message, "Exported to zelda_20240102_030405_1.sav");
    assert_eq!(t.contents("exports/zelda_20240102_030405_1.sav").unwrap(), b"base bytes");
}

#[test]
fn export_needs_active_save_and_folder() {
    let t = MemTree::new();
    t.add_file("saves/zelda_sam.sav", b"s");
    let exports = t.add_dir("exports");
    let g = only_group(&t);
    let sw = SaveSwitcher::new(&t);
    assert_eq!(sw.export(&g, &exports).message, "No active save file to export");
    assert_eq!(sw.export(&g, &"gone".to_string()).message, "Export folder is no longer accessible");
}

#[test]
fn failed_export_leaves_no_empty_file() {
    let t = zelda_tree();
    let exports = t.add_dir("exports");
    let g = only_group(&t);
    t.refuse_writes();
    let out = SaveSwitcher::with_clock(&t, fixed_clock).export(&g, &exports);
    assert!(!out.succeeded);
    assert!(out.message.starts_with("Could not write export file"), "{}", out.message);
    assert!(t.list_children(&exports).unwrap().is_empty());
}

#[test]
fn import_replaces_base_and_backs_it_up() {
    let t = zelda_tree();
    let src = t.add_file("downloads/from_friend.sav", b"friend bytes");
    let g = only_group(&t);
    let out = SaveSwitcher::with_clock(&t, fixed_clock).import(&g, &src);
    assert!(out.succeeded);
    assert_eq!(out.message, "Imported save from from_friend.sav");
    assert_eq!(t.contents("saves/zelda.sav").unwrap(), b"friend bytes");
    assert_eq!(t.contents("saves/zelda_sam.sav").unwrap(), b"sam bytes");
    assert_eq!(backups(&t, "saves")["zelda_20240102_030405.sav.bak"], b"base bytes");
}

#[test]
fn import_rejects_folders_and_missing_files() {
    let t = zelda_tree();
    let folder = t.add_dir("downloads");
    let g = only_group(&t);
    let sw = SaveSwitcher::new(&t);
    assert_eq!(sw.import(&g, &folder).message, "Selected item is not a file");
    let missing = sw.import(&g, &"downloads/nope.sav".to_string());
    assert!(!missing.succeeded);
    assert_eq!(missing.message, "Selected import file is no longer accessible");
    assert_eq!(t.read(&"saves/zelda.sav".to_string()).unwrap(), b"base bytes");
}

#[test]
fn history_record_from_outcome() {
    let t = zelda_tree();
    let g = only_group(&t);
    let started = chrono::Utc::now();
    let out = SaveSwitcher::new(&t).switch_owner(&g, Some("alex"), "sam");
    let rec = ssw_core::HistoryRecord::from_outcome(&g, Some("alex"), "sam", started, &out);
    assert_eq!(rec.status, ssw_core::OpStatus::Success);
    assert_eq!(rec.game_id, "gba||zelda|sav");
    assert_eq!(rec.message(), Some("Switched to sam"));
    let line = rec.to_json_line().unwrap();
    assert!(line.contains("\"status\":\"success\""));
    let back: ssw_core::HistoryRecord = serde_json::from_str(&line).unwrap();
    assert_eq!(back, rec);
}
