// Tests for grouping edits: merging and splitting syllables and neumes,
// contour rebuilds, and ligature toggling.

use neume_editor::editor::actions::{
    ChangeGroupParam, GroupParam, SetTextParam, ToggleLigatureParam,
};
use neume_editor::{
    ClefData, ClefShape, Editor, EditorAction, EditorOptions, ElementId, ElementKind, Pitch,
    StaffMetrics, Zone,
};

const UNIT: i32 = 100;

fn make_staff(editor: &mut Editor) -> (ElementId, ElementId) {
    let page = editor.doc.page().clone();
    let staff = editor.doc.create(ElementKind::Staff, Some(&page));
    let layer = editor.doc.create(ElementKind::Layer, Some(&staff));
    let zone = editor.doc.surface.add(Zone::new(0, 0, 4000, 600));
    let el = editor.doc.get_mut(&staff).unwrap();
    el.zone = Some(zone);
    el.staff = Some(StaffMetrics::new(
        UNIT,
        4,
        ClefData::new(ClefShape::C, 3),
    ));
    (staff, layer)
}

/// Helper building syllable -> neume -> nc with a zone at the given x.
fn add_syllable(editor: &mut Editor, layer: &str, ulx: i32) -> (ElementId, ElementId, ElementId) {
    let syllable = editor.doc.create(ElementKind::Syllable, Some(layer));
    let neume = editor.doc.create(ElementKind::Neume, Some(&syllable));
    let nc = editor.doc.create(ElementKind::Nc, Some(&neume));
    let zone = editor.doc.surface.add(Zone::new(ulx, 200, ulx + 140, 300));
    let el = editor.doc.get_mut(&nc).unwrap();
    el.zone = Some(zone);
    el.pitch = Some(Pitch::new(1, 3));
    editor.doc.reorder_children_by_x(layer);
    (syllable, neume, nc)
}

fn add_nc(editor: &mut Editor, neume: &str, ulx: i32, pitch: Pitch) -> ElementId {
    let nc = editor.doc.create(ElementKind::Nc, Some(neume));
    let zone = editor.doc.surface.add(Zone::new(ulx, 200, ulx + 140, 300));
    let el = editor.doc.get_mut(&nc).unwrap();
    el.zone = Some(zone);
    el.pitch = Some(pitch);
    nc
}

fn set_text(editor: &mut Editor, id: &str, text: &str) {
    let report = editor.apply(EditorAction::SetText(SetTextParam {
        element_id: id.to_string(),
        text: text.to_string(),
    }));
    assert!(report.success, "{}", report.info);
}

fn syllable_text(editor: &Editor, syllable: &str) -> Option<String> {
    let syl = editor.doc.find_child_of_kind(syllable, ElementKind::Syl)?;
    let text = editor.doc.find_child_of_kind(&syl, ElementKind::Text)?;
    editor.doc.get(&text).and_then(|el| el.text.clone())
}

fn zone_of(editor: &Editor, id: &str) -> Zone {
    let zone_id = editor.doc.get(id).unwrap().zone.clone().unwrap();
    *editor.doc.surface.get(&zone_id).unwrap()
}

#[test]
fn test_group_full_syllables_merges_into_new_one_with_concatenated_text() {
    let mut editor = Editor::new();
    let (_staff, layer) = make_staff(&mut editor);
    let (syllable1, neume1, _) = add_syllable(&mut editor, &layer, 1000);
    let (syllable2, neume2, _) = add_syllable(&mut editor, &layer, 2000);
    set_text(&mut editor, &syllable1, "wei");
    set_text(&mut editor, &syllable2, "le");

    let report = editor.apply(EditorAction::Group(GroupParam {
        group_type: "neume".to_string(),
        element_ids: vec![neume2.clone(), neume1.clone()],
    }));
    assert!(report.success, "{}", report.info);

    // Both sources were fully selected, so a fresh syllable takes over.
    let merged = editor.doc.parent_of(&neume1).unwrap();
    assert_ne!(merged, syllable1);
    assert_eq!(editor.doc.parent_of(&neume2), Some(merged.clone()));
    assert!(!editor.doc.contains(&syllable1));
    assert!(!editor.doc.contains(&syllable2));
    assert_eq!(
        editor.doc.count_children_of_kind(&layer, ElementKind::Syllable),
        1
    );
    assert_eq!(syllable_text(&editor, &merged).as_deref(), Some("weile"));
}

#[test]
fn test_group_reuses_single_full_parent() {
    let mut editor = Editor::new();
    let (_staff, layer) = make_staff(&mut editor);
    let (syllable1, neume1, _) = add_syllable(&mut editor, &layer, 1000);
    let (_, neume2, _) = add_syllable(&mut editor, &layer, 2000);
    // Second neume in syllable1 so it is not fully selected.
    let extra = editor.doc.create(ElementKind::Neume, Some(&syllable1));
    add_nc(&mut editor, &extra, 1200, Pitch::new(2, 3));

    let report = editor.apply(EditorAction::Group(GroupParam {
        group_type: "neume".to_string(),
        element_ids: vec![neume1.clone(), neume2.clone()],
    }));
    assert!(report.success, "{}", report.info);

    // neume2's syllable was the only full parent: everything lands in it.
    let target = editor.doc.parent_of(&neume2).unwrap();
    assert_eq!(editor.doc.parent_of(&neume1), Some(target.clone()));
    assert_ne!(target, syllable1);
    assert!(editor.doc.contains(&syllable1), "partial parent survives");
    assert_eq!(
        editor.doc.count_children_of_kind(&syllable1, ElementKind::Neume),
        1
    );
}

#[test]
fn test_group_then_ungroup_restores_two_syllables() {
    let mut editor = Editor::new();
    let (_staff, layer) = make_staff(&mut editor);
    let (_, neume1, _) = add_syllable(&mut editor, &layer, 1000);
    let (_, neume2, _) = add_syllable(&mut editor, &layer, 2000);

    let report = editor.apply(EditorAction::Group(GroupParam {
        group_type: "neume".to_string(),
        element_ids: vec![neume1.clone(), neume2.clone()],
    }));
    assert!(report.success, "{}", report.info);

    let report = editor.apply(EditorAction::Ungroup(GroupParam {
        group_type: "neume".to_string(),
        element_ids: vec![neume1.clone(), neume2.clone()],
    }));
    assert!(report.success, "{}", report.info);

    let syllables: Vec<ElementId> = editor
        .doc
        .children_of(&layer)
        .into_iter()
        .filter(|id| editor.doc.kind_of(id) == Some(ElementKind::Syllable))
        .collect();
    assert_eq!(syllables.len(), 2);
    for syllable in &syllables {
        assert_eq!(
            editor.doc.count_children_of_kind(syllable, ElementKind::Neume),
            1
        );
        assert!(
            editor
                .doc
                .find_child_of_kind(syllable, ElementKind::Syl)
                .is_some(),
            "every syllable keeps a text holder"
        );
    }
}

#[test]
fn test_group_full_neumes_builds_fresh_neume() {
    let mut editor = Editor::new();
    let (_staff, layer) = make_staff(&mut editor);
    let (syllable, neume1, nc1) = add_syllable(&mut editor, &layer, 1000);
    let neume2 = editor.doc.create(ElementKind::Neume, Some(&syllable));
    let nc2 = add_nc(&mut editor, &neume2, 1200, Pitch::new(2, 3));

    let report = editor.apply(EditorAction::Group(GroupParam {
        group_type: "nc".to_string(),
        element_ids: vec![nc1.clone(), nc2.clone()],
    }));
    assert!(report.success, "{}", report.info);

    let target = editor.doc.parent_of(&nc1).unwrap();
    assert_eq!(editor.doc.parent_of(&nc2), Some(target.clone()));
    assert_ne!(target, neume1);
    assert_ne!(target, neume2);
    assert!(!editor.doc.contains(&neume1));
    assert!(!editor.doc.contains(&neume2));
    assert_eq!(
        editor.doc.count_children_of_kind(&syllable, ElementKind::Neume),
        1
    );
}

#[test]
fn test_group_partial_selection_splits_off_new_neume() {
    let mut editor = Editor::new();
    let (_staff, layer) = make_staff(&mut editor);
    let (syllable, neume, nc1) = add_syllable(&mut editor, &layer, 1000);
    let nc2 = add_nc(&mut editor, &neume, 1200, Pitch::new(2, 3));
    let nc3 = add_nc(&mut editor, &neume, 1400, Pitch::new(3, 3));

    let report = editor.apply(EditorAction::Group(GroupParam {
        group_type: "nc".to_string(),
        element_ids: vec![nc1.clone(), nc2.clone()],
    }));
    assert!(report.success, "{}", report.info);

    // No full parent: the pair moves to a fresh neume, the third stays.
    let target = editor.doc.parent_of(&nc1).unwrap();
    assert_ne!(target, neume);
    assert_eq!(editor.doc.parent_of(&nc2), Some(target));
    assert_eq!(editor.doc.parent_of(&nc3), Some(neume.clone()));
    assert!(editor.doc.contains(&neume));
    assert_eq!(
        editor.doc.count_children_of_kind(&syllable, ElementKind::Neume),
        2
    );
}

#[test]
fn test_group_ncs_across_syllables_prunes_emptied_sources() {
    let mut editor = Editor::new();
    let (_staff, layer) = make_staff(&mut editor);
    let (syllable1, neume1, nc1) = add_syllable(&mut editor, &layer, 1000);
    let (syllable2, neume2, nc2) = add_syllable(&mut editor, &layer, 2000);

    let report = editor.apply(EditorAction::Group(GroupParam {
        group_type: "nc".to_string(),
        element_ids: vec![nc1.clone(), nc2.clone()],
    }));
    assert!(report.success, "{}", report.info);

    // Both neumes were fully selected, so they go; the second syllable is
    // left without note components and goes too.
    let target = editor.doc.parent_of(&nc1).unwrap();
    assert_eq!(editor.doc.parent_of(&nc2), Some(target.clone()));
    assert!(!editor.doc.contains(&neume1));
    assert!(!editor.doc.contains(&neume2));
    assert!(!editor.doc.contains(&syllable2));
    // The fresh neume lands in the first syllable, which therefore stays.
    assert_eq!(editor.doc.parent_of(&target), Some(syllable1.clone()));
    assert!(editor.doc.contains(&syllable1));
}

#[test]
fn test_ungroup_skips_syl_ids_in_selection() {
    let mut editor = Editor::new();
    let (_staff, layer) = make_staff(&mut editor);
    let (syllable, neume1, _) = add_syllable(&mut editor, &layer, 1000);
    let neume2 = editor.doc.create(ElementKind::Neume, Some(&syllable));
    add_nc(&mut editor, &neume2, 1200, Pitch::new(2, 3));
    set_text(&mut editor, &syllable, "ly");
    let syl = editor
        .doc
        .find_child_of_kind(&syllable, ElementKind::Syl)
        .unwrap();

    let report = editor.apply(EditorAction::Ungroup(GroupParam {
        group_type: "neume".to_string(),
        element_ids: vec![neume1.clone(), syl, neume2.clone()],
    }));
    assert!(report.success, "{}", report.info);

    // The syl id is ignored; the neumes split into two syllables.
    assert_eq!(editor.doc.parent_of(&neume1), Some(syllable.clone()));
    assert_ne!(editor.doc.parent_of(&neume2), Some(syllable));
    assert_eq!(
        editor.doc.count_children_of_kind(&layer, ElementKind::Syllable),
        2
    );
}

#[test]
fn test_ungroup_with_bbox_option_boxes_new_text_holder() {
    let mut editor = Editor::with_options(EditorOptions {
        create_default_syl: true,
        create_default_syl_bbox: true,
    });
    let (_staff, layer) = make_staff(&mut editor);
    let (syllable, neume1, _) = add_syllable(&mut editor, &layer, 1000);
    let neume2 = editor.doc.create(ElementKind::Neume, Some(&syllable));
    add_nc(&mut editor, &neume2, 1200, Pitch::new(2, 3));

    let report = editor.apply(EditorAction::Ungroup(GroupParam {
        group_type: "neume".to_string(),
        element_ids: vec![neume1, neume2.clone()],
    }));
    assert!(report.success, "{}", report.info);

    let new_syllable = editor.doc.parent_of(&neume2).unwrap();
    assert_ne!(new_syllable, syllable);
    let syl = editor
        .doc
        .find_child_of_kind(&new_syllable, ElementKind::Syl)
        .unwrap();
    assert!(editor.doc.get(&syl).unwrap().zone.is_some());
}

#[test]
fn test_change_group_rebuilds_components_from_contour() {
    let mut editor = Editor::new();
    let (_staff, layer) = make_staff(&mut editor);
    let (_, neume, nc1) = add_syllable(&mut editor, &layer, 1000);
    let nc2 = add_nc(&mut editor, &neume, 1200, Pitch::new(5, 3));

    let report = editor.apply(EditorAction::ChangeGroup(ChangeGroupParam {
        element_id: neume.clone(),
        contour: "u".to_string(),
    }));
    assert!(report.success, "{}", report.info);

    // The old follower is discarded and rebuilt one step above the anchor.
    assert!(!editor.doc.contains(&nc2));
    let ncs = editor.doc.children_of(&neume);
    assert_eq!(ncs.len(), 2);
    assert_eq!(ncs[0], nc1);
    assert_eq!(editor.doc.get(&ncs[1]).unwrap().pitch, Some(Pitch::new(2, 3)));
    // One note width right, one unit above the anchor box.
    assert_eq!(zone_of(&editor, &ncs[1]), Zone::new(1143, 100, 1286, 200));
}

#[test]
fn test_change_group_can_extend_the_neume() {
    let mut editor = Editor::new();
    let (_staff, layer) = make_staff(&mut editor);
    let (_, neume, _nc1) = add_syllable(&mut editor, &layer, 1000);

    let report = editor.apply(EditorAction::ChangeGroup(ChangeGroupParam {
        element_id: neume.clone(),
        contour: "ud".to_string(),
    }));
    assert!(report.success, "{}", report.info);

    let ncs = editor.doc.children_of(&neume);
    assert_eq!(ncs.len(), 3);
    assert_eq!(editor.doc.get(&ncs[0]).unwrap().pitch, Some(Pitch::new(1, 3)));
    assert_eq!(editor.doc.get(&ncs[1]).unwrap().pitch, Some(Pitch::new(2, 3)));
    assert_eq!(editor.doc.get(&ncs[2]).unwrap().pitch, Some(Pitch::new(1, 3)));
}

#[test]
fn test_change_group_rejects_invalid_contour() {
    let mut editor = Editor::new();
    let (_staff, layer) = make_staff(&mut editor);
    let (_, neume, _) = add_syllable(&mut editor, &layer, 1000);

    let report = editor.apply(EditorAction::ChangeGroup(ChangeGroupParam {
        element_id: neume,
        contour: "uxd".to_string(),
    }));
    assert!(!report.success);
}

#[test]
fn test_toggle_ligature_shares_and_restores_zone() {
    let mut editor = Editor::new();
    let (_staff, layer) = make_staff(&mut editor);
    let (_, neume, nc1) = add_syllable(&mut editor, &layer, 1000);
    let nc2 = editor.doc.create(ElementKind::Nc, Some(&neume));
    let zone = editor.doc.surface.add(Zone::new(1200, 150, 1340, 250));
    let el = editor.doc.get_mut(&nc2).unwrap();
    el.zone = Some(zone);
    el.pitch = Some(Pitch::new(2, 3));
    let zones_before = editor.doc.surface.len();

    let report = editor.apply(EditorAction::ToggleLigature(ToggleLigatureParam {
        element_ids: vec![nc1.clone(), nc2.clone()],
    }));
    assert!(report.success, "{}", report.info);

    let first_zone = editor.doc.get(&nc1).unwrap().zone.clone().unwrap();
    let second_zone = editor.doc.get(&nc2).unwrap().zone.clone().unwrap();
    assert_eq!(first_zone, second_zone, "ligature shares one zone");
    assert!(editor.doc.get(&nc1).unwrap().ligated);
    assert!(editor.doc.get(&nc2).unwrap().ligated);
    assert_eq!(zone_of(&editor, &nc1), Zone::new(1000, 200, 1140, 300));
    assert_eq!(editor.doc.surface.len(), zones_before - 1);

    // Toggling back gives the second component its own offset box.
    let report = editor.apply(EditorAction::ToggleLigature(ToggleLigatureParam {
        element_ids: vec![nc1.clone(), nc2.clone()],
    }));
    assert!(report.success, "{}", report.info);
    assert!(!editor.doc.get(&nc1).unwrap().ligated);
    assert!(!editor.doc.get(&nc2).unwrap().ligated);
    let first_zone = editor.doc.get(&nc1).unwrap().zone.clone().unwrap();
    let second_zone = editor.doc.get(&nc2).unwrap().zone.clone().unwrap();
    assert_ne!(first_zone, second_zone);
    assert_eq!(zone_of(&editor, &nc1), Zone::new(1000, 200, 1140, 300));
    assert_eq!(zone_of(&editor, &nc2), Zone::new(1143, 300, 1283, 400));
}

#[test]
fn test_toggle_ligature_duplicate_id_reports_failure() {
    let mut editor = Editor::new();
    let (_staff, layer) = make_staff(&mut editor);
    let (_, _neume, nc1) = add_syllable(&mut editor, &layer, 1000);

    let report = editor.apply(EditorAction::ToggleLigature(ToggleLigatureParam {
        element_ids: vec![nc1.clone(), nc1.clone()],
    }));
    assert!(!report.success);
    assert!(!editor.doc.get(&nc1).unwrap().ligated);
}

#[test]
fn test_toggle_ligature_rejects_non_adjacent_components() {
    let mut editor = Editor::new();
    let (_staff, layer) = make_staff(&mut editor);
    let (_, neume, nc1) = add_syllable(&mut editor, &layer, 1000);
    add_nc(&mut editor, &neume, 1200, Pitch::new(2, 3));
    let third = add_nc(&mut editor, &neume, 1400, Pitch::new(3, 3));

    let report = editor.apply(EditorAction::ToggleLigature(ToggleLigatureParam {
        element_ids: vec![nc1, third],
    }));
    assert!(!report.success);
}

#[test]
fn test_ungroup_ligature_pair_dissolves_ligature() {
    let mut editor = Editor::new();
    let (_staff, layer) = make_staff(&mut editor);
    let (syllable, neume, nc1) = add_syllable(&mut editor, &layer, 1000);
    let nc2 = add_nc(&mut editor, &neume, 1200, Pitch::new(2, 3));

    let report = editor.apply(EditorAction::ToggleLigature(ToggleLigatureParam {
        element_ids: vec![nc1.clone(), nc2.clone()],
    }));
    assert!(report.success, "{}", report.info);

    let report = editor.apply(EditorAction::Ungroup(GroupParam {
        group_type: "nc".to_string(),
        element_ids: vec![nc1.clone(), nc2.clone()],
    }));
    assert!(report.success, "{}", report.info);

    assert!(!editor.doc.get(&nc1).unwrap().ligated);
    assert!(!editor.doc.get(&nc2).unwrap().ligated);
    assert_ne!(
        editor.doc.get(&nc1).unwrap().zone,
        editor.doc.get(&nc2).unwrap().zone
    );
    // Each component now has its own neume within the syllable.
    assert_eq!(
        editor.doc.count_children_of_kind(&syllable, ElementKind::Neume),
        2
    );
    assert_ne!(editor.doc.parent_of(&nc1), editor.doc.parent_of(&nc2));
}
