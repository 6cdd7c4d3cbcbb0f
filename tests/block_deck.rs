use std::path::PathBuf;

use approx::assert_relative_eq;
use ccx_deck::prelude::*;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/block.inp")
}

fn load() -> Deck {
    read_path(&fixture(), &ReaderOptions { strict: true }).unwrap()
}

#[test]
fn fixed_face_nodes_are_declared() {
    let deck = load();
    let fixed = deck.node_set("Internal_Selection-1_Fixed-1").unwrap();
    assert_eq!(fixed.ids, vec![5, 6, 7, 8]);
    for id in &fixed.ids {
        assert!(deck.has_node(*id), "node {} missing", id);
    }
}

#[test]
fn hexahedron_references_eight_distinct_declared_nodes() {
    let deck = load();
    let element = deck.element(1).unwrap();
    assert_eq!(element.kind, ElementType::C3D8);
    assert_eq!(element.nodes.len(), 8);

    let mut distinct = element.nodes.clone();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct.len(), 8);
    assert!(element.nodes.iter().all(|n| deck.has_node(*n)));
}

#[test]
fn material_and_section() {
    let deck = load();
    let material = deck.material("solidmaterial").unwrap();
    assert_relative_eq!(material.density().unwrap(), 7.9e-9);
    let elastic = material.elastic().unwrap();
    assert_relative_eq!(elastic.young, 210000.0);
    assert_relative_eq!(elastic.poisson, 0.3);
    assert_relative_eq!(material.expansion[0].value, 1.2e-5);
    assert_relative_eq!(material.conductivity[0].value, 43.0);
    assert_relative_eq!(material.specific_heat[0].value, 5.9e8);

    assert_eq!(
        deck.sections,
        vec![Section::Solid {
            elset: "SolidMaterialSolid".to_string(),
            material: "SolidMaterial".to_string(),
            options: Vec::new(),
        }]
    );
    assert_eq!(deck.element_set("SolidMaterialSolid").unwrap().ids, vec![1]);
    assert_eq!(deck.material_of_element(1).map(|m| m.name.as_str()), Some("SolidMaterial"));
}

#[test]
fn static_step_with_fixed_face_and_gravity() {
    let deck = load();
    assert_eq!(deck.heading, vec!["Solid block under self weight"]);
    assert_eq!(deck.steps.len(), 1);
    let step = &deck.steps[0];

    assert!(matches!(
        &step.procedure,
        Some(Procedure::Static { solver: Some(s), .. }) if s == "SPOOLES"
    ));

    let boundary = &step.boundaries[0];
    assert_eq!(boundary.target, Target::Set("Internal_Selection-1_Fixed-1".to_string()));
    assert_eq!((boundary.first_dof, boundary.last_dof), (1, 3));
    assert_eq!(boundary.value, 0.0);

    match &step.loads[0] {
        Load::Distributed {
            target,
            kind,
            magnitude,
            direction,
            ..
        } => {
            assert_eq!(target, &Target::Set("Eall".to_string()));
            assert_eq!(kind, &DloadKind::Gravity);
            assert_relative_eq!(*magnitude, 9810.0);
            assert_eq!(direction, &vec![0.0, 0.0, -1.0]);
        }
        other => panic!("expected gravity load, got {:?}", other),
    }

    let kinds: Vec<OutputKind> = step.outputs.iter().map(|o| o.kind).collect();
    assert_eq!(kinds, vec![OutputKind::NodeFile, OutputKind::ElFile, OutputKind::NodePrint]);
    assert_eq!(step.outputs[1].variables, vec!["S", "E"]);
}

#[test]
fn block_deck_is_clean() {
    let report = validate(&load());
    assert!(report.is_valid(), "{:?}", report.issues);
    assert_eq!(report.warning_count, 0, "{:?}", report.issues);
}

#[test]
fn summary_of_block() {
    let summary = summarize(&load());
    assert_eq!(summary.nodes, 8);
    assert_eq!(summary.element_types.get("C3D8"), Some(&1));
    assert_eq!(summary.bounding_box.unwrap().extent(), [10.0, 10.0, 10.0]);
    assert_eq!(summary.materials, vec!["SolidMaterial"]);
}

#[test]
fn normalized_deck_reads_back_the_same_model() {
    let deck = load();
    let text = write_deck(&deck);
    let again = read_str(&text, &ReaderOptions { strict: true }).unwrap();

    assert_eq!(again.nodes, deck.nodes);
    assert_eq!(again.elements, deck.elements);
    assert_eq!(again.node_sets, deck.node_sets);
    assert_eq!(again.element_sets, deck.element_sets);
    assert_eq!(again.materials, deck.materials);
    assert_eq!(again.sections, deck.sections);
    assert_eq!(again.steps.len(), 1);
    assert_eq!(again.steps[0].procedure, deck.steps[0].procedure);
    assert_eq!(write_deck(&again), text);
}

#[test]
fn missing_node_is_reported_everywhere_it_is_used() {
    let text = std::fs::read_to_string(fixture()).unwrap();
    let broken = text.replace(
        "8, 0.000000000000e+00, 1.000000000000e+01, 0.000000000000e+00\n",
        "",
    );
    assert_ne!(text, broken);

    let deck = read_str(&broken, &ReaderOptions::default()).unwrap();
    let report = validate(&deck);
    assert!(!report.is_valid());
    let dangling: Vec<&Issue> = report
        .errors()
        .filter(|i| i.kind == IssueKind::DanglingNode)
        .collect();
    // Nall only collects nodes that were actually read
    assert_eq!(dangling.len(), 2);
    assert!(dangling.iter().any(|i| i.message.contains("element 1")));
    assert!(dangling
        .iter()
        .any(|i| i.message.contains("Internal_Selection-1_Fixed-1")));
}
