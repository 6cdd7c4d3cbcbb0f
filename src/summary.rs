//! Counts and extents of a deck, for quick inspection

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::Deck;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    pub fn extent(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub name: Option<String>,
    pub procedure: Option<&'static str>,
    pub boundaries: usize,
    pub loads: usize,
    pub outputs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeckSummary {
    pub nodes: usize,
    pub elements: usize,
    pub element_types: BTreeMap<String, usize>,
    pub node_sets: usize,
    pub element_sets: usize,
    pub materials: Vec<String>,
    pub sections: usize,
    pub bounding_box: Option<BoundingBox>,
    pub steps: Vec<StepSummary>,
    pub unsupported_keywords: Vec<String>,
}

impl DeckSummary {
    pub fn format(&self) -> String {
        let mut out = format!(
            "Deck: {} nodes, {} elements, {} node sets, {} element sets, {} sections\n",
            self.nodes, self.elements, self.node_sets, self.element_sets, self.sections
        );
        for (kind, count) in &self.element_types {
            out.push_str(&format!("  {:<8} {}\n", kind, count));
        }
        if let Some(bbox) = &self.bounding_box {
            let [dx, dy, dz] = bbox.extent();
            out.push_str(&format!("  extent   {} x {} x {}\n", dx, dy, dz));
        }
        for step in &self.steps {
            out.push_str(&format!(
                "  step {}: {} ({} boundaries, {} loads, {} outputs)\n",
                step.name.as_deref().unwrap_or("-"),
                step.procedure.unwrap_or("no procedure"),
                step.boundaries,
                step.loads,
                step.outputs
            ));
        }
        out
    }
}

pub fn summarize(deck: &Deck) -> DeckSummary {
    let mut element_types = BTreeMap::new();
    for element in &deck.elements {
        *element_types.entry(element.kind.to_string()).or_insert(0) += 1;
    }

    let bounding_box = deck.nodes.first().map(|first| {
        let mut bbox = BoundingBox {
            min: first.coords(),
            max: first.coords(),
        };
        for node in &deck.nodes[1..] {
            for (axis, value) in node.coords().into_iter().enumerate() {
                bbox.min[axis] = bbox.min[axis].min(value);
                bbox.max[axis] = bbox.max[axis].max(value);
            }
        }
        bbox
    });

    let unsupported_keywords = deck
        .unsupported
        .iter()
        .chain(deck.materials.iter().flat_map(|m| m.unsupported.iter()))
        .chain(deck.steps.iter().flat_map(|s| s.unsupported.iter()))
        .map(|block| block.keyword.clone())
        .collect();

    DeckSummary {
        nodes: deck.nodes.len(),
        elements: deck.elements.len(),
        element_types,
        node_sets: deck.node_sets.len(),
        element_sets: deck.element_sets.len(),
        materials: deck.materials.iter().map(|m| m.name.clone()).collect(),
        sections: deck.sections.len(),
        bounding_box,
        steps: deck
            .steps
            .iter()
            .map(|step| StepSummary {
                name: step.name.clone(),
                procedure: step.procedure.as_ref().map(|p| p.name()),
                boundaries: step.boundaries.len(),
                loads: step.loads.len(),
                outputs: step.outputs.len(),
            })
            .collect(),
        unsupported_keywords,
    }
}
