//! Renders a [`Deck`] back to normalized keyword text.

use crate::model::{
    Boundary, Deck, Element, ElementType, IdSet, Increments, KeptOption, Load, Material, OutputRequest, Procedure,
    PropertyRow, Section, Step, UnsupportedBlock,
};

/// Maximum number of fields CalculiX reads from one data line
const FIELDS_PER_LINE: usize = 16;

pub struct DeckWriter;

impl DeckWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write(&self, deck: &Deck) -> String {
        let mut inp = String::new();

        // 1. Header
        inp.push_str("** written by ccx-deck\n");
        if !deck.heading.is_empty() {
            inp.push_str("*HEADING\n");
            for line in &deck.heading {
                inp.push_str(line);
                inp.push('\n');
            }
        }

        // 2. Nodes
        if !deck.nodes.is_empty() {
            inp.push_str("*NODE\n");
            for node in &deck.nodes {
                inp.push_str(&format!(
                    "{}, {}, {}, {}\n",
                    node.id,
                    fmt_f64(node.x),
                    fmt_f64(node.y),
                    fmt_f64(node.z)
                ));
            }
        }

        // 3. Elements, one block per type in order of first appearance
        let mut groups: Vec<(&ElementType, Vec<&Element>)> = Vec::new();
        for element in &deck.elements {
            match groups.iter_mut().find(|(kind, _)| **kind == element.kind) {
                Some((_, members)) => members.push(element),
                None => groups.push((&element.kind, vec![element])),
            }
        }
        for (kind, members) in groups {
            inp.push_str(&format!("*ELEMENT, TYPE={}\n", kind));
            for element in members {
                let mut fields = vec![element.id.to_string()];
                fields.extend(element.nodes.iter().map(|n| n.to_string()));
                push_wrapped(&mut inp, &fields);
            }
        }

        // 4. Sets
        for set in &deck.node_sets {
            write_set(&mut inp, "NSET", set);
        }
        for set in &deck.element_sets {
            write_set(&mut inp, "ELSET", set);
        }

        // 5. Materials
        for material in &deck.materials {
            write_material(&mut inp, material);
        }

        // 6. Sections
        for section in &deck.sections {
            write_section(&mut inp, section);
        }

        // 7. Model-level boundary conditions and pass-through blocks
        write_boundaries(&mut inp, &deck.boundaries);
        for block in &deck.unsupported {
            write_verbatim(&mut inp, block);
        }

        // 8. Steps
        for step in &deck.steps {
            write_step(&mut inp, step);
        }

        inp
    }
}

impl Default for DeckWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for `DeckWriter::new().write(deck)`
pub fn write_deck(deck: &Deck) -> String {
    DeckWriter::new().write(deck)
}

/// Shortest text that parses back to the same value; exponent form for very small or large magnitudes
fn fmt_f64(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e10).contains(&magnitude) {
        format!("{:e}", value)
    } else {
        format!("{}", value)
    }
}

/// Append `, OPTION` for every kept option
fn push_options(head: &mut String, options: &[KeptOption]) {
    for option in options {
        head.push_str(&format!(", {}", option));
    }
}

/// Start a `*KEYWORD` line carrying the given options
fn push_keyword(inp: &mut String, head: &str, options: &[KeptOption]) {
    let mut line = head.to_string();
    push_options(&mut line, options);
    inp.push_str(&line);
    inp.push('\n');
}

/// Write one record, continuing on following lines with a trailing comma
fn push_wrapped(inp: &mut String, fields: &[String]) {
    let mut chunks = fields.chunks(FIELDS_PER_LINE).peekable();
    while let Some(chunk) = chunks.next() {
        inp.push_str(&chunk.join(", "));
        if chunks.peek().is_some() {
            inp.push(',');
        }
        inp.push('\n');
    }
}

fn write_set(inp: &mut String, keyword: &str, set: &IdSet) {
    inp.push_str(&format!("*{}, {}={}\n", keyword, keyword, set.name));
    for chunk in set.ids.chunks(FIELDS_PER_LINE) {
        let line: Vec<String> = chunk.iter().map(|id| id.to_string()).collect();
        inp.push_str(&line.join(", "));
        inp.push('\n');
    }
}

fn write_rows(inp: &mut String, keyword: &str, rows: &[PropertyRow<f64>]) {
    if rows.is_empty() {
        return;
    }
    inp.push_str(&format!("*{}\n", keyword));
    for row in rows {
        match row.temperature {
            Some(t) => inp.push_str(&format!("{}, {}\n", fmt_f64(row.value), fmt_f64(t))),
            None => inp.push_str(&format!("{}\n", fmt_f64(row.value))),
        }
    }
}

fn write_material(inp: &mut String, material: &Material) {
    inp.push_str(&format!("*MATERIAL, NAME={}\n", material.name));
    if !material.elastic.is_empty() {
        inp.push_str("*ELASTIC\n");
        for row in &material.elastic {
            let mut line = format!("{}, {}", fmt_f64(row.value.young), fmt_f64(row.value.poisson));
            if let Some(t) = row.temperature {
                line.push_str(&format!(", {}", fmt_f64(t)));
            }
            inp.push_str(&line);
            inp.push('\n');
        }
    }
    write_rows(inp, "DENSITY", &material.density);
    write_rows(inp, "EXPANSION", &material.expansion);
    write_rows(inp, "CONDUCTIVITY", &material.conductivity);
    write_rows(inp, "SPECIFIC HEAT", &material.specific_heat);
    for block in &material.unsupported {
        write_verbatim(inp, block);
    }
}

fn write_section(inp: &mut String, section: &Section) {
    let head = format!("*{}, ELSET={}, MATERIAL={}", section.keyword(), section.elset(), section.material());
    match section {
        Section::Solid { options, .. } => push_keyword(inp, &head, options),
        Section::Shell {
            thickness, options, ..
        } => {
            push_keyword(inp, &head, options);
            inp.push_str(&format!("{}\n", fmt_f64(*thickness)));
        }
        Section::Beam {
            profile,
            dimensions,
            orientation,
            options,
            ..
        } => {
            push_keyword(inp, &format!("{}, SECTION={}", head, profile), options);
            let dims: Vec<String> = dimensions.iter().map(|d| fmt_f64(*d)).collect();
            inp.push_str(&dims.join(", "));
            inp.push('\n');
            if let Some([x, y, z]) = orientation {
                inp.push_str(&format!("{}, {}, {}\n", fmt_f64(*x), fmt_f64(*y), fmt_f64(*z)));
            }
        }
    }
}

fn increments_line(increments: &Increments) -> Option<String> {
    if increments.is_empty() {
        return None;
    }
    let mut fields: Vec<String> = [
        increments.initial,
        increments.period,
        increments.minimum,
        increments.maximum,
    ]
    .iter()
    .map(|v| v.map(fmt_f64).unwrap_or_default())
    .collect();
    while fields.last().map_or(false, |f| f.is_empty()) {
        fields.pop();
    }
    Some(fields.join(", "))
}

fn write_procedure(inp: &mut String, procedure: &Procedure, options: &[KeptOption]) {
    let mut head = format!("*{}", procedure.name());
    let data = match procedure {
        Procedure::Static { solver, increments } => {
            if let Some(solver) = solver {
                head.push_str(&format!(", SOLVER={}", solver));
            }
            increments_line(increments)
        }
        Procedure::Frequency { solver, modes } => {
            if let Some(solver) = solver {
                head.push_str(&format!(", SOLVER={}", solver));
            }
            modes.map(|m| m.to_string())
        }
        Procedure::HeatTransfer {
            steady_state,
            increments,
        } => {
            if *steady_state {
                head.push_str(", STEADY STATE");
            }
            increments_line(increments)
        }
    };
    push_keyword(inp, &head, options);
    if let Some(line) = data {
        inp.push_str(&line);
        inp.push('\n');
    }
}

fn write_output(inp: &mut String, output: &OutputRequest) {
    let set_option = if output.kind.addresses_nodes() { "NSET" } else { "ELSET" };
    let mut head = format!("*{}", output.kind.keyword());
    if let Some(set) = &output.set {
        head.push_str(&format!(", {}={}", set_option, set));
    }
    push_keyword(inp, &head, &output.options);
    if !output.variables.is_empty() {
        inp.push_str(&output.variables.join(", "));
        inp.push('\n');
    }
}

/// One `*BOUNDARY` block per run of records sharing the same options
fn write_boundaries(inp: &mut String, boundaries: &[Boundary]) {
    let mut current: Option<&[KeptOption]> = None;
    for boundary in boundaries {
        if current != Some(boundary.options.as_slice()) {
            push_keyword(inp, "*BOUNDARY", &boundary.options);
            current = Some(boundary.options.as_slice());
        }
        inp.push_str(&format!(
            "{}, {}, {}, {}\n",
            boundary.target,
            boundary.first_dof,
            boundary.last_dof,
            fmt_f64(boundary.value)
        ));
    }
}

/// `*CLOAD` records first, then `*DLOAD`; a new block starts whenever the options change
fn write_loads(inp: &mut String, loads: &[Load]) {
    let concentrated = loads.iter().filter(|l| matches!(l, Load::Concentrated { .. }));
    let distributed = loads.iter().filter(|l| matches!(l, Load::Distributed { .. }));

    let mut current: Option<(&str, &[KeptOption])> = None;
    for load in concentrated.chain(distributed) {
        let key = (load.keyword(), load.options());
        if current != Some(key) {
            push_keyword(inp, &format!("*{}", load.keyword()), load.options());
            current = Some(key);
        }
        match load {
            Load::Concentrated {
                target, dof, magnitude, ..
            } => {
                inp.push_str(&format!("{}, {}, {}\n", target, dof, fmt_f64(*magnitude)));
            }
            Load::Distributed {
                target,
                kind,
                magnitude,
                direction,
                ..
            } => {
                let mut fields = vec![target.to_string(), kind.tag(), fmt_f64(*magnitude)];
                fields.extend(direction.iter().map(|c| fmt_f64(*c)));
                inp.push_str(&fields.join(", "));
                inp.push('\n');
            }
        }
    }
}

fn write_step(inp: &mut String, step: &Step) {
    let mut head = String::from("*STEP");
    if step.nlgeom {
        head.push_str(", NLGEOM");
    }
    if let Some(name) = &step.name {
        head.push_str(&format!(", NAME={}", name));
    }
    push_keyword(inp, &head, &step.options);

    if let Some(procedure) = &step.procedure {
        write_procedure(inp, procedure, &step.procedure_options);
    }

    write_boundaries(inp, &step.boundaries);
    write_loads(inp, &step.loads);

    for output in &step.outputs {
        write_output(inp, output);
    }
    for block in &step.unsupported {
        write_verbatim(inp, block);
    }
    inp.push_str("*END STEP\n");
}

fn write_verbatim(inp: &mut String, block: &UnsupportedBlock) {
    for line in &block.lines {
        inp.push_str(line);
        inp.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, Target};
    use crate::reader::{read_str, ReaderOptions};

    #[test]
    fn floats_keep_full_precision() {
        assert_eq!(fmt_f64(210000.0), "210000");
        assert_eq!(fmt_f64(0.3), "0.3");
        assert_eq!(fmt_f64(7.9e-9), "7.9e-9");
        assert_eq!(fmt_f64(0.0), "0");
        assert_eq!(fmt_f64(-1.5e12), "-1.5e12");
    }

    #[test]
    fn long_records_wrap_with_trailing_comma() {
        let mut inp = String::new();
        let fields: Vec<String> = (1..=21).map(|i| i.to_string()).collect();
        push_wrapped(&mut inp, &fields);
        let lines: Vec<&str> = inp.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("16,"));
        assert_eq!(lines[1], "17, 18, 19, 20, 21");
    }

    #[test]
    fn writes_model_boundaries_before_steps() {
        let mut deck = Deck::new();
        deck.add_node(Node::new(1, 0.0, 0.0, 0.0));
        deck.boundaries.push(crate::model::Boundary {
            target: Target::Id(1),
            first_dof: 1,
            last_dof: 3,
            value: 0.0,
            options: Vec::new(),
            at: crate::error::Location::new("t".into(), 1),
        });
        let text = write_deck(&deck);
        assert!(text.contains("*BOUNDARY\n1, 1, 3, 0\n"));
    }

    #[test]
    fn uninterpreted_options_are_written_back() {
        let source = "*NODE\n1,0,0,0\n2,1,0,0\n\
            *ELEMENT, TYPE=T3D2, ELSET=Eall\n1, 1, 2\n\
            *MATERIAL, NAME=Steel\n*ELASTIC\n210000, 0.3\n\
            *SOLID SECTION, ELSET=Eall, MATERIAL=Steel, ORIENTATION=Ori\n\
            *STEP, INC=1000\n*STATIC, DIRECT\n0.1, 1\n\
            *BOUNDARY, OP=NEW\n1, 1, 3\n*BOUNDARY\n2, 2, 3\n\
            *CLOAD, AMPLITUDE=Ramp\n2, 1, 10.0\n*CLOAD\n2, 2, 5.0\n\
            *NODE FILE, OUTPUT=3D\nU\n*END STEP\n";
        let options = ReaderOptions::default();
        let text = write_deck(&read_str(source, &options).unwrap());

        assert!(text.contains("*SOLID SECTION, ELSET=Eall, MATERIAL=Steel, ORIENTATION=Ori\n"));
        assert!(text.contains("*STEP, INC=1000\n*STATIC, DIRECT\n0.1, 1\n"));
        assert!(text.contains("*BOUNDARY, OP=NEW\n1, 1, 3, 0\n*BOUNDARY\n2, 2, 3, 0\n"));
        assert!(text.contains("*CLOAD, AMPLITUDE=Ramp\n2, 1, 10\n*CLOAD\n2, 2, 5\n"));
        assert!(text.contains("*NODE FILE, OUTPUT=3D\nU\n"));
        assert_eq!(write_deck(&read_str(&text, &options).unwrap()), text);
    }

    #[test]
    fn shell_beam_and_heat_transfer() {
        let source = "*MATERIAL, NAME=Al\n*ELASTIC\n70000, 0.33\n\
            *SHELL SECTION, ELSET=Plate, MATERIAL=Al\n2.5\n\
            *BEAM SECTION, ELSET=Frame, MATERIAL=Al, SECTION=RECT\n10, 20\n0, 0, 1\n\
            *STEP\n*HEAT TRANSFER, STEADY STATE\n1, 1\n*END STEP\n";
        let text = write_deck(&read_str(source, &ReaderOptions::default()).unwrap());
        assert!(text.contains("*SHELL SECTION, ELSET=Plate, MATERIAL=Al\n2.5\n"));
        assert!(text.contains("*BEAM SECTION, ELSET=Frame, MATERIAL=Al, SECTION=RECT\n10, 20\n0, 0, 1\n"));
        assert!(text.contains("*HEAT TRANSFER, STEADY STATE\n1, 1\n"));
    }

    #[test]
    fn output_is_stable_under_rereading() {
        let source = "*HEADING\nblock under gravity\n\
            *NODE, NSET=Nall\n1,0,0,0\n2,1,0,0\n3,0,1,0\n4,0,0,1\n\
            *ELEMENT, TYPE=C3D4, ELSET=Eall\n1, 1, 2, 3, 4\n\
            *MATERIAL, NAME=Al\n*ELASTIC\n70000, 0.33\n*DENSITY\n2.7e-9\n*PLASTIC\n100, 0\n\
            *SOLID SECTION, ELSET=Eall, MATERIAL=Al\n\
            *STEP, NAME=Load\n*STATIC\n0.5, 1\n*BOUNDARY\nNall, 1, 1\n\
            *DLOAD\nEall, GRAV, 9810, 0, 0, -1\n*CLOAD\n4, 3, -1.0\n*EL FILE\nS\n*END STEP\n";
        let options = ReaderOptions::default();
        let first = write_deck(&read_str(source, &options).unwrap());
        let second = write_deck(&read_str(&first, &options).unwrap());
        assert_eq!(first, second);
        assert!(first.contains("*PLASTIC\n100, 0\n"));
        assert!(first.contains("*STEP, NAME=Load\n*STATIC\n0.5, 1\n"));
    }
}
