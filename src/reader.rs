//! Builds a [`Deck`] from keyword blocks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{DeckError, DeckResult, Location};
use crate::lexer::{lex, KeywordLine, Line, LineKind};
use crate::model::{
    Boundary, Deck, DloadKind, Element, ElementType, IgnoredOption, Increments, Isotropic, KeptOption, Load,
    Material, Node, OutputKind, OutputRequest, Procedure, PropertyRow, Section, Step, Target, UnsupportedBlock,
};

/// Maximum nesting of `*INCLUDE` files
pub const MAX_INCLUDE_DEPTH: usize = 8;

/// Records of known element types wrap after this many fields per line
const FIELDS_PER_LINE: usize = 16;

#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    /// Reject keywords and keyword options the reader does not interpret
    /// instead of keeping them verbatim
    pub strict: bool,
}

/// Read a deck held in memory. `*INCLUDE` is refused since there is no base directory.
pub fn read_str(text: &str, options: &ReaderOptions) -> DeckResult<Deck> {
    let lines = lex(text, Arc::from("<input>"))?;
    DeckReader::new(options).run(&lines)
}

/// Read a deck from disk, expanding `*INCLUDE, INPUT=...` relative to the including file
pub fn read_path(path: &Path, options: &ReaderOptions) -> DeckResult<Deck> {
    tracing::info!("Reading deck {:?}", path);
    let lines = load_with_includes(path, 0)?;
    DeckReader::new(options).run(&lines)
}

fn load_with_includes(path: &Path, depth: usize) -> DeckResult<Vec<Line>> {
    let text = std::fs::read_to_string(path).map_err(|source| DeckError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    expand_includes(path, &text, depth)
}

fn expand_includes(path: &Path, text: &str, depth: usize) -> DeckResult<Vec<Line>> {
    let source: Arc<str> = Arc::from(path.display().to_string());
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut out = Vec::new();
    for line in lex(text, source)? {
        match &line.kind {
            LineKind::Keyword(kw) if kw.name == "INCLUDE" => {
                if depth + 1 > MAX_INCLUDE_DEPTH {
                    return Err(DeckError::IncludeDepth {
                        at: line.at.clone(),
                        limit: MAX_INCLUDE_DEPTH,
                    });
                }
                let input = kw.require("INPUT", &line.at)?;
                let target: PathBuf = base.join(input);
                tracing::debug!("Including {:?} from {}", target, line.at);
                let included = std::fs::read_to_string(&target).map_err(|source| DeckError::Include {
                    at: line.at.clone(),
                    path: target.clone(),
                    source,
                })?;
                out.extend(expand_includes(&target, &included, depth + 1)?);
            }
            _ => out.push(line),
        }
    }
    Ok(out)
}

/// A keyword line with the data lines that follow it
struct Block<'a> {
    keyword: &'a KeywordLine,
    head: &'a Line,
    data: Vec<&'a Line>,
}

impl<'a> Block<'a> {
    fn at(&self) -> &'a Location {
        &self.head.at
    }

    fn records(&self) -> impl Iterator<Item = (&'a Location, &'a [String])> + '_ {
        self.data.iter().copied().filter_map(|line: &'a Line| match &line.kind {
            LineKind::Data { fields, .. } => Some((&line.at, fields.as_slice())),
            LineKind::Keyword(_) => None,
        })
    }

    fn verbatim(&self) -> UnsupportedBlock {
        let mut lines = vec![self.head.raw.clone()];
        lines.extend(self.data.iter().map(|l| l.raw.clone()));
        UnsupportedBlock {
            keyword: self.keyword.name.clone(),
            lines,
            at: self.head.at.clone(),
        }
    }
}

fn group_blocks(lines: &[Line]) -> DeckResult<Vec<Block<'_>>> {
    let mut blocks: Vec<Block<'_>> = Vec::new();
    for line in lines {
        match &line.kind {
            LineKind::Keyword(keyword) => blocks.push(Block {
                keyword,
                head: line,
                data: Vec::new(),
            }),
            LineKind::Data { .. } => match blocks.last_mut() {
                Some(block) => block.data.push(line),
                None => {
                    return Err(DeckError::Syntax {
                        at: line.at.clone(),
                        message: "data line before any keyword".to_string(),
                    })
                }
            },
        }
    }
    Ok(blocks)
}

const MODEL_KEYWORDS: &[&str] = &[
    "HEADING",
    "NODE",
    "ELEMENT",
    "NSET",
    "ELSET",
    "MATERIAL",
    "SOLID SECTION",
    "SHELL SECTION",
    "BEAM SECTION",
];

const MATERIAL_KEYWORDS: &[&str] = &["DENSITY", "ELASTIC", "EXPANSION", "CONDUCTIVITY", "SPECIFIC HEAT"];

struct DeckReader<'o> {
    options: &'o ReaderOptions,
    deck: Deck,
    step: Option<Step>,
    material: Option<Material>,
}

impl<'o> DeckReader<'o> {
    fn new(options: &'o ReaderOptions) -> Self {
        Self {
            options,
            deck: Deck::new(),
            step: None,
            material: None,
        }
    }

    fn run(mut self, lines: &[Line]) -> DeckResult<Deck> {
        for block in group_blocks(lines)? {
            self.block(&block)?;
        }
        self.close_material();
        if let Some(step) = self.step.take() {
            return Err(DeckError::UnterminatedStep { at: step.at });
        }

        tracing::info!(
            "Deck read: {} nodes, {} elements, {} materials, {} steps",
            self.deck.nodes.len(),
            self.deck.elements.len(),
            self.deck.materials.len(),
            self.deck.steps.len()
        );
        Ok(self.deck)
    }

    fn block(&mut self, block: &Block<'_>) -> DeckResult<()> {
        let name = block.keyword.name.as_str();
        tracing::debug!("*{} at {} ({} data lines)", name, block.at(), block.data.len());

        let is_material_keyword = MATERIAL_KEYWORDS.contains(&name);
        let is_known = is_material_keyword
            || MODEL_KEYWORDS.contains(&name)
            || OutputKind::from_keyword(name).is_some()
            || matches!(
                name,
                "BOUNDARY" | "STEP" | "END STEP" | "STATIC" | "FREQUENCY" | "HEAT TRANSFER" | "CLOAD" | "DLOAD" | "INCLUDE"
            );
        if is_known && !is_material_keyword {
            self.close_material();
        }
        if MODEL_KEYWORDS.contains(&name) && self.step.is_some() {
            return Err(misplaced(block, "inside *STEP"));
        }

        match name {
            "HEADING" => {
                self.deck
                    .heading
                    .extend(block.data.iter().map(|line| line.raw.trim().to_string()));
                Ok(())
            }
            "NODE" => self.nodes(block),
            "ELEMENT" => self.elements(block),
            "NSET" => self.set(block, true),
            "ELSET" => self.set(block, false),
            "MATERIAL" => {
                let material_name = block.keyword.require("NAME", block.at())?;
                if self.deck.material(material_name).is_some() {
                    return Err(DeckError::DuplicateName {
                        at: block.at().clone(),
                        kind: "material",
                        name: material_name.to_string(),
                    });
                }
                self.ignore_options(block, &["NAME"])?;
                self.material = Some(Material::new(material_name));
                Ok(())
            }
            "DENSITY" | "ELASTIC" | "EXPANSION" | "CONDUCTIVITY" | "SPECIFIC HEAT" => self.property(block),
            "SOLID SECTION" | "SHELL SECTION" | "BEAM SECTION" => self.section(block),
            "BOUNDARY" => self.boundary(block),
            "STEP" => {
                if self.step.is_some() {
                    return Err(misplaced(block, "inside another *STEP"));
                }
                let mut step = Step::new(block.at().clone());
                step.options = self.keep_options(block, &["NAME", "NLGEOM"])?;
                step.name = block.keyword.option("NAME").map(str::to_string);
                step.nlgeom = match block.keyword.option("NLGEOM") {
                    Some(value) => !value.eq_ignore_ascii_case("NO"),
                    None => block.keyword.has("NLGEOM"),
                };
                self.step = Some(step);
                Ok(())
            }
            "END STEP" => match self.step.take() {
                Some(step) => {
                    tracing::debug!("Closed step opened at {}", step.at);
                    self.deck.steps.push(step);
                    Ok(())
                }
                None => Err(misplaced(block, "without an open *STEP")),
            },
            "STATIC" | "FREQUENCY" | "HEAT TRANSFER" => self.procedure(block),
            "CLOAD" | "DLOAD" => self.load(block),
            "INCLUDE" => Err(DeckError::IncludeUnavailable { at: block.at().clone() }),
            _ => match OutputKind::from_keyword(name) {
                Some(kind) => self.output(block, kind),
                None => self.unsupported(block),
            },
        }
    }

    fn close_material(&mut self) {
        if let Some(material) = self.material.take() {
            tracing::debug!("Material {} complete", material.name);
            let added = self.deck.add_material(material);
            debug_assert!(added, "material names are checked when *MATERIAL is read");
        }
    }

    fn unsupported(&mut self, block: &Block<'_>) -> DeckResult<()> {
        if self.options.strict {
            return Err(DeckError::UnsupportedKeyword {
                at: block.at().clone(),
                keyword: block.keyword.name.clone(),
            });
        }
        tracing::warn!("Keeping unsupported keyword *{} at {} verbatim", block.keyword.name, block.at());
        let kept = block.verbatim();
        if let Some(material) = self.material.as_mut() {
            material.unsupported.push(kept);
        } else if let Some(step) = self.step.as_mut() {
            step.unsupported.push(kept);
        } else {
            self.deck.unsupported.push(kept);
        }
        Ok(())
    }

    /// Options of `block` not listed in `known`; strict mode refuses them
    fn extra_options(&self, block: &Block<'_>, known: &[&str]) -> DeckResult<Vec<KeptOption>> {
        let extra: Vec<KeptOption> = block
            .keyword
            .options
            .iter()
            .filter(|(name, _)| !known.contains(&name.as_str()))
            .map(|(name, value)| KeptOption {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();
        if let Some(first) = extra.first().filter(|_| self.options.strict) {
            return Err(DeckError::UnsupportedOption {
                at: block.at().clone(),
                keyword: block.keyword.name.clone(),
                option: first.to_string(),
            });
        }
        Ok(extra)
    }

    /// Uninterpreted options that travel with the record and are written back
    fn keep_options(&self, block: &Block<'_>, known: &[&str]) -> DeckResult<Vec<KeptOption>> {
        let extra = self.extra_options(block, known)?;
        for option in &extra {
            tracing::warn!("Keeping option {} of *{} at {} uninterpreted", option, block.keyword.name, block.at());
        }
        Ok(extra)
    }

    /// Uninterpreted options on keywords whose data is flattened into the deck
    fn ignore_options(&mut self, block: &Block<'_>, known: &[&str]) -> DeckResult<()> {
        for option in self.extra_options(block, known)? {
            tracing::warn!("Ignoring option {} of *{} at {}", option, block.keyword.name, block.at());
            self.deck.ignored_options.push(IgnoredOption {
                keyword: block.keyword.name.clone(),
                option,
                at: block.at().clone(),
            });
        }
        Ok(())
    }

    fn nodes(&mut self, block: &Block<'_>) -> DeckResult<()> {
        self.ignore_options(block, &["NSET"])?;
        let nset = block.keyword.option("NSET").map(str::to_string);
        for (at, fields) in block.records() {
            expect_fields(fields, 2, 4, at)?;
            let id = parse_id(&fields[0], at)?;
            let coord = |i: usize| -> DeckResult<f64> { Ok(opt_f64(fields, i, at)?.unwrap_or(0.0)) };
            let node = Node::new(id, coord(1)?, coord(2)?, coord(3)?);
            if !self.deck.add_node(node) {
                return Err(DeckError::DuplicateId {
                    at: at.clone(),
                    kind: "node",
                    id,
                });
            }
            if let Some(name) = &nset {
                self.deck.node_set_mut(name).insert(id);
            }
        }
        Ok(())
    }

    fn elements(&mut self, block: &Block<'_>) -> DeckResult<()> {
        let kind = ElementType::parse(block.keyword.require("TYPE", block.at())?);
        let elset = block.keyword.option("ELSET").map(str::to_string);
        if let Some(name) = &elset {
            self.deck.element_set_mut(name);
        }
        self.ignore_options(block, &["TYPE", "ELSET"])?;
        let needed = kind.node_count().map(|n| n + 1);

        let lines: Vec<(&Location, &[String], bool)> = block
            .data
            .iter()
            .filter_map(|line| match &line.kind {
                LineKind::Data { fields, continued } => Some((&line.at, fields.as_slice(), *continued)),
                LineKind::Keyword(_) => None,
            })
            .collect();
        let present = |fields: &[String]| fields.iter().filter(|f| !f.is_empty()).count();

        let mut i = 0;
        while i < lines.len() {
            let (at, fields, mut continued) = lines[i];
            let mut record: Vec<String> = fields.iter().filter(|f| !f.is_empty()).cloned().collect();
            let mut full_line = fields.len() >= FIELDS_PER_LINE;
            i += 1;

            // A trailing comma always continues; a full line without one only
            // continues into a line that fits the remaining connectivity
            while let Some(&(_, next, next_continued)) = lines.get(i) {
                let more = match needed {
                    Some(needed) => {
                        record.len() < needed
                            && (continued || (full_line && record.len() + present(next) <= needed))
                    }
                    None => continued,
                };
                if !more {
                    break;
                }
                record.extend(next.iter().filter(|f| !f.is_empty()).cloned());
                continued = next_continued;
                full_line = next.len() >= FIELDS_PER_LINE;
                i += 1;
            }
            self.element_record(&kind, elset.as_deref(), at, &record)?;
        }
        Ok(())
    }

    fn element_record(
        &mut self,
        kind: &ElementType,
        elset: Option<&str>,
        at: &Location,
        fields: &[String],
    ) -> DeckResult<()> {
        expect_fields(fields, 2, usize::MAX, at)?;
        let id = parse_id(&fields[0], at)?;
        let nodes = fields[1..]
            .iter()
            .map(|f| parse_id(f, at))
            .collect::<DeckResult<Vec<_>>>()?;
        let element = Element {
            id,
            kind: kind.clone(),
            nodes,
        };
        if !self.deck.add_element(element) {
            return Err(DeckError::DuplicateId {
                at: at.clone(),
                kind: "element",
                id,
            });
        }
        if let Some(name) = elset {
            self.deck.element_set_mut(name).insert(id);
        }
        Ok(())
    }

    fn set(&mut self, block: &Block<'_>, of_nodes: bool) -> DeckResult<()> {
        let option = if of_nodes { "NSET" } else { "ELSET" };
        let name = block.keyword.require(option, block.at())?.to_string();
        let generate = block.keyword.has("GENERATE");
        self.ignore_options(block, &[option, "GENERATE"])?;

        let mut members = Vec::new();
        for (at, fields) in block.records() {
            if generate {
                expect_fields(fields, 2, 3, at)?;
                let start = parse_id(&fields[0], at)?;
                let end = parse_id(&fields[1], at)?;
                let step = match fields.get(2).filter(|f| !f.is_empty()) {
                    Some(f) => parse_id(f, at)?,
                    None => 1,
                };
                if step == 0 || end < start {
                    return Err(DeckError::Syntax {
                        at: at.clone(),
                        message: format!("invalid GENERATE range {}..{} step {}", start, end, step),
                    });
                }
                members.extend((start..=end).step_by(step));
                continue;
            }

            for field in fields.iter().filter(|f| !f.is_empty()) {
                match Target::parse(field) {
                    Target::Id(id) => members.push(id),
                    Target::Set(other) => {
                        let existing = if of_nodes {
                            self.deck.node_set(&other)
                        } else {
                            self.deck.element_set(&other)
                        };
                        match existing {
                            Some(set) => members.extend(set.ids.iter().copied()),
                            None => {
                                return Err(DeckError::UnknownSet {
                                    at: at.clone(),
                                    name: other,
                                })
                            }
                        }
                    }
                }
            }
        }

        let set = if of_nodes {
            self.deck.node_set_mut(&name)
        } else {
            self.deck.element_set_mut(&name)
        };
        for id in members {
            set.insert(id);
        }
        Ok(())
    }

    fn property(&mut self, block: &Block<'_>) -> DeckResult<()> {
        if self.material.is_none() {
            return Err(misplaced(block, "outside *MATERIAL"));
        }
        let name = block.keyword.name.as_str();
        if let Some(kind) = block.keyword.option("TYPE") {
            if !matches!(kind.to_uppercase().as_str(), "ISO" | "ISOTROPIC") {
                return self.unsupported(block);
            }
        }
        // Property tables with further options are kept whole so nothing is lost
        if !self.extra_options(block, &["TYPE"])?.is_empty() {
            return self.unsupported(block);
        }

        let mut rows = Vec::new();
        for (at, fields) in block.records() {
            let width = if name == "ELASTIC" { 2 } else { 1 };
            expect_fields(fields, width, width + 1, at)?;
            let values = fields[..width]
                .iter()
                .map(|f| parse_f64(f, at))
                .collect::<DeckResult<Vec<_>>>()?;
            rows.push((values, opt_f64(fields, width, at)?));
        }
        if rows.is_empty() {
            return Err(DeckError::Syntax {
                at: block.at().clone(),
                message: format!("*{} has no data", name),
            });
        }

        let Some(material) = self.material.as_mut() else {
            return Ok(());
        };
        for (values, temperature) in rows {
            match name {
                "ELASTIC" => material.elastic.push(PropertyRow {
                    value: Isotropic {
                        young: values[0],
                        poisson: values[1],
                    },
                    temperature,
                }),
                _ => {
                    let row = PropertyRow {
                        value: values[0],
                        temperature,
                    };
                    match name {
                        "DENSITY" => material.density.push(row),
                        "EXPANSION" => material.expansion.push(row),
                        "CONDUCTIVITY" => material.conductivity.push(row),
                        _ => material.specific_heat.push(row),
                    }
                }
            }
        }
        Ok(())
    }

    fn section(&mut self, block: &Block<'_>) -> DeckResult<()> {
        let at = block.at();
        let elset = block.keyword.require("ELSET", at)?.to_string();
        let material = block.keyword.require("MATERIAL", at)?.to_string();
        let mut records = block.records();

        let section = match block.keyword.name.as_str() {
            "SOLID SECTION" => Section::Solid {
                elset,
                material,
                options: self.keep_options(block, &["ELSET", "MATERIAL"])?,
            },
            "SHELL SECTION" => {
                let (line_at, fields) = records.next().ok_or_else(|| DeckError::Syntax {
                    at: at.clone(),
                    message: "*SHELL SECTION needs a thickness line".to_string(),
                })?;
                expect_fields(fields, 1, 2, line_at)?;
                Section::Shell {
                    elset,
                    material,
                    thickness: parse_f64(&fields[0], line_at)?,
                    options: self.keep_options(block, &["ELSET", "MATERIAL"])?,
                }
            }
            _ => {
                let profile = block.keyword.require("SECTION", at)?.to_uppercase();
                let (line_at, fields) = records.next().ok_or_else(|| DeckError::Syntax {
                    at: at.clone(),
                    message: "*BEAM SECTION needs a dimensions line".to_string(),
                })?;
                let dimensions = fields
                    .iter()
                    .filter(|f| !f.is_empty())
                    .map(|f| parse_f64(f, line_at))
                    .collect::<DeckResult<Vec<_>>>()?;
                let orientation = match records.next() {
                    Some((line_at, fields)) => {
                        expect_fields(fields, 3, 3, line_at)?;
                        Some([
                            parse_f64(&fields[0], line_at)?,
                            parse_f64(&fields[1], line_at)?,
                            parse_f64(&fields[2], line_at)?,
                        ])
                    }
                    None => None,
                };
                Section::Beam {
                    elset,
                    material,
                    profile,
                    dimensions,
                    orientation,
                    options: self.keep_options(block, &["ELSET", "MATERIAL", "SECTION"])?,
                }
            }
        };
        self.deck.sections.push(section);
        Ok(())
    }

    fn boundary(&mut self, block: &Block<'_>) -> DeckResult<()> {
        let options = self.keep_options(block, &[])?;
        let mut parsed = Vec::new();
        for (at, fields) in block.records() {
            expect_fields(fields, 2, 4, at)?;
            let first_dof = parse_dof(&fields[1], at)?;
            let last_dof = match fields.get(2).filter(|f| !f.is_empty()) {
                Some(f) => parse_dof(f, at)?,
                None => first_dof,
            };
            parsed.push(Boundary {
                target: Target::parse(&fields[0]),
                first_dof,
                last_dof,
                value: opt_f64(fields, 3, at)?.unwrap_or(0.0),
                options: options.clone(),
                at: at.clone(),
            });
        }
        match self.step.as_mut() {
            Some(step) => step.boundaries.extend(parsed),
            None => self.deck.boundaries.extend(parsed),
        }
        Ok(())
    }

    fn procedure(&mut self, block: &Block<'_>) -> DeckResult<()> {
        let keyword = block.keyword;
        let first = block.records().next();
        let known: &[&str] = if keyword.name == "HEAT TRANSFER" {
            &["STEADY STATE"]
        } else {
            &["SOLVER"]
        };
        let options = self.keep_options(block, known)?;
        let procedure = match keyword.name.as_str() {
            "STATIC" => Procedure::Static {
                solver: keyword.option("SOLVER").map(str::to_uppercase),
                increments: increments(first)?,
            },
            "FREQUENCY" => Procedure::Frequency {
                solver: keyword.option("SOLVER").map(str::to_uppercase),
                modes: match first.and_then(|(at, fields)| fields.first().filter(|f| !f.is_empty()).map(|f| (at, f))) {
                    Some((at, modes)) => Some(parse_id(modes, at)?),
                    None => None,
                },
            },
            _ => Procedure::HeatTransfer {
                steady_state: keyword.has("STEADY STATE"),
                increments: increments(first)?,
            },
        };

        let Some(step) = self.step.as_mut() else {
            return Err(misplaced(block, "outside *STEP"));
        };
        if step.procedure.is_some() {
            return Err(DeckError::Syntax {
                at: block.at().clone(),
                message: "step already has a procedure".to_string(),
            });
        }
        step.procedure = Some(procedure);
        step.procedure_options = options;
        Ok(())
    }

    fn load(&mut self, block: &Block<'_>) -> DeckResult<()> {
        let concentrated = block.keyword.name == "CLOAD";
        let options = self.keep_options(block, &[])?;
        let mut loads = Vec::new();
        for (at, fields) in block.records() {
            expect_fields(fields, 3, if concentrated { 3 } else { usize::MAX }, at)?;
            let target = Target::parse(&fields[0]);
            let load = if concentrated {
                Load::Concentrated {
                    target,
                    dof: parse_dof(&fields[1], at)?,
                    magnitude: parse_f64(&fields[2], at)?,
                    options: options.clone(),
                    at: at.clone(),
                }
            } else {
                Load::Distributed {
                    target,
                    kind: DloadKind::parse(&fields[1]),
                    magnitude: parse_f64(&fields[2], at)?,
                    direction: fields[3..]
                        .iter()
                        .filter(|f| !f.is_empty())
                        .map(|f| parse_f64(f, at))
                        .collect::<DeckResult<Vec<_>>>()?,
                    options: options.clone(),
                    at: at.clone(),
                }
            };
            loads.push(load);
        }

        let Some(step) = self.step.as_mut() else {
            return Err(misplaced(block, "outside *STEP"));
        };
        step.loads.extend(loads);
        Ok(())
    }

    fn output(&mut self, block: &Block<'_>, kind: OutputKind) -> DeckResult<()> {
        let set_option = if kind.addresses_nodes() { "NSET" } else { "ELSET" };
        let variables = block
            .records()
            .flat_map(|(_, fields)| fields.iter())
            .filter(|f| !f.is_empty())
            .map(|f| f.to_uppercase())
            .collect();
        let request = OutputRequest {
            kind,
            set: block.keyword.option(set_option).map(str::to_string),
            variables,
            options: self.keep_options(block, &[set_option])?,
            at: block.at().clone(),
        };

        let Some(step) = self.step.as_mut() else {
            return Err(misplaced(block, "outside *STEP"));
        };
        step.outputs.push(request);
        Ok(())
    }
}

fn misplaced(block: &Block<'_>, context: &'static str) -> DeckError {
    DeckError::Misplaced {
        at: block.at().clone(),
        keyword: block.keyword.name.clone(),
        context,
    }
}

fn increments(first: Option<(&Location, &[String])>) -> DeckResult<Increments> {
    let Some((at, fields)) = first else {
        return Ok(Increments::default());
    };
    expect_fields(fields, 1, 4, at)?;
    Ok(Increments {
        initial: opt_f64(fields, 0, at)?,
        period: opt_f64(fields, 1, at)?,
        minimum: opt_f64(fields, 2, at)?,
        maximum: opt_f64(fields, 3, at)?,
    })
}

fn expect_fields(fields: &[String], min: usize, max: usize, at: &Location) -> DeckResult<()> {
    let n = fields.len();
    if n < min || n > max || fields[0].is_empty() {
        let message = if max == usize::MAX {
            format!("expected at least {} fields, found {}", min, n)
        } else {
            format!("expected {} to {} fields, found {}", min, max, n)
        };
        return Err(DeckError::Syntax {
            at: at.clone(),
            message,
        });
    }
    Ok(())
}

pub(crate) fn parse_f64(field: &str, at: &Location) -> DeckResult<f64> {
    // Fortran style exponents (1.0D-3) are common in generated decks
    let normalized = field.trim().replace(['D', 'd'], "E");
    normalized.parse::<f64>().map_err(|_| DeckError::InvalidNumber {
        at: at.clone(),
        expected: "number",
        value: field.to_string(),
    })
}

fn opt_f64(fields: &[String], idx: usize, at: &Location) -> DeckResult<Option<f64>> {
    match fields.get(idx).map(|f| f.trim()) {
        Some(f) if !f.is_empty() => parse_f64(f, at).map(Some),
        _ => Ok(None),
    }
}

fn parse_id(field: &str, at: &Location) -> DeckResult<usize> {
    field.trim().parse::<usize>().map_err(|_| DeckError::InvalidNumber {
        at: at.clone(),
        expected: "id",
        value: field.to_string(),
    })
}

fn parse_dof(field: &str, at: &Location) -> DeckResult<u32> {
    field.trim().parse::<u32>().map_err(|_| DeckError::InvalidNumber {
        at: at.clone(),
        expected: "degree of freedom",
        value: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str) -> Deck {
        read_str(text, &ReaderOptions::default()).unwrap()
    }

    fn read_err(text: &str) -> DeckError {
        read_str(text, &ReaderOptions::default()).unwrap_err()
    }

    #[test]
    fn nodes_default_missing_coordinates() {
        let deck = read("*NODE, NSET=Nall\n1, 1.5\n2, 1.0, 2.0, 3.0D0\n");
        assert_eq!(deck.nodes.len(), 2);
        assert_eq!(deck.node(1).map(|n| n.coords()), Some([1.5, 0.0, 0.0]));
        assert_eq!(deck.node(2).map(|n| n.z), Some(3.0));
        assert_eq!(deck.node_set("NALL").map(|s| s.ids.clone()), Some(vec![1, 2]));
    }

    #[test]
    fn long_element_records_wrap() {
        let text = "*ELEMENT, TYPE=C3D20, ELSET=E\n\
                    1, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,\n\
                    16, 17, 18, 19, 20\n";
        let deck = read(text);
        assert_eq!(deck.elements.len(), 1);
        assert_eq!(deck.elements[0].nodes, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn generate_and_nested_sets() {
        let text = "*ELSET, ELSET=A, GENERATE\n1, 7, 3\n*ELSET, ELSET=B\nA, 9\n";
        let deck = read(text);
        assert_eq!(deck.element_set("b").map(|s| s.ids.clone()), Some(vec![1, 4, 7, 9]));
    }

    #[test]
    fn unknown_set_member_is_an_error() {
        let err = read_err("*NSET, NSET=B\nMissing\n");
        assert!(matches!(err, DeckError::UnknownSet { ref name, .. } if name == "Missing"));
    }

    #[test]
    fn duplicate_node_is_an_error() {
        let err = read_err("*NODE\n1, 0, 0, 0\n1, 1, 1, 1\n");
        assert!(matches!(err, DeckError::DuplicateId { id: 1, .. }));
        assert_eq!(err.location().map(|l| l.line), Some(3));
    }

    #[test]
    fn property_outside_material_is_misplaced() {
        let err = read_err("*NODE\n1,0,0,0\n*ELASTIC\n210000, 0.3\n");
        assert!(matches!(err, DeckError::Misplaced { .. }));
    }

    #[test]
    fn material_collects_properties_until_next_model_keyword() {
        let text = "*MATERIAL, NAME=Steel\n*ELASTIC\n210000, 0.3\n*DENSITY\n7.9e-9\n\
                    *PLASTIC\n235, 0\n*CONDUCTIVITY\n43, 20\n*NODE\n1,0,0,0\n";
        let deck = read(text);
        let steel = deck.material("STEEL").unwrap();
        assert_eq!(steel.elastic().map(|e| e.young), Some(210000.0));
        assert_eq!(steel.density(), Some(7.9e-9));
        assert_eq!(steel.conductivity[0].temperature, Some(20.0));
        assert!(deck.unsupported.is_empty());
        assert_eq!(steel.unsupported.len(), 1);
        assert_eq!(steel.unsupported[0].keyword, "PLASTIC");
        assert_eq!(steel.unsupported[0].lines, vec!["*PLASTIC", "235, 0"]);
    }

    #[test]
    fn step_lifecycle_errors() {
        assert!(matches!(
            read_err("*STEP\n*STATIC\n"),
            DeckError::UnterminatedStep { .. }
        ));
        assert!(matches!(
            read_err("*STEP\n*STEP\n"),
            DeckError::Misplaced { context: "inside another *STEP", .. }
        ));
        assert!(matches!(
            read_err("*END STEP\n"),
            DeckError::Misplaced { .. }
        ));
        assert!(matches!(
            read_err("*CLOAD\n1, 1, 10.0\n"),
            DeckError::Misplaced { context: "outside *STEP", .. }
        ));
        assert!(matches!(
            read_err("*STEP\n*NODE\n1,0,0,0\n*END STEP\n"),
            DeckError::Misplaced { context: "inside *STEP", .. }
        ));
    }

    #[test]
    fn step_contents() {
        let text = "*STEP, NLGEOM\n*STATIC, solver=spooles\n0.1, 1.0\n\
                    *BOUNDARY\nFixed, 1, 3\n7, 2\n\
                    *CLOAD\n3, 2, -100.0\n\
                    *DLOAD\nEall, GRAV, 9810, 0, 0, -1\n\
                    *NODE PRINT, NSET=Nall\nU, RF\n\
                    *END STEP\n";
        let deck = read(text);
        let step = &deck.steps[0];
        assert!(step.nlgeom);
        match &step.procedure {
            Some(Procedure::Static { solver, increments }) => {
                assert_eq!(solver.as_deref(), Some("SPOOLES"));
                assert_eq!(increments.initial, Some(0.1));
                assert_eq!(increments.maximum, None);
            }
            other => panic!("unexpected procedure {:?}", other),
        }
        assert_eq!(step.boundaries.len(), 2);
        assert_eq!((step.boundaries[1].first_dof, step.boundaries[1].last_dof), (2, 2));
        assert_eq!(step.loads.len(), 2);
        match &step.loads[1] {
            Load::Distributed { kind, magnitude, direction, .. } => {
                assert_eq!(*kind, DloadKind::Gravity);
                assert_eq!(*magnitude, 9810.0);
                assert_eq!(direction, &vec![0.0, 0.0, -1.0]);
            }
            other => panic!("unexpected load {:?}", other),
        }
        assert_eq!(step.outputs[0].variables, vec!["U", "RF"]);
        assert_eq!(step.outputs[0].set.as_deref(), Some("Nall"));
    }

    #[test]
    fn strict_mode_rejects_unknown_keywords() {
        let options = ReaderOptions { strict: true };
        let err = read_str("*AMPLITUDE, NAME=A1\n0, 0\n1, 1\n", &options).unwrap_err();
        assert!(matches!(err, DeckError::UnsupportedKeyword { .. }));
    }

    const WITH_OPTIONS: &str = "*NODE\n1,0,0,0\n2,1,0,0\n\
        *ELEMENT, TYPE=T3D2, ELSET=Eall\n1, 1, 2\n\
        *MATERIAL, NAME=Steel\n*ELASTIC\n210000, 0.3\n\
        *SOLID SECTION, ELSET=Eall, MATERIAL=Steel, ORIENTATION=Ori\n\
        *STEP, INC=1000\n*STATIC, DIRECT\n0.1, 1\n\
        *BOUNDARY, OP=NEW\n1, 1, 3\n*BOUNDARY\n2, 2, 3\n\
        *CLOAD, AMPLITUDE=Ramp\n2, 1, 10.0\n\
        *NODE FILE, OUTPUT=3D\nU\n*END STEP\n";

    fn kept(name: &str, value: Option<&str>) -> KeptOption {
        KeptOption {
            name: name.to_string(),
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn uninterpreted_options_travel_with_their_records() {
        let deck = read(WITH_OPTIONS);
        assert_eq!(deck.sections[0].options(), &[kept("ORIENTATION", Some("Ori"))]);

        let step = &deck.steps[0];
        assert_eq!(step.options, vec![kept("INC", Some("1000"))]);
        assert_eq!(step.procedure_options, vec![kept("DIRECT", None)]);
        assert_eq!(step.boundaries[0].options, vec![kept("OP", Some("NEW"))]);
        assert!(step.boundaries[1].options.is_empty());
        assert_eq!(step.loads[0].options(), &[kept("AMPLITUDE", Some("Ramp"))]);
        assert_eq!(step.outputs[0].options, vec![kept("OUTPUT", Some("3D"))]);
        assert!(deck.ignored_options.is_empty());
    }

    #[test]
    fn strict_mode_rejects_uninterpreted_options() {
        let err = read_str(WITH_OPTIONS, &ReaderOptions { strict: true }).unwrap_err();
        match err {
            DeckError::UnsupportedOption { keyword, option, at } => {
                assert_eq!(keyword, "SOLID SECTION");
                assert_eq!(option, "ORIENTATION=Ori");
                assert_eq!(at.line, 9);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn options_on_flattened_keywords_are_recorded_as_ignored() {
        let deck = read("*NODE, SYSTEM=C\n1, 1, 0, 0\n*NSET, NSET=A, UNSORTED\n1\n");
        let ignored: Vec<(String, String)> = deck
            .ignored_options
            .iter()
            .map(|i| (i.keyword.clone(), i.option.to_string()))
            .collect();
        assert_eq!(
            ignored,
            vec![
                ("NODE".to_string(), "SYSTEM=C".to_string()),
                ("NSET".to_string(), "UNSORTED".to_string())
            ]
        );

        let err = read_str("*NODE, SYSTEM=C\n1, 1, 0, 0\n", &ReaderOptions { strict: true }).unwrap_err();
        assert!(matches!(err, DeckError::UnsupportedOption { .. }));
    }

    #[test]
    fn material_names_must_be_unique() {
        let text = "*MATERIAL, NAME=Steel\n*DENSITY\n7.9e-9\n*ELASTIC\n210000, 0.3\n\
                    *MATERIAL, NAME=STEEL\n*ELASTIC\n70000, 0.3\n";
        match read_err(text) {
            DeckError::DuplicateName { kind, name, at } => {
                assert_eq!(kind, "material");
                assert_eq!(name, "STEEL");
                assert_eq!(at.line, 6);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn full_line_without_comma_does_not_swallow_next_record() {
        let text = "*ELEMENT, TYPE=C3D20\n\
                    1, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15\n\
                    2, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,\n\
                    16, 17, 18, 19, 20\n";
        let deck = read(text);
        let shapes: Vec<(usize, usize)> = deck.elements.iter().map(|e| (e.id, e.nodes.len())).collect();
        assert_eq!(shapes, vec![(1, 15), (2, 20)]);
    }

    #[test]
    fn full_line_continues_into_the_rest_of_its_record() {
        let text = "*ELEMENT, TYPE=C3D20\n\
                    1, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15\n\
                    16, 17, 18, 19, 20\n";
        let deck = read(text);
        assert_eq!(deck.elements.len(), 1);
        assert_eq!(deck.elements[0].nodes, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn shell_and_beam_sections() {
        let text = "*MATERIAL, NAME=Al\n*ELASTIC\n70000, 0.33\n\
                    *SHELL SECTION, ELSET=Plate, MATERIAL=Al\n2.5\n\
                    *BEAM SECTION, ELSET=Frame, MATERIAL=Al, SECTION=rect\n10, 20\n0, 0, 1\n";
        let deck = read(text);
        assert_eq!(
            deck.sections[0],
            Section::Shell {
                elset: "Plate".to_string(),
                material: "Al".to_string(),
                thickness: 2.5,
                options: Vec::new(),
            }
        );
        match &deck.sections[1] {
            Section::Beam {
                profile,
                dimensions,
                orientation,
                ..
            } => {
                assert_eq!(profile, "RECT");
                assert_eq!(dimensions, &vec![10.0, 20.0]);
                assert_eq!(orientation, &Some([0.0, 0.0, 1.0]));
            }
            other => panic!("unexpected section {:?}", other),
        }
    }

    #[test]
    fn shell_section_needs_thickness() {
        let err = read_err("*MATERIAL, NAME=Al\n*ELASTIC\n70000, 0.33\n*SHELL SECTION, ELSET=Plate, MATERIAL=Al\n");
        assert!(matches!(err, DeckError::Syntax { ref message, .. } if message.contains("thickness")));

        let err = read_err("*BEAM SECTION, ELSET=Frame, MATERIAL=Al\n10, 20\n");
        assert!(matches!(err, DeckError::MissingOption { option: "SECTION", .. }));
    }

    #[test]
    fn steady_state_heat_transfer() {
        let deck = read("*STEP\n*HEAT TRANSFER, STEADY STATE\n1, 1\n*END STEP\n");
        match &deck.steps[0].procedure {
            Some(Procedure::HeatTransfer {
                steady_state,
                increments,
            }) => {
                assert!(*steady_state);
                assert_eq!(increments.initial, Some(1.0));
                assert_eq!(increments.period, Some(1.0));
            }
            other => panic!("unexpected procedure {:?}", other),
        }
        assert!(deck.steps[0].procedure_options.is_empty());
    }

    #[test]
    fn anisotropic_elastic_is_kept_verbatim() {
        let text = "*MATERIAL, NAME=Wood\n*ELASTIC, TYPE=ENGINEERING CONSTANTS\n\
                    12000, 800, 800, 0.4, 0.4, 0.3, 700, 700,\n300\n";
        let deck = read(text);
        let wood = deck.material("wood").unwrap();
        assert!(wood.elastic.is_empty());
        assert_eq!(wood.unsupported.len(), 1);
        assert_eq!(wood.unsupported[0].keyword, "ELASTIC");
        assert_eq!(wood.unsupported[0].lines.len(), 3);

        let err = read_str(text, &ReaderOptions { strict: true }).unwrap_err();
        assert!(matches!(err, DeckError::UnsupportedKeyword { .. }));
    }

    #[test]
    fn include_needs_a_path_based_reader() {
        let err = read_err("*INCLUDE, INPUT=mesh.inp\n");
        assert!(matches!(err, DeckError::IncludeUnavailable { .. }));
    }

    #[test]
    fn data_before_keyword_is_rejected() {
        let err = read_err("1, 2, 3\n*NODE\n");
        assert!(matches!(err, DeckError::Syntax { .. }));
    }
}
