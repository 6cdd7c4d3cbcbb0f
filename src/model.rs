//! In-memory model of an input deck

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Location;

/// A node in the mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Node {
    pub fn new(id: usize, x: f64, y: f64, z: f64) -> Self {
        Self { id, x, y, z }
    }

    pub fn coords(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Element topology tag as written after `TYPE=`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementType {
    /// 4-node tetrahedron
    C3D4,
    /// 6-node wedge
    C3D6,
    /// 8-node hexahedron, full integration
    C3D8,
    /// 8-node hexahedron, reduced integration
    C3D8R,
    /// 8-node hexahedron, incompatible modes
    C3D8I,
    C3D10,
    C3D15,
    C3D20,
    C3D20R,
    S3,
    S4,
    S4R,
    S6,
    S8,
    S8R,
    B31,
    B32,
    T3D2,
    T3D3,
    /// A type this crate does not know the arity of
    Other(String),
}

impl ElementType {
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_uppercase().as_str() {
            "C3D4" => ElementType::C3D4,
            "C3D6" => ElementType::C3D6,
            "C3D8" => ElementType::C3D8,
            "C3D8R" => ElementType::C3D8R,
            "C3D8I" => ElementType::C3D8I,
            "C3D10" => ElementType::C3D10,
            "C3D15" => ElementType::C3D15,
            "C3D20" => ElementType::C3D20,
            "C3D20R" => ElementType::C3D20R,
            "S3" => ElementType::S3,
            "S4" => ElementType::S4,
            "S4R" => ElementType::S4R,
            "S6" => ElementType::S6,
            "S8" => ElementType::S8,
            "S8R" => ElementType::S8R,
            "B31" => ElementType::B31,
            "B32" => ElementType::B32,
            "T3D2" => ElementType::T3D2,
            "T3D3" => ElementType::T3D3,
            other => ElementType::Other(other.to_string()),
        }
    }

    /// Number of nodes in the connectivity, `None` for unknown types
    pub fn node_count(&self) -> Option<usize> {
        let n = match self {
            ElementType::T3D2 | ElementType::B31 => 2,
            ElementType::T3D3 | ElementType::B32 | ElementType::S3 => 3,
            ElementType::C3D4 | ElementType::S4 | ElementType::S4R => 4,
            ElementType::C3D6 | ElementType::S6 => 6,
            ElementType::C3D8
            | ElementType::C3D8R
            | ElementType::C3D8I
            | ElementType::S8
            | ElementType::S8R => 8,
            ElementType::C3D10 => 10,
            ElementType::C3D15 => 15,
            ElementType::C3D20 | ElementType::C3D20R => 20,
            ElementType::Other(_) => return None,
        };
        Some(n)
    }

    pub fn is_solid(&self) -> bool {
        matches!(
            self,
            ElementType::C3D4
                | ElementType::C3D6
                | ElementType::C3D8
                | ElementType::C3D8R
                | ElementType::C3D8I
                | ElementType::C3D10
                | ElementType::C3D15
                | ElementType::C3D20
                | ElementType::C3D20R
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            ElementType::C3D4 => "C3D4",
            ElementType::C3D6 => "C3D6",
            ElementType::C3D8 => "C3D8",
            ElementType::C3D8R => "C3D8R",
            ElementType::C3D8I => "C3D8I",
            ElementType::C3D10 => "C3D10",
            ElementType::C3D15 => "C3D15",
            ElementType::C3D20 => "C3D20",
            ElementType::C3D20R => "C3D20R",
            ElementType::S3 => "S3",
            ElementType::S4 => "S4",
            ElementType::S4R => "S4R",
            ElementType::S6 => "S6",
            ElementType::S8 => "S8",
            ElementType::S8R => "S8R",
            ElementType::B31 => "B31",
            ElementType::B32 => "B32",
            ElementType::T3D2 => "T3D2",
            ElementType::T3D3 => "T3D3",
            ElementType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ElementType {
    fn from(tag: String) -> Self {
        ElementType::parse(&tag)
    }
}

impl From<ElementType> for String {
    fn from(kind: ElementType) -> Self {
        kind.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: usize,
    pub kind: ElementType,
    pub nodes: Vec<usize>,
}

/// Named, ordered and duplicate-free collection of ids
#[derive(Debug, Clone, Serialize)]
pub struct IdSet {
    pub name: String,
    pub ids: Vec<usize>,
    #[serde(skip)]
    members: HashSet<usize>,
}

impl IdSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ids: Vec::new(),
            members: HashSet::new(),
        }
    }

    /// Append an id; repeated ids keep their first position
    pub fn insert(&mut self, id: usize) {
        if self.members.insert(id) {
            self.ids.push(id);
        }
    }

    pub fn contains(&self, id: usize) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl PartialEq for IdSet {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.ids == other.ids
    }
}

pub type NodeSet = IdSet;
pub type ElementSet = IdSet;

/// One row of a material property table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRow<T> {
    pub value: T,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Isotropic {
    pub young: f64,
    pub poisson: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub density: Vec<PropertyRow<f64>>,
    pub elastic: Vec<PropertyRow<Isotropic>>,
    pub expansion: Vec<PropertyRow<f64>>,
    pub conductivity: Vec<PropertyRow<f64>>,
    pub specific_heat: Vec<PropertyRow<f64>>,
    /// Property keywords this crate does not interpret, e.g. `*PLASTIC`
    pub unsupported: Vec<UnsupportedBlock>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            density: Vec::new(),
            elastic: Vec::new(),
            expansion: Vec::new(),
            conductivity: Vec::new(),
            specific_heat: Vec::new(),
            unsupported: Vec::new(),
        }
    }

    /// Density at the first (or only) temperature
    pub fn density(&self) -> Option<f64> {
        self.density.first().map(|row| row.value)
    }

    pub fn elastic(&self) -> Option<Isotropic> {
        self.elastic.first().map(|row| row.value)
    }
}

/// A keyword option read but not interpreted, e.g. `AMPLITUDE=Ramp`.
/// It is written back exactly where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeptOption {
    pub name: String,
    pub value: Option<String>,
}

impl fmt::Display for KeptOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

/// An option on a keyword whose data is flattened into the model (`*NODE`,
/// `*ELEMENT`, `*NSET`, `*ELSET`, `*MATERIAL`); it cannot be written back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoredOption {
    pub keyword: String,
    pub option: KeptOption,
    pub at: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Section {
    Solid {
        elset: String,
        material: String,
        #[serde(default)]
        options: Vec<KeptOption>,
    },
    Shell {
        elset: String,
        material: String,
        thickness: f64,
        #[serde(default)]
        options: Vec<KeptOption>,
    },
    Beam {
        elset: String,
        material: String,
        /// `SECTION=` value, e.g. RECT, CIRC, BOX
        profile: String,
        dimensions: Vec<f64>,
        orientation: Option<[f64; 3]>,
        #[serde(default)]
        options: Vec<KeptOption>,
    },
}

impl Section {
    pub fn elset(&self) -> &str {
        match self {
            Section::Solid { elset, .. } | Section::Shell { elset, .. } | Section::Beam { elset, .. } => elset,
        }
    }

    pub fn material(&self) -> &str {
        match self {
            Section::Solid { material, .. }
            | Section::Shell { material, .. }
            | Section::Beam { material, .. } => material,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Section::Solid { .. } => "SOLID SECTION",
            Section::Shell { .. } => "SHELL SECTION",
            Section::Beam { .. } => "BEAM SECTION",
        }
    }

    pub fn options(&self) -> &[KeptOption] {
        match self {
            Section::Solid { options, .. } | Section::Shell { options, .. } | Section::Beam { options, .. } => {
                options
            }
        }
    }
}

/// What a boundary, load or output record addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Id(usize),
    Set(String),
}

impl Target {
    pub fn parse(field: &str) -> Self {
        match field.trim().parse::<usize>() {
            Ok(id) => Target::Id(id),
            Err(_) => Target::Set(field.trim().to_string()),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Id(id) => write!(f, "{}", id),
            Target::Set(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub target: Target,
    pub first_dof: u32,
    pub last_dof: u32,
    pub value: f64,
    /// Options of the `*BOUNDARY` line this record came from, e.g. `OP=NEW`
    #[serde(default)]
    pub options: Vec<KeptOption>,
    pub at: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DloadKind {
    Gravity,
    /// `P` (face 0) or `P1`..`P6`
    Pressure(u8),
    Centrifugal,
    Other(String),
}

impl DloadKind {
    pub fn parse(tag: &str) -> Self {
        let upper = tag.trim().to_uppercase();
        match upper.as_str() {
            "GRAV" => DloadKind::Gravity,
            "CENTRIF" => DloadKind::Centrifugal,
            "P" => DloadKind::Pressure(0),
            _ => match upper.strip_prefix('P').and_then(|face| face.parse::<u8>().ok()) {
                Some(face) if (1..=6).contains(&face) => DloadKind::Pressure(face),
                _ => DloadKind::Other(upper),
            },
        }
    }

    pub fn tag(&self) -> String {
        match self {
            DloadKind::Gravity => "GRAV".to_string(),
            DloadKind::Centrifugal => "CENTRIF".to_string(),
            DloadKind::Pressure(0) => "P".to_string(),
            DloadKind::Pressure(face) => format!("P{}", face),
            DloadKind::Other(tag) => tag.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Load {
    Concentrated {
        target: Target,
        dof: u32,
        magnitude: f64,
        #[serde(default)]
        options: Vec<KeptOption>,
        at: Location,
    },
    Distributed {
        target: Target,
        kind: DloadKind,
        magnitude: f64,
        /// Components following the magnitude (gravity direction, rotation axis)
        direction: Vec<f64>,
        #[serde(default)]
        options: Vec<KeptOption>,
        at: Location,
    },
}

impl Load {
    /// Options of the `*CLOAD`/`*DLOAD` line, e.g. `AMPLITUDE=Ramp`
    pub fn options(&self) -> &[KeptOption] {
        match self {
            Load::Concentrated { options, .. } | Load::Distributed { options, .. } => options,
        }
    }

    pub fn at(&self) -> &Location {
        match self {
            Load::Concentrated { at, .. } | Load::Distributed { at, .. } => at,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Load::Concentrated { .. } => "CLOAD",
            Load::Distributed { .. } => "DLOAD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputKind {
    NodeFile,
    ElFile,
    NodePrint,
    ElPrint,
}

impl OutputKind {
    pub fn from_keyword(name: &str) -> Option<Self> {
        match name {
            "NODE FILE" => Some(OutputKind::NodeFile),
            "EL FILE" => Some(OutputKind::ElFile),
            "NODE PRINT" => Some(OutputKind::NodePrint),
            "EL PRINT" => Some(OutputKind::ElPrint),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            OutputKind::NodeFile => "NODE FILE",
            OutputKind::ElFile => "EL FILE",
            OutputKind::NodePrint => "NODE PRINT",
            OutputKind::ElPrint => "EL PRINT",
        }
    }

    /// Whether the set option names a node set (`NSET=`) or element set (`ELSET=`)
    pub fn addresses_nodes(&self) -> bool {
        matches!(self, OutputKind::NodeFile | OutputKind::NodePrint)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRequest {
    pub kind: OutputKind,
    pub set: Option<String>,
    pub variables: Vec<String>,
    #[serde(default)]
    pub options: Vec<KeptOption>,
    pub at: Location,
}

/// Incrementation controls from the data line of a procedure keyword
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Increments {
    pub initial: Option<f64>,
    pub period: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl Increments {
    pub fn is_empty(&self) -> bool {
        self.initial.is_none() && self.period.is_none() && self.minimum.is_none() && self.maximum.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Procedure {
    Static {
        solver: Option<String>,
        increments: Increments,
    },
    Frequency {
        solver: Option<String>,
        modes: Option<usize>,
    },
    HeatTransfer {
        steady_state: bool,
        increments: Increments,
    },
}

impl Procedure {
    pub fn name(&self) -> &'static str {
        match self {
            Procedure::Static { .. } => "STATIC",
            Procedure::Frequency { .. } => "FREQUENCY",
            Procedure::HeatTransfer { .. } => "HEAT TRANSFER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: Option<String>,
    pub nlgeom: bool,
    /// Further `*STEP` options such as `INC=1000`
    pub options: Vec<KeptOption>,
    pub procedure: Option<Procedure>,
    /// Further options of the procedure keyword such as `DIRECT`
    pub procedure_options: Vec<KeptOption>,
    pub boundaries: Vec<Boundary>,
    pub loads: Vec<Load>,
    pub outputs: Vec<OutputRequest>,
    pub unsupported: Vec<UnsupportedBlock>,
    pub at: Location,
}

impl Step {
    pub fn new(at: Location) -> Self {
        Self {
            name: None,
            nlgeom: false,
            options: Vec::new(),
            procedure: None,
            procedure_options: Vec::new(),
            boundaries: Vec::new(),
            loads: Vec::new(),
            outputs: Vec::new(),
            unsupported: Vec::new(),
            at,
        }
    }
}

/// A keyword block this crate does not interpret, kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsupportedBlock {
    pub keyword: String,
    pub lines: Vec<String>,
    pub at: Location,
}

/// A complete input deck
#[derive(Debug, Clone, Default, Serialize)]
pub struct Deck {
    pub heading: Vec<String>,
    pub nodes: Vec<Node>,
    pub elements: Vec<Element>,
    pub node_sets: Vec<NodeSet>,
    pub element_sets: Vec<ElementSet>,
    pub materials: Vec<Material>,
    pub sections: Vec<Section>,
    /// Boundary conditions given in the model data, before any step
    pub boundaries: Vec<Boundary>,
    pub steps: Vec<Step>,
    pub unsupported: Vec<UnsupportedBlock>,
    pub ignored_options: Vec<IgnoredOption>,

    #[serde(skip)]
    node_index: HashMap<usize, usize>,
    #[serde(skip)]
    element_index: HashMap<usize, usize>,
    #[serde(skip)]
    node_set_index: HashMap<String, usize>,
    #[serde(skip)]
    element_set_index: HashMap<String, usize>,
    #[serde(skip)]
    material_index: HashMap<String, usize>,
}

fn set_key(name: &str) -> String {
    name.trim().to_uppercase()
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; returns `false` when the id is already taken
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.node_index.contains_key(&node.id) {
            return false;
        }
        self.node_index.insert(node.id, self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Add an element; returns `false` when the id is already taken
    pub fn add_element(&mut self, element: Element) -> bool {
        if self.element_index.contains_key(&element.id) {
            return false;
        }
        self.element_index.insert(element.id, self.elements.len());
        self.elements.push(element);
        true
    }

    pub fn node(&self, id: usize) -> Option<&Node> {
        self.node_index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn element(&self, id: usize) -> Option<&Element> {
        self.element_index.get(&id).map(|&i| &self.elements[i])
    }

    pub fn has_node(&self, id: usize) -> bool {
        self.node_index.contains_key(&id)
    }

    pub fn has_element(&self, id: usize) -> bool {
        self.element_index.contains_key(&id)
    }

    /// Node set by case-insensitive name
    pub fn node_set(&self, name: &str) -> Option<&NodeSet> {
        self.node_set_index.get(&set_key(name)).map(|&i| &self.node_sets[i])
    }

    pub fn element_set(&self, name: &str) -> Option<&ElementSet> {
        self.element_set_index
            .get(&set_key(name))
            .map(|&i| &self.element_sets[i])
    }

    /// Node set with the given name, created empty on first use
    pub fn node_set_mut(&mut self, name: &str) -> &mut NodeSet {
        let idx = match self.node_set_index.get(&set_key(name)) {
            Some(&i) => i,
            None => {
                self.node_sets.push(IdSet::new(name.trim()));
                let i = self.node_sets.len() - 1;
                self.node_set_index.insert(set_key(name), i);
                i
            }
        };
        &mut self.node_sets[idx]
    }

    pub fn element_set_mut(&mut self, name: &str) -> &mut ElementSet {
        let idx = match self.element_set_index.get(&set_key(name)) {
            Some(&i) => i,
            None => {
                self.element_sets.push(IdSet::new(name.trim()));
                let i = self.element_sets.len() - 1;
                self.element_set_index.insert(set_key(name), i);
                i
            }
        };
        &mut self.element_sets[idx]
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.material_index.get(&set_key(name)).map(|&i| &self.materials[i])
    }

    /// Add a material; returns `false` when the name (ignoring case) is already taken
    pub fn add_material(&mut self, material: Material) -> bool {
        let key = set_key(&material.name);
        if self.material_index.contains_key(&key) {
            return false;
        }
        self.material_index.insert(key, self.materials.len());
        self.materials.push(material);
        true
    }

    /// Element ids addressed by a target, `None` if it names no known set
    pub fn elements_of(&self, target: &Target) -> Option<Vec<usize>> {
        match target {
            Target::Id(id) => Some(vec![*id]),
            Target::Set(name) => self.element_set(name).map(|set| set.ids.clone()),
        }
    }

    pub fn nodes_of(&self, target: &Target) -> Option<Vec<usize>> {
        match target {
            Target::Id(id) => Some(vec![*id]),
            Target::Set(name) => self.node_set(name).map(|set| set.ids.clone()),
        }
    }

    /// Material assigned to an element through a section
    pub fn material_of_element(&self, element_id: usize) -> Option<&Material> {
        self.sections.iter().find_map(|section| {
            let in_set = self
                .element_set(section.elset())
                .map_or(false, |set| set.contains(element_id));
            if in_set {
                self.material(section.material())
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_type_parsing() {
        assert_eq!(ElementType::parse("c3d8"), ElementType::C3D8);
        assert_eq!(ElementType::parse("C3D20R").node_count(), Some(20));
        assert_eq!(ElementType::parse("S4R").node_count(), Some(4));
        assert_eq!(
            ElementType::parse("DCOUP3D"),
            ElementType::Other("DCOUP3D".to_string())
        );
        assert_eq!(ElementType::parse("DCOUP3D").node_count(), None);
    }

    #[test]
    fn sets_keep_order_and_drop_repeats() {
        let mut set = IdSet::new("Fixed");
        for id in [8, 5, 6, 5, 7] {
            set.insert(id);
        }
        assert_eq!(set.ids, vec![8, 5, 6, 7]);
        assert!(set.contains(6));
        assert!(!set.contains(1));
    }

    #[test]
    fn set_lookup_is_case_insensitive() {
        let mut deck = Deck::new();
        deck.node_set_mut("Nall").insert(1);
        deck.node_set_mut("NALL").insert(2);
        assert_eq!(deck.node_sets.len(), 1);
        assert_eq!(deck.node_set("nall").map(|s| s.ids.clone()), Some(vec![1, 2]));
        assert_eq!(deck.node_sets[0].name, "Nall");
    }

    #[test]
    fn duplicate_ids_are_refused() {
        let mut deck = Deck::new();
        assert!(deck.add_node(Node::new(1, 0.0, 0.0, 0.0)));
        assert!(!deck.add_node(Node::new(1, 1.0, 0.0, 0.0)));
        assert_eq!(deck.node(1).map(|n| n.x), Some(0.0));
    }

    #[test]
    fn duplicate_material_names_are_refused() {
        let mut deck = Deck::new();
        let mut steel = Material::new("Steel");
        steel.density.push(PropertyRow {
            value: 7.9e-9,
            temperature: None,
        });
        assert!(deck.add_material(steel));
        assert!(!deck.add_material(Material::new("STEEL")));
        assert_eq!(deck.materials.len(), 1);
        assert_eq!(deck.material("steel").and_then(|m| m.density()), Some(7.9e-9));
    }

    #[test]
    fn kept_options_render_as_written() {
        let flag = KeptOption {
            name: "DIRECT".to_string(),
            value: None,
        };
        let keyed = KeptOption {
            name: "AMPLITUDE".to_string(),
            value: Some("Ramp".to_string()),
        };
        assert_eq!(flag.to_string(), "DIRECT");
        assert_eq!(keyed.to_string(), "AMPLITUDE=Ramp");
    }

    #[test]
    fn dload_kinds() {
        assert_eq!(DloadKind::parse("grav"), DloadKind::Gravity);
        assert_eq!(DloadKind::parse("P"), DloadKind::Pressure(0));
        assert_eq!(DloadKind::parse("P3"), DloadKind::Pressure(3));
        assert_eq!(DloadKind::parse("P9"), DloadKind::Other("P9".to_string()));
        assert_eq!(DloadKind::Pressure(3).tag(), "P3");
    }

    #[test]
    fn targets_distinguish_ids_from_sets() {
        assert_eq!(Target::parse(" 12 "), Target::Id(12));
        assert_eq!(
            Target::parse("Internal_Selection-1_Fixed-1"),
            Target::Set("Internal_Selection-1_Fixed-1".to_string())
        );
    }
}
