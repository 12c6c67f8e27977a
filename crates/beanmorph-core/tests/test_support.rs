//! Shared test support utilities for integration tests

#![allow(dead_code)]

use beanmorph_core::{bean, Bean, Constraint, FieldValue, TypeInfo, TypeRef, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub street: String,
    pub city: String,
}
bean!(mutable Address { street: String, city: String });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub age: u32,
    pub address: Address,
    pub tags: Vec<String>,
    pub scores: BTreeMap<String, i32>,
    pub nickname: Option<String>,
}
bean!(mutable Person {
    id: i64,
    name: String,
    age: u32,
    address: Address,
    tags: Vec<String>,
    scores: BTreeMap<String, i32>,
    nickname: Option<String>,
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressDto {
    pub street: String,
    pub city: String,
}
bean!(mutable AddressDto { street: String, city: String });

/// Same layout as [`Person`] with wider numeric types
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonDto {
    pub id: i64,
    pub name: String,
    pub age: u64,
    pub address: AddressDto,
    pub tags: Vec<String>,
    pub scores: BTreeMap<String, i64>,
    pub nickname: Option<String>,
}
bean!(mutable PersonDto {
    id: i64,
    name: String,
    age: u64,
    address: AddressDto,
    tags: Vec<String>,
    scores: BTreeMap<String, i64>,
    nickname: Option<String>,
});

#[derive(Debug, Clone, PartialEq)]
pub struct PersonView {
    pub id: i64,
    pub name: String,
}
bean!(immutable PersonView { id: i64, name: String });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonSummary {
    pub id: i64,
    pub name: String,
    pub age: u32,
}
bean!(hybrid PersonSummary { constructor { id: i64 } setters { name: String, age: u32 } });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dept {
    pub code: String,
}
bean!(mutable Dept { code: String });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub dept: Dept,
}
bean!(mutable Employee { id: i64, name: String, dept: Dept });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeDto {
    pub id: i64,
    pub full_name: String,
    pub dept_code: String,
}
bean!(mutable EmployeeDto { id: i64, full_name: String, dept_code: String });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub city: String,
}
bean!(mutable Location { city: String });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Customer {
    pub name: String,
    pub location: Location,
}
bean!(mutable Customer { name: String, location: Location });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityDto {
    pub city: String,
}
bean!(mutable CityDto { city: String });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerDto {
    pub name: String,
    pub address: CityDto,
}
bean!(mutable CustomerDto { name: String, address: CityDto });

/// Source node whose successor can be rewired after construction
pub struct Node {
    pub label: String,
    pub next: Mutex<Option<Arc<Node>>>,
}

impl Node {
    pub fn new(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            next: Mutex::new(None),
        })
    }

    pub fn link(&self, next: &Arc<Node>) {
        if let Ok(mut slot) = self.next.lock() {
            *slot = Some(Arc::clone(next));
        }
    }

    pub fn unlink(&self) {
        if let Ok(mut slot) = self.next.lock() {
            *slot = None;
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").field("label", &self.label).finish_non_exhaustive()
    }
}

fn read_next(node: &Node) -> Value {
    node.next.lock().map(|next| next.to_value()).unwrap_or(Value::Null)
}

fn write_next(node: &mut Node, value: Value) -> Result<(), String> {
    let next = <Option<Arc<Node>>>::from_value(value)?;
    *node.next.get_mut().map_err(|e| e.to_string())? = next;
    Ok(())
}

impl Bean for Node {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<Node>("Node")
            .no_arg_constructor(|| Node {
                label: String::new(),
                next: Mutex::new(None),
            })
            .property("label", |n| &n.label, |n, v| n.label = v)
            .raw_property(
                "next",
                <Option<Arc<Node>>>::kind(),
                Some(read_next as fn(&Node) -> Value),
                Some(write_next as fn(&mut Node, Value) -> Result<(), String>),
            )
            .build()
    }

    fn type_ref(&self) -> TypeRef {
        TypeRef::of::<Node>()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeDto {
    pub label: String,
    pub next: Option<Arc<NodeDto>>,
}
bean!(mutable NodeDto { label: String, next: Option<Arc<NodeDto>> });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leaf {
    pub value: i32,
}
bean!(mutable Leaf { value: i32 });

/// Two fields that may share one leaf instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pair {
    pub left: Arc<Leaf>,
    pub right: Arc<Leaf>,
}
bean!(mutable Pair { left: Arc<Leaf>, right: Arc<Leaf> });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafDto {
    pub value: i64,
}
bean!(mutable LeafDto { value: i64 });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairDto {
    pub left: LeafDto,
    pub right: LeafDto,
}
bean!(mutable PairDto { left: LeafDto, right: LeafDto });

/// Destination carrying validation constraints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registration {
    pub name: String,
    pub age: u32,
    pub email: String,
}

impl Bean for Registration {
    fn type_info() -> TypeInfo {
        TypeInfo::builder::<Registration>("Registration")
            .default_constructor()
            .property("name", |r| &r.name, |r, v| r.name = v)
            .property("age", |r| &r.age, |r, v| r.age = v)
            .property("email", |r| &r.email, |r, v| r.email = v)
            .constraint("name", Constraint::NotBlank)
            .constraint("age", Constraint::range(Some(18.0), Some(130.0)))
            .constraint("email", Constraint::pattern(r"[^@\s]+@[^@\s]+").expect("valid pattern"))
            .build()
    }

    fn type_ref(&self) -> TypeRef {
        TypeRef::of::<Registration>()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applicant {
    pub name: String,
    pub age: u32,
    pub email: String,
}
bean!(mutable Applicant { name: String, age: u32, email: String });

/// Flat source with no nested objects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contact {
    pub id: i64,
    pub name: String,
}
bean!(mutable Contact { id: i64, name: String });

/// Destination pair linking back to each other through optional links
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberDto {
    pub id: i64,
    pub name: String,
    pub team: Option<Arc<TeamDto>>,
}
bean!(mutable MemberDto { id: i64, name: String, team: Option<Arc<TeamDto>> });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamDto {
    pub code: String,
    pub lead: Option<Arc<MemberDto>>,
}
bean!(mutable TeamDto { code: String, lead: Option<Arc<MemberDto>> });

/// `code` two levels down in the first branch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Badge {
    pub code: String,
}
bean!(mutable Badge { code: String });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Holder {
    pub badge: Badge,
}
bean!(mutable Holder { badge: Badge });

/// `code` one level down in the second branch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unit {
    pub code: String,
}
bean!(mutable Unit { code: String });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Site {
    pub holder: Holder,
    pub unit: Unit,
}
bean!(mutable Site { holder: Holder, unit: Unit });

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteDto {
    pub code: String,
}
bean!(mutable SiteDto { code: String });

/// Build a fully populated person
pub fn sample_person() -> Person {
    let mut scores = BTreeMap::new();
    scores.insert("math".to_string(), 91);
    scores.insert("art".to_string(), -3);
    Person {
        id: 42,
        name: "Ann".to_string(),
        age: 37,
        address: Address {
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
        },
        tags: vec!["admin".to_string(), "ops".to_string()],
        scores,
        nickname: Some("annie".to_string()),
    }
}

pub fn sample_employee() -> Employee {
    Employee {
        id: 1,
        name: "Ann".to_string(),
        dept: Dept {
            code: "X1".to_string(),
        },
    }
}

/// Build the chain `labels[0] -> labels[1] -> ...`, returning its head
pub fn node_chain(labels: &[&str]) -> Vec<Arc<Node>> {
    let nodes: Vec<Arc<Node>> = labels.iter().map(|label| Node::new(label)).collect();
    for window in nodes.windows(2) {
        window[0].link(&window[1]);
    }
    nodes
}
