//! Department entity - read-only tree
//!
//! Departments form a tree: children are contained and die with their
//! parent. Each node reaches its containing parent through a weak
//! back-reference set at attach time.

use std::rc::Rc;

use serde_json::{json, Value};
use tracing::debug;

use crate::core::entity::{DataObject, MapKind};
use crate::core::identity::{ensure_uuid, new_uuid};
use crate::core::map::{self, DataMap};
use crate::core::relation::{handle, Handle, OwnedList, WeakHandle};

pub struct Department {
    /// Domain key referenced by `Order.depId`.
    pub id: i32,
    pub uuid: String,
    pub name: String,
    children: OwnedList<Department>,
    parent: WeakHandle<Department>,
}

impl Default for Department {
    fn default() -> Self {
        Self {
            id: -1,
            uuid: String::new(),
            name: String::new(),
            children: OwnedList::default(),
            parent: WeakHandle::new(),
        }
    }
}

impl Department {
    /// The containing parent department (back-reference). `None` for roots.
    pub fn parent_dep(&self) -> Option<Handle<Department>> {
        self.parent.upgrade()
    }

    pub(crate) fn set_parent_dep(&mut self, parent: WeakHandle<Department>) {
        self.parent = parent;
    }

    /// Wire the parent back-references of the whole subtree.
    pub fn attach(department: &Handle<Department>) {
        let weak = Rc::downgrade(department);
        for child in department.borrow().children.iter() {
            child.borrow_mut().set_parent_dep(weak.clone());
            Department::attach(child);
        }
    }

    pub fn children(&self) -> &OwnedList<Department> {
        &self.children
    }

    pub fn children_count(&self) -> usize {
        self.children.len()
    }

    /// Create a child attached to this node but not yet added. Call
    /// [`Department::add_child`] on success or drop it to discard.
    pub fn create_child(department: &Handle<Department>) -> Handle<Department> {
        let mut child = Department::default();
        child.prepare_new();
        child.set_parent_dep(Rc::downgrade(department));
        handle(child)
    }

    pub fn add_child(department: &Handle<Department>, child: Handle<Department>) {
        child.borrow_mut().set_parent_dep(Rc::downgrade(department));
        department.borrow_mut().children.push(child);
    }

    /// Children are contained: removal destroys the subtree.
    pub fn remove_from_children(&mut self, child: &Handle<Department>) -> bool {
        let ok = self.children.remove(child);
        if !ok {
            debug!("department not found in children");
        }
        ok
    }

    pub fn remove_from_children_by_uuid(&mut self, uuid: &str) -> bool {
        let ok = self.children.remove_by(|d| d.uuid == uuid);
        if !ok {
            debug!("uuid not found in children: {uuid}");
        }
        ok
    }

    pub fn remove_from_children_by_id(&mut self, id: i32) -> bool {
        let ok = self.children.remove_by(|d| d.id == id);
        if !ok {
            debug!("id not found in children: {id}");
        }
        ok
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    /// Flat pre-order list of all descendants.
    pub fn all_department_children(&self) -> Vec<Handle<Department>> {
        let mut all = Vec::new();
        for child in self.children.iter() {
            all.push(child.clone());
            all.extend(child.borrow().all_department_children());
        }
        all
    }

    fn children_as_list(&self, kind: MapKind) -> Vec<Value> {
        self.children
            .iter()
            .map(|d| Value::Object(d.borrow().export(kind)))
            .collect()
    }
}

impl DataObject for Department {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn prepare_new(&mut self) {
        self.uuid = new_uuid();
    }

    fn is_valid(&self) -> bool {
        self.id != -1 && !self.uuid.is_empty()
    }

    fn fill(&mut self, m: &DataMap, kind: MapKind) {
        if let Some(id) = map::get_i32(m, "id") {
            self.id = id;
        }
        if let Some(uuid) = map::get_string(m, "uuid") {
            self.uuid = uuid;
        }
        if let Some(fresh) = ensure_uuid(&self.uuid) {
            self.uuid = fresh;
        }
        if let Some(name) = map::get_string(m, "name") {
            self.name = name;
        }
        self.children.clear();
        for child_map in map::get_map_list(m, "children") {
            let mut child = Department::default();
            child.fill(child_map, kind);
            self.children.push(handle(child));
        }
    }

    fn export(&self, kind: MapKind) -> DataMap {
        let mut m = DataMap::new();
        m.insert("id".into(), json!(self.id));
        m.insert("uuid".into(), json!(self.uuid));
        m.insert("name".into(), json!(self.name));
        m.insert("children".into(), Value::Array(self.children_as_list(kind)));
        m
    }
}
