//! Relation containers: lazy references and owned vs. shared lists
//!
//! Ownership is a property of the relation, not of the entity type.
//! [`OwnedList`] drops members on removal (contained children die with the
//! relation), [`SharedList`] hands removed members back (independent
//! entities survive), [`RefList`] never holds a member strongly at all and
//! persists only keys. [`LazyRef`] is the scalar counterpart of
//! [`RefList`]: a domain key plus an on-demand resolved handle.
//!
//! The store is single-threaded cooperative, so handles are
//! `Rc<RefCell<T>>` and every non-owning edge is a `Weak`.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Shared handle to a live entity.
pub type Handle<T> = Rc<RefCell<T>>;

/// Non-owning handle to a live entity.
pub type WeakHandle<T> = Weak<RefCell<T>>;

/// Wrap an entity value into a store handle.
pub fn handle<T>(value: T) -> Handle<T> {
    Rc::new(RefCell::new(value))
}

// =========================================================================
// LazyRef
// =========================================================================

/// Lazy scalar reference: an integer domain key resolved on demand.
///
/// State machine: `Unset` (key == -1) -> `SetUnresolved` -> `Resolved` or
/// `Invalid`. The invalid flag and a cached target are mutually exclusive;
/// assigning a new key always clears both.
pub struct LazyRef<T> {
    key: i32,
    invalid: bool,
    target: Option<WeakHandle<T>>,
}

impl<T> LazyRef<T> {
    /// Key value meaning "no reference".
    pub const UNSET: i32 = -1;

    pub fn key(&self) -> i32 {
        self.key
    }

    /// Assign a new key. A changed key drops the cached target and clears
    /// the invalid flag; the reference returns to `SetUnresolved` (or
    /// `Unset` for -1).
    pub fn set_key(&mut self, key: i32) {
        if key == self.key {
            return;
        }
        // reset handle, don't touch the independent target object
        self.target = None;
        self.key = key;
        self.invalid = false;
    }

    pub fn clear(&mut self) {
        if self.key != Self::UNSET {
            self.set_key(Self::UNSET);
        }
    }

    /// Key set and not marked invalid.
    pub fn has(&self) -> bool {
        !self.invalid && self.key != Self::UNSET
    }

    /// A live target is cached and the reference is not invalid.
    pub fn is_resolved(&self) -> bool {
        !self.invalid
            && self
                .target
                .as_ref()
                .map_or(false, |weak| weak.strong_count() > 0)
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Bind the resolved target. Overwrites the key when the target's
    /// domain key differs from the stored one.
    pub fn resolve(&mut self, target: &Handle<T>, domain_key: i32) {
        if domain_key != self.key {
            self.set_key(domain_key);
        }
        self.target = Some(Rc::downgrade(target));
        self.invalid = false;
    }

    /// Resolution was attempted and the target was not found. Idempotent;
    /// sticky until the key is re-assigned.
    pub fn mark_invalid(&mut self) {
        self.invalid = true;
    }

    pub fn target(&self) -> Option<Handle<T>> {
        if self.invalid {
            return None;
        }
        self.target.as_ref()?.upgrade()
    }
}

impl<T> Default for LazyRef<T> {
    fn default() -> Self {
        Self {
            key: Self::UNSET,
            invalid: false,
            target: None,
        }
    }
}

impl<T> std::fmt::Debug for LazyRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyRef")
            .field("key", &self.key)
            .field("invalid", &self.invalid)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

// =========================================================================
// RefList
// =========================================================================

/// Lazy list reference to independent entities: only keys are persisted.
///
/// Resolution is all-or-nothing for the whole list. Once the resolved flag
/// is set, further `resolve` calls are no-ops, which keeps repeated
/// resolution passes from double-inserting members. Partial resolution is
/// accepted: the flag is set even when some keys found no match.
pub struct RefList<T> {
    keys: Vec<String>,
    resolved: bool,
    items: Vec<WeakHandle<T>>,
}

impl<T> RefList<T> {
    /// Install the persisted key list. An empty key list counts as already
    /// resolved.
    pub fn set_keys(&mut self, keys: Vec<String>) {
        self.resolved = keys.is_empty();
        self.keys = keys;
        self.items.clear();
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn are_resolved(&self) -> bool {
        self.resolved
    }

    /// Bind the resolved members. No-op when already resolved.
    pub fn resolve(&mut self, items: Vec<Handle<T>>) {
        if self.resolved {
            return;
        }
        self.items = items.iter().map(Rc::downgrade).collect();
        self.resolved = true;
    }

    pub fn add(&mut self, item: &Handle<T>) {
        self.items.push(Rc::downgrade(item));
    }

    /// Remove by handle identity. The target object is independent and is
    /// never destroyed here.
    pub fn remove(&mut self, item: &Handle<T>) -> bool {
        let before = self.items.len();
        self.items
            .retain(|weak| !weak.upgrade().map_or(false, |rc| Rc::ptr_eq(&rc, item)));
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Live members (dropped targets are skipped).
    pub fn items(&self) -> Vec<Handle<T>> {
        self.items.iter().filter_map(Weak::upgrade).collect()
    }

    /// Keys for serialization. When the list is resolved, or keys were
    /// never set but live members exist, the keys are derived from the
    /// members instead of the stored list (lazy backfill).
    pub fn export_keys(&self, key_of: impl Fn(&T) -> String) -> Vec<String> {
        if self.resolved || (self.keys.is_empty() && !self.items.is_empty()) {
            self.items()
                .iter()
                .map(|rc| key_of(&rc.borrow()))
                .collect()
        } else {
            self.keys.clone()
        }
    }
}

impl<T> Default for RefList<T> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            resolved: false,
            items: Vec::new(),
        }
    }
}

// =========================================================================
// OwnedList
// =========================================================================

/// Contained children: removing an entry destroys it.
pub struct OwnedList<T> {
    items: Vec<Handle<T>>,
}

impl<T> OwnedList<T> {
    pub fn push(&mut self, item: Handle<T>) {
        self.items.push(item);
    }

    /// Remove by handle identity, dropping the child.
    pub fn remove(&mut self, item: &Handle<T>) -> bool {
        match self.items.iter().position(|rc| Rc::ptr_eq(rc, item)) {
            Some(pos) => {
                self.items.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove the first child matching `pred`, dropping it.
    pub fn remove_by(&mut self, pred: impl Fn(&T) -> bool) -> bool {
        match self.items.iter().position(|rc| pred(&rc.borrow())) {
            Some(pos) => {
                self.items.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Drop all children.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&Handle<T>> {
        self.items.get(pos)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Handle<T>> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Handle<T>] {
        &self.items
    }
}

impl<T> Default for OwnedList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

// =========================================================================
// SharedList
// =========================================================================

/// Independent members held by strong handle: removing an entry hands it
/// back to the caller instead of destroying it.
pub struct SharedList<T> {
    items: Vec<Handle<T>>,
}

impl<T> SharedList<T> {
    pub fn push(&mut self, item: Handle<T>) {
        self.items.push(item);
    }

    /// Remove by handle identity; the member is returned, not destroyed.
    pub fn remove(&mut self, item: &Handle<T>) -> Option<Handle<T>> {
        let pos = self.items.iter().position(|rc| Rc::ptr_eq(rc, item))?;
        Some(self.items.remove(pos))
    }

    /// Remove the first member matching `pred`; the member is returned.
    pub fn remove_by(&mut self, pred: impl Fn(&T) -> bool) -> Option<Handle<T>> {
        let pos = self.items.iter().position(|rc| pred(&rc.borrow()))?;
        Some(self.items.remove(pos))
    }

    /// Detach all members without destroying them.
    pub fn clear(&mut self) -> Vec<Handle<T>> {
        std::mem::take(&mut self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&Handle<T>> {
        self.items.get(pos)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Handle<T>> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Handle<T>] {
        &self.items
    }
}

impl<T> Default for SharedList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}
