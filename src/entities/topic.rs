//! Topic entity
//!
//! A topic optionally embeds a *copy* of its tree parent (`parentTopic`)
//! and keeps a list of sub-topics. Unlike Department children, sub-topics
//! are independent: removing one from the list never destroys it.

use serde_json::{json, Value};
use tracing::debug;

use crate::core::entity::{DataObject, MapKind};
use crate::core::identity::{ensure_uuid, new_uuid};
use crate::core::map::{self, DataMap};
use crate::core::relation::{handle, Handle, SharedList};

pub struct Topic {
    pub uuid: String,
    /// Domain key referenced by `Order.topicId`.
    pub id: i32,
    pub classification: String,
    parent_topic: Option<Handle<Topic>>,
    sub_topic: SharedList<Topic>,
}

impl Default for Topic {
    fn default() -> Self {
        Self {
            uuid: String::new(),
            id: -1,
            classification: String::new(),
            parent_topic: None,
            sub_topic: SharedList::default(),
        }
    }
}

impl Topic {
    pub fn parent_topic(&self) -> Option<Handle<Topic>> {
        self.parent_topic.clone()
    }

    pub fn has_parent_topic(&self) -> bool {
        self.parent_topic.is_some()
    }

    /// Create a topic intended to become the parent copy. Call
    /// [`Topic::set_parent_topic`] on success or drop it to discard.
    pub fn create_parent_topic(&self) -> Handle<Topic> {
        let mut topic = Topic::default();
        topic.prepare_new();
        handle(topic)
    }

    pub fn undo_create_parent_topic(&self, _topic: Handle<Topic>) {
        // dropping the handle releases the abandoned copy
    }

    /// Replace the embedded parent copy. The old copy is owned and dropped.
    pub fn set_parent_topic(&mut self, parent: Handle<Topic>) {
        self.parent_topic = Some(parent);
    }

    pub fn delete_parent_topic(&mut self) {
        self.parent_topic = None;
    }

    pub fn sub_topic(&self) -> &SharedList<Topic> {
        &self.sub_topic
    }

    pub fn sub_topic_count(&self) -> usize {
        self.sub_topic.len()
    }

    pub fn add_to_sub_topic(&mut self, topic: Handle<Topic>) {
        self.sub_topic.push(topic);
    }

    /// Sub-topics are independent: the removed entry is handed back, not
    /// destroyed.
    pub fn remove_from_sub_topic(&mut self, topic: &Handle<Topic>) -> Option<Handle<Topic>> {
        let removed = self.sub_topic.remove(topic);
        if removed.is_none() {
            debug!("topic not found in sub topics");
        }
        removed
    }

    pub fn remove_from_sub_topic_by_uuid(&mut self, uuid: &str) -> Option<Handle<Topic>> {
        let removed = self.sub_topic.remove_by(|t| t.uuid == uuid);
        if removed.is_none() {
            debug!("uuid not found in sub topics: {uuid}");
        }
        removed
    }

    pub fn remove_from_sub_topic_by_id(&mut self, id: i32) -> Option<Handle<Topic>> {
        let removed = self.sub_topic.remove_by(|t| t.id == id);
        if removed.is_none() {
            debug!("id not found in sub topics: {id}");
        }
        removed
    }

    pub fn clear_sub_topic(&mut self) -> Vec<Handle<Topic>> {
        self.sub_topic.clear()
    }

    fn sub_topic_as_list(&self, kind: MapKind) -> Vec<Value> {
        self.sub_topic
            .iter()
            .map(|t| Value::Object(t.borrow().export(kind)))
            .collect()
    }
}

impl DataObject for Topic {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn prepare_new(&mut self) {
        self.uuid = new_uuid();
    }

    fn is_valid(&self) -> bool {
        !self.uuid.is_empty() && self.id != -1
    }

    fn fill(&mut self, m: &DataMap, kind: MapKind) {
        if let Some(uuid) = map::get_string(m, "uuid") {
            self.uuid = uuid;
        }
        if let Some(fresh) = ensure_uuid(&self.uuid) {
            self.uuid = fresh;
        }
        if let Some(id) = map::get_i32(m, "id") {
            self.id = id;
        }
        if let Some(classification) = map::get_string(m, "classification") {
            self.classification = classification;
        }
        if let Some(parent_map) = map::get_map(m, "parentTopic") {
            if !parent_map.is_empty() {
                let mut parent = Topic::default();
                parent.fill(parent_map, kind);
                self.parent_topic = Some(handle(parent));
            }
        }
        self.sub_topic.clear();
        for sub_map in map::get_map_list(m, "subTopic") {
            let mut sub = Topic::default();
            sub.fill(sub_map, kind);
            self.sub_topic.push(handle(sub));
        }
    }

    fn export(&self, kind: MapKind) -> DataMap {
        let mut m = DataMap::new();
        m.insert("uuid".into(), json!(self.uuid));
        m.insert("id".into(), json!(self.id));
        m.insert("classification".into(), json!(self.classification));
        m.insert("subTopic".into(), Value::Array(self.sub_topic_as_list(kind)));
        if let Some(parent) = &self.parent_topic {
            m.insert("parentTopic".into(), Value::Object(parent.borrow().export(kind)));
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn sample_topic() -> Topic {
        let mut topic = Topic::default();
        topic.prepare_new();
        topic.id = 3;
        topic.classification = "logistics".into();

        let mut parent = Topic::default();
        parent.prepare_new();
        parent.id = 1;
        parent.classification = "root".into();
        topic.set_parent_topic(handle(parent));

        let mut sub = Topic::default();
        sub.prepare_new();
        sub.id = 30;
        topic.add_to_sub_topic(handle(sub));
        topic
    }

    #[test]
    fn test_cache_round_trip_with_nested_topics() {
        let topic = sample_topic();
        let mut back = Topic::default();
        back.fill_from_cache_map(&topic.to_cache_map());
        assert_eq!(back.id, 3);
        assert!(back.has_parent_topic());
        assert_eq!(back.parent_topic().unwrap().borrow().id, 1);
        assert_eq!(back.sub_topic_count(), 1);
        assert_eq!(back.sub_topic().get(0).unwrap().borrow().id, 30);
    }

    #[test]
    fn test_sub_topic_removal_does_not_destroy() {
        let mut topic = sample_topic();
        let sub = topic.sub_topic().get(0).unwrap().clone();
        let probe = Rc::downgrade(&sub);

        let removed = topic.remove_from_sub_topic_by_id(30).unwrap();
        assert!(Rc::ptr_eq(&removed, &sub));
        assert_eq!(topic.sub_topic_count(), 0);
        // still alive through the handed-back handle
        drop(sub);
        assert!(probe.upgrade().is_some());
        drop(removed);
        assert!(probe.upgrade().is_none());
    }

    #[test]
    fn test_remove_missing_sub_topic_returns_none() {
        let mut topic = sample_topic();
        assert!(topic.remove_from_sub_topic_by_id(999).is_none());
        assert!(topic.remove_from_sub_topic_by_uuid("nope").is_none());
    }
}
