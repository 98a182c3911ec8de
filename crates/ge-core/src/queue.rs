use std::collections::VecDeque;

use crate::list::{DisplayList, DisplayListId};

/// Display lists in execution order.
///
/// Entries are only ever added at either end and removed once they finish; nothing reorders the
/// entries in between.
#[derive(Debug, Default, Clone)]
pub struct DisplayListQueue {
    lists: VecDeque<DisplayList>,
}

impl DisplayListQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn push_back(&mut self, list: DisplayList) {
        self.lists.push_back(list);
    }

    pub fn push_front(&mut self, list: DisplayList) {
        self.lists.push_front(list);
    }

    pub fn front(&self) -> Option<&DisplayList> {
        self.lists.front()
    }

    pub fn position(&self, id: DisplayListId) -> Option<usize> {
        self.lists.iter().position(|list| list.id == id)
    }

    pub fn get(&self, id: DisplayListId) -> Option<&DisplayList> {
        self.lists.iter().find(|list| list.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: DisplayListId) -> Option<&mut DisplayList> {
        self.lists.iter_mut().find(|list| list.id == id)
    }

    pub(crate) fn remove(&mut self, id: DisplayListId) -> Option<DisplayList> {
        let index = self.position(id)?;
        self.lists.remove(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DisplayList> + '_ {
        self.lists.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut DisplayList> + '_ {
        self.lists.iter_mut()
    }

    pub(crate) fn clear(&mut self) {
        self.lists.clear();
    }
}

impl FromIterator<DisplayList> for DisplayListQueue {
    fn from_iter<I: IntoIterator<Item = DisplayList>>(iter: I) -> Self {
        Self {
            lists: iter.into_iter().collect(),
        }
    }
}
