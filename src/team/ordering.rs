//! Display ordering of team members.
//!
//! Members are listed by ascending `displayOrder` (missing counts as 0), ties
//! broken by creation time and then id, the same total order the database
//! uses. [`OrderBoard`] stages drag-reorder gestures locally
//! until they are saved as one batch of `(memberId, displayOrder)` pairs.

use std::collections::{HashMap, HashSet};

use crate::models::{DisplayOrderUpdate, Member};

/// Effective sort key of a member.
pub fn display_key(member: &Member) -> i64 {
    member.display_order.unwrap_or(0)
}

fn sort_key(member: &Member) -> (i64, &str, &str) {
    (display_key(member), member.created_at.as_str(), member.id.as_str())
}

/// Sort into display sequence. The result depends only on the members'
/// fields, never on their previous arrangement.
pub fn sort_for_display(members: &mut [Member]) {
    members.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
}

/// Locally staged ordering of the member list.
#[derive(Debug, Clone)]
pub struct OrderBoard {
    /// All members, always in display sequence.
    members: Vec<Member>,
    /// Order last known to be persisted, by member id.
    saved: HashMap<String, Option<i64>>,
    /// Members reindexed since the last save.
    touched: HashSet<String>,
    year_filter: Option<i32>,
}

impl OrderBoard {
    pub fn new(mut members: Vec<Member>) -> Self {
        sort_for_display(&mut members);
        let saved = members
            .iter()
            .map(|m| (m.id.clone(), m.display_order))
            .collect();

        Self {
            members,
            saved,
            touched: HashSet::new(),
            year_filter: None,
        }
    }

    /// Every member in display sequence, including filtered-out ones.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn year_filter(&self) -> Option<i32> {
        self.year_filter
    }

    /// Restrict the visible subset to one team year. Staged orders are kept.
    pub fn set_year_filter(&mut self, year: Option<i32>) {
        self.year_filter = year;
    }

    /// Members currently shown, in display sequence.
    pub fn visible(&self) -> Vec<&Member> {
        self.members
            .iter()
            .filter(|m| self.is_visible(m))
            .collect()
    }

    /// Move `moved_id` to the position currently held by `target_id` within the
    /// visible subset. Returns false when nothing changed.
    pub fn move_member(&mut self, moved_id: &str, target_id: &str) -> bool {
        let Some(to) = self.visible_index(target_id) else {
            return false;
        };
        self.move_to_index(moved_id, to)
    }

    /// Move `moved_id` to visible index `to` (clamped to the last slot).
    ///
    /// The member is removed from its old slot and reinserted, then every
    /// visible member gets its new zero-based index as display order. Members
    /// hidden by the year filter keep their display order.
    pub fn move_to_index(&mut self, moved_id: &str, to: usize) -> bool {
        let mut sequence: Vec<String> = self.visible().iter().map(|m| m.id.clone()).collect();
        let Some(from) = sequence.iter().position(|id| id == moved_id) else {
            return false;
        };
        let to = to.min(sequence.len().saturating_sub(1));
        if from == to {
            return false;
        }

        let id = sequence.remove(from);
        sequence.insert(to, id);

        let positions: HashMap<&str, i64> = sequence
            .iter()
            .enumerate()
            .map(|(index, id)| (id.as_str(), index as i64))
            .collect();

        for member in &mut self.members {
            if let Some(index) = positions.get(member.id.as_str()) {
                member.display_order = Some(*index);
                self.touched.insert(member.id.clone());
            }
        }

        sort_for_display(&mut self.members);
        true
    }

    /// Whether there are staged changes not yet persisted.
    pub fn is_dirty(&self) -> bool {
        !self.touched.is_empty()
    }

    /// The batch to persist: every reindexed member, in display sequence.
    ///
    /// Applying the batch any number of times yields the same order.
    pub fn pending_updates(&self) -> Vec<DisplayOrderUpdate> {
        self.members
            .iter()
            .filter(|m| self.touched.contains(&m.id))
            .map(|m| DisplayOrderUpdate {
                user_id: m.id.clone(),
                display_order: display_key(m),
            })
            .collect()
    }

    /// Record that the pending batch was persisted.
    pub fn mark_saved(&mut self) {
        for member in &self.members {
            self.saved.insert(member.id.clone(), member.display_order);
        }
        self.touched.clear();
    }

    /// Display order last persisted for a member.
    pub fn saved_order(&self, member_id: &str) -> Option<i64> {
        self.saved.get(member_id).copied().flatten()
    }

    fn is_visible(&self, member: &Member) -> bool {
        match self.year_filter {
            Some(year) => member.belongs_to_year(year),
            None => true,
        }
    }

    fn visible_index(&self, member_id: &str) -> Option<usize> {
        self.visible().iter().position(|m| m.id == member_id)
    }
}
