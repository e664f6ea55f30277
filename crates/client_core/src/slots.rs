use shared::domain::{HandleId, SlotId, TicketId, SLOT_COUNT};

use crate::handle::ImageHandle;

pub const PROCESSING_LABEL: &str = "Processing...";
pub const STARTING_LABEL: &str = "Starting process...";

/// What a tile shows. An image and text can never coexist.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SlotContent {
    #[default]
    Empty,
    Pending(String),
    Image(ImageHandle),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Slot {
    id: SlotId,
    content: SlotContent,
    /// Latest request issued for this slot; older results are dropped.
    ticket: Option<TicketId>,
}

impl Slot {
    fn new(id: SlotId) -> Self {
        Self {
            id,
            content: SlotContent::Empty,
            ticket: None,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn content(&self) -> &SlotContent {
        &self.content
    }

    pub fn image(&self) -> Option<&ImageHandle> {
        match &self.content {
            SlotContent::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            SlotContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.content, SlotContent::Pending(_))
    }

    /// Holds an image or text that can be opened in the modal.
    pub fn is_populated(&self) -> bool {
        matches!(self.content, SlotContent::Image(_) | SlotContent::Text(_))
    }

    pub fn ticket(&self) -> Option<TicketId> {
        self.ticket
    }
}

#[derive(Debug, Clone)]
pub struct SlotRegistry {
    slots: [Slot; SLOT_COUNT],
}

impl Default for SlotRegistry {
    fn default() -> Self {
        Self {
            slots: SlotId::ALL.map(Slot::new),
        }
    }
}

impl SlotRegistry {
    pub fn get(&self, id: SlotId) -> &Slot {
        &self.slots[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    pub fn mark_pending(&mut self, id: SlotId, ticket: TicketId, label: &str) {
        let slot = &mut self.slots[id.index()];
        slot.content = SlotContent::Pending(label.to_string());
        slot.ticket = Some(ticket);
    }

    /// Writes `content` and releases the previous content.
    pub fn set(&mut self, id: SlotId, content: SlotContent) {
        let slot = &mut self.slots[id.index()];
        slot.content = content;
        slot.ticket = None;
    }

    /// Writes `content` only if `ticket` is the slot's latest request.
    pub fn settle(&mut self, id: SlotId, ticket: TicketId, content: SlotContent) -> bool {
        let slot = &mut self.slots[id.index()];
        if slot.ticket != Some(ticket) {
            return false;
        }
        slot.content = content;
        slot.ticket = None;
        true
    }

    pub fn clear_all(&mut self) {
        for slot in &mut self.slots {
            slot.content = SlotContent::Empty;
            slot.ticket = None;
        }
    }

    pub fn image_ids(&self) -> impl Iterator<Item = HandleId> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.image().map(ImageHandle::id))
    }

    pub fn all_settled(&self) -> bool {
        self.slots.iter().all(|slot| !slot.is_pending())
    }
}
