use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);
    };
}

id_newtype!(HandleId);
id_newtype!(TicketId);

/// Number of result tiles in the grid.
pub const SLOT_COUNT: usize = 6;

/// One of the six fixed result slots, numbered 1 through 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SlotId(u8);

impl SlotId {
    pub const ALL: [SlotId; SLOT_COUNT] = [
        SlotId(1),
        SlotId(2),
        SlotId(3),
        SlotId(4),
        SlotId(5),
        SlotId(6),
    ];

    pub fn new(number: u8) -> Option<Self> {
        (1..=SLOT_COUNT as u8)
            .contains(&number)
            .then_some(Self(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Key used in file names and logs, e.g. `slot3`.
    pub fn key(self) -> String {
        format!("slot{}", self.0)
    }

    pub fn title(self) -> String {
        format!("Result {}", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot{}", self.0)
    }
}

impl TryFrom<u8> for SlotId {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        SlotId::new(value).ok_or_else(|| format!("slot number out of range: {value}"))
    }
}

impl From<SlotId> for u8 {
    fn from(value: SlotId) -> Self {
        value.0
    }
}

/// How a backend action's success body is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Image,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "remover")]
    RemoveDefault,
    #[serde(rename = "remover_carvekit")]
    RemoveCarvekit,
    #[serde(rename = "remover_blurfusion")]
    RemoveBlurFusion,
    #[serde(rename = "remover_briaai")]
    RemoveBriaAi,
    #[serde(rename = "remover_u2net")]
    RemoveU2Net,
    #[serde(rename = "remover_basnet")]
    RemoveBasnet,
    #[serde(rename = "blanco_negro")]
    Grayscale,
    #[serde(rename = "rotar")]
    Rotate,
    #[serde(rename = "medida_rapida")]
    MeasureQuick,
    #[serde(rename = "medir_manualmente")]
    MeasureManual,
    #[serde(rename = "medir_yolo")]
    MeasureYolo,
    #[serde(rename = "medir_plano")]
    MeasurePlane,
}

impl Action {
    pub const ALL: [Action; 12] = [
        Action::RemoveDefault,
        Action::RemoveCarvekit,
        Action::RemoveBlurFusion,
        Action::RemoveBriaAi,
        Action::RemoveU2Net,
        Action::RemoveBasnet,
        Action::Grayscale,
        Action::Rotate,
        Action::MeasureQuick,
        Action::MeasureManual,
        Action::MeasureYolo,
        Action::MeasurePlane,
    ];

    /// The segmentation variants launched together by "run all advanced".
    pub const ADVANCED: [Action; SLOT_COUNT] = [
        Action::RemoveDefault,
        Action::RemoveCarvekit,
        Action::RemoveBlurFusion,
        Action::RemoveBriaAi,
        Action::RemoveU2Net,
        Action::RemoveBasnet,
    ];

    /// Value sent in the multipart `action` field.
    pub fn wire_name(self) -> &'static str {
        match self {
            Action::RemoveDefault => "remover",
            Action::RemoveCarvekit => "remover_carvekit",
            Action::RemoveBlurFusion => "remover_blurfusion",
            Action::RemoveBriaAi => "remover_briaai",
            Action::RemoveU2Net => "remover_u2net",
            Action::RemoveBasnet => "remover_basnet",
            Action::Grayscale => "blanco_negro",
            Action::Rotate => "rotar",
            Action::MeasureQuick => "medida_rapida",
            Action::MeasureManual => "medir_manualmente",
            Action::MeasureYolo => "medir_yolo",
            Action::MeasurePlane => "medir_plano",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Action::ALL
            .into_iter()
            .find(|action| action.wire_name() == name.trim())
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::RemoveDefault => "Remove background",
            Action::RemoveCarvekit => "Remove background (CarveKit)",
            Action::RemoveBlurFusion => "Remove background (BlurFusion)",
            Action::RemoveBriaAi => "Remove background (BRIA AI)",
            Action::RemoveU2Net => "Remove background (U2-Net)",
            Action::RemoveBasnet => "Remove background (BASNet)",
            Action::Grayscale => "Black & White",
            Action::Rotate => "Rotate",
            Action::MeasureQuick => "Quick measurement",
            Action::MeasureManual => "Manual measurement",
            Action::MeasureYolo => "Measure with YOLO",
            Action::MeasurePlane => "Measure on plane",
        }
    }

    /// Grayscale and rotate never reach the network.
    pub fn is_local(self) -> bool {
        matches!(self, Action::Grayscale | Action::Rotate)
    }

    /// The two image-returning measurements that are only reachable from the modal.
    pub fn is_measurement_overlay(self) -> bool {
        matches!(self, Action::MeasureYolo | Action::MeasurePlane)
    }

    pub fn response_kind(self) -> ResponseKind {
        match self {
            Action::MeasureQuick | Action::MeasureManual => ResponseKind::Json,
            _ => ResponseKind::Image,
        }
    }

    /// Static action to slot binding; `None` for actions with no grid slot.
    pub fn slot(self) -> Option<SlotId> {
        let number = match self {
            Action::RemoveDefault => 1,
            Action::RemoveCarvekit => 2,
            Action::RemoveBlurFusion => 3,
            Action::RemoveBriaAi => 4,
            Action::RemoveU2Net => 5,
            Action::RemoveBasnet => 6,
            _ => return None,
        };
        SlotId::new(number)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Where a backend request was issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Grid,
    Modal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advanced_actions_cover_every_slot_once() {
        let mut slots: Vec<SlotId> = Action::ADVANCED
            .iter()
            .filter_map(|action| action.slot())
            .collect();
        slots.sort();
        assert_eq!(slots, SlotId::ALL.to_vec());
    }

    #[test]
    fn only_quick_and_manual_measurements_return_json() {
        let json: Vec<Action> = Action::ALL
            .into_iter()
            .filter(|action| action.response_kind() == ResponseKind::Json)
            .collect();
        assert_eq!(json, vec![Action::MeasureQuick, Action::MeasureManual]);
        assert_eq!(Action::MeasureYolo.response_kind(), ResponseKind::Image);
        assert_eq!(Action::MeasurePlane.response_kind(), ResponseKind::Image);
    }

    #[test]
    fn measurement_and_local_actions_have_no_slot() {
        for action in [
            Action::Grayscale,
            Action::Rotate,
            Action::MeasureQuick,
            Action::MeasureManual,
            Action::MeasureYolo,
            Action::MeasurePlane,
        ] {
            assert_eq!(action.slot(), None, "{action} should be unbound");
        }
    }

    #[test]
    fn wire_names_match_serde_names() {
        for action in Action::ALL {
            let encoded = serde_json::to_string(&action).expect("encode");
            assert_eq!(encoded, format!("\"{}\"", action.wire_name()));
            assert_eq!(Action::from_wire_name(action.wire_name()), Some(action));
        }
        assert_eq!(Action::from_wire_name("remover_unknown"), None);
    }

    #[test]
    fn slot_ids_are_bounded() {
        assert!(SlotId::new(0).is_none());
        assert!(SlotId::new(7).is_none());
        let slot = SlotId::new(4).expect("slot");
        assert_eq!(slot.index(), 3);
        assert_eq!(slot.key(), "slot4");
        assert_eq!(slot.title(), "Result 4");
        assert!(serde_json::from_str::<SlotId>("9").is_err());
    }
}
