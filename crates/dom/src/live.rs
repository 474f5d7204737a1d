use core_types::{Rect, ScrollOffset};

/// Per-node state owned by the host rather than the tree.
///
/// Changing any of this never produces a mutation record.
#[derive(Clone, Debug)]
pub(crate) struct LiveState {
    pub scroll: ScrollOffset,
    pub rect: Option<Rect>,
    pub value: Option<String>,
    pub checked: Option<bool>,
    pub selected: Option<bool>,
    pub canvas_data_url: Option<String>,
    pub paused: bool,
    pub sheet: Option<String>,
}

impl Default for LiveState {
    fn default() -> Self {
        Self {
            scroll: ScrollOffset::default(),
            rect: None,
            value: None,
            checked: None,
            selected: None,
            canvas_data_url: None,
            paused: true,
            sheet: None,
        }
    }
}
