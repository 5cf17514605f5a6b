/// Element that had keyboard focus when a key event fired.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum FocusTarget {
    /// The map canvas or any element that does not take text.
    #[default]
    Scene,
    TextInput,
    TextArea,
    ContentEditable,
}

impl FocusTarget {
    /// Classifies a DOM element by tag name and its content-editable flag.
    pub fn from_element(tag_name: &str, content_editable: bool) -> Self {
        if content_editable {
            return FocusTarget::ContentEditable;
        }
        match tag_name.to_ascii_uppercase().as_str() {
            "INPUT" => FocusTarget::TextInput,
            "TEXTAREA" => FocusTarget::TextArea,
            _ => FocusTarget::Scene,
        }
    }

    /// Keys typed here belong to the element, not to the map.
    pub fn takes_text(self) -> bool {
        !matches!(self, FocusTarget::Scene)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// `KeyboardEvent.key` value, e.g. `"Delete"`.
    pub key: String,
    pub target: FocusTarget,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, target: FocusTarget) -> Self {
        Self {
            key: key.into(),
            target,
        }
    }

    pub fn is_delete(&self) -> bool {
        self.key == "Delete"
    }
}
