use serde::de::DeserializeOwned;

/// A strongly typed task input.
///
/// Implementors list their fields so parameter bindings can be checked
/// before the task is called.
pub trait TaskInput: DeserializeOwned + Send + 'static {
  /// Name shown in task definitions as the input type.
  const TYPE_NAME: &'static str;

  fn fields() -> Vec<InputField>;
}

/// One field of a [`TaskInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputField {
  pub name: &'static str,
  pub data_type: &'static str,
  pub doc: &'static str,
  pub optional: bool,
}

impl InputField {
  pub const fn required(name: &'static str, data_type: &'static str, doc: &'static str) -> Self {
    Self {
      name,
      data_type,
      doc,
      optional: false,
    }
  }

  pub const fn optional(name: &'static str, data_type: &'static str, doc: &'static str) -> Self {
    Self {
      name,
      data_type,
      doc,
      optional: true,
    }
  }
}

/// Whether a task takes input, and if so which fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputShape {
  None,
  Structured {
    type_name: &'static str,
    fields: Vec<InputField>,
  },
}

impl InputShape {
  pub fn of<In: TaskInput>() -> Self {
    InputShape::Structured {
      type_name: In::TYPE_NAME,
      fields: In::fields(),
    }
  }

  pub fn is_structured(&self) -> bool {
    matches!(self, InputShape::Structured { .. })
  }

  pub fn fields(&self) -> &[InputField] {
    match self {
      InputShape::None => &[],
      InputShape::Structured { fields, .. } => fields,
    }
  }

  pub fn type_name(&self) -> Option<&'static str> {
    match self {
      InputShape::None => None,
      InputShape::Structured { type_name, .. } => Some(*type_name),
    }
  }
}
