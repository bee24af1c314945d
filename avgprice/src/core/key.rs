use std::fmt;

/// Group identity: the (make, model) pair itself, compared by value.
#[derive(Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Debug)]
pub struct CompositeKey {
    pub make: String,
    pub model: String,
}

impl CompositeKey {
    pub fn new(make: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
        }
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.make, self.model)
    }
}
