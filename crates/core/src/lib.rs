#![forbid(unsafe_code)]

pub mod ids {
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct ScopeId(String);

    impl ScopeId {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, ScopeIdError> {
            let value = value.into();
            validate_scope_id(&value)?;
            Ok(Self(value))
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum ScopeIdError {
        Empty,
        TooLong,
        InvalidFirstChar,
        InvalidChar { ch: char, index: usize },
    }

    impl ScopeIdError {
        pub fn message(&self) -> &'static str {
            match self {
                Self::Empty => "scope id must not be empty",
                Self::TooLong => "scope id is too long",
                Self::InvalidFirstChar => "scope id must start with an alphanumeric character",
                Self::InvalidChar { .. } => "scope id contains an invalid character",
            }
        }
    }

    fn validate_scope_id(value: &str) -> Result<(), ScopeIdError> {
        if value.is_empty() {
            return Err(ScopeIdError::Empty);
        }
        if value.len() > 128 {
            return Err(ScopeIdError::TooLong);
        }
        let mut chars = value.chars();
        let Some(first) = chars.next() else {
            return Err(ScopeIdError::Empty);
        };
        if !first.is_ascii_alphanumeric() {
            return Err(ScopeIdError::InvalidFirstChar);
        }
        for (index, ch) in value.chars().enumerate() {
            if index == 0 {
                continue;
            }
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '/' | '-' | ':') {
                continue;
            }
            return Err(ScopeIdError::InvalidChar { ch, index });
        }
        Ok(())
    }
}

pub mod tree;
