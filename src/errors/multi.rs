//! Ordered aggregation of independent errors.

use std::fmt;

/// Collects several errors so that a caller can report all of them at once
/// instead of stopping at the first one.
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<Box<dyn std::error::Error + Send + Sync>>,
}

impl MultiError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error, keeping insertion order.
    pub fn push<E>(&mut self, err: E)
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.errors.push(err.into());
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `Ok(())` when nothing was collected, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.errors.len() == 1 { "error" } else { "errors" };
        write!(f, "{} {} occurred:", self.errors.len(), noun)?;
        for err in &self.errors {
            write!(f, "\n\t* {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}
