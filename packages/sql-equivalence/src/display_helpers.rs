use std::fmt::{Display, Formatter, Result};

/// Renders a list as `'a', 'b'` for mismatch explanations.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct Fmt<T>(pub(crate) T);

impl<T: Display> Display for Fmt<&[T]> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let quoted: Vec<String> = self.0.iter().map(|item| format!("'{item}'")).collect();
        f.write_str(&quoted.join(", "))
    }
}

impl<T: Display> Display for Fmt<&Vec<T>> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        Display::fmt(&Fmt(self.0.as_slice()), f)
    }
}

impl<T: Display> Display for Fmt<Option<T>> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match &self.0 {
            Some(value) => Display::fmt(value, f),
            None => f.write_str("(none)"),
        }
    }
}
