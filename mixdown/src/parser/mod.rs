pub mod error;
mod structural;
mod value;

pub use error::ParseError;

use crate::document::Section;

/// Parser entry point.
pub struct Parser<'a> {
    source: &'a str,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Parser { source }
    }

    /// Parse the source into its root section, with every value block typed.
    pub fn parse(&self) -> Result<Section, ParseError> {
        structural::parse_section(self.source)
    }
}
