//! Format writers
use crate::{
    error::WriterError,
    output::{OutputRequest, ZoneView},
    types::{OutputFormat, RealScalar},
};
use std::io::Write;

pub trait Writer<T: RealScalar> {
    //! A writer for one output format
    //!
    //! Writers only encode. Choosing file names and moving finished files into place is done by
    //! the dispatcher.

    /// The format this writer produces
    fn format(&self) -> OutputFormat;

    /// Encode one zone
    fn write(
        &self,
        zone: &ZoneView<'_, T>,
        request: &OutputRequest,
        out: &mut dyn Write,
    ) -> Result<(), WriterError>;
}
