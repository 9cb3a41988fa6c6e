//! Folding SOC fragments into one merged document.

use log::debug;
use soc::{Soc, parse_soc};

use crate::error::{KartError, Result};

/// Parse `fragments` in the order given, each on top of the document built so
/// far. A fragment that fails to parse fails the whole merge.
pub fn combine_socs<S: AsRef<str>>(label: &str, fragments: &[S]) -> Result<Soc> {
    let soc = fragments
        .iter()
        .enumerate()
        .try_fold(Soc::new(), |soc, (index, text)| {
            parse_soc(label, text.as_ref(), soc).map_err(|source| KartError::ConfigParse {
                label: label.to_owned(),
                index,
                source,
            })
        })?;
    debug!("{}: merged {} SOC fragments", label, fragments.len());
    Ok(soc)
}
