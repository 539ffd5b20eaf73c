//! Single-line `source()` chain rendering for `tracing` fields (spec §6
//! "structured logging"): a gossip RPC failure or a store error nested
//! three `snafu` layers deep should still read as one `a: b: c`, not a
//! multi-line `{:?}` dump in the log line.

use std::{error, fmt};

pub struct FmtCompactError<'e, E>(pub &'e E);

impl<E> fmt::Display for FmtCompactError<'_, E>
where
    E: error::Error,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut error = Some(self.0 as &dyn error::Error);

        while let Some(err) = error {
            f.write_fmt(format_args!("{err}"))?;
            error = err.source();
            if error.is_some() {
                f.write_str(": ")?;
            }
        }

        Ok(())
    }
}

pub trait FmtCompact {
    type Report<'a>: fmt::Display
    where
        Self: 'a;
    fn fmt_compact(&self) -> Self::Report<'_>;
}

impl<E> FmtCompact for E
where
    E: error::Error,
{
    type Report<'a>
        = FmtCompactError<'a, E>
    where
        E: 'a;
    fn fmt_compact(&self) -> Self::Report<'_> {
        FmtCompactError(self)
    }
}
