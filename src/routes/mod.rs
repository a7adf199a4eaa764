mod campaigns;
mod credentials;
mod health_check;

pub use campaigns::*;
pub use credentials::*;
pub use health_check::*;

/// Writes an error followed by every cause in its chain, one per line.
pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
