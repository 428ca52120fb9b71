mod basis_loader;
mod output;

pub use basis_loader::{load_basis, resolve_basis_path};
pub use output::{setup_output, write_summary, RunSummary};
