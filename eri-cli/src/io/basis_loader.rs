//! Basis set assembly from a geometry and an NWChem library file

use crate::config::Atom;
use basis::{BasisLibrary, BasisSet};
use color_eyre::eyre::{eyre, Result, WrapErr};
use nalgebra::Vector3;
use periodic_table_on_an_enum::Element;
use std::path::{Path, PathBuf};
use tracing::info;

/// Relative library paths are taken relative to the directory of the job file.
pub fn resolve_basis_path(config_file: &str, basis_file: &str) -> PathBuf {
    let path = Path::new(basis_file);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match Path::new(config_file).parent() {
        Some(dir) => dir.join(path),
        None => path.to_path_buf(),
    }
}

/// Validates element symbols and places the library shells on every atom.
pub fn load_basis(path: &Path, geometry: &[Atom]) -> Result<BasisSet> {
    let mut atoms = Vec::with_capacity(geometry.len());
    for atom in geometry {
        let element = Element::from_symbol(&atom.element)
            .ok_or_else(|| eyre!("Invalid element symbol: {}", atom.element))?;
        let [x, y, z] = atom.coords;
        atoms.push((element.get_symbol().to_string(), Vector3::new(x, y, z)));
    }

    let library = BasisLibrary::load_from_file(path)
        .wrap_err_with(|| format!("Failed to load basis library: {}", path.display()))?;
    info!(
        "Loaded basis library '{}' with {} elements",
        library.name,
        library.elements.len()
    );

    library
        .build(&atoms)
        .wrap_err("Failed to place basis functions on the geometry")
}
