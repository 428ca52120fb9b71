use crate::basis::BasisSet;
use crate::cgto::{BasisShell, Contraction, ShellType};
use crate::helper::am_from_letter;
use crate::BasisError;
use nalgebra::Vector3;
use periodic_table_on_an_enum::Element;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Per-element shell templates read from a basis-set file. Templates sit at
/// the origin and are moved onto atoms by [`BasisLibrary::build`].
#[derive(Debug, Clone, Default)]
pub struct BasisLibrary {
    pub name: String,
    pub elements: BTreeMap<String, Vec<BasisShell>>,
}

// Example of nwchem format:
// BASIS "ao basis" SPHERICAL PRINT
// #BASIS SET: (4s,1p) -> [2s,1p]
// H    S
//       1.301000E+01           1.968500E-02
//       1.962000E+00           1.379770E-01
//       4.446000E-01           4.781480E-01
// H    S
//       1.220000E-01           1.000000E+00
// O    SP
//       5.0331513              -0.0999672             0.1559163
// END

fn canonical_symbol(symbol: &str) -> String {
    let mut chars = symbol.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
        None => String::new(),
    }
}

fn parse_float(token: &str, line: usize) -> Result<f64, BasisError> {
    token
        .replace(['D', 'd'], "E")
        .parse::<f64>()
        .map_err(|_| BasisError::Parse {
            line,
            message: format!("invalid number '{}'", token),
        })
}

struct Block<'a> {
    element: String,
    letters: &'a str,
    header_line: usize,
    rows: Vec<(usize, &'a str)>,
}

impl BasisLibrary {
    pub fn parse_nwchem(input: &str) -> Result<Self, BasisError> {
        let mut library = BasisLibrary {
            name: String::from("ao basis"),
            elements: BTreeMap::new(),
        };
        let mut shell_type = ShellType::Spherical;
        let mut current: Option<Block> = None;

        for (idx, raw) in input.lines().enumerate() {
            let lineno = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            let head = tokens[0];

            if head.eq_ignore_ascii_case("BASIS") {
                if let Some(name) = line.split('"').nth(1) {
                    library.name = name.to_string();
                }
                if tokens.iter().any(|t| t.eq_ignore_ascii_case("CARTESIAN")) {
                    shell_type = ShellType::Cartesian;
                }
                continue;
            }

            if head.eq_ignore_ascii_case("END") {
                if let Some(block) = current.take() {
                    library.push_block(block, shell_type)?;
                }
                continue;
            }

            if head.chars().all(char::is_alphabetic) {
                if tokens.len() < 2 {
                    return Err(BasisError::Parse {
                        line: lineno,
                        message: format!("expected '<element> <shell>' but found '{}'", line),
                    });
                }
                let symbol = canonical_symbol(head);
                if Element::from_symbol(&symbol).is_none() {
                    return Err(BasisError::UnknownElement(symbol));
                }
                if let Some(block) = current.take() {
                    library.push_block(block, shell_type)?;
                }
                current = Some(Block {
                    element: symbol,
                    letters: tokens[1],
                    header_line: lineno,
                    rows: Vec::new(),
                });
                continue;
            }

            match current.as_mut() {
                Some(block) => block.rows.push((lineno, line)),
                None => {
                    return Err(BasisError::Parse {
                        line: lineno,
                        message: "primitive row outside of a shell block".to_string(),
                    })
                }
            }
        }

        if let Some(block) = current.take() {
            library.push_block(block, shell_type)?;
        }

        Ok(library)
    }

    fn push_block(&mut self, block: Block, shell_type: ShellType) -> Result<(), BasisError> {
        let ams = block
            .letters
            .chars()
            .map(|c| am_from_letter(c).ok_or_else(|| BasisError::UnknownShell(block.letters.to_string())))
            .collect::<Result<Vec<usize>, _>>()?;

        let mut exponents = Vec::with_capacity(block.rows.len());
        let mut columns: Vec<Vec<f64>> = Vec::new();

        for &(lineno, row) in &block.rows {
            let values = row
                .split_whitespace()
                .map(|t| parse_float(t, lineno))
                .collect::<Result<Vec<f64>, _>>()?;
            if values.len() < 2 {
                return Err(BasisError::Parse {
                    line: lineno,
                    message: "expected an exponent followed by coefficients".to_string(),
                });
            }
            if columns.is_empty() {
                columns = vec![Vec::new(); values.len() - 1];
            } else if columns.len() != values.len() - 1 {
                return Err(BasisError::Parse {
                    line: lineno,
                    message: format!(
                        "expected {} coefficients, found {}",
                        columns.len(),
                        values.len() - 1
                    ),
                });
            }
            exponents.push(values[0]);
            for (col, &v) in columns.iter_mut().zip(&values[1..]) {
                col.push(v);
            }
        }

        // "SP" style blocks give one letter per column, "S" style blocks with
        // several columns are generalized contractions of a single l
        let column_am: Vec<usize> = if ams.len() == 1 {
            vec![ams[0]; columns.len()]
        } else if ams.len() == columns.len() {
            ams
        } else {
            return Err(BasisError::Parse {
                line: block.header_line,
                message: format!(
                    "shell '{}' needs {} coefficient columns, found {}",
                    block.letters,
                    ams.len(),
                    columns.len()
                ),
            });
        };

        let contractions = column_am
            .into_iter()
            .zip(columns)
            .map(|(am, coefficients)| Contraction { am, coefficients })
            .collect();

        let shell = BasisShell::new(Vector3::zeros(), exponents, contractions, shell_type)?;
        self.elements.entry(block.element).or_default().push(shell);
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, BasisError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| BasisError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_nwchem(&content)
    }

    pub fn shells_for(&self, symbol: &str) -> Option<&[BasisShell]> {
        self.elements.get(&canonical_symbol(symbol)).map(Vec::as_slice)
    }

    /// Places the element templates on every atom, in atom order.
    pub fn build<S: AsRef<str>>(&self, atoms: &[(S, Vector3<f64>)]) -> Result<BasisSet, BasisError> {
        let mut shells = Vec::new();
        for (symbol, center) in atoms {
            let templates = self
                .shells_for(symbol.as_ref())
                .ok_or_else(|| BasisError::MissingElement(canonical_symbol(symbol.as_ref())))?;
            shells.extend(templates.iter().cloned().map(|sh| sh.with_center(*center)));
        }
        Ok(BasisSet::new(self.name.clone(), shells))
    }
}
